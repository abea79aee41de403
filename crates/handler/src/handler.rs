use std::{convert::Infallible, time::Instant};

use async_graphql::http::GraphiQLSource;
use http::HeaderMap;
use tracing::instrument;
use warp::{http::Response as HttpResponse, Filter, Rejection, Reply};

use graphward_executor::{Executor, Request, RequestContext};

use crate::{auth::extract_credentials, metrics::METRICS, App};

/// The POST endpoint executing GraphQL requests.
pub fn graphql_request(app: App) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::post()
        .and(warp::body::json())
        .and(warp::header::headers_cloned())
        .and_then(move |request: Request, headers: HeaderMap| {
            let app = app.clone();
            async move {
                let started = Instant::now();
                let credentials = extract_credentials(&app.credentials, &headers);
                let ctx = RequestContext::new(
                    app.schema.clone(),
                    app.store.clone(),
                    app.gate.clone(),
                    app.guards.clone(),
                    app.resolvers.clone(),
                )
                .with_credentials(credentials)
                .with_debug(app.debug);

                let response = Executor::new(ctx).execute(&request);

                METRICS.query_counter.inc();
                METRICS
                    .query_histogram
                    .observe(started.elapsed().as_secs_f64());
                if !response.errors.is_empty() {
                    METRICS.error_counter.inc_by(response.errors.len() as u64);
                    tracing::debug!(errors = response.errors.len(), "request finished with errors");
                }

                Ok::<_, Infallible>(warp::reply::json(&response))
            }
        })
}

/// The GraphiQL playground page.
#[instrument(level = "trace")]
pub fn graphql_playground(
    path: String,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let endpoint = format!("/{path}");
    warp::get().map(move || {
        HttpResponse::builder()
            .header("content-type", "text/html")
            .body(GraphiQLSource::build().endpoint(endpoint.as_str()).finish())
    })
}
