#![forbid(unsafe_code)]

mod config;

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use config::Config;
use futures_util::FutureExt;
use prometheus::{Encoder, TextEncoder};
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warp::{http::Response as HttpResponse, hyper::StatusCode, Filter, Rejection, Reply};

use graphward_executor::{Response, ServerError};
use graphward_handler::{graphql_playground, graphql_request, App};
use graphward_schema::PolicySchema;
use graphward_store::{MemoryStore, SeedData};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("info"))
                .unwrap(),
        )
        .init();
}

fn metrics() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("metrics").and(warp::get()).map(|| {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
            return HttpResponse::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(err.to_string().into_bytes())
                .unwrap();
        }
        HttpResponse::builder()
            .status(StatusCode::OK)
            .body(buffer)
            .unwrap()
    })
}

async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else {
        tracing::error!("unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "Bad Request".to_string())
    };

    let res = warp::reply::json(&Response {
        data: value::ConstValue::Null,
        errors: vec![ServerError::new(message)],
    });

    Ok(warp::reply::with_status(res, code))
}

fn load_store(config: &Config) -> Result<MemoryStore> {
    match &config.seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read seed file '{}'.", path.display()))?;
            let seed: SeedData = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse seed file '{}'.", path.display()))?;
            Ok(MemoryStore::from_seed("default", seed)?)
        }
        None => {
            tracing::warn!("No seed file configured; the store starts empty.");
            Ok(MemoryStore::new("default"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::try_parse()?;

    let sdl = std::fs::read_to_string(&config.schema).with_context(|| {
        format!("Failed to read schema file '{}'.", config.schema.display())
    })?;
    let schema = PolicySchema::parse(&sdl)
        .with_context(|| format!("Invalid schema '{}'.", config.schema.display()))?;
    tracing::info!(
        types = schema.types.len(),
        schema = %config.schema.display(),
        "Schema loaded"
    );

    let store = load_store(&config)?;
    let gate = config.create_gate();
    let guards = config.create_guards().await?;

    let app = App::new(
        Arc::new(schema),
        Arc::new(store),
        Arc::new(gate),
        Arc::new(guards),
        Arc::new(Default::default()),
    )
    .with_credentials(config.credential_configs())
    .with_debug(config.debug);

    let path = config.path.clone();
    let graphql = warp::path(path.clone())
        .and(warp::path::end())
        .and(graphql_request(app).or(graphql_playground(path)));
    let health = warp::path!("health").map(|| warp::reply::json(&"healthy"));

    let bind_addr: SocketAddr = config
        .bind
        .parse()
        .context(format!("Failed to parse bind addr '{}'", config.bind))?;

    let routes = graphql.or(health).or(metrics());
    let (addr, server) = warp::serve(routes.recover(handle_rejection))
        .bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()));
    tracing::info!(addr = %addr, "Listening");
    server.await;
    tracing::info!("Server shutdown");

    Ok(())
}
