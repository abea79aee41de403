use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

pub struct Metrics {
    pub query_counter: IntCounter,
    pub error_counter: IntCounter,
    pub query_histogram: Histogram,
}

/// Process-wide GraphQL metrics, registered with the default Prometheus
/// registry and exposed by the binary's `/metrics` endpoint.
pub static METRICS: Lazy<Metrics> = Lazy::new(|| Metrics {
    query_counter: register_int_counter!(
        "graphward_queries_total",
        "Total number of GraphQL requests executed."
    )
    .expect("metric registration"),
    error_counter: register_int_counter!(
        "graphward_query_errors_total",
        "Total number of errors returned in GraphQL responses."
    )
    .expect("metric registration"),
    query_histogram: register_histogram!(
        "graphward_query_duration_seconds",
        "GraphQL request execution time in seconds."
    )
    .expect("metric registration"),
});
