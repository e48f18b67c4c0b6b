//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Gauge, HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mutuals_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "mutuals_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mutuals_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "mutuals_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Visibility Metrics
    pub static ref POSTS_HIDDEN_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mutuals_posts_hidden_total", "Posts dropped or redacted by the visibility check"),
        &["kind"]
    ).expect("metric can be created");

    // Action Metrics
    pub static ref ACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mutuals_actions_total", "Total number of mutating actions"),
        &["action", "result"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref AVATAR_UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mutuals_avatar_uploads_total", "Total number of avatar uploads"),
        &["status"]
    ).expect("metric can be created");

    // Application Metrics
    pub static ref APP_UPTIME_SECONDS: Gauge = Gauge::new(
        "mutuals_app_uptime_seconds",
        "Application uptime in seconds"
    ).expect("metric can be created");

    static ref STARTED_AT: std::time::Instant = std::time::Instant::now();

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("mutuals_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize and register all metrics
///
/// Safe to call more than once; duplicate registrations are ignored.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(DB_QUERIES_TOTAL.clone()),
        Box::new(DB_QUERY_DURATION_SECONDS.clone()),
        Box::new(POSTS_HIDDEN_TOTAL.clone()),
        Box::new(ACTIONS_TOTAL.clone()),
        Box::new(AVATAR_UPLOADS_TOTAL.clone()),
        Box::new(APP_UPTIME_SECONDS.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::debug!(%error, "Metric already registered");
        }
    }

    lazy_static::initialize(&STARTED_AT);
    tracing::info!("Metrics initialized");
}

/// Refresh the uptime gauge
pub fn update_uptime() {
    APP_UPTIME_SECONDS.set(STARTED_AT.elapsed().as_secs_f64());
}

/// Record the outcome of a mutating action
pub fn record_action<T, E>(action: &str, result: &Result<T, E>) {
    let outcome = if result.is_ok() { "success" } else { "failure" };
    ACTIONS_TOTAL.with_label_values(&[action, outcome]).inc();
}

/// Time a database call and count it
pub async fn observe_db<F, T>(operation: &str, table: &str, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .start_timer();
    let output = fut.await;
    timer.observe_duration();
    DB_QUERIES_TOTAL.with_label_values(&[operation, table]).inc();
    output
}
