use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all SoundClone metrics
const PREFIX: &str = "soundclone";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Authentication Metrics
    pub static ref AUTH_LOGIN_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_auth_login_attempts_total"), "Total login attempts"),
        &["status"]
    ).expect("Failed to create auth_login_attempts_total metric");

    pub static ref AUTH_LOGIN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_auth_login_duration_seconds"),
            "Login request duration in seconds"
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0])
    ).expect("Failed to create auth_login_duration_seconds metric");

    // Social Metrics
    pub static ref INTERACTION_TOGGLES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_interaction_toggles_total"), "Interaction toggles by type and outcome"),
        &["type", "action"]
    ).expect("Failed to create interaction_toggles_total metric");

    pub static ref SONG_PLAYS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_song_plays_total"),
        "Total song plays registered"
    ).expect("Failed to create song_plays_total metric");

    pub static ref SEARCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_searches_total"), "Total searches"),
        &["caller"]
    ).expect("Failed to create searches_total metric");

    // Content Metrics
    pub static ref CONTENT_ITEMS_TOTAL: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_content_items_total"), "Total stored items"),
        &["type"]
    ).expect("Failed to create content_items_total metric");

    // Error Metrics
    pub static ref INTERNAL_ERRORS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_internal_errors_total"),
        "Total requests answered with an internal error"
    ).expect("Failed to create internal_errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_ATTEMPTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(AUTH_LOGIN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(INTERACTION_TOGGLES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SONG_PLAYS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SEARCHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CONTENT_ITEMS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(INTERNAL_ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Refresh the stored item gauges
pub fn set_content_items(users: usize, songs: usize, albums: usize, playlists: usize) {
    CONTENT_ITEMS_TOTAL
        .with_label_values(&["user"])
        .set(users as f64);
    CONTENT_ITEMS_TOTAL
        .with_label_values(&["song"])
        .set(songs as f64);
    CONTENT_ITEMS_TOTAL
        .with_label_values(&["album"])
        .set(albums as f64);
    CONTENT_ITEMS_TOTAL
        .with_label_values(&["playlist"])
        .set(playlists as f64);
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a login attempt
pub fn record_login_attempt(status: &str, duration: Duration) {
    AUTH_LOGIN_ATTEMPTS_TOTAL
        .with_label_values(&[status])
        .inc();
    AUTH_LOGIN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record an interaction toggle; `action` is "creado" or "eliminado"
pub fn record_interaction_toggle(kind: &str, action: &str) {
    INTERACTION_TOGGLES_TOTAL
        .with_label_values(&[kind, action])
        .inc();
}

pub fn record_song_play() {
    SONG_PLAYS_TOTAL.inc();
}

pub fn record_search(authenticated: bool) {
    let caller = if authenticated { "user" } else { "anonymous" };
    SEARCHES_TOTAL.with_label_values(&[caller]).inc();
}

pub fn record_internal_error() {
    INTERNAL_ERRORS_TOTAL.inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if line.starts_with("VmRSS:") {
                    // RSS is reported in kB
                    if let Some(kb_str) = line.split_whitespace().nth(1) {
                        if let Ok(kb) = kb_str.parse::<f64>() {
                            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
