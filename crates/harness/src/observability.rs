use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

// Prometheus metrics (default registry)
pub static CHECKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "finance_probe_checks_total",
        "Checks executed, by suite and outcome",
        &["suite", "outcome"]
    )
    .expect("register checks_total")
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "finance_probe_http_requests_total",
        "HTTP requests sent to the backend, by method and status",
        &["method", "status"]
    )
    .expect("register http_requests_total")
});

pub static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finance_probe_request_duration_seconds",
        "Backend request duration in seconds",
        &["method"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("register request_duration")
});

pub static LOGIN_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "finance_probe_login_attempts_total",
        "Login attempts, by outcome",
        &["outcome"]
    )
    .expect("register login_attempts_total")
});

pub static RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("finance_probe_retries_total", "Total retry attempts")
        .expect("register retries_total")
});

/// Text exposition of every registered metric.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    // Touch the lazies so families appear even when nothing was recorded.
    Lazy::force(&CHECKS_TOTAL);
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&REQUEST_DURATION);
    Lazy::force(&LOGIN_ATTEMPTS_TOTAL);
    Lazy::force(&RETRIES_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
