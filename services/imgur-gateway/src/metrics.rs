//! Prometheus metrics exposition
//!
//! - `imgur_auth_outcomes_total` (counter): label `outcome`
//! - `imgur_auth_duration_seconds` (histogram): label `outcome`
//! - `imgur_proxy_requests_total` (counter): label `status`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Histogram buckets for the authentication step: from a store hit that
/// takes microseconds up to a slow token endpoint round trip.
const AUTH_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("imgur_auth_duration_seconds".to_string()),
            AUTH_DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record how the middleware resolved a request's authentication.
pub fn record_auth_outcome(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("imgur_auth_outcomes_total", "outcome" => outcome).increment(1);
    metrics::histogram!("imgur_auth_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

/// Record a proxied Imgur API request by response status.
pub fn record_proxy_request(status: u16) {
    metrics::counter!("imgur_proxy_requests_total", "status" => status.to_string()).increment(1);
}
