//! Prometheus exposition for dispatch metrics
//!
//! The dispatcher records through the `metrics` facade (see
//! `key_pool::metrics`). This installs the Prometheus recorder so a run
//! started with `--metrics` can print the exposition text on exit.

use key_pool::metrics::BACKOFF_HISTOGRAM;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries (seconds) for the backoff histogram. The default
/// schedule waits 2-3s then 4-5s; retry-after hints can push past a minute.
const BACKOFF_BUCKETS: &[f64] = &[0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 16.0, 30.0, 60.0, 120.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(BACKOFF_HISTOGRAM.to_string()), BACKOFF_BUCKETS)
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}
