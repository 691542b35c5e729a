//! Dispatch metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! application installs a recorder.
//!
//! - `dispatch_attempts_total` (counter): label `outcome` (success|failure)
//! - `dispatch_backoff_seconds` (histogram): wait inserted between rounds
//! - `dispatch_results_total` (counter): label `result`
//!   (success|no_credentials|terminal|exhausted|cancelled)

use std::time::Duration;

/// Name of the backoff histogram, for bucket configuration by exporters.
pub const BACKOFF_HISTOGRAM: &str = "dispatch_backoff_seconds";

/// Record one operation invocation against one credential.
pub fn record_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("dispatch_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_backoff(delay: Duration) {
    metrics::histogram!(BACKOFF_HISTOGRAM).record(delay.as_secs_f64());
}

/// Record how a dispatch ended.
pub fn record_result(result: &'static str) {
    metrics::counter!("dispatch_results_total", "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_attempt(true);
        record_backoff(Duration::from_millis(2500));
        record_result("success");
    }

    #[test]
    fn attempts_and_results_render_with_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_attempt(false);
        record_attempt(false);
        record_attempt(true);
        record_result("success");

        let output = handle.render();
        assert!(
            output.contains("dispatch_attempts_total{outcome=\"failure\"} 2"),
            "output: {output}"
        );
        assert!(
            output.contains("dispatch_attempts_total{outcome=\"success\"} 1"),
            "output: {output}"
        );
        assert!(
            output.contains("dispatch_results_total{result=\"success\"} 1"),
            "output: {output}"
        );
    }

    #[test]
    fn backoff_histogram_records_seconds() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_backoff(Duration::from_millis(2500));

        let output = handle.render();
        assert!(output.contains(BACKOFF_HISTOGRAM), "output: {output}");
        assert!(
            output.contains("dispatch_backoff_seconds_sum 2.5"),
            "output: {output}"
        );
    }
}
