//! Prometheus metrics for the reconcile loop.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Reconcile counters and timings, registered on a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciles_total: IntCounterVec,
    reconcile_duration: HistogramVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ainic_controller".to_string()), None)?;

        let reconciles_total = IntCounterVec::new(
            Opts::new("reconciles_total", "Reconcile passes grouped by result"),
            &["result"],
        )?;
        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new("reconcile_duration_seconds", "Time spent in a reconcile pass")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["result"],
        )?;

        registry.register(Box::new(reconciles_total.clone()))?;
        registry.register(Box::new(reconcile_duration.clone()))?;

        Ok(Self {
            registry,
            reconciles_total,
            reconcile_duration,
        })
    }

    /// Records the outcome of a pass timed from `started`.
    pub fn observe(&self, started: std::time::Instant, success: bool) {
        let result = if success { "success" } else { "error" };
        self.reconciles_total.with_label_values(&[result]).inc();
        self.reconcile_duration
            .with_label_values(&[result])
            .observe(started.elapsed().as_secs_f64());
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_render_counts_by_result() {
        let metrics = Metrics::new().unwrap();
        metrics.observe(Instant::now(), true);
        metrics.observe(Instant::now(), true);
        metrics.observe(Instant::now(), false);

        let text = metrics.render().unwrap();

        assert!(text.contains("ainic_controller_reconciles_total{result=\"success\"} 2"));
        assert!(text.contains("ainic_controller_reconciles_total{result=\"error\"} 1"));
        assert!(text.contains("ainic_controller_reconcile_duration_seconds_bucket"));
    }

    #[test]
    fn test_instances_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.observe(Instant::now(), true);

        assert!(!second.render().unwrap().contains("result=\"success\"} 1"));
    }
}
