use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Committed mutations and version conflicts per entity kind
// - Commit latency and failures
// - Rollbacks and authorization denials
//
// The registry is rendered in the Prometheus text format by `render()`;
// exposing it over HTTP is left to the embedding service.
// ============================================================================

/// Central metrics registry for the procurement core
pub struct Metrics {
    registry: Registry,

    // Mutation protocol
    pub mutations_committed: IntCounterVec,
    pub mutation_conflicts: IntCounterVec,
    pub commit_failures: IntCounter,
    pub commit_duration: Histogram,

    // Use-case outcomes
    pub rollbacks: IntCounterVec,
    pub authorization_denials: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let mutations_committed = IntCounterVec::new(
            Opts::new(
                "procurement_mutations_committed_total",
                "Versioned writes committed",
            ),
            &["entity"],
        )?;
        registry.register(Box::new(mutations_committed.clone()))?;

        let mutation_conflicts = IntCounterVec::new(
            Opts::new(
                "procurement_mutation_conflicts_total",
                "Batches rejected because the expected version was stale",
            ),
            &["entity"],
        )?;
        registry.register(Box::new(mutation_conflicts.clone()))?;

        let commit_failures = IntCounter::new(
            "procurement_commit_failures_total",
            "Batches that failed for reasons other than a version conflict",
        )?;
        registry.register(Box::new(commit_failures.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "procurement_commit_duration_seconds",
                "Mutation batch commit duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        let rollbacks = IntCounterVec::new(
            Opts::new("procurement_rollbacks_total", "Completed rollbacks"),
            &["entity"],
        )?;
        registry.register(Box::new(rollbacks.clone()))?;

        let authorization_denials = IntCounterVec::new(
            Opts::new(
                "procurement_authorization_denials_total",
                "Requests rejected as forbidden",
            ),
            &["entity"],
        )?;
        registry.register(Box::new(authorization_denials.clone()))?;

        Ok(Self {
            registry,
            mutations_committed,
            mutation_conflicts,
            commit_failures,
            commit_duration,
            rollbacks,
            authorization_denials,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_mutation(&self, entity: &str) {
        self.mutations_committed.with_label_values(&[entity]).inc();
    }

    pub fn record_conflict(&self, entity: &str) {
        self.mutation_conflicts.with_label_values(&[entity]).inc();
    }

    pub fn record_rollback(&self, entity: &str) {
        self.rollbacks.with_label_values(&[entity]).inc();
    }

    pub fn record_denial(&self, entity: &str) {
        self.authorization_denials.with_label_values(&[entity]).inc();
    }

    /// Encode every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.commit_failures.inc();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_mutation_per_entity() {
        let metrics = Metrics::new().unwrap();
        metrics.record_mutation("Tender");
        metrics.record_mutation("Tender");
        metrics.record_mutation("Bid");

        assert_eq!(metrics.mutations_committed.with_label_values(&["Tender"]).get(), 2);
        assert_eq!(metrics.mutations_committed.with_label_values(&["Bid"]).get(), 1);
    }

    #[test]
    fn test_render_contains_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_conflict("Bid");
        metrics.record_rollback("Tender");

        let text = metrics.render().unwrap();
        assert!(text.contains("procurement_mutation_conflicts_total{entity=\"Bid\"} 1"));
        assert!(text.contains("procurement_rollbacks_total{entity=\"Tender\"} 1"));
    }
}
