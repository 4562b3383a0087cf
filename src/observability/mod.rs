//! Structured logging and lightweight runtime metrics.
//!
//! This module provides:
//! - [`init_logging`] — One-time structured logging setup with `RUST_LOG` support
//! - [`Metrics`] — Lightweight traversal metrics collector

use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `fieldlineage=info` when `RUST_LOG` is not set. Call once at
/// program startup — subsequent calls are silently ignored by
/// `tracing_subscriber`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fieldlineage=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Lightweight traversal metrics collector.
///
/// Tracks how many traversals ran, how much graph they returned, and how
/// long they took. Serializable to JSON via [`Metrics::to_json`].
pub struct Metrics {
    pub traversals_run: u64,
    pub edges_returned: u64,
    pub nodes_returned: u64,
    pub total_traversal_ms: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            traversals_run: 0,
            edges_returned: 0,
            nodes_returned: 0,
            total_traversal_ms: 0,
        }
    }

    /// Fold one finished traversal into the running totals.
    pub fn record_traversal(&mut self, edge_count: usize, node_count: usize, elapsed: Duration) {
        self.traversals_run += 1;
        self.edges_returned += edge_count as u64;
        self.nodes_returned += node_count as u64;
        self.total_traversal_ms += elapsed.as_millis() as u64;
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "traversals_run": self.traversals_run,
            "edges_returned": self.edges_returned,
            "nodes_returned": self.nodes_returned,
            "total_traversal_ms": self.total_traversal_ms,
            "avg_traversal_ms": self.avg_traversal_ms(),
        })
    }

    pub fn avg_traversal_ms(&self) -> f64 {
        if self.traversals_run == 0 {
            return 0.0;
        }
        self.total_traversal_ms as f64 / self.traversals_run as f64
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- init_logging -------------------------------------------------------

    #[test]
    fn init_logging_does_not_panic() {
        init_logging();
        // Second call should also not panic (try_init ignores re-init).
        init_logging();
    }

    // -- Metrics ------------------------------------------------------------

    #[test]
    fn metrics_new_has_zero_values() {
        let m = Metrics::new();
        assert_eq!(m.traversals_run, 0);
        assert_eq!(m.edges_returned, 0);
        assert_eq!(m.nodes_returned, 0);
        assert_eq!(m.total_traversal_ms, 0);
    }

    #[test]
    fn metrics_default_equals_new() {
        let a = Metrics::new();
        let b = Metrics::default();
        assert_eq!(a.traversals_run, b.traversals_run);
        assert_eq!(a.edges_returned, b.edges_returned);
        assert_eq!(a.total_traversal_ms, b.total_traversal_ms);
    }

    #[test]
    fn record_traversal_accumulates() {
        let mut m = Metrics::new();
        m.record_traversal(4, 5, Duration::from_millis(12));
        m.record_traversal(10, 8, Duration::from_millis(8));

        assert_eq!(m.traversals_run, 2);
        assert_eq!(m.edges_returned, 14);
        assert_eq!(m.nodes_returned, 13);
        assert_eq!(m.total_traversal_ms, 20);
    }

    #[test]
    fn metrics_to_json_contains_all_fields() {
        let mut m = Metrics::new();
        m.record_traversal(100, 42, Duration::from_millis(450));
        m.record_traversal(20, 10, Duration::from_millis(50));

        let json = m.to_json();
        assert_eq!(json["traversals_run"], 2);
        assert_eq!(json["edges_returned"], 120);
        assert_eq!(json["nodes_returned"], 52);
        assert_eq!(json["total_traversal_ms"], 500);
        assert_eq!(json["avg_traversal_ms"], 250.0);
    }

    #[test]
    fn metrics_avg_traversal_ms() {
        let mut m = Metrics::new();
        m.record_traversal(1, 2, Duration::from_millis(30));
        m.record_traversal(1, 2, Duration::from_millis(10));
        let avg = m.avg_traversal_ms();
        assert!((avg - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metrics_avg_zero_traversals() {
        let m = Metrics::new();
        assert_eq!(m.avg_traversal_ms(), 0.0);
    }
}
