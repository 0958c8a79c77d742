//! Heap Metrics - Export Metrics
//!
//! Exports heap counters for monitoring systems
//! (Prometheus text format, JSON).

use super::RcSummary;
use indexmap::IndexMap;

/// RcMetrics - metrics exporter
///
/// Keeps insertion order so exports are stable.
#[derive(Debug, Default)]
pub struct RcMetrics {
    metrics: IndexMap<String, MetricValue>,
}

impl RcMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard metric set from a stats summary
    pub fn from_summary(summary: &RcSummary) -> Self {
        let mut metrics = Self::new();
        metrics.add("frc_allocations_total", MetricValue::Counter(summary.allocations));
        metrics.add(
            "frc_allocated_bytes_total",
            MetricValue::Counter(summary.bytes_allocated),
        );
        metrics.add("frc_retain_calls_total", MetricValue::Counter(summary.retain_calls));
        metrics.add("frc_release_calls_total", MetricValue::Counter(summary.release_calls));
        metrics.add("frc_frees_total", MetricValue::Counter(summary.frees));
        metrics.add("frc_freed_bytes_total", MetricValue::Counter(summary.bytes_freed));
        metrics.add("frc_cascades_total", MetricValue::Counter(summary.cascades));
        metrics.add(
            "frc_peak_work_list",
            MetricValue::Gauge(summary.peak_work_list as f64),
        );
        metrics.add("frc_live_objects", MetricValue::Gauge(summary.live_objects as f64));
        metrics.add("frc_live_bytes", MetricValue::Gauge(summary.live_bytes as f64));
        metrics
    }

    /// Add metric
    pub fn add(&mut self, name: impl Into<String>, value: MetricValue) {
        self.metrics.insert(name.into(), value);
    }

    /// Get metric
    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.metrics.get(name).copied()
    }

    /// Export to Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        for (name, value) in &self.metrics {
            output.push_str(&format!("# TYPE {} {}\n", name, value.kind()));
            output.push_str(&format!("{} {}\n", name, value.as_f64()));
        }

        output
    }

    /// Export to JSON
    pub fn to_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .metrics
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::json!(value.as_f64())))
            .collect();

        serde_json::Value::Object(map).to_string()
    }
}

/// Metric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Counter(v) => *v as f64,
            MetricValue::Gauge(v) => *v,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MetricValue::Counter(_) => "counter",
            MetricValue::Gauge(_) => "gauge",
        }
    }
}
