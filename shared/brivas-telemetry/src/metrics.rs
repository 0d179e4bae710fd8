//! Metrics primitives

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic counter
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
    name: String,
}

impl Counter {
    pub fn new(name: &str) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.to_string(),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Point-in-time value
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    value: Arc<AtomicU64>,
    name: String,
}

impl Gauge {
    pub fn new(name: &str) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.to_string(),
        }
    }

    pub fn set(&self, val: u64) {
        self.value.store(val, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Bounded sample window for percentile reporting
#[derive(Debug, Clone)]
pub struct Histogram {
    samples: Arc<Mutex<Vec<f64>>>,
    name: String,
    max_samples: usize,
}

impl Histogram {
    pub fn new(name: &str) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::with_capacity(1000))),
            name: name.to_string(),
            max_samples: 10000,
        }
    }

    pub fn record(&self, value: f64) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.max_samples {
            samples.remove(0);
        }
        samples.push(value);
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn percentile(&self, p: f64) -> f64 {
        let mut samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        samples.sort_by(|a, b| a.total_cmp(b));
        let idx = ((samples.len() as f64) * p / 100.0) as usize;
        samples[idx.min(samples.len() - 1)]
    }

    pub fn mean(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSummary {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p99: f64,
}

/// Serializable view of a set of metrics, keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramSummary>,
}

impl MetricsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(mut self, counter: &Counter) -> Self {
        self.counters.insert(counter.name().to_string(), counter.get());
        self
    }

    pub fn gauge(mut self, gauge: &Gauge) -> Self {
        self.gauges.insert(gauge.name().to_string(), gauge.get());
        self
    }

    pub fn histogram(mut self, histogram: &Histogram) -> Self {
        self.histograms.insert(
            histogram.name().to_string(),
            HistogramSummary {
                count: histogram.count(),
                mean: histogram.mean(),
                p50: histogram.percentile(50.0),
                p99: histogram.percentile(99.0),
            },
        );
        self
    }

    pub fn to_json(&self) -> Result<String, crate::TelemetryError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("frames_decoded");
        assert_eq!(counter.get(), 0);
        counter.inc();
        assert_eq!(counter.get(), 1);
        counter.add(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new("associations");
        gauge.set(10);
        assert_eq!(gauge.get(), 10);
        gauge.inc();
        assert_eq!(gauge.get(), 11);
        gauge.dec();
        assert_eq!(gauge.get(), 10);
    }

    #[test]
    fn test_histogram() {
        let hist = Histogram::new("decode_us");
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            hist.record(v);
        }
        assert_eq!(hist.count(), 5);
        assert!((hist.mean() - 3.0).abs() < 0.001);
        assert!((hist.percentile(50.0) - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_snapshot_json() {
        let decoded = Counter::new("frames_decoded");
        decoded.add(3);
        let assoc = Gauge::new("associations");
        assoc.set(1);
        let json = MetricsSnapshot::new().counter(&decoded).gauge(&assoc).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"counters":{"frames_decoded":3},"gauges":{"associations":1},"histograms":{}}"#
        );
    }
}
