use std::collections::BTreeMap;
use std::fmt;

pub const TILES_REQUESTED: &str = "tiles.requested";
pub const TILES_LOADED: &str = "tiles.loaded";
pub const TILES_FAILED: &str = "tiles.failed";
pub const CACHE_HITS: &str = "cache.hits";
pub const TILES_RESIDENT: &str = "tiles.resident";
pub const FRAME_MS: &str = "frame.ms";

/// Counters, gauges and timing summaries for the map loop.
///
/// Keys are kept in sorted maps so snapshots print in a stable order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, u64>,
    timings: BTreeMap<&'static str, Timing>,
}

/// Running summary of a duration series in milliseconds.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Timing {
    pub count: u64,
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl Timing {
    pub fn record(&mut self, ms: f64) {
        if self.count == 0 {
            self.min_ms = ms;
            self.max_ms = ms;
        } else {
            self.min_ms = self.min_ms.min(ms);
            self.max_ms = self.max_ms.max(ms);
        }
        self.count += 1;
        self.total_ms += ms;
    }

    pub fn mean_ms(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_ms / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub gauges: Vec<(&'static str, u64)>,
    pub timings: Vec<(&'static str, Timing)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn incr(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: u64) {
        self.gauges.insert(name, value);
    }

    pub fn record_ms(&mut self, name: &'static str, ms: f64) {
        self.timings.entry(name).or_default().record(ms);
    }

    pub fn timing(&self, name: &str) -> Option<Timing> {
        self.timings.get(name).copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (*k, *v)).collect(),
            timings: self.timings.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        for (name, value) in self.counters.iter().chain(self.gauges.iter()) {
            parts.push(format!("{name}={value}"));
        }
        for (name, timing) in &self.timings {
            if let Some(mean) = timing.mean_ms() {
                parts.push(format!("{name}.mean={mean:.1} {name}.max={:.1}", timing.max_ms));
            }
        }
        f.write_str(&parts.join(" "))
    }
}
