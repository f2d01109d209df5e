//! Prometheus metrics for monitoring
//!
//! Counters, gauges and a latency histogram exported in the Prometheus
//! text format at `/metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

/// Counter metric (monotonically increasing)
pub struct Counter {
    value: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Counter {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
            help,
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {0} {1}\n# TYPE {0} counter\n{0} {2}\n",
            self.name,
            self.help,
            self.get()
        )
    }
}

/// Gauge metric (can go up or down)
pub struct Gauge {
    value: AtomicI64,
    name: &'static str,
    help: &'static str,
}

impl Gauge {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicI64::new(0),
            name,
            help,
        }
    }

    pub fn set(&self, val: i64) {
        self.value.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {0} {1}\n# TYPE {0} gauge\n{0} {2}\n",
            self.name,
            self.help,
            self.get()
        )
    }
}

const RELAY_BUCKETS: [f64; 10] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0];

/// Fixed-bucket histogram for relay latency
pub struct Histogram {
    buckets: [AtomicU64; RELAY_BUCKETS.len()],
    /// Sum in microseconds
    sum_micros: AtomicU64,
    count: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Histogram {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            buckets: [const { AtomicU64::new(0) }; RELAY_BUCKETS.len()],
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
            name,
            help,
        }
    }

    /// Observe a value in seconds
    pub fn observe(&self, secs: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((secs * 1_000_000.0) as u64, Ordering::Relaxed);

        for (bound, count) in RELAY_BUCKETS.iter().zip(&self.buckets) {
            if secs <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Start a timer that records on drop
    pub fn start_timer(&self) -> HistogramTimer<'_> {
        HistogramTimer {
            histogram: self,
            start: Instant::now(),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        let mut output = format!(
            "# HELP {0} {1}\n# TYPE {0} histogram\n",
            self.name, self.help
        );

        for (bound, count) in RELAY_BUCKETS.iter().zip(&self.buckets) {
            let _ = writeln!(
                output,
                "{}_bucket{{le=\"{}\"}} {}",
                self.name,
                bound,
                count.load(Ordering::Relaxed)
            );
        }
        let count = self.count();
        let _ = writeln!(output, "{}_bucket{{le=\"+Inf\"}} {}", self.name, count);

        let sum_secs = self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let _ = writeln!(output, "{}_sum {}", self.name, sum_secs);
        let _ = writeln!(output, "{}_count {}", self.name, count);

        output
    }
}

/// Records elapsed time into a histogram when dropped
pub struct HistogramTimer<'a> {
    histogram: &'a Histogram,
    start: Instant,
}

impl Drop for HistogramTimer<'_> {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Standard Fedlink metrics
pub mod standard {
    use super::*;

    pub static REGISTRATIONS: Counter = Counter::new(
        "fedlink_registrations_total",
        "Workers admitted through authenticated registration",
    );

    pub static UNAUTHENTICATED_REGISTRATIONS: Counter = Counter::new(
        "fedlink_unauthenticated_registrations_total",
        "Workers admitted in open mode without key verification",
    );

    pub static AUTH_FAILURES: Counter = Counter::new(
        "fedlink_auth_failures_total",
        "Registration attempts rejected by the authenticator or registry",
    );

    pub static UPDATES_RECEIVED: Counter = Counter::new(
        "fedlink_updates_received_total",
        "Worker updates delivered to the application",
    );

    pub static MODEL_FETCHES: Counter = Counter::new(
        "fedlink_model_fetches_total",
        "Global model snapshots served",
    );

    pub static UNREGISTERED_REQUESTS: Counter = Counter::new(
        "fedlink_unregistered_requests_total",
        "Relay requests refused because the worker is unknown or inactive",
    );

    pub static RELAY_ERRORS: Counter = Counter::new(
        "fedlink_relay_errors_total",
        "Relay requests that failed in the codec or the application",
    );

    pub static KNOWN_WORKERS: Gauge =
        Gauge::new("fedlink_known_workers", "Number of known worker identities");

    pub static ACTIVE_WORKERS: Gauge =
        Gauge::new("fedlink_active_workers", "Number of active workers");

    pub static RELAY_DURATION: Histogram = Histogram::new(
        "fedlink_relay_duration_seconds",
        "Latency of relay operations including the application callback",
    );
}

/// Helper to gather all standard metrics
pub fn gather_system_metrics() -> String {
    let mut output = String::new();

    // Counters
    output.push_str(&standard::REGISTRATIONS.to_prometheus());
    output.push_str(&standard::UNAUTHENTICATED_REGISTRATIONS.to_prometheus());
    output.push_str(&standard::AUTH_FAILURES.to_prometheus());
    output.push_str(&standard::UPDATES_RECEIVED.to_prometheus());
    output.push_str(&standard::MODEL_FETCHES.to_prometheus());
    output.push_str(&standard::UNREGISTERED_REQUESTS.to_prometheus());
    output.push_str(&standard::RELAY_ERRORS.to_prometheus());

    // Gauges
    output.push_str(&standard::KNOWN_WORKERS.to_prometheus());
    output.push_str(&standard::ACTIVE_WORKERS.to_prometheus());

    // Histograms
    output.push_str(&standard::RELAY_DURATION.to_prometheus());

    output
}
