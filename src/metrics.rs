//! Request metrics for the market-data provider
//!
//! Tracks a rolling window of request latencies plus lifetime success
//! counts, so the dashboard can report how the upstream API is behaving.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Maximum number of samples kept for percentile calculation
const MAX_SAMPLES: usize = 100;

/// Computed provider metrics
#[derive(Debug, Clone)]
pub struct ProviderMetrics {
    /// Name of the provider
    pub provider_name: String,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of requests tracked
    pub total_requests: u64,
    /// Number of failed requests
    pub failed_requests: u64,
}

impl ProviderMetrics {
    /// Metrics with no recorded data
    pub fn empty(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

struct Sample {
    duration_ms: f64,
    success: bool,
}

#[derive(Default)]
struct Counters {
    samples: VecDeque<Sample>,
    total_requests: u64,
    failed_requests: u64,
}

/// Collects request outcomes for a single provider
pub struct MetricsCollector {
    provider_name: String,
    counters: Mutex<Counters>,
}

impl MetricsCollector {
    /// Creates a collector for the named provider
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Records one request outcome
    pub fn record_request(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.lock().unwrap();
        counters.total_requests += 1;
        if !success {
            counters.failed_requests += 1;
        }
        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(Sample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from the collected samples
    pub fn get_metrics(&self) -> ProviderMetrics {
        let counters = self.counters.lock().unwrap();
        if counters.samples.is_empty() {
            return ProviderMetrics::empty(&self.provider_name);
        }

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if counters.total_requests > 0 {
            (counters.total_requests - counters.failed_requests) as f64
                / counters.total_requests as f64
        } else {
            1.0
        };

        ProviderMetrics {
            provider_name: self.provider_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_requests: counters.total_requests,
            failed_requests: counters.failed_requests,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_tracks_totals_and_failures() {
        let collector = MetricsCollector::new("coingecko");

        collector.record_request(Duration::from_millis(100), true);
        collector.record_request(Duration::from_millis(200), true);
        collector.record_request(Duration::from_millis(150), false);

        let metrics = collector.get_metrics();
        assert_eq!(metrics.provider_name, "coingecko");
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[test]
    fn empty_collector_reports_clean_metrics() {
        let collector = MetricsCollector::new("coingecko");
        let metrics = collector.get_metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.success_rate, 1.0);
    }

    #[test]
    fn percentiles_from_sorted_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
    }
}
