//! Request metrics and periodic summaries for the prediction service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept before the oldest half is dropped
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for the HTTP prediction path
pub struct ServiceMetrics {
    /// Successful predictions
    pub predictions_served: AtomicU64,
    /// Predictions whose `yes` probability reached the reported threshold
    pub above_threshold: AtomicU64,
    /// Requests rejected by input validation
    pub validation_rejections: AtomicU64,
    /// Requests refused because no model is loaded
    pub model_unavailable: AtomicU64,
    /// Requests where encoding or the estimator failed
    pub inference_failures: AtomicU64,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// `yes` probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Threshold used for `above_threshold`
    threshold: f64,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new(threshold: f64) -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            above_threshold: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            model_unavailable: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            threshold,
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, prob_yes: f64) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if prob_yes >= self.threshold {
            self.above_threshold.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut samples) = self.latencies.write() {
            samples.push(latency.as_micros() as u64);
            if samples.len() > MAX_LATENCY_SAMPLES {
                samples.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }

        let bucket = (prob_yes.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_unavailable(&self) {
        self.model_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Latency percentiles over the retained samples
    pub fn latency_stats(&self) -> LatencyStats {
        let sorted = match self.latencies.read() {
            Ok(samples) if !samples.is_empty() => {
                let mut sorted = samples.clone();
                sorted.sort_unstable();
                sorted
            }
            _ => return LatencyStats::default(),
        };

        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    pub fn probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or([0; 10])
    }

    /// Successful predictions per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let above = self.above_threshold.load(Ordering::Relaxed);
        let latency = self.latency_stats();

        info!(
            predictions = served,
            above_threshold = above,
            validation_rejections = self.validation_rejections.load(Ordering::Relaxed),
            model_unavailable = self.model_unavailable.load(Ordering::Relaxed),
            inference_failures = self.inference_failures.load(Ordering::Relaxed),
            throughput = format!("{:.2} req/s", self.throughput()),
            "Prediction summary"
        );

        if latency.count > 0 {
            info!(
                mean_us = latency.mean_us,
                p50_us = latency.p50_us,
                p95_us = latency.p95_us,
                p99_us = latency.p99_us,
                max_us = latency.max_us,
                "Prediction latency"
            );

            let dist = self.probability_distribution();
            let buckets: Vec<String> = dist
                .iter()
                .enumerate()
                .map(|(i, count)| format!("{:.1}-{:.1}:{}", i as f64 / 10.0, (i + 1) as f64 / 10.0, count))
                .collect();
            info!(distribution = %buckets.join(" "), "P(yes) distribution");
        }
    }
}

/// Latency statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Run until the task is dropped. Returns immediately if the interval is 0.
    pub async fn start(self) {
        if self.interval_secs == 0 {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.log_summary();
        }
    }
}
