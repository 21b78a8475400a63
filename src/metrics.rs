//! Request statistics for the prediction service.

use crate::types::prediction::{Personality, PredictionResult, ProbabilitySource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for served predictions
pub struct PredictionMetrics {
    /// Predictions returned to callers
    pub predictions_served: AtomicU64,
    /// Requests rejected (schema or value errors, model failures)
    pub requests_rejected: AtomicU64,
    /// Predictions that used the fallback probabilities
    pub fallbacks: AtomicU64,
    /// Predictions by label
    by_label: RwLock<HashMap<Personality, u64>>,
    /// Rejections by error kind
    rejections_by_kind: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Confidence distribution in 10-point buckets
    confidence_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            by_label: RwLock::new(HashMap::new()),
            rejections_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, processing_time: Duration, result: &PredictionResult) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if result.probability_source == ProbabilitySource::Fallback {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }

        self.record_time(processing_time);

        if let Ok(mut by_label) = self.by_label.write() {
            *by_label.entry(result.label).or_insert(0) += 1;
        }

        let bucket = ((result.confidence_score / 10.0).max(0.0) as usize).min(9);
        if let Ok(mut buckets) = self.confidence_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a rejected request
    pub fn record_rejection(&self, processing_time: Duration, kind: &str) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        if let Ok(mut by_kind) = self.rejections_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self
            .processing_times
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Requests handled per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let handled = self.predictions_served.load(Ordering::Relaxed)
            + self.requests_rejected.load(Ordering::Relaxed);
        if elapsed > 0.0 {
            handled as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_label_counts(&self) -> HashMap<Personality, u64> {
        self.by_label
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_rejections_by_kind(&self) -> HashMap<String, u64> {
        self.rejections_by_kind
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        *self
            .confidence_buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let fallbacks = self.fallbacks.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let labels = self.get_label_counts();
        let rejections = self.get_rejections_by_kind();
        let confidence = self.get_confidence_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          PERSONALITY PREDICTOR - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions Served: {:>8}  │  Throughput: {:>6.1} req/s    ║",
            served, throughput
        );
        info!(
            "║ Rejected Requests:  {:>8}  │  Fallbacks:  {:>8}        ║",
            rejected, fallbacks
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Predictions by Label:                                        ║");
        for personality in [Personality::Introvert, Personality::Extrovert] {
            let count = labels.get(&personality).copied().unwrap_or(0);
            let pct = if served > 0 {
                (count as f64 / served as f64) * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>6} ({:>5.1}%)", personality.as_str(), count, pct);
        }
        if !rejections.is_empty() {
            info!("║ Rejections by Kind:                                          ║");
            for (kind, count) in &rejections {
                info!("║   {:16}: {:>6}", kind, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Confidence Distribution:                                     ║");
        let total: u64 = confidence.iter().sum();
        for (i, &count) in confidence.iter().enumerate() {
            let pct = if total > 0 {
                (count as f64 / total as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:<3}%: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
