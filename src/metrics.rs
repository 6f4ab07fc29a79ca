//! Service metrics and statistics tracking for the training pipeline

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for training activity
pub struct TrainingMetrics {
    /// Total upload-and-train runs processed
    pub runs_processed: AtomicU64,
    /// Total models trained successfully
    pub models_trained: AtomicU64,
    /// Total models that failed to train
    pub model_failures: AtomicU64,
    /// Whole-run durations (in milliseconds)
    run_times: RwLock<Vec<u64>>,
    /// Per-model fit durations (in milliseconds)
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl TrainingMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            runs_processed: AtomicU64::new(0),
            models_trained: AtomicU64::new(0),
            model_failures: AtomicU64::new(0),
            run_times: RwLock::new(Vec::with_capacity(100)),
            model_times: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a completed run
    pub fn record_run(&self, duration: Duration) {
        self.runs_processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.run_times.write() {
            times.push(duration.as_millis() as u64);
            // keep only the most recent runs
            if times.len() > 1000 {
                times.drain(0..500);
            }
        }
    }

    /// Record a successfully trained model
    pub fn record_model(&self, model_name: &str, duration_ms: u64) {
        self.models_trained.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model_name.to_string()).or_insert_with(Vec::new);
            model_times.push(duration_ms);
            if model_times.len() > 1000 {
                model_times.drain(0..500);
            }
        }
    }

    /// Record a model that failed to train
    pub fn record_failure(&self) {
        self.model_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get run duration statistics
    pub fn get_run_stats(&self) -> DurationStats {
        let times = match self.run_times.read() {
            Ok(times) => times,
            Err(_) => return DurationStats::default(),
        };
        DurationStats::from_samples(&times)
    }

    /// Get per-model fit duration statistics
    pub fn get_model_stats(&self) -> HashMap<String, DurationStats> {
        let times = match self.model_times.read() {
            Ok(times) => times,
            Err(_) => return HashMap::new(),
        };

        times
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(model, samples)| (model.clone(), DurationStats::from_samples(samples)))
            .collect()
    }

    /// Runs completed per hour since startup
    pub fn get_run_rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.runs_processed.load(Ordering::Relaxed) as f64 / elapsed * 3600.0
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let runs = self.runs_processed.load(Ordering::Relaxed);
        let trained = self.models_trained.load(Ordering::Relaxed);
        let failures = self.model_failures.load(Ordering::Relaxed);
        let run_stats = self.get_run_stats();

        info!(
            runs,
            models_trained = trained,
            model_failures = failures,
            runs_per_hour = format!("{:.1}", self.get_run_rate()),
            "Training pipeline metrics"
        );
        if run_stats.count > 0 {
            info!(
                mean_ms = run_stats.mean,
                p50_ms = run_stats.p50,
                p95_ms = run_stats.p95,
                max_ms = run_stats.max,
                "Run durations"
            );
        }

        for (model, stats) in self.get_model_stats() {
            info!(
                model = %model,
                fits = stats.count,
                mean_ms = stats.mean,
                p50_ms = stats.p50,
                p95_ms = stats.p95,
                "Model fit durations"
            );
        }
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile statistics over recorded durations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DurationStats {
    pub count: u64,
    pub mean: u64,
    pub p50: u64,
    pub p95: u64,
    pub max: u64,
}

impl DurationStats {
    fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<u64> = samples.to_vec();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        Self {
            count: count as u64,
            mean: sum / count as u64,
            p50: sorted[count / 2],
            p95: sorted[(count as f64 * 0.95) as usize],
            max: *sorted.last().unwrap_or(&0),
        }
    }
}

/// Periodic metrics summary task
pub struct MetricsReporter {
    metrics: std::sync::Arc<TrainingMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<TrainingMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = TrainingMetrics::new();

        metrics.record_run(Duration::from_millis(120));
        metrics.record_model("svm", 40);
        metrics.record_model("svm", 60);
        metrics.record_failure();

        assert_eq!(metrics.runs_processed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.models_trained.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.model_failures.load(Ordering::Relaxed), 1);

        let stats = metrics.get_model_stats();
        assert_eq!(stats["svm"].count, 2);
        assert_eq!(stats["svm"].mean, 50);
    }

    #[test]
    fn test_duration_stats_percentiles() {
        let samples: Vec<u64> = (1..=100).collect();
        let stats = DurationStats::from_samples(&samples);

        assert_eq!(stats.count, 100);
        assert_eq!(stats.p50, 51);
        assert_eq!(stats.p95, 96);
        assert_eq!(stats.max, 100);
    }

    #[test]
    fn test_empty_stats_default() {
        let metrics = TrainingMetrics::new();
        assert_eq!(metrics.get_run_stats(), DurationStats::default());
        assert!(metrics.get_model_stats().is_empty());
    }
}
