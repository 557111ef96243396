//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler.
//!
//! ## Sharing model:
//! - **Configuration** is immutable after process start, so it is shared as
//!   a plain `Arc<AppConfig>` with no lock at all. The detection pipeline
//!   only ever reads it.
//! - **Metrics** are updated by every request, so they sit behind
//!   `Arc<RwLock<_>>`: many concurrent readers, one writer at a time.
//! - **start_time** never changes and is `Copy`, so it is shared directly.
//!
//! The detection pipeline itself holds no state here; everything it touches
//! is request-scoped.

use crate::config::AppConfig;
use crate::detection::classifier::Label;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The application state shared across all HTTP request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Immutable configuration snapshot taken at startup.
    config: Arc<AppConfig>,

    /// Request/detection counters, updated by middleware and handlers.
    metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started.
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start.
    pub request_count: u64,

    /// Total number of errors encountered since server start.
    pub error_count: u64,

    /// Detections currently running on the blocking pool.
    pub active_detections: u32,

    /// Successful classifications, per label.
    pub ai_detections: u64,
    pub human_detections: u64,

    /// Per-endpoint statistics, keyed by "METHOD /path".
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Performance counters for a single endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Wrap the validated startup configuration for sharing.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// The startup configuration snapshot. Borrowing instead of cloning:
    /// the config never changes, so there is no lock to release early.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record per-endpoint request statistics (called by middleware).
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Count a successful classification by its label.
    pub fn record_classification(&self, label: Label) {
        let mut metrics = self.metrics.write().unwrap();
        match label {
            Label::AiGenerated => metrics.ai_detections += 1,
            Label::Human => metrics.human_detections += 1,
        }
    }

    pub fn increment_active_detections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_detections += 1;
    }

    pub fn decrement_active_detections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_detections > 0 {
            metrics.active_detections -= 1;
        }
    }

    /// Consistent copy of the counters for the health/metrics endpoints,
    /// taken under a read lock so serialization happens lock-free.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_detections: metrics.active_detections,
            ai_detections: metrics.ai_detections,
            human_detections: metrics.human_detections,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time in milliseconds for this endpoint.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate in [0.0, 1.0] for this endpoint.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let state = AppState::new(AppConfig::default());
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);
    }

    #[test]
    fn classifications_count_per_label() {
        let state = AppState::new(AppConfig::default());
        state.record_classification(Label::AiGenerated);
        state.record_classification(Label::AiGenerated);
        state.record_classification(Label::Human);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.ai_detections, 2);
        assert_eq!(snapshot.human_detections, 1);
    }

    #[test]
    fn active_detections_never_underflow() {
        let state = AppState::new(AppConfig::default());
        state.decrement_active_detections();
        assert_eq!(state.get_metrics_snapshot().active_detections, 0);

        state.increment_active_detections();
        state.decrement_active_detections();
        assert_eq!(state.get_metrics_snapshot().active_detections, 0);
    }

    #[test]
    fn endpoint_metrics_track_averages_and_error_rate() {
        let state = AppState::new(AppConfig::default());
        state.record_endpoint_request("POST /api/voice-detection", 30, false);
        state.record_endpoint_request("POST /api/voice-detection", 50, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/voice-detection"];
        assert_eq!(metric.request_count, 2);
        assert!((metric.average_duration_ms() - 40.0).abs() < f64::EPSILON);
        assert!((metric.error_rate() - 0.5).abs() < f64::EPSILON);
    }
}
