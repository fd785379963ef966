//! # Application State Management
//!
//! Shared state handed to every HTTP handler and the WebSocket actors:
//! the live configuration, the metrics counters, and the server start time.
//! Everything mutable sits behind `Arc<RwLock<T>>`; reads clone and release
//! the lock immediately.

use crate::config::AppConfig;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// State shared across all HTTP request handlers and relay actors.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live configuration (updatable at runtime via the config endpoint).
    pub config: Arc<RwLock<AppConfig>>,

    /// Counters updated by middleware and the relay.
    pub metrics: Arc<RwLock<RelayMetrics>>,

    /// When the server started, for uptime reporting.
    pub start_time: Instant,
}

/// Counters for the HTTP surface and the relay pipeline.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total HTTP requests processed since start.
    pub request_count: u64,

    /// Total HTTP errors since start.
    pub error_count: u64,

    /// Per-endpoint statistics, keyed by "METHOD /path".
    pub endpoint_metrics: HashMap<String, EndpointMetric>,

    /// Audio frames fed into the session buffer.
    pub audio_frames_received: u64,

    /// Payload bytes fed into the session buffer.
    pub audio_bytes_received: u64,

    /// Control tokens routed (both directions).
    pub control_messages: u64,

    /// Recordings finalized since start.
    pub recordings_finalized: u64,

    /// Sink deliveries that returned an error.
    pub sink_failures: u64,
}

/// Per-endpoint request statistics.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(RelayMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Copy of the current configuration.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Snapshot of the counters for reporting.
    pub fn get_metrics_snapshot(&self) -> RelayMetrics {
        let metrics = self.metrics.read().unwrap();
        RelayMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
            audio_frames_received: metrics.audio_frames_received,
            audio_bytes_received: metrics.audio_bytes_received,
            control_messages: metrics.control_messages,
            recordings_finalized: metrics.recordings_finalized,
            sink_failures: metrics.sink_failures,
        }
    }

    pub fn increment_request_count(&self) {
        self.metrics.write().unwrap().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics.write().unwrap().error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let entry = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();
        entry.request_count += 1;
        entry.total_duration_ms += duration_ms;
        if is_error {
            entry.error_count += 1;
        }
    }

    pub fn record_audio_frame(&self, bytes: usize) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.audio_frames_received += 1;
        metrics.audio_bytes_received += bytes as u64;
    }

    pub fn record_control_message(&self) {
        self.metrics.write().unwrap().control_messages += 1;
    }

    pub fn record_recording_finalized(&self) {
        self.metrics.write().unwrap().recordings_finalized += 1;
    }

    pub fn record_sink_failure(&self) {
        self.metrics.write().unwrap().sink_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let state = AppState::new(AppConfig::default());
        let mut config = state.get_config();
        config.server.port = 9090;
        assert!(state.update_config(config).is_ok());
        assert_eq!(state.get_config().server.port, 9090);
    }

    #[test]
    fn test_update_rejects_invalid_config() {
        let state = AppState::new(AppConfig::default());
        let mut config = state.get_config();
        config.server.port = 0;
        assert!(state.update_config(config).is_err());
        assert_eq!(state.get_config().server.port, 8080);
    }

    #[test]
    fn test_relay_counters() {
        let state = AppState::new(AppConfig::default());
        state.record_audio_frame(1024);
        state.record_audio_frame(512);
        state.record_control_message();
        state.record_recording_finalized();
        state.record_sink_failure();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.audio_frames_received, 2);
        assert_eq!(snapshot.audio_bytes_received, 1536);
        assert_eq!(snapshot.control_messages, 1);
        assert_eq!(snapshot.recordings_finalized, 1);
        assert_eq!(snapshot.sink_failures, 1);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = AppState::new(AppConfig::default());
        state.record_endpoint_request("GET /health", 5, false);
        state.record_endpoint_request("GET /health", 7, true);

        let snapshot = state.get_metrics_snapshot();
        let entry = &snapshot.endpoint_metrics["GET /health"];
        assert_eq!(entry.request_count, 2);
        assert_eq!(entry.total_duration_ms, 12);
        assert_eq!(entry.error_count, 1);
    }
}
