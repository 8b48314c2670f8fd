//! Sliding-window burst detection for brute force attacks
//!
//! Scans each address's sorted timeline for `threshold` consecutive failures
//! falling within `max_window_seconds`. Only the earliest qualifying window
//! is reported, so an address yields at most one alert per run.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::aggregator::AddressTimeline;
use crate::config::DetectionConfig;
use crate::models::BurstAlert;

/// Errors raised for invalid detector parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("Burst threshold must be at least 1")]
    ZeroThreshold,

    #[error("Burst window must be a non-negative number of seconds, got {0}")]
    InvalidWindow(f64),
}

/// Detects brute force bursts in per-address timelines
#[derive(Debug, Clone, PartialEq)]
pub struct BurstDetector {
    /// Consecutive failures that make up a burst (default: 5)
    threshold: usize,
    /// Maximum span of those failures in seconds (default: 60)
    max_window_seconds: f64,
}

impl BurstDetector {
    /// Create a detector with the default thresholds
    pub fn new() -> Self {
        BurstDetector {
            threshold: 5,
            max_window_seconds: 60.0,
        }
    }

    /// Create with custom thresholds
    pub fn with_config(threshold: usize, max_window_seconds: f64) -> Result<Self, DetectionError> {
        if threshold == 0 {
            return Err(DetectionError::ZeroThreshold);
        }
        if !max_window_seconds.is_finite() || max_window_seconds < 0.0 {
            return Err(DetectionError::InvalidWindow(max_window_seconds));
        }
        Ok(BurstDetector {
            threshold,
            max_window_seconds,
        })
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectionError> {
        Self::with_config(config.threshold, config.max_window_seconds)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn max_window_seconds(&self) -> f64 {
        self.max_window_seconds
    }

    /// Find the earliest qualifying window in a sorted timeline.
    ///
    /// Returns the window span in seconds. Each window is checked by its two
    /// endpoints only, so the scan is linear in the timeline length.
    pub fn earliest_burst(&self, attempts: &[DateTime<Utc>]) -> Option<f64> {
        attempts
            .windows(self.threshold)
            .map(|window| span_seconds(window[0], window[self.threshold - 1]))
            .find(|&span| span <= self.max_window_seconds)
    }

    /// Check one timeline and build an alert for its earliest burst
    pub fn detect(&self, timeline: &AddressTimeline, detected_at: DateTime<Utc>) -> Option<BurstAlert> {
        let window_seconds = self.earliest_burst(&timeline.attempts)?;

        Some(BurstAlert {
            source_address: timeline.source_address.clone(),
            attempt_count: timeline.len(),
            window_seconds,
            detected_at,
        })
    }

    /// Check every timeline, keeping timeline order
    pub fn detect_all(&self, timelines: &[AddressTimeline], detected_at: DateTime<Utc>) -> Vec<BurstAlert> {
        timelines
            .iter()
            .filter_map(|timeline| self.detect(timeline, detected_at))
            .collect()
    }
}

impl Default for BurstDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn span_seconds(first: DateTime<Utc>, last: DateTime<Utc>) -> f64 {
    (last - first).num_milliseconds() as f64 / 1000.0
}
