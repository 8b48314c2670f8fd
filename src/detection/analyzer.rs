//! Single-file analysis run
//!
//! Ties extraction, aggregation and burst detection together. An analyzer is
//! built once from configuration and then shared read-only between runs.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use super::aggregator::aggregate;
use super::burst::{BurstDetector, DetectionError};
use crate::config::DetectionConfig;
use crate::input::{EventExtractor, ExtractError};
use crate::models::AnalysisReport;

/// Errors surfaced by an analysis run
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No log content supplied")]
    MissingInput,

    #[error("Invalid detector settings: {0}")]
    Detection(#[from] DetectionError),

    #[error("Failed to build extractor: {0}")]
    Extract(#[from] ExtractError),
}

/// Runs the extract → aggregate → detect pipeline over one log file
#[derive(Debug, Clone)]
pub struct LogAnalyzer {
    extractor: EventExtractor,
    detector: BurstDetector,
    preview_lines: usize,
}

impl LogAnalyzer {
    pub fn new(extractor: EventExtractor, detector: BurstDetector, preview_lines: usize) -> Self {
        LogAnalyzer {
            extractor,
            detector,
            preview_lines,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self, AnalysisError> {
        let extractor = EventExtractor::new(config.reference_year)?;
        let detector = BurstDetector::from_config(config)?;
        Ok(Self::new(extractor, detector, config.preview_lines))
    }

    pub fn detector(&self) -> &BurstDetector {
        &self.detector
    }

    /// Analyze log text, stamping alerts with the current time
    pub fn analyze(&self, content: &str) -> AnalysisReport {
        self.analyze_at(content, Utc::now())
    }

    /// Analyze log text with an explicit detection time
    pub fn analyze_at(&self, content: &str, detected_at: DateTime<Utc>) -> AnalysisReport {
        let lines: Vec<&str> = content.lines().collect();

        let events = self.extractor.extract(lines.iter().copied());
        log::debug!("Extracted {} failed-login event(s) from {} line(s)", events.len(), lines.len());

        let mut failures_by_kind = BTreeMap::new();
        for event in &events {
            *failures_by_kind.entry(event.kind).or_insert(0) += 1;
        }

        let timelines = aggregate(events);
        let alerts = self.detector.detect_all(&timelines, detected_at);

        for alert in &alerts {
            log::warn!(
                "BURST DETECTED: {} - {} attempts, window {:.2}s",
                alert.source_address,
                alert.attempt_count,
                alert.window_seconds
            );
        }

        AnalysisReport {
            total_lines: lines.len(),
            preview: lines
                .iter()
                .take(self.preview_lines)
                .map(|line| line.to_string())
                .collect(),
            failures_by_kind,
            alerts,
        }
    }

    /// Analyze raw uploaded bytes. Missing content is a caller error;
    /// invalid UTF-8 is replaced rather than rejected.
    pub fn analyze_upload(&self, upload: Option<&[u8]>) -> Result<AnalysisReport, AnalysisError> {
        let bytes = upload.ok_or(AnalysisError::MissingInput)?;
        let content = String::from_utf8_lossy(bytes);
        Ok(self.analyze(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use chrono::TimeZone;

    fn analyzer() -> LogAnalyzer {
        let config = DetectionConfig {
            reference_year: Some(2024),
            ..DetectionConfig::default()
        };
        LogAnalyzer::from_config(&config).unwrap()
    }

    fn failed(address: &str, secs: u32) -> String {
        format!(
            "Mar 10 12:{:02}:{:02} host sshd[100]: Failed password for root from {} port 22 ssh2",
            secs / 60,
            secs % 60,
            address
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_scenario_a_spread_out_attempts() {
        let content = [0, 60, 130, 200]
            .iter()
            .map(|s| failed("10.0.0.1", *s))
            .collect::<Vec<_>>()
            .join("\n");

        let report = analyzer().analyze(&content);
        assert!(report.alerts.is_empty());
        assert_eq!(report.total_lines, 4);
    }

    #[test]
    fn test_scenario_b_five_attempts_in_forty_seconds() {
        let content = [0, 10, 20, 30, 40]
            .iter()
            .map(|s| failed("10.0.0.1", *s))
            .collect::<Vec<_>>()
            .join("\n");

        let report = analyzer().analyze_at(&content, fixed_now());
        assert_eq!(report.alerts.len(), 1);

        let alert = &report.alerts[0];
        assert_eq!(alert.source_address, "10.0.0.1");
        assert_eq!(alert.attempt_count, 5);
        assert_eq!(format!("{:.2}", alert.window_seconds), "40.00");
        assert_eq!(alert.detected_at, fixed_now());
    }

    #[test]
    fn test_scenario_c_extra_attempt_counted_but_not_windowed() {
        let content = [0, 5, 10, 15, 20, 90]
            .iter()
            .map(|s| failed("10.0.0.1", *s))
            .collect::<Vec<_>>()
            .join("\n");

        let report = analyzer().analyze(&content);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].attempt_count, 6);
        assert_eq!(format!("{:.2}", report.alerts[0].window_seconds), "20.00");
    }

    #[test]
    fn test_scenario_d_unmatched_line_only_counted() {
        let mut lines: Vec<String> = [0, 10, 20, 30, 40]
            .iter()
            .map(|s| failed("10.0.0.1", *s))
            .collect();
        lines.insert(0, "Mar 10 11:59:59 host kernel: eth0 link up".to_string());
        let content = lines.join("\n");

        let report = analyzer().analyze(&content);
        assert_eq!(report.total_lines, 6);
        assert_eq!(report.preview[0], "Mar 10 11:59:59 host kernel: eth0 link up");
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].attempt_count, 5);
    }

    #[test]
    fn test_failures_counted_per_kind() {
        let content = [
            failed("10.0.0.1", 0),
            failed("10.0.0.2", 5),
            "Mar 10 12:00:10 gw app: Unauthorized request from 172.16.0.9".to_string(),
            "Mar 10 12:00:11 host kernel: eth0 link up".to_string(),
        ]
        .join("\n");

        let report = analyzer().analyze(&content);
        assert_eq!(report.failures_by_kind.len(), 2);
        assert_eq!(report.failures_by_kind[&FailureKind::PasswordFailure], 2);
        assert_eq!(report.failures_by_kind[&FailureKind::UnauthorizedAccess], 1);
        assert!(!report.failures_by_kind.contains_key(&FailureKind::LoginTimeout));
    }

    #[test]
    fn test_preview_limited_to_configured_lines() {
        let content = (0..25).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let report = analyzer().analyze(&content);

        assert_eq!(report.total_lines, 25);
        assert_eq!(report.preview.len(), 10);
        assert_eq!(report.preview[9], "line 9");
    }

    #[test]
    fn test_empty_input_is_valid() {
        let report = analyzer().analyze("");
        assert_eq!(report.total_lines, 0);
        assert!(report.preview.is_empty());
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn test_crlf_lines_match() {
        let content = [0, 1, 2, 3, 4]
            .iter()
            .map(|s| failed("10.0.0.9", *s))
            .collect::<Vec<_>>()
            .join("\r\n");
        assert_eq!(analyzer().analyze(&content).alerts.len(), 1);
    }

    #[test]
    fn test_missing_upload_rejected() {
        assert!(matches!(
            analyzer().analyze_upload(None),
            Err(AnalysisError::MissingInput)
        ));
    }

    #[test]
    fn test_upload_with_invalid_utf8() {
        let mut bytes = failed("10.0.0.1", 0).into_bytes();
        bytes.extend_from_slice(b"\n\xff\xfe broken\n");
        let report = analyzer().analyze_upload(Some(&bytes)).unwrap();
        assert_eq!(report.total_lines, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectionConfig {
            threshold: 0,
            ..DetectionConfig::default()
        };
        assert!(matches!(
            LogAnalyzer::from_config(&config),
            Err(AnalysisError::Detection(DetectionError::ZeroThreshold))
        ));
    }

    #[test]
    fn test_shared_between_threads() {
        use std::sync::Arc;

        let analyzer = Arc::new(analyzer());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let analyzer = Arc::clone(&analyzer);
                std::thread::spawn(move || {
                    let address = format!("10.0.0.{}", i);
                    let content = (0..5)
                        .map(|s| failed(&address, s))
                        .collect::<Vec<_>>()
                        .join("\n");
                    analyzer.analyze(&content)
                })
            })
            .collect();

        for handle in handles {
            let report = handle.join().unwrap();
            assert_eq!(report.alerts.len(), 1);
        }
    }
}
