//! Upload processing: validate, analyze, emit.

use crate::alerting::AlertEmitter;
use crate::detection::{AnalysisError, LogAnalyzer};
use crate::models::AnalysisReport;

/// Process one uploaded log file end to end.
///
/// Only missing content is an error. Alert store and notifier failures are
/// logged by the emitter and the report is still returned.
pub fn process_upload(
    analyzer: &LogAnalyzer,
    emitter: &AlertEmitter,
    upload: Option<&[u8]>,
    recipient: Option<&str>,
) -> Result<AnalysisReport, AnalysisError> {
    let report = analyzer.analyze_upload(upload)?;

    if !report.alerts.is_empty() {
        let outcome = emitter.emit(&report.alerts, recipient);
        log::info!(
            "Emitted {} alert(s): {} stored, {} persist failure(s), {} notify failure(s)",
            report.alerts.len(),
            outcome.stored.len(),
            outcome.persist_failures,
            outcome.notify_failures
        );
    }

    Ok(report)
}
