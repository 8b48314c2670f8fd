use crate::models::{AnalysisReport, StoredAlert};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Output handler for analysis reports and stored alerts
pub struct OutputHandler {
    format: OutputFormat,
    writer: Box<dyn Write + Send>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Jsonl, // Default
        }
    }
}

impl OutputHandler {
    /// Create a new output handler; stdout when no file is given
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> io::Result<Self> {
        let writer: Box<dyn Write + Send> = match file_path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout()),
        };

        Ok(OutputHandler { format, writer })
    }

    /// Create an output handler over an arbitrary writer
    pub fn with_writer(format: OutputFormat, writer: Box<dyn Write + Send>) -> Self {
        OutputHandler { format, writer }
    }

    /// Write the result of one analysis run
    pub fn write_report(&mut self, source: &str, report: &AnalysisReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Console => {
                let mut output = format!(
                    "{}: {} line(s), {} suspicious address(es)\n",
                    source,
                    report.total_lines,
                    report.alerts.len()
                );
                for (kind, count) in &report.failures_by_kind {
                    output.push_str(&format!("  {}: {}\n", kind, count));
                }
                for alert in &report.alerts {
                    output.push_str(&format!(
                        "  [BURST] {} - {} attempts, window {:.2}s\n",
                        alert.source_address, alert.attempt_count, alert.window_seconds
                    ));
                }
                self.write_output(&output)
            }
            _ => self.write_json(report),
        }
    }

    /// Write alerts fetched from the store
    pub fn write_alerts(&mut self, alerts: &[StoredAlert]) -> io::Result<()> {
        match self.format {
            OutputFormat::Console => {
                let mut output = format!("{} alert(s)\n", alerts.len());
                for stored in alerts {
                    output.push_str(&format!(
                        "  #{} {} {} - {} attempts, window {:.2}s\n",
                        stored.id,
                        stored.alert.detected_at.to_rfc3339(),
                        stored.alert.source_address,
                        stored.alert.attempt_count,
                        stored.alert.window_seconds
                    ));
                }
                self.write_output(&output)
            }
            OutputFormat::Json => self.write_json(alerts),
            OutputFormat::Jsonl => {
                for stored in alerts {
                    self.write_json(stored)?;
                }
                Ok(())
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        let json = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };
        self.write_output(&format!("{}\n", json))
    }

    fn write_output(&mut self, data: &str) -> io::Result<()> {
        self.writer.write_all(data.as_bytes())?;
        self.writer.flush()
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
