//! Reporting interfaces
//!
//! Two surfaces for external collaborators:
//!
//! - **Outcome records**: the flat numeric-triple format consumed by the
//!   offline statistical summarizer. One record per line, three
//!   comma-separated fields (completion time, error count, satisfaction
//!   score), no header.
//! - **Report envelopes**: JSON encoding of a full analysis report with
//!   producer metadata, for downstream consumers that want the whole
//!   profile.

use crate::engine::AnalysisReport;
use crate::error::EngineError;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One flat outcome record: `completion_time,errors,satisfaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Task/session completion time in seconds
    pub completion_time_sec: f64,
    /// Friction cues observed during the session
    pub errors_encountered: u32,
    /// Satisfaction-equivalent score on a 1-5 scale
    pub satisfaction_score: f64,
}

impl OutcomeRecord {
    /// Derive an outcome record from an analysis report.
    ///
    /// Completion time is the session's accumulated duration; errors are
    /// the session's friction cues; satisfaction maps engagement onto the
    /// 1-5 scale used by the downstream summarizer.
    pub fn from_analysis(report: &AnalysisReport) -> Self {
        let metrics = &report.session.metrics;
        Self {
            completion_time_sec: metrics.total_duration_sec,
            errors_encountered: metrics.friction_events,
            satisfaction_score: 1.0 + 4.0 * metrics.engagement_score.clamp(0.0, 1.0),
        }
    }

    /// Serialize to one headerless CSV line.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{}",
            self.completion_time_sec, self.errors_encountered, self.satisfaction_score
        )
    }

    /// Parse one line of the flat format.
    pub fn parse_line(line: &str) -> Result<Self, EngineError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 3 {
            return Err(EngineError::ReportError(format!(
                "expected 3 fields, got {}",
                fields.len()
            )));
        }

        let completion_time_sec = fields[0]
            .parse::<f64>()
            .map_err(|e| EngineError::ReportError(format!("bad completion time: {e}")))?;
        let errors_encountered = fields[1]
            .parse::<u32>()
            .map_err(|e| EngineError::ReportError(format!("bad error count: {e}")))?;
        let satisfaction_score = fields[2]
            .parse::<f64>()
            .map_err(|e| EngineError::ReportError(format!("bad satisfaction: {e}")))?;

        Ok(Self {
            completion_time_sec,
            errors_encountered,
            satisfaction_score,
        })
    }

    /// Serialize a slice of records, one per line, trailing newline.
    pub fn write_all(records: &[OutcomeRecord]) -> String {
        let mut out = String::new();
        for record in records {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        out
    }

    /// Parse a newline-delimited stream of records; blank lines ignored.
    pub fn parse_all(input: &str) -> Result<Vec<OutcomeRecord>, EngineError> {
        input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(OutcomeRecord::parse_line)
            .collect()
    }
}

/// Producer metadata stamped on encoded reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    /// Unique engine instance identifier
    pub instance_id: String,
}

/// Envelope wrapping an analysis report with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEnvelope {
    pub producer: ReportProducer,
    pub report: AnalysisReport,
}

/// JSON encoder for analysis reports.
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a fresh instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID.
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap a report in a provenance envelope.
    pub fn encode(&self, report: &AnalysisReport) -> ReportEnvelope {
        ReportEnvelope {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            report: report.clone(),
        }
    }

    /// Encode a report to a JSON string.
    pub fn encode_to_json(&self, report: &AnalysisReport) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.encode(report))?)
    }
}
