// autoresolve-rs/src/model.rs
// Value types shared by the pipeline and its collaborators.
//
// Events arrive as NDJSON written by the shell hook; remedies and
// diagnosis reports come back from the deep-analysis workflow. All of
// them are plain immutable records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed terminal command, as captured by the shell hook.
///
/// `success` is fixed when the event is created and is never recomputed
/// from `exit_code` afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCommandEvent")]
pub struct CommandEvent {
    pub timestamp: String,
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    pub success: bool,
}

impl CommandEvent {
    pub fn new(
        command: impl Into<String>,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            command: command.into(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration,
            success: exit_code == 0,
        }
    }

    /// Text used for classification: stderr when present, stdout otherwise.
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Wire shape of an event line. Older hooks omit `success` and the
/// captured streams, so those are filled in here.
#[derive(Deserialize)]
struct RawCommandEvent {
    #[serde(default)]
    timestamp: String,
    command: String,
    exit_code: i32,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    duration: f64,
    success: Option<bool>,
}

impl From<RawCommandEvent> for CommandEvent {
    fn from(raw: RawCommandEvent) -> Self {
        let success = raw.success.unwrap_or(raw.exit_code == 0);
        Self {
            timestamp: raw.timestamp,
            command: raw.command,
            exit_code: raw.exit_code,
            stdout: raw.stdout,
            stderr: raw.stderr,
            duration: raw.duration,
            success,
        }
    }
}

/// Intrinsic danger of a remedy, independent of how much the engine
/// trusts itself for the error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

impl RiskTier {
    /// Numeric rank used by the risk gate. Unrecognized tiers rank as high.
    pub fn rank(self) -> u8 {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High | RiskTier::Unknown => 2,
            RiskTier::Critical => 3,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => RiskTier::Low,
            "medium" => RiskTier::Medium,
            "high" => RiskTier::High,
            "critical" => RiskTier::Critical,
            _ => RiskTier::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
            RiskTier::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed fix: an ordered list of shell commands plus risk metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remedy {
    pub name: String,
    pub description: String,
    pub commands: Vec<String>,
    #[serde(default = "default_risk_level")]
    pub risk_level: RiskTier,
    #[serde(default)]
    pub rollback_commands: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
}

fn default_risk_level() -> RiskTier {
    RiskTier::Medium
}

/// Root-cause analysis returned by the deep-analysis workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub error_type: String,
    pub category: String,
    #[serde(default)]
    pub severity: Option<String>,
    pub root_cause: String,
    #[serde(default)]
    pub affected_components: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// Full result of one deep-analysis run. Strategies are ranked best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub error_analysis: Option<ErrorAnalysis>,
    #[serde(default)]
    pub solution_strategies: Vec<Remedy>,
}

/// What the pipeline hands to the executor: the remedy and the gate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub command: String,
    pub remedy: Remedy,
    pub auto_execute: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub commands_executed: Vec<String>,
    pub output: String,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn succeeded(commands_executed: Vec<String>, output: String) -> Self {
        Self {
            success: true,
            commands_executed,
            output,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(commands_executed: Vec<String>, output: String, error: String) -> Self {
        Self {
            success: false,
            commands_executed,
            output,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_derives_success_from_exit_code() {
        assert!(CommandEvent::new("ls", 0, "", "", 0.1).success);
        assert!(!CommandEvent::new("npm start", 127, "", "npm: command not found", 0.1).success);
    }

    #[test]
    fn parsed_event_keeps_recorded_success_flag() {
        let line = r#"{"timestamp":"t","command":"make","exit_code":2,"stdout":"","stderr":"x","duration":1.5,"success":true}"#;
        let event: CommandEvent = serde_json::from_str(line).expect("parse");
        assert!(event.success);
        assert_eq!(event.exit_code, 2);
    }

    #[test]
    fn parsed_event_without_success_derives_it() {
        let line = r#"{"command":"git push","exit_code":1,"stderr":"Connection refused"}"#;
        let event: CommandEvent = serde_json::from_str(line).expect("parse");
        assert!(!event.success);
        assert_eq!(event.error_text(), "Connection refused");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let event = CommandEvent::new("cc main.c", 1, "cannot find -lssl", "  ", 0.0);
        assert_eq!(event.error_text(), "cannot find -lssl");
    }

    #[test]
    fn unrecognized_risk_label_deserializes_as_unknown() {
        let tier: RiskTier = serde_json::from_str("\"extreme\"").expect("parse");
        assert_eq!(tier, RiskTier::Unknown);
        assert_eq!(tier.rank(), 2);
        assert_eq!(RiskTier::from_label("Critical"), RiskTier::Critical);
    }
}
