// autoresolve-rs/src/collaborators.rs
// Contracts for the services the pipeline calls out to.
//
// The deep-analysis workflow (LLM backed) and the user-facing reporter
// live outside this crate. The defaults here are conservative: the
// workflow reports itself as unconfigured, and the reporter only emits
// tracing events.

use std::time::Duration;

use async_trait::async_trait;

use crate::model::{CommandEvent, DiagnosisReport, ErrorAnalysis, Remedy};
use crate::policy::InterventionDecision;

/// Error type for collaborator calls.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator failed: {0}")]
    Failed(String),

    #[error("collaborator timed out after {0:?}")]
    Timeout(Duration),
}

/// Deep error analysis and solution generation.
///
/// Implementations may be slow or hang; the pipeline bounds every call
/// with its own timeout.
#[async_trait]
pub trait DiagnosisWorkflow {
    async fn run(&self, command: &str, error_context: &str)
        -> Result<DiagnosisReport, CollaboratorError>;
}

/// Workflow used when no analysis backend has been configured.
///
/// Every call fails with [`CollaboratorError::Unavailable`] so the user
/// sees why no remedy was proposed.
#[derive(Debug, Default)]
pub struct UnconfiguredWorkflow;

#[async_trait]
impl DiagnosisWorkflow for UnconfiguredWorkflow {
    async fn run(
        &self,
        _command: &str,
        _error_context: &str,
    ) -> Result<DiagnosisReport, CollaboratorError> {
        Err(CollaboratorError::Unavailable(
            "no diagnosis backend configured".to_string(),
        ))
    }
}

/// Where the pipeline surfaces what it decided. Rendering is up to the
/// implementation; calls must not block for long.
pub trait InterventionReporter {
    fn decision(&self, event: &CommandEvent, decision: &InterventionDecision);
    fn suggestions(&self, event: &CommandEvent, actions: &[String]);
    fn analysis(&self, event: &CommandEvent, analysis: &ErrorAnalysis);
    fn remedy(&self, event: &CommandEvent, remedy: &Remedy, auto_execute: bool);
    fn failure(&self, event: &CommandEvent, message: &str);
}

/// Reporter that writes everything to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl InterventionReporter for TracingReporter {
    fn decision(&self, event: &CommandEvent, decision: &InterventionDecision) {
        tracing::info!(
            command = %event.command,
            error_type = %decision.error_type,
            level = %decision.level,
            confidence = decision.confidence,
            "{}",
            decision.reason
        );
    }

    fn suggestions(&self, event: &CommandEvent, actions: &[String]) {
        for action in actions {
            tracing::info!(command = %event.command, "suggestion: {}", action);
        }
    }

    fn analysis(&self, event: &CommandEvent, analysis: &ErrorAnalysis) {
        tracing::info!(
            command = %event.command,
            category = %analysis.category,
            "root cause: {}",
            analysis.root_cause
        );
    }

    fn remedy(&self, event: &CommandEvent, remedy: &Remedy, auto_execute: bool) {
        if auto_execute {
            tracing::info!(
                command = %event.command,
                remedy = %remedy.name,
                risk = %remedy.risk_level,
                "auto-executing fix"
            );
        } else {
            tracing::info!(
                command = %event.command,
                remedy = %remedy.name,
                risk = %remedy.risk_level,
                commands = %remedy.commands.join(", "),
                "suggested fix: {}",
                remedy.description
            );
        }
    }

    fn failure(&self, event: &CommandEvent, message: &str) {
        tracing::warn!(command = %event.command, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_workflow_reports_unavailable() {
        let result = UnconfiguredWorkflow.run("npm start", "npm: command not found").await;
        match result {
            Err(CollaboratorError::Unavailable(message)) => {
                assert!(message.contains("no diagnosis backend"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
