// autoresolve-rs/src/pipeline.rs
// Per-event processing: classify, decide, and hand off remedies.
//
// Outcome recording: a surfaced remedy is remembered against the command
// text that failed. The next event for the same command settles it:
// success records a success, another failure records a failure. Remedies
// that the executor ran and that failed outright are recorded at once.
// Pending entries older than the verification window are dropped unrecorded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::catalog::ErrorType;
use crate::collaborators::{
    CollaboratorError, DiagnosisWorkflow, InterventionReporter, TracingReporter,
    UnconfiguredWorkflow,
};
use crate::config::{ResolverConfig, DEFAULT_VERIFICATION_WINDOW, DEFAULT_WORKFLOW_TIMEOUT};
use crate::executor::{CommandExecutor, DryRunExecutor};
use crate::history::{CommandHistory, SolutionAttempt};
use crate::model::{CommandEvent, DiagnosisReport, ExecutionRequest, ExecutionResult, Remedy};
use crate::policy::{InterventionDecision, InterventionLevel};
use crate::resolver::Resolver;
use crate::risk;

/// What the pipeline did with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum InterventionAction {
    /// Successful command, only logged.
    Logged,
    /// Failure the policy chose not to act on.
    Ignored,
    /// Static hints surfaced; no workflow call.
    Suggested(Vec<String>),
    /// The workflow produced no usable remedy; static hints were surfaced.
    NoRemedy { reason: String },
    /// The top remedy was handed to the executor with the gate's verdict.
    RemedyProposed {
        remedy: Remedy,
        auto_execute: bool,
        execution: Option<ExecutionResult>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub decision: Option<InterventionDecision>,
    pub action: InterventionAction,
    /// Outcome recorded for an earlier remedy on this command, if any.
    pub verified: Option<bool>,
}

#[derive(Debug, Clone)]
struct PendingFix {
    error_type: ErrorType,
    remedy: Remedy,
    raw_error: String,
    surfaced_at: Instant,
}

pub struct CommandPipeline {
    resolver: Arc<RwLock<Resolver>>,
    history: Arc<dyn CommandHistory + Send + Sync>,
    workflow: Arc<dyn DiagnosisWorkflow + Send + Sync>,
    executor: Arc<dyn CommandExecutor + Send + Sync>,
    reporter: Arc<dyn InterventionReporter + Send + Sync>,
    auto_fix_enabled: AtomicBool,
    workflow_timeout: Duration,
    verification_window: Duration,
    pending: Mutex<HashMap<String, PendingFix>>,
}

impl CommandPipeline {
    /// Pipeline with conservative defaults: unconfigured workflow, dry-run
    /// executor and tracing reporter.
    pub fn new(
        resolver: Arc<RwLock<Resolver>>,
        history: Arc<dyn CommandHistory + Send + Sync>,
    ) -> Self {
        Self {
            resolver,
            history,
            workflow: Arc::new(UnconfiguredWorkflow),
            executor: Arc::new(DryRunExecutor::new()),
            reporter: Arc::new(TracingReporter),
            auto_fix_enabled: AtomicBool::new(true),
            workflow_timeout: DEFAULT_WORKFLOW_TIMEOUT,
            verification_window: DEFAULT_VERIFICATION_WINDOW,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, cfg: &ResolverConfig) -> Self {
        self.auto_fix_enabled = AtomicBool::new(cfg.auto_fix_enabled);
        self.workflow_timeout = cfg.workflow_timeout;
        self.verification_window = cfg.verification_window;
        self
    }

    pub fn with_workflow(mut self, workflow: Arc<dyn DiagnosisWorkflow + Send + Sync>) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor + Send + Sync>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn InterventionReporter + Send + Sync>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_auto_fix(self, enabled: bool) -> Self {
        self.set_auto_fix(enabled);
        self
    }

    pub fn set_auto_fix(&self, enabled: bool) {
        self.auto_fix_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn auto_fix_enabled(&self) -> bool {
        self.auto_fix_enabled.load(Ordering::SeqCst)
    }

    pub fn resolver(&self) -> &Arc<RwLock<Resolver>> {
        &self.resolver
    }

    pub fn history(&self) -> &Arc<dyn CommandHistory + Send + Sync> {
        &self.history
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Run one event through the pipeline. Never fails: collaborator
    /// errors are logged and reported, and processing moves on.
    #[instrument(
        name = "process_command_event",
        skip(self, event),
        fields(command = %event.command, exit_code = event.exit_code)
    )]
    pub async fn process(&self, event: &CommandEvent) -> PipelineOutcome {
        let verified = self.settle_pending(event).await;

        if event.success {
            self.log_command(event).await;
            metrics::increment_counter!("autoresolve_events_total", "outcome" => "success");
            return PipelineOutcome {
                decision: None,
                action: InterventionAction::Logged,
                verified,
            };
        }

        let decision = self
            .read_resolver()
            .analyze_error(event.error_text(), &event.command);

        if !decision.should_intervene {
            tracing::debug!(error_type = %decision.error_type, "policy declined to intervene");
            self.log_command(event).await;
            metrics::increment_counter!("autoresolve_events_total", "outcome" => "ignored");
            return PipelineOutcome {
                decision: Some(decision),
                action: InterventionAction::Ignored,
                verified,
            };
        }

        self.reporter.decision(event, &decision);

        let action = if self.auto_fix_enabled() && decision.level != InterventionLevel::Silent {
            self.autonomous_fix(event, &decision).await
        } else {
            self.reporter.suggestions(event, &decision.suggested_actions);
            InterventionAction::Suggested(decision.suggested_actions.clone())
        };

        self.log_command(event).await;
        metrics::increment_counter!("autoresolve_events_total", "outcome" => "failure");

        PipelineOutcome {
            decision: Some(decision),
            action,
            verified,
        }
    }

    async fn autonomous_fix(
        &self,
        event: &CommandEvent,
        decision: &InterventionDecision,
    ) -> InterventionAction {
        let error_context = error_context(event, decision);
        tracing::info!(error_type = %decision.error_type, "running deep analysis");

        let report = match self.run_workflow(&event.command, &error_context).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(error = %err, "deep analysis failed; falling back to hints");
                self.reporter.failure(event, &format!("Analysis error: {err}"));
                self.reporter.suggestions(event, &decision.suggested_actions);
                return InterventionAction::NoRemedy {
                    reason: err.to_string(),
                };
            }
        };

        if let Some(analysis) = &report.error_analysis {
            self.reporter.analysis(event, analysis);
        }

        let Some(remedy) = report.solution_strategies.into_iter().next() else {
            self.reporter.suggestions(event, &decision.suggested_actions);
            return InterventionAction::NoRemedy {
                reason: "analysis produced no solution strategies".to_string(),
            };
        };

        let auto_execute = risk::should_auto_execute(decision, remedy.risk_level);
        self.reporter.remedy(event, &remedy, auto_execute);

        let request = ExecutionRequest {
            command: event.command.clone(),
            remedy: remedy.clone(),
            auto_execute,
        };

        let execution = match self.executor.submit(&request).await {
            Ok(Some(result)) if !result.success => {
                tracing::warn!(
                    remedy = %remedy.name,
                    error = ?result.error,
                    "auto-executed remedy failed"
                );
                self.record(decision.error_type, false, &remedy, event.error_text())
                    .await;
                Some(result)
            }
            Ok(result) => {
                self.remember_pending(event, decision.error_type, &remedy);
                result
            }
            Err(err) => {
                tracing::warn!(remedy = %remedy.name, error = %err, "executor refused remedy");
                self.reporter.failure(event, &format!("Executor error: {err}"));
                None
            }
        };

        InterventionAction::RemedyProposed {
            remedy,
            auto_execute,
            execution,
        }
    }

    async fn run_workflow(
        &self,
        command: &str,
        error_context: &str,
    ) -> Result<DiagnosisReport, CollaboratorError> {
        match tokio::time::timeout(self.workflow_timeout, self.workflow.run(command, error_context))
            .await
        {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(err)) => {
                metrics::increment_counter!("autoresolve_workflow_failures_total");
                Err(err)
            }
            Err(_) => {
                metrics::increment_counter!("autoresolve_workflow_timeouts_total");
                Err(CollaboratorError::Timeout(self.workflow_timeout))
            }
        }
    }

    fn remember_pending(&self, event: &CommandEvent, error_type: ErrorType, remedy: &Remedy) {
        self.lock_pending().insert(
            event.command.clone(),
            PendingFix {
                error_type,
                remedy: remedy.clone(),
                raw_error: event.error_text().to_string(),
                surfaced_at: Instant::now(),
            },
        );
    }

    /// Settle a pending remedy for this command, if one is still in window.
    async fn settle_pending(&self, event: &CommandEvent) -> Option<bool> {
        let pending = {
            let mut pending = self.lock_pending();
            let window = self.verification_window;
            pending.retain(|command, fix| {
                let fresh = fix.surfaced_at.elapsed() <= window;
                if !fresh {
                    tracing::debug!(command = %command, "pending remedy expired unverified");
                }
                fresh
            });
            pending.remove(&event.command)
        }?;

        self.record(pending.error_type, event.success, &pending.remedy, &pending.raw_error)
            .await;
        Some(event.success)
    }

    async fn record(&self, error_type: ErrorType, success: bool, remedy: &Remedy, raw_error: &str) {
        self.write_resolver().record_outcome(error_type, success, remedy);

        let attempt = SolutionAttempt::new(error_type, raw_error, &remedy.name, success);
        if let Err(err) = self.history.record_attempt(&attempt).await {
            tracing::warn!(error = %err, "failed to record solution attempt");
        }
    }

    async fn log_command(&self, event: &CommandEvent) {
        if let Err(err) = self.history.add_command(event).await {
            tracing::warn!(error = %err, "failed to append command history");
        }
    }

    fn read_resolver(&self) -> std::sync::RwLockReadGuard<'_, Resolver> {
        self.resolver.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_resolver(&self) -> std::sync::RwLockWriteGuard<'_, Resolver> {
        self.resolver.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingFix>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Context handed to the deep-analysis workflow.
pub fn error_context(event: &CommandEvent, decision: &InterventionDecision) -> String {
    format!(
        "Command: {}\nExit Code: {}\nOutput: {}\nIntervention Level: {}\nConfidence: {:.0}%\n",
        event.command,
        event.exit_code,
        event.error_text(),
        decision.level,
        decision.confidence * 100.0
    )
}
