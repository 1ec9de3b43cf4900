// autoresolve-rs/src/lib.rs
// Library interface for the autonomous intervention engine.
//
// Watches terminal command events, classifies failures, decides how far to
// intervene based on learned success rates, and gates remedy execution by
// risk.
//
// Design notes:
// - Classification, policy and the risk gate are synchronous and pure.
// - Learning state is owned by a `Resolver`; the pipeline shares it behind
//   a lock so outcome updates are serialized.
// - Deep analysis and remedy execution are delegated to collaborators
//   behind async traits. The defaults never run anything on their own.

pub mod bus;
pub mod catalog;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod history;
pub mod learning;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod risk;

#[cfg(test)]
mod test_support;

pub use crate::catalog::ErrorType;
pub use crate::classifier::{classify, ErrorClassifier, PatternClassifier};
pub use crate::config::ResolverConfig;
pub use crate::error::{ResolverError, Result};
pub use crate::learning::{LearningStatus, LearningStore};
pub use crate::model::{CommandEvent, Remedy, RiskTier};
pub use crate::monitor::{CommandMonitor, MonitorStatus};
pub use crate::pipeline::{CommandPipeline, InterventionAction, PipelineOutcome};
pub use crate::policy::{InterventionDecision, InterventionLevel};
pub use crate::resolver::Resolver;
pub use crate::risk::should_auto_execute;
