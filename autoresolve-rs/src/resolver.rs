// autoresolve-rs/src/resolver.rs
// Owner of the learning state and entry point for decisions.

use std::path::Path;
use std::sync::Arc;

use crate::catalog::ErrorType;
use crate::classifier::{ErrorClassifier, PatternClassifier};
use crate::error::Result;
use crate::learning::{LearningStatus, LearningStore};
use crate::model::{Remedy, RiskTier};
use crate::policy::{self, InterventionDecision};
use crate::risk;

/// Makes intervention decisions and learns from their outcomes.
///
/// All mutation goes through `&mut self`; callers sharing a resolver
/// across tasks wrap it in a lock so decay updates are serialized.
pub struct Resolver {
    classifier: Arc<dyn ErrorClassifier + Send + Sync>,
    store: LearningStore,
}

impl Resolver {
    pub fn new() -> Self {
        Self::with_store(LearningStore::new())
    }

    pub fn with_store(store: LearningStore) -> Self {
        Self {
            classifier: Arc::new(PatternClassifier),
            store,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier + Send + Sync>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classify(&self, error_text: &str) -> ErrorType {
        self.classifier.classify(error_text)
    }

    pub fn analyze_error(&self, error_text: &str, command: &str) -> InterventionDecision {
        policy::decide(self.classifier.as_ref(), &self.store, error_text, command)
    }

    pub fn should_auto_execute(&self, decision: &InterventionDecision, risk: RiskTier) -> bool {
        risk::should_auto_execute(decision, risk)
    }

    pub fn record_outcome(&mut self, error_type: ErrorType, success: bool, remedy: &Remedy) {
        self.store.record_outcome(error_type, success, remedy);
    }

    pub fn quick_fix(&self, error_type: ErrorType) -> Option<&'static str> {
        error_type.profile().and_then(|p| p.quick_fix)
    }

    pub fn learning_status(&self) -> LearningStatus {
        self.store.status()
    }

    pub fn store(&self) -> &LearningStore {
        &self.store
    }

    pub fn into_store(self) -> LearningStore {
        self.store
    }

    /// Resolver backed by the snapshot at `path`; a missing file starts empty.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::with_store(LearningStore::load(path)?))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.store.save(path)?;
        Ok(())
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
