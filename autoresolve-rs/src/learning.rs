// autoresolve-rs/src/learning.rs
// Per-error-type success tracking.
//
// The store keeps an exponentially decayed success rate and the last
// remedy that worked for each error type. It lives as long as its owning
// resolver; persistence is an explicit save/load, never automatic.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ErrorType;
use crate::model::Remedy;

/// Weight kept from the previous rate on each update.
pub const DECAY_RETAIN: f64 = 0.7;
/// Weight given to the newest outcome on each update.
pub const DECAY_WEIGHT: f64 = 0.3;

#[derive(Debug, thiserror::Error)]
pub enum LearningStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One recorded intervention outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub error_type: ErrorType,
    pub success: bool,
    pub remedy_name: String,
    pub recorded_at: DateTime<Utc>,
}

/// Summary of what the store has learned so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStatus {
    pub total_interventions: usize,
    pub error_types_learned: usize,
    pub success_rates: BTreeMap<ErrorType, f64>,
    pub learned_solutions: Vec<ErrorType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningStore {
    success_rates: HashMap<ErrorType, f64>,
    best_remedies: HashMap<ErrorType, Remedy>,
    #[serde(default)]
    history: Vec<InterventionRecord>,
}

impl LearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one intervention.
    ///
    /// The first observation sets the rate to 1.0 or 0.0; later ones blend
    /// in with `old * 0.7 + outcome * 0.3`. The best remedy is replaced only
    /// on success and never cleared on failure.
    pub fn record_outcome(&mut self, error_type: ErrorType, success: bool, remedy: &Remedy) {
        let outcome = if success { 1.0 } else { 0.0 };
        let rate = match self.success_rates.get(&error_type) {
            None => outcome,
            Some(old) => old * DECAY_RETAIN + outcome * DECAY_WEIGHT,
        };
        self.success_rates.insert(error_type, rate.clamp(0.0, 1.0));

        if success {
            self.best_remedies.insert(error_type, remedy.clone());
        }

        self.history.push(InterventionRecord {
            error_type,
            success,
            remedy_name: remedy.name.clone(),
            recorded_at: Utc::now(),
        });

        tracing::debug!(
            error_type = %error_type,
            success,
            success_rate = rate,
            remedy = %remedy.name,
            "recorded intervention outcome"
        );
    }

    /// Current success rate; 0.0 when the type has no history.
    pub fn success_rate(&self, error_type: ErrorType) -> f64 {
        self.success_rates.get(&error_type).copied().unwrap_or(0.0)
    }

    pub fn best_remedy(&self, error_type: ErrorType) -> Option<&Remedy> {
        self.best_remedies.get(&error_type)
    }

    pub fn history(&self) -> &[InterventionRecord] {
        &self.history
    }

    pub fn status(&self) -> LearningStatus {
        let mut learned_solutions: Vec<ErrorType> = self.best_remedies.keys().copied().collect();
        learned_solutions.sort();

        LearningStatus {
            total_interventions: self.history.len(),
            error_types_learned: self.success_rates.len(),
            success_rates: self.success_rates.iter().map(|(k, v)| (*k, *v)).collect(),
            learned_solutions,
        }
    }

    /// Write a JSON snapshot of the store.
    pub fn save(&self, path: &Path) -> Result<(), LearningStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a snapshot written by [`LearningStore::save`]. A missing file
    /// yields an empty store. Rates outside [0, 1] are clamped.
    pub fn load(path: &Path) -> Result<Self, LearningStoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let mut store: Self = serde_json::from_str(&raw)?;
        for rate in store.success_rates.values_mut() {
            *rate = rate.clamp(0.0, 1.0);
        }
        Ok(store)
    }
}
