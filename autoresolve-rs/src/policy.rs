// autoresolve-rs/src/policy.rs
// Intervention policy: how aggressively to act on a classified error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{ErrorType, GENERIC_SUGGESTION};
use crate::classifier::ErrorClassifier;
use crate::learning::LearningStore;

/// Autonomy tiers in increasing order. The risk gate compares ranks, so
/// variant order is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum InterventionLevel {
    Silent = 0,
    Suggest = 1,
    AutoLowRisk = 2,
    AutoMedium = 3,
    FullAutonomous = 4,
}

impl InterventionLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InterventionLevel::Silent => "SILENT",
            InterventionLevel::Suggest => "SUGGEST",
            InterventionLevel::AutoLowRisk => "AUTO_LOW_RISK",
            InterventionLevel::AutoMedium => "AUTO_MEDIUM",
            InterventionLevel::FullAutonomous => "FULL_AUTONOMOUS",
        }
    }
}

impl fmt::Display for InterventionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success rate above which learned trust overrides the static level.
pub const HIGH_TRUST_RATE: f64 = 0.9;
/// Success rate above which the static level is used as-is.
pub const MEDIUM_TRUST_RATE: f64 = 0.7;

pub const HIGH_TRUST_CONFIDENCE: f64 = 0.95;
pub const MEDIUM_TRUST_CONFIDENCE: f64 = 0.80;
pub const LOW_TRUST_CONFIDENCE: f64 = 0.60;
pub const UNKNOWN_CONFIDENCE: f64 = 0.5;

/// Outcome of analysing one failed command. Produced per call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionDecision {
    pub error_type: ErrorType,
    pub should_intervene: bool,
    pub level: InterventionLevel,
    pub confidence: f64,
    pub reason: String,
    pub suggested_actions: Vec<String>,
}

/// Decide how to intervene on `error_text` given the store's current rates.
///
/// Pure with respect to the store: reads one success rate, mutates nothing.
pub fn decide(
    classifier: &dyn ErrorClassifier,
    store: &LearningStore,
    error_text: &str,
    command: &str,
) -> InterventionDecision {
    let error_type = classifier.classify(error_text);
    let decision = decide_for(error_type, store.success_rate(error_type), command);

    tracing::debug!(
        error_type = %decision.error_type,
        level = %decision.level,
        confidence = decision.confidence,
        "intervention decision"
    );
    metrics::increment_counter!(
        "autoresolve_decisions_total",
        "error_type" => decision.error_type.as_str(),
        "level" => decision.level.as_str()
    );

    decision
}

/// Decision for an already classified error with a known success rate.
pub fn decide_for(error_type: ErrorType, success_rate: f64, command: &str) -> InterventionDecision {
    let Some(profile) = error_type.profile() else {
        return InterventionDecision {
            error_type,
            should_intervene: true,
            level: InterventionLevel::Suggest,
            confidence: UNKNOWN_CONFIDENCE,
            reason: format!("Unknown error type: {error_type}"),
            suggested_actions: vec![GENERIC_SUGGESTION.to_string()],
        };
    };

    let (level, confidence) = if success_rate > HIGH_TRUST_RATE {
        (InterventionLevel::AutoLowRisk, HIGH_TRUST_CONFIDENCE)
    } else if success_rate > MEDIUM_TRUST_RATE {
        (profile.default_level, MEDIUM_TRUST_CONFIDENCE)
    } else {
        (
            profile.default_level.max(InterventionLevel::Suggest),
            LOW_TRUST_CONFIDENCE,
        )
    };

    InterventionDecision {
        error_type,
        should_intervene: true,
        level,
        confidence,
        reason: format!(
            "Detected {error_type} error (confidence: {:.0}%)",
            confidence * 100.0
        ),
        suggested_actions: suggestions_for(profile.suggestions, command),
    }
}

/// Expand `<command>` placeholders with the program name from the command line.
fn suggestions_for(hints: &[&str], command: &str) -> Vec<String> {
    let program = command.split_whitespace().next();
    hints
        .iter()
        .map(|hint| match program {
            Some(program) => hint.replace("<command>", program),
            None => hint.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PatternClassifier;
    use crate::model::{Remedy, RiskTier};
    use crate::test_support;

    fn remedy() -> Remedy {
        test_support::remedy("install npm", RiskTier::Low, &["sudo apt install npm"])
    }

    #[test]
    fn levels_are_ordered_by_autonomy() {
        assert!(InterventionLevel::Silent < InterventionLevel::Suggest);
        assert!(InterventionLevel::Suggest < InterventionLevel::AutoLowRisk);
        assert!(InterventionLevel::AutoLowRisk < InterventionLevel::AutoMedium);
        assert!(InterventionLevel::AutoMedium < InterventionLevel::FullAutonomous);
        assert_eq!(InterventionLevel::FullAutonomous.rank(), 4);
    }

    #[test]
    fn unknown_error_gets_generic_suggestion() {
        let store = LearningStore::new();
        let decision = decide(&PatternClassifier, &store, "segfault", "./a.out");
        assert_eq!(decision.error_type, ErrorType::Unknown);
        assert!(decision.should_intervene);
        assert_eq!(decision.level, InterventionLevel::Suggest);
        assert_eq!(decision.confidence, 0.5);
        assert_eq!(decision.reason, "Unknown error type: unknown");
        assert_eq!(decision.suggested_actions, vec!["Run diagnostic analysis".to_string()]);
    }

    #[test]
    fn command_not_found_without_history() {
        let store = LearningStore::new();
        let decision = decide(&PatternClassifier, &store, "npm: command not found", "npm start");
        assert_eq!(decision.error_type, ErrorType::CommandNotFound);
        assert!(decision.level >= InterventionLevel::Suggest);
        assert_eq!(decision.level, InterventionLevel::AutoLowRisk);
        assert_eq!(decision.confidence, 0.60);
        assert_eq!(decision.reason, "Detected command_not_found error (confidence: 60%)");
        assert!(decision
            .suggested_actions
            .contains(&"Try 'which npm' to locate it".to_string()));
    }

    #[test]
    fn high_success_rate_promotes_to_auto_low_risk() {
        let mut store = LearningStore::new();
        store.record_outcome(ErrorType::CommandNotFound, true, &remedy());
        assert!(store.success_rate(ErrorType::CommandNotFound) > 0.9);

        let decision = decide(&PatternClassifier, &store, "npm: command not found", "npm start");
        assert_eq!(decision.level, InterventionLevel::AutoLowRisk);
        assert_eq!(decision.confidence, 0.95);
    }

    #[test]
    fn learned_trust_overrides_suggest_default() {
        let decision = decide_for(ErrorType::PortAlreadyInUse, 0.95, "npm start");
        assert_eq!(decision.level, InterventionLevel::AutoLowRisk);
        assert_eq!(decision.confidence, 0.95);
    }

    #[test]
    fn middle_band_uses_static_default() {
        let decision = decide_for(ErrorType::DiskSpace, 0.8, "cp a b");
        assert_eq!(decision.level, InterventionLevel::Suggest);
        assert_eq!(decision.confidence, 0.80);

        // Exactly 0.9 is still the middle band.
        let decision = decide_for(ErrorType::CommandNotFound, 0.9, "npm");
        assert_eq!(decision.level, InterventionLevel::AutoLowRisk);
        assert_eq!(decision.confidence, 0.80);
    }

    #[test]
    fn low_band_never_drops_below_suggest() {
        let decision = decide_for(ErrorType::PermissionDenied, 0.7, "./run.sh");
        assert_eq!(decision.level, InterventionLevel::Suggest);
        assert_eq!(decision.confidence, 0.60);
    }
}
