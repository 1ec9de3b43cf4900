// autoresolve-rs/src/risk.rs
// Gate between a decision and unattended execution.
//
// Autonomy level and remedy risk are independent: a trusted error type
// still never auto-runs a remedy above the level's risk ceiling.

use crate::model::RiskTier;
use crate::policy::{InterventionDecision, InterventionLevel};

/// Whether a remedy of `risk` may run without asking the user.
pub fn should_auto_execute(decision: &InterventionDecision, risk: RiskTier) -> bool {
    let verdict = match decision.level {
        InterventionLevel::AutoLowRisk => risk.rank() == 0,
        InterventionLevel::AutoMedium => risk.rank() <= 1,
        InterventionLevel::FullAutonomous => true,
        InterventionLevel::Silent | InterventionLevel::Suggest => false,
    };

    let verdict_label = if verdict { "auto" } else { "ask" };
    metrics::increment_counter!(
        "autoresolve_gate_verdicts_total",
        "level" => decision.level.as_str(),
        "risk" => risk.as_str(),
        "verdict" => verdict_label
    );

    verdict
}

/// String-labelled variant for callers holding raw risk labels.
/// Unrecognized labels are treated as high risk.
pub fn should_auto_execute_label(decision: &InterventionDecision, risk_label: &str) -> bool {
    should_auto_execute(decision, RiskTier::from_label(risk_label))
}
