// autoresolve-rs/src/test_support.rs
// Fixtures shared by the unit tests.

use crate::model::{Remedy, RiskTier};

pub(crate) fn remedy(name: &str, risk_level: RiskTier, commands: &[&str]) -> Remedy {
    Remedy {
        name: name.to_string(),
        description: format!("{name} description"),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        risk_level,
        rollback_commands: Vec::new(),
        confidence: 0.85,
        estimated_time: Some("1 minute".to_string()),
        prerequisites: Vec::new(),
        side_effects: Vec::new(),
    }
}
