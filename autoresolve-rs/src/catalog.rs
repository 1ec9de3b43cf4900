// autoresolve-rs/src/catalog.rs
// Declarative table of known error types.
//
// Each profile carries everything the engine knows statically about one
// error type: the patterns that identify it, the risk tier of its typical
// fixes, the autonomy level used before any learning, and the hints shown
// to the user. Profile order is the classification precedence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::RiskTier;
use crate::policy::InterventionLevel;

/// Closed set of error types the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    CommandNotFound,
    PermissionDenied,
    MissingDependency,
    PortAlreadyInUse,
    DiskSpace,
    NetworkError,
    Unknown,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::CommandNotFound => "command_not_found",
            ErrorType::PermissionDenied => "permission_denied",
            ErrorType::MissingDependency => "missing_dependency",
            ErrorType::PortAlreadyInUse => "port_already_in_use",
            ErrorType::DiskSpace => "disk_space",
            ErrorType::NetworkError => "network_error",
            ErrorType::Unknown => "unknown",
        }
    }

    /// Static profile for this type, or `None` for `Unknown`.
    pub fn profile(self) -> Option<&'static ErrorProfile> {
        PROFILES.iter().find(|p| p.error_type == self)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ErrorProfile {
    pub error_type: ErrorType,
    /// Regular expressions, matched case-insensitively.
    pub patterns: &'static [&'static str],
    pub risk_level: RiskTier,
    pub default_level: InterventionLevel,
    pub suggestions: &'static [&'static str],
    pub quick_fix: Option<&'static str>,
}

/// Hint used when the error type has no profile.
pub const GENERIC_SUGGESTION: &str = "Run diagnostic analysis";

pub static PROFILES: &[ErrorProfile] = &[
    ErrorProfile {
        error_type: ErrorType::CommandNotFound,
        patterns: &[r"command not found", r"No such file or directory", r"not found in"],
        risk_level: RiskTier::Low,
        default_level: InterventionLevel::AutoLowRisk,
        suggestions: &[
            "Check spelling of the command",
            "Ensure the program is installed",
            "Verify the program is in your PATH",
            "Try 'which <command>' to locate it",
        ],
        quick_fix: None,
    },
    ErrorProfile {
        error_type: ErrorType::PermissionDenied,
        patterns: &[r"Permission denied", r"Operation not permitted"],
        risk_level: RiskTier::Medium,
        default_level: InterventionLevel::Suggest,
        suggestions: &[
            "Add execute permission: chmod +x <file>",
            "Run with sudo (if appropriate)",
            "Check file ownership",
        ],
        quick_fix: Some("chmod +x"),
    },
    ErrorProfile {
        error_type: ErrorType::MissingDependency,
        patterns: &[r"ModuleNotFoundError", r"No module named", r"cannot find -l", r"pkg-config"],
        risk_level: RiskTier::Low,
        default_level: InterventionLevel::Suggest,
        suggestions: &[
            "Install the missing dependency",
            "Check package manager (npm, pip, apt, etc.)",
            "Verify installation completed successfully",
        ],
        quick_fix: None,
    },
    ErrorProfile {
        error_type: ErrorType::PortAlreadyInUse,
        patterns: &[r"Address already in use", r"port [0-9]+ is already in use", r"EADDRINUSE"],
        risk_level: RiskTier::Medium,
        default_level: InterventionLevel::Suggest,
        suggestions: &[
            "Use a different port number",
            "Kill the process using the port",
            "Check for zombie processes",
        ],
        quick_fix: Some("lsof -i :<port>"),
    },
    ErrorProfile {
        error_type: ErrorType::DiskSpace,
        patterns: &[r"No space left on device", r"disk full", r"out of space"],
        risk_level: RiskTier::High,
        default_level: InterventionLevel::Suggest,
        suggestions: &[
            "Clean up temporary files",
            "Check disk usage with 'df -h'",
            "Remove old build artifacts",
        ],
        quick_fix: Some("df -h && du -sh *"),
    },
    ErrorProfile {
        error_type: ErrorType::NetworkError,
        patterns: &[
            r"Connection refused",
            r"Connection reset",
            r"Network unreachable",
            r"Temporary failure in name resolution",
        ],
        risk_level: RiskTier::Low,
        default_level: InterventionLevel::Suggest,
        suggestions: &[
            "Check internet connection",
            "Verify the target server is running",
            "Check DNS resolution",
            "Look for proxy/firewall issues",
        ],
        quick_fix: None,
    },
];
