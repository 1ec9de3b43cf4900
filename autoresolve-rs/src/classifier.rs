// autoresolve-rs/src/classifier.rs
// Pattern-based classification of raw error output.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::catalog::{ErrorType, PROFILES};

/// Strategy interface for error classification.
///
/// Implementations must be pure: the same text always yields the same type.
pub trait ErrorClassifier {
    fn classify(&self, error_text: &str) -> ErrorType;
}

/// Compiled profile patterns, kept in declaration order.
static COMPILED: Lazy<Vec<(ErrorType, Vec<Regex>)>> = Lazy::new(|| {
    PROFILES
        .iter()
        .map(|profile| {
            let regexes = profile
                .patterns
                .iter()
                .filter_map(|pattern| {
                    match RegexBuilder::new(pattern).case_insensitive(true).build() {
                        Ok(re) => Some(re),
                        Err(err) => {
                            tracing::error!(
                                error_type = %profile.error_type,
                                pattern = %pattern,
                                error = %err,
                                "invalid error pattern; ignoring"
                            );
                            None
                        }
                    }
                })
                .collect();
            (profile.error_type, regexes)
        })
        .collect()
});

/// Classifier backed by the static profile table.
///
/// The first profile with any matching pattern wins, so overlapping
/// patterns resolve toward the profile declared earlier.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternClassifier;

impl ErrorClassifier for PatternClassifier {
    fn classify(&self, error_text: &str) -> ErrorType {
        classify(error_text)
    }
}

pub fn classify(error_text: &str) -> ErrorType {
    COMPILED
        .iter()
        .find(|(_, regexes)| regexes.iter().any(|re| re.is_match(error_text)))
        .map(|(error_type, _)| *error_type)
        .unwrap_or(ErrorType::Unknown)
}
