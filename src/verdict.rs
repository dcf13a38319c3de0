//! Match verdicts and their display strings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message carried by the verdict of a cancelled resolution.
pub const CANCELLED: &str = "Cancelled";

/// Final classified outcome for one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchVerdict {
    FullMatch {
        record_id: String,
    },
    DeletedMatch {
        record_id: String,
    },
    PartialWithinDescription {
        example_description: String,
        record_id: String,
    },
    PartialPrefixOnly {
        prefix: String,
        record_id: String,
    },
    NoMatch,
    Error {
        message: String,
    },
}

impl MatchVerdict {
    pub fn full(record_id: &str) -> Self {
        MatchVerdict::FullMatch {
            record_id: record_id.trim().to_string(),
        }
    }

    pub fn deleted(record_id: &str) -> Self {
        MatchVerdict::DeletedMatch {
            record_id: record_id.trim().to_string(),
        }
    }

    pub fn within_description(description: &str, record_id: &str) -> Self {
        MatchVerdict::PartialWithinDescription {
            example_description: description.trim().to_string(),
            record_id: record_id.trim().to_string(),
        }
    }

    pub fn prefix_only(prefix: &str, record_id: &str) -> Self {
        MatchVerdict::PartialPrefixOnly {
            prefix: prefix.trim().to_string(),
            record_id: record_id.trim().to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        MatchVerdict::Error {
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::error(CANCELLED)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MatchVerdict::Error { .. })
    }

    /// Errors are never cached so the term can be retried.
    pub fn is_cacheable(&self) -> bool {
        !self.is_error()
    }
}

impl fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchVerdict::FullMatch { record_id } => {
                write!(f, "Full match found (Term ID: {})", record_id)
            }
            MatchVerdict::DeletedMatch { record_id } => {
                write!(f, "Deleted description found (Term ID: {})", record_id)
            }
            MatchVerdict::PartialWithinDescription {
                example_description,
                record_id,
            } => write!(
                f,
                "Apart of a larger description (Example - {} - Term ID: {})",
                example_description, record_id
            ),
            MatchVerdict::PartialPrefixOnly { prefix, record_id } => write!(
                f,
                "Full match not found, but partial match found: '{}' (Term ID: {})",
                prefix, record_id
            ),
            MatchVerdict::NoMatch => write!(f, "No match found"),
            MatchVerdict::Error { message } if message == CANCELLED => write!(f, "{}", CANCELLED),
            MatchVerdict::Error { .. } => write!(f, "Error during search"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_templates() {
        assert_eq!(
            MatchVerdict::full("78").to_string(),
            "Full match found (Term ID: 78)"
        );
        assert_eq!(
            MatchVerdict::deleted("78").to_string(),
            "Deleted description found (Term ID: 78)"
        );
        assert_eq!(
            MatchVerdict::within_description(" athletic running gear ", "12").to_string(),
            "Apart of a larger description (Example - athletic running gear - Term ID: 12)"
        );
        assert_eq!(
            MatchVerdict::prefix_only("running", "Not found").to_string(),
            "Full match not found, but partial match found: 'running' (Term ID: Not found)"
        );
        assert_eq!(MatchVerdict::NoMatch.to_string(), "No match found");
        assert_eq!(MatchVerdict::cancelled().to_string(), "Cancelled");
        assert_eq!(
            MatchVerdict::error("Remote timeout: x").to_string(),
            "Error during search"
        );
    }

    #[test]
    fn test_errors_are_not_cacheable() {
        assert!(!MatchVerdict::cancelled().is_cacheable());
        assert!(MatchVerdict::NoMatch.is_cacheable());
    }
}
