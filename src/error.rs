// Copyright (c) Questboard, Inc.
// SPDX-License-Identifier: Apache-2.0

use ethers::types::H256;
use thiserror::Error;

use crate::criteria::FilterType;

/// Errors raised while validating action steps.
///
/// None of these is ever collapsed into a `false` validation result:
/// "determined invalid" is `Ok(false)`, while every variant here means
/// "validity could not be determined".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // Signature absent from both the caller override and the registry
    #[error("no known event descriptor for signature {0:?}")]
    UnknownEvent(H256),
    // Criteria references a topic position the log does not have
    #[error("criteria field index {field_index} is out of range for a log with {topic_count} topics")]
    FieldMissing { field_index: u8, topic_count: usize },
    // Filter operator is incompatible with the declared field type
    #[error("{filter} filter cannot be applied to field type {field_type}")]
    TypeMismatch { filter: FilterType, field_type: u8 },
    // Unrecognized filter operator read from chain
    #[error("unrecognized filter type {0}")]
    InvalidFilter(u8),
    // Transport-level failure while fetching logs; retryable by the caller
    #[error("log fetch failed: {0}")]
    LogFetchFailed(String),
    // Transport-level failure while reading declared action steps
    #[error("action step fetch failed: {0}")]
    StepFetchFailed(String),
}

impl ValidationError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            ValidationError::UnknownEvent(_) => "unknown_event",
            ValidationError::FieldMissing { .. } => "field_missing",
            ValidationError::TypeMismatch { .. } => "type_mismatch",
            ValidationError::InvalidFilter(_) => "invalid_filter",
            ValidationError::LogFetchFailed(_) => "log_fetch_failed",
            ValidationError::StepFetchFailed(_) => "step_fetch_failed",
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_labels() {
        let errors = vec![
            (
                ValidationError::UnknownEvent(H256::zero()),
                "unknown_event",
            ),
            (
                ValidationError::FieldMissing {
                    field_index: 2,
                    topic_count: 1,
                },
                "field_missing",
            ),
            (
                ValidationError::TypeMismatch {
                    filter: FilterType::GreaterThan,
                    field_type: 3,
                },
                "type_mismatch",
            ),
            (ValidationError::InvalidFilter(9), "invalid_filter"),
            (
                ValidationError::LogFetchFailed("boom".to_string()),
                "log_fetch_failed",
            ),
            (
                ValidationError::StepFetchFailed("boom".to_string()),
                "step_fetch_failed",
            ),
        ];
        for (error, expected) in errors {
            assert_eq!(
                error.error_type(),
                expected,
                "error_type for {:?} should be '{}'",
                error,
                expected
            );
        }
    }

    /// error_type values feed Prometheus labels and must stay
    /// lowercase/underscore only
    #[test]
    fn test_error_type_valid_prometheus_labels() {
        let errors = vec![
            ValidationError::UnknownEvent(H256::zero()),
            ValidationError::FieldMissing {
                field_index: 0,
                topic_count: 0,
            },
            ValidationError::TypeMismatch {
                filter: FilterType::Contains,
                field_type: 0,
            },
            ValidationError::InvalidFilter(255),
            ValidationError::LogFetchFailed("any".to_string()),
            ValidationError::StepFetchFailed("any".to_string()),
        ];
        for error in errors {
            let error_type = error.error_type();
            assert!(!error_type.is_empty());
            for c in error_type.chars() {
                assert!(
                    c.is_ascii_lowercase() || c == '_',
                    "error_type '{}' contains invalid character '{}' for Prometheus label",
                    error_type,
                    c
                );
            }
            assert!(!error_type.starts_with('_'));
            assert!(!error_type.ends_with('_'));
        }
    }

    #[test]
    fn test_type_mismatch_display_names_the_operator() {
        let error = ValidationError::TypeMismatch {
            filter: FilterType::GreaterThan,
            field_type: 3,
        };
        let display = format!("{}", error);
        assert!(display.contains("GREATER_THAN"));
        assert!(display.contains("field type 3"));
    }
}
