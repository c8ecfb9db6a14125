//! Error types for the test engine.
//!
//! Every failure the engine can hit is returned as one of these values; the
//! host decides how to present it. Adapter errors are defined here so the
//! engine can tell retryable submission failures from permanent ones without
//! string matching.

use thiserror::Error;

use crate::ids::QuestionId;
use crate::model::VariantKind;
use crate::session::Phase;

/// The selection does not carry what its variant needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    #[error("no test variant selected")]
    MissingKind,

    #[error("missing required selector field `{field}` for {kind} test")]
    MissingField {
        kind: VariantKind,
        field: &'static str,
    },

    #[error("question count for a custom topic test must be at least 1")]
    ZeroQuestionCount,
}

/// Failure fetching questions from a catalog source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The source could not be reached.
    #[error("question source unavailable: {0}")]
    Unavailable(String),

    /// The source refused the credentials.
    #[error("not authorized to fetch questions: {0}")]
    Unauthorized(String),

    /// The source answered with an error status.
    #[error("question source error (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The source answered with something that is not a question list.
    #[error("malformed question data: {0}")]
    Malformed(String),
}

/// Failure handing a result record to the submission adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("no credential available for result submission")]
    MissingCredential,

    #[error("result submission not authorized: {0}")]
    Unauthorized(String),

    #[error("result submission rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to store result: {0}")]
    Storage(String),
}

impl SubmitError {
    /// Whether sending the same record again can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmitError::Timeout(_) | SubmitError::Network(_) | SubmitError::Storage(_) => true,
            SubmitError::Rejected { status, .. } => *status >= 500 || *status == 429,
            SubmitError::MissingCredential | SubmitError::Unauthorized(_) => false,
        }
    }
}

/// Why an attempt could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("cannot start test: {0}")]
    Config(#[from] VariantError),

    #[error("cannot load questions: {0}")]
    Catalog(#[from] CatalogError),
}

/// A navigation or answer request that was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("session is not active (phase: {0})")]
    NotActive(Phase),

    #[error("answers are frozen while the result is being submitted")]
    Frozen,

    #[error("question {0} is not part of this test")]
    UnknownQuestion(QuestionId),

    #[error("invalid option label: {0}")]
    InvalidOption(String),

    #[error("question index {index} out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },
}

/// A phase transition that was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("a submission is already in flight")]
    AlreadySubmitting,

    #[error("the test has already been submitted")]
    AlreadySubmitted,

    #[error("there is no failed submission to retry")]
    NothingToRetry,

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_error_retry_classification() {
        assert!(SubmitError::Network("reset".into()).is_retryable());
        assert!(SubmitError::Timeout(30).is_retryable());
        assert!(SubmitError::Rejected {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!SubmitError::Rejected {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!SubmitError::MissingCredential.is_retryable());
        assert!(!SubmitError::Unauthorized("expired".into()).is_retryable());
    }

    #[test]
    fn config_error_message_names_the_field() {
        let err = StartError::from(VariantError::MissingField {
            kind: VariantKind::Chapter,
            field: "subject",
        });
        assert_eq!(
            err.to_string(),
            "cannot start test: missing required selector field `subject` for chapter test"
        );
    }
}
