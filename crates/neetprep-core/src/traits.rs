//! Boundary traits the engine depends on.
//!
//! Implemented by the `neetprep-providers` crate (HTTP, file and mock
//! adapters) and by hosts that bring their own transport.

use async_trait::async_trait;

use crate::error::{CatalogError, SubmitError};
use crate::model::{QuestionRecord, TestVariant};
use crate::report::ResultRecord;

// ---------------------------------------------------------------------------
// Question source
// ---------------------------------------------------------------------------

/// A source of questions for a test variant.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    /// Human-readable source name (e.g. "http").
    fn name(&self) -> &str;

    /// Fetch the raw question records making up `variant`.
    ///
    /// Records may contain duplicates; the engine normalizes them.
    async fn fetch(&self, variant: &TestVariant) -> Result<Vec<QuestionRecord>, CatalogError>;
}

// ---------------------------------------------------------------------------
// Result sink
// ---------------------------------------------------------------------------

/// Bearer credential presented on submission.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Persists a finished attempt.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Human-readable sink name (e.g. "file").
    fn name(&self) -> &str;

    /// Store `record`. Called once per completed attempt, again only when the
    /// host retries a failed submission.
    async fn submit(&self, record: &ResultRecord, credential: &Credential) -> Result<(), SubmitError>;
}

/// Supplies the learner's credential at submission time.
pub trait CredentialSource: Send + Sync {
    /// The current bearer credential, if the learner is signed in.
    fn credential(&self) -> Option<Credential>;
}

/// A credential source that never has a credential.
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn credential(&self) -> Option<Credential> {
        None
    }
}

impl CredentialSource for Credential {
    fn credential(&self) -> Option<Credential> {
        Some(self.clone())
    }
}
