//! Adapter error types.

use thiserror::Error;

use neetprep_core::error::{CatalogError, SubmitError};

/// Errors that can occur when talking to the neetprep backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The bearer token was missing, expired or refused.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The endpoint or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    fn status(&self) -> u16 {
        match self {
            ApiError::RateLimited { .. } => 429,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Api { status, .. } => *status,
            ApiError::Timeout(_) | ApiError::Network(_) | ApiError::InvalidResponse(_) => 0,
        }
    }
}

impl From<ApiError> for CatalogError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized(msg) => CatalogError::Unauthorized(msg),
            ApiError::Timeout(_) | ApiError::Network(_) => CatalogError::Unavailable(e.to_string()),
            ApiError::InvalidResponse(msg) => CatalogError::Malformed(msg),
            ApiError::Api { status, message } => CatalogError::Rejected { status, message },
            ApiError::RateLimited { .. } | ApiError::NotFound(_) => CatalogError::Rejected {
                status: e.status(),
                message: e.to_string(),
            },
        }
    }
}

impl From<ApiError> for SubmitError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthorized(msg) => SubmitError::Unauthorized(msg),
            ApiError::Timeout(secs) => SubmitError::Timeout(secs),
            ApiError::Network(msg) => SubmitError::Network(msg),
            ApiError::Api { status, message } => SubmitError::Rejected { status, message },
            ApiError::RateLimited { .. } | ApiError::NotFound(_) | ApiError::InvalidResponse(_) => {
                SubmitError::Rejected {
                    status: e.status(),
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_maps_to_retryable_submit_error() {
        let err = SubmitError::from(ApiError::RateLimited {
            retry_after_ms: 5000,
        });
        assert!(matches!(err, SubmitError::Rejected { status: 429, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn transport_failures_make_catalog_unavailable() {
        assert!(matches!(
            CatalogError::from(ApiError::Timeout(30)),
            CatalogError::Unavailable(_)
        ));
        assert!(matches!(
            CatalogError::from(ApiError::InvalidResponse("eof".into())),
            CatalogError::Malformed(_)
        ));
        assert!(matches!(
            CatalogError::from(ApiError::NotFound("/api/questions".into())),
            CatalogError::Rejected { status: 404, .. }
        ));
    }
}
