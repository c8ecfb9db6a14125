//! neetprep-providers — Question catalog and result submission adapters.
//!
//! Implements the `QuestionCatalog` and `ResultSink` traits over the neetprep
//! HTTP API and over local files, plus in-memory doubles for tests and the
//! configuration that picks between them.

pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod mock;

pub use config::{
    create_catalog, create_credentials, create_result_sink, load_config, load_config_from,
    CatalogConfig, NeetprepConfig, ResultsConfig, StaticCredentials,
};
pub use error::ApiError;
