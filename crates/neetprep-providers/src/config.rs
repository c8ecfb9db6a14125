//! Configuration and adapter factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use neetprep_core::engine::TestEngineConfig;
use neetprep_core::scoring::MarkingScheme;
use neetprep_core::traits::{Credential, CredentialSource, QuestionCatalog, ResultSink};

use crate::file::{FileCatalog, FileResultSink};
use crate::http::{HttpCatalog, HttpResultSink};

/// Where questions come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogConfig {
    Http {
        base_url: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    File {
        path: PathBuf,
    },
}

/// Where finished attempts go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultsConfig {
    Http {
        base_url: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    File {
        dir: PathBuf,
    },
}

/// Learner credentials.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Top-level neetprep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeetprepConfig {
    /// Learner the results are filed under.
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Time allowance per question.
    #[serde(default = "default_seconds_per_question")]
    pub seconds_per_question: u32,
    /// Show the instructions screen before full mock tests.
    #[serde(default = "default_true")]
    pub show_instructions: bool,
    /// Output directory for reports and file results.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub marking: MarkingScheme,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub results: Option<ResultsConfig>,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_user_id() -> String {
    "anonymous".to_string()
}
fn default_seconds_per_question() -> u32 {
    60
}
fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./neetprep-results")
}

impl Default for NeetprepConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            seconds_per_question: default_seconds_per_question(),
            show_instructions: true,
            output_dir: default_output_dir(),
            marking: MarkingScheme::default(),
            catalog: None,
            results: None,
            auth: AuthConfig::default(),
        }
    }
}

impl NeetprepConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> TestEngineConfig {
        TestEngineConfig {
            user_id: self.user_id.clone(),
            seconds_per_question: self.seconds_per_question,
            marking: self.marking,
            show_instructions: self.show_instructions,
            ..TestEngineConfig::default()
        }
    }

    /// Results configuration, falling back to files in `output_dir`.
    pub fn results_or_default(&self) -> ResultsConfig {
        self.results.clone().unwrap_or_else(|| ResultsConfig::File {
            dir: self.output_dir.clone(),
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_env_in_config(config: &mut NeetprepConfig) {
    config.user_id = resolve_env_vars(&config.user_id);
    if let Some(CatalogConfig::Http { base_url, .. }) = &mut config.catalog {
        *base_url = resolve_env_vars(base_url);
    }
    if let Some(ResultsConfig::Http { base_url, .. }) = &mut config.results {
        *base_url = resolve_env_vars(base_url);
    }
    // An unset variable leaves no token rather than an empty one.
    config.auth.token = config
        .auth
        .token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `neetprep.toml` in the current directory
/// 2. `~/.config/neetprep/config.toml`
///
/// Environment variable overrides: `NEETPREP_TOKEN`, `NEETPREP_USER_ID`.
pub fn load_config() -> Result<NeetprepConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<NeetprepConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("neetprep.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<NeetprepConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => NeetprepConfig::default(),
    };

    // Apply env var overrides
    if let Ok(token) = std::env::var("NEETPREP_TOKEN") {
        config.auth.token = Some(token);
    }
    if let Ok(user_id) = std::env::var("NEETPREP_USER_ID") {
        config.user_id = user_id;
    }

    resolve_env_in_config(&mut config);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("neetprep"))
}

/// Create a question catalog from its configuration.
pub fn create_catalog(config: &CatalogConfig, auth: &AuthConfig) -> Result<Box<dyn QuestionCatalog>> {
    match config {
        CatalogConfig::Http {
            base_url,
            timeout_secs,
        } => Ok(Box::new(HttpCatalog::new(
            base_url,
            auth.token.clone(),
            *timeout_secs,
        )?)),
        CatalogConfig::File { path } => Ok(Box::new(FileCatalog::open(path)?)),
    }
}

/// Create a result sink from its configuration.
pub fn create_result_sink(config: &ResultsConfig) -> Result<Box<dyn ResultSink>> {
    match config {
        ResultsConfig::Http {
            base_url,
            timeout_secs,
        } => Ok(Box::new(HttpResultSink::new(base_url, *timeout_secs)?)),
        ResultsConfig::File { dir } => Ok(Box::new(FileResultSink::new(dir.clone()))),
    }
}

/// Bearer token from configuration.
///
/// Note: Custom Debug impl masks the token.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(&self) -> Option<Credential> {
        self.token.clone().map(Credential::new)
    }
}

/// Credentials for the configured result sink.
///
/// Local file results do not need a signed-in learner; they get a fixed
/// `local` token when none is configured.
pub fn create_credentials(config: &NeetprepConfig) -> Arc<dyn CredentialSource> {
    match (&config.auth.token, config.results_or_default()) {
        (Some(token), _) => Arc::new(StaticCredentials::new(Some(token.clone()))),
        (None, ResultsConfig::File { .. }) => {
            Arc::new(StaticCredentials::new(Some("local".to_string())))
        }
        (None, ResultsConfig::Http { .. }) => Arc::new(StaticCredentials::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_NEETPREP_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_NEETPREP_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_NEETPREP_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_NEETPREP_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = NeetprepConfig::default();
        assert_eq!(config.seconds_per_question, 60);
        assert_eq!(config.marking, MarkingScheme { correct: 4, wrong: -1 });
        assert!(config.show_instructions);
        assert!(matches!(
            config.results_or_default(),
            ResultsConfig::File { dir } if dir == PathBuf::from("./neetprep-results")
        ));
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
user_id = "learner-42"
seconds_per_question = 72
show_instructions = false

[marking]
correct = 4
wrong = -2

[catalog]
type = "http"
base_url = "https://api.example.com"

[results]
type = "file"
dir = "./out"

[auth]
token = "abc"
"#;
        let config: NeetprepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.user_id, "learner-42");
        assert_eq!(config.marking.wrong, -2);
        assert!(matches!(config.catalog, Some(CatalogConfig::Http { .. })));
        assert!(matches!(config.results, Some(ResultsConfig::File { .. })));

        let engine = config.engine_config();
        assert_eq!(engine.seconds_per_question, 72);
        assert!(!engine.show_instructions);
    }

    #[test]
    fn token_is_masked_in_debug() {
        let auth = AuthConfig {
            token: Some("super-secret".into()),
        };
        let printed = format!("{auth:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("***"));

        let creds = StaticCredentials::new(Some("super-secret".into()));
        assert!(!format!("{creds:?}").contains("super-secret"));
    }

    #[test]
    fn unset_token_variable_means_no_token() {
        let mut config = NeetprepConfig {
            auth: AuthConfig {
                token: Some("${_NEETPREP_SURELY_UNSET}".into()),
            },
            ..NeetprepConfig::default()
        };
        resolve_env_in_config(&mut config);
        assert!(config.auth.token.is_none());
    }

    #[test]
    fn credentials_follow_results_target() {
        let local = NeetprepConfig::default();
        assert_eq!(
            create_credentials(&local).credential(),
            Some(Credential::new("local"))
        );

        let remote = NeetprepConfig {
            results: Some(ResultsConfig::Http {
                base_url: "https://api.example.com".into(),
                timeout_secs: None,
            }),
            ..NeetprepConfig::default()
        };
        assert!(create_credentials(&remote).credential().is_none());
    }

    #[test]
    fn load_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neetprep.toml");
        std::fs::write(&path, "user_id = \"from-file\"\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var("NEETPREP_USER_ID").is_err() {
            assert_eq!(config.user_id, "from-file");
        }

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn factory_builds_file_adapters() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("bank.json");
        std::fs::write(&bank, "[]").unwrap();

        let catalog = create_catalog(&CatalogConfig::File { path: bank }, &AuthConfig::default()).unwrap();
        assert_eq!(catalog.name(), "file");
        let sink = create_result_sink(&ResultsConfig::File {
            dir: dir.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(sink.name(), "file");
        let http = create_result_sink(&ResultsConfig::Http {
            base_url: "http://localhost".into(),
            timeout_secs: Some(5),
        })
        .unwrap();
        assert_eq!(http.name(), "http");
    }
}
