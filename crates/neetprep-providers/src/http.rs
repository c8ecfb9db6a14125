//! HTTP adapters for the neetprep backend.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use neetprep_core::error::{CatalogError, SubmitError};
use neetprep_core::ids::{ChapterId, PortionId, SubjectId, TopicId};
use neetprep_core::model::{QuestionRecord, TestVariant};
use neetprep_core::report::ResultRecord;
use neetprep_core::traits::{Credential, QuestionCatalog, ResultSink};

use crate::error::ApiError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

fn transport_error(e: reqwest::Error, timeout_secs: u64) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(timeout_secs)
    } else {
        ApiError::Network(e.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Map non-success statuses to [`ApiError`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status().as_u16();
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            .saturating_mul(1000);
        return Err(ApiError::RateLimited {
            retry_after_ms: retry_after,
        });
    }
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Unauthorized(body));
    }
    if status == 404 {
        return Err(ApiError::NotFound(response.url().path().to_string()));
    }
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(ApiError::Api { status, message });
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// Question catalog
// ---------------------------------------------------------------------------

/// Question catalog served by the neetprep API.
pub struct HttpCatalog {
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: Option<u64>) -> Result<Self> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomTestRequest<'a> {
    portion_id: &'a PortionId,
    subject_id: &'a SubjectId,
    chapter_id: &'a ChapterId,
    topic_ids: &'a [TopicId],
    question_count: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsPayload {
    List(Vec<QuestionRecord>),
    Wrapped { questions: Vec<QuestionRecord> },
}

/// Query parameters for the scoped listing endpoint.
fn scope_query(variant: &TestVariant) -> Vec<(&'static str, String)> {
    match variant {
        TestVariant::FullPortion => vec![("scope", "full".into())],
        TestVariant::ByPortion { portion } => {
            vec![("scope", "portion".into()), ("portionId", portion.to_string())]
        }
        TestVariant::BySubject { portion, subject } => vec![
            ("scope", "subject".into()),
            ("portionId", portion.to_string()),
            ("subjectId", subject.to_string()),
        ],
        TestVariant::ByChapter {
            portion,
            subject,
            chapter,
        }
        | TestVariant::ByTopics {
            portion,
            subject,
            chapter,
            ..
        } => vec![
            ("scope", "chapter".into()),
            ("portionId", portion.to_string()),
            ("subjectId", subject.to_string()),
            ("chapterId", chapter.to_string()),
        ],
    }
}

impl HttpCatalog {
    async fn request(&self, variant: &TestVariant) -> Result<Vec<QuestionRecord>, ApiError> {
        let request = match variant {
            TestVariant::ByTopics {
                portion,
                subject,
                chapter,
                topics,
                question_count,
            } => self
                .client
                .post(format!("{}/api/questions/custom", self.base_url))
                .json(&CustomTestRequest {
                    portion_id: portion,
                    subject_id: subject,
                    chapter_id: chapter,
                    topic_ids: topics,
                    question_count: *question_count,
                }),
            _ => self
                .client
                .get(format!("{}/api/questions", self.base_url))
                .query(&scope_query(variant)),
        };

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        let response = check_status(response).await?;

        let payload: QuestionsPayload = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("failed to parse questions: {e}")))?;

        Ok(match payload {
            QuestionsPayload::List(records) | QuestionsPayload::Wrapped { questions: records } => {
                records
            }
        })
    }
}

#[async_trait]
impl QuestionCatalog for HttpCatalog {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch(&self, variant: &TestVariant) -> Result<Vec<QuestionRecord>, CatalogError> {
        match self.request(variant).await {
            Ok(records) => {
                tracing::debug!(count = records.len(), "fetched questions");
                Ok(records)
            }
            Err(e) => {
                tracing::error!("question fetch failed: {e}");
                Err(e.into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Result sink
// ---------------------------------------------------------------------------

/// Result submission to the neetprep API.
pub struct HttpResultSink {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpResultSink {
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> Result<Self> {
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }

    async fn post(&self, record: &ResultRecord, credential: &Credential) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/api/results", self.base_url))
            .bearer_auth(credential.token())
            .json(record)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, record, credential), fields(attempt = %record.id))]
    async fn submit(&self, record: &ResultRecord, credential: &Credential) -> Result<(), SubmitError> {
        self.post(record, credential).await.map_err(|e| {
            tracing::error!("result upload failed: {e}");
            SubmitError::from(e)
        })
    }
}
