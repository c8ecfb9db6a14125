//! File-backed adapters: question banks on disk, results as JSON files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::instrument;

use neetprep_core::error::{CatalogError, SubmitError};
use neetprep_core::ids::PortionId;
use neetprep_core::model::{QuestionRecord, TestVariant};
use neetprep_core::parser::load_questions;
use neetprep_core::report::ResultRecord;
use neetprep_core::traits::{Credential, QuestionCatalog, ResultSink};

/// Serves questions from a bank file or a directory of banks.
pub struct FileCatalog {
    source: PathBuf,
    records: Vec<QuestionRecord>,
}

impl FileCatalog {
    /// Load every question under `path` (file or directory).
    pub fn open(path: &Path) -> Result<Self> {
        let records = load_questions(path)?;
        tracing::debug!(path = %path.display(), count = records.len(), "loaded question bank");
        Ok(Self {
            source: path.to_path_buf(),
            records,
        })
    }

    pub fn from_records(records: Vec<QuestionRecord>) -> Self {
        Self {
            source: PathBuf::from("<memory>"),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Whether `record` belongs to `variant`.
///
/// A record without a portion id is taken to belong to every portion; a
/// custom topic test only takes records tagged with one of its topics.
pub fn matches_variant(record: &QuestionRecord, variant: &TestVariant) -> bool {
    let in_portion = |portion: &PortionId| record.portion_id.as_ref().map_or(true, |p| p == portion);
    match variant {
        TestVariant::FullPortion => true,
        TestVariant::ByPortion { portion } => in_portion(portion),
        TestVariant::BySubject { portion, subject } => {
            in_portion(portion) && &record.subject_id == subject
        }
        TestVariant::ByChapter {
            portion,
            subject,
            chapter,
        } => in_portion(portion) && &record.subject_id == subject && &record.chapter_id == chapter,
        TestVariant::ByTopics {
            portion,
            subject,
            chapter,
            topics,
            ..
        } => {
            in_portion(portion)
                && &record.subject_id == subject
                && &record.chapter_id == chapter
                && record.topic_id.as_ref().is_some_and(|t| topics.contains(t))
        }
    }
}

#[async_trait]
impl QuestionCatalog for FileCatalog {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self), fields(source = %self.source.display()))]
    async fn fetch(&self, variant: &TestVariant) -> Result<Vec<QuestionRecord>, CatalogError> {
        let matching = self
            .records
            .iter()
            .filter(|r| matches_variant(r, variant))
            .cloned();
        let records: Vec<QuestionRecord> = match variant {
            TestVariant::ByTopics { question_count, .. } => {
                matching.take(*question_count as usize).collect()
            }
            _ => matching.collect(),
        };
        tracing::debug!(count = records.len(), "selected questions from bank");
        Ok(records)
    }
}

/// Writes each result as `result-<timestamp>-<id>.json` into a directory.
pub struct FileResultSink {
    dir: PathBuf,
}

impl FileResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a record is written to.
    pub fn path_for(&self, record: &ResultRecord) -> PathBuf {
        self.dir.join(format!(
            "result-{}-{}.json",
            record.completed_at.format("%Y%m%d-%H%M%S"),
            record.id
        ))
    }
}

#[async_trait]
impl ResultSink for FileResultSink {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self, record, _credential), fields(attempt = %record.id))]
    async fn submit(&self, record: &ResultRecord, _credential: &Credential) -> Result<(), SubmitError> {
        let path = self.path_for(record);
        record
            .save_json(&path)
            .map_err(|e| SubmitError::Storage(format!("{e:#}")))?;
        tracing::info!(path = %path.display(), "result written");
        Ok(())
    }
}
