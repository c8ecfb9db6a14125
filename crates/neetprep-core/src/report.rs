//! The result record of one attempt, with JSON persistence.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{ChapterId, QuestionTypeId};
use crate::model::TestVariant;
use crate::scoring::{ChapterBreakdown, ScoreSheet, TypeBreakdown};

/// Everything the submission adapter receives for one finished attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Attempt identifier.
    pub id: Uuid,
    pub user_id: String,
    pub variant: TestVariant,
    pub score: i64,
    pub total_marks: i64,
    pub total_questions: u32,
    pub answered: u32,
    pub correct: u32,
    pub wrong: u32,
    pub unanswered: u32,
    /// Percentage of attempted questions answered correctly.
    pub accuracy: u32,
    /// Elapsed time as `M:SS`.
    pub total_time_taken: String,
    pub elapsed_secs: u32,
    pub total_time_secs: u32,
    pub results_by_type: BTreeMap<QuestionTypeId, TypeBreakdown>,
    pub results_by_chapter: BTreeMap<ChapterId, ChapterBreakdown>,
    /// When the attempt left the active phase.
    pub completed_at: DateTime<Utc>,
}

/// Time bookkeeping captured at the moment an attempt is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTiming {
    pub total_secs: u32,
    pub time_left_secs: u32,
}

impl AttemptTiming {
    pub fn elapsed_secs(&self) -> u32 {
        self.total_secs.saturating_sub(self.time_left_secs)
    }
}

impl ResultRecord {
    /// Assemble a record from a score sheet.
    pub fn new(
        id: Uuid,
        user_id: impl Into<String>,
        variant: TestVariant,
        sheet: ScoreSheet,
        timing: AttemptTiming,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let elapsed_secs = timing.elapsed_secs();
        Self {
            id,
            user_id: user_id.into(),
            variant,
            score: sheet.score,
            total_marks: sheet.total_marks,
            total_questions: sheet.total_questions,
            answered: sheet.answered,
            correct: sheet.correct,
            wrong: sheet.wrong,
            unanswered: sheet.unanswered,
            accuracy: sheet.accuracy,
            total_time_taken: format_clock(elapsed_secs),
            elapsed_secs,
            total_time_secs: timing.total_secs,
            results_by_type: sheet.by_type,
            results_by_chapter: sheet.by_chapter,
            completed_at,
        }
    }

    /// Save the record as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let record: ResultRecord =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(record)
    }
}

/// Format seconds as `M:SS`, minutes unpadded.
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
