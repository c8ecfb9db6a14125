//! Normalization of catalog output into session questions.

use std::collections::HashSet;

use crate::model::{Hint, OptionLabel, Question, QuestionRecord};

/// Convert raw records into questions, dropping repeated ids.
///
/// The first occurrence of an id wins and the original order is kept.
pub fn normalize(records: Vec<QuestionRecord>) -> Vec<Question> {
    let total = records.len();
    let questions = dedup_by_id(records.into_iter().map(into_question).collect());
    if questions.len() < total {
        tracing::warn!(
            "dropped {} duplicate question(s) from catalog output",
            total - questions.len()
        );
    }
    questions
}

/// Remove questions whose id was already seen. Applying it twice is a no-op.
pub fn dedup_by_id(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::with_capacity(questions.len());
    questions
        .into_iter()
        .filter(|q| seen.insert(q.id.clone()))
        .collect()
}

/// Convert a single record. An unrecognised answer key becomes `None`.
pub fn into_question(record: QuestionRecord) -> Question {
    let correct_option = record
        .correct_option
        .as_deref()
        .and_then(|raw| raw.parse::<OptionLabel>().ok());
    if correct_option.is_none() {
        tracing::warn!(
            "question {} has no valid answer key ({:?}); it cannot be scored as correct",
            record.id,
            record.correct_option
        );
    }

    let hint = non_empty(record.hint).map(|text| Hint {
        text,
        image: non_empty(record.hint_image),
    });

    Question {
        id: record.id,
        body: record.question.trim().to_string(),
        image: non_empty(record.image),
        options: [
            record.option_a.trim().to_string(),
            record.option_b.trim().to_string(),
            record.option_c.trim().to_string(),
            record.option_d.trim().to_string(),
        ],
        correct_option,
        hint,
        question_type_id: record.question_type_id,
        subject_id: record.subject_id,
        chapter_id: record.chapter_id,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
