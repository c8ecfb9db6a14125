//! Question bank and answer sheet parser.
//!
//! Banks are TOML (`[bank]` header plus `[[questions]]`) or JSON (an array of
//! camelCase question records). Answer sheets are TOML with an `[answers]`
//! table.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ids::{ChapterId, PortionId, QuestionId, QuestionTypeId, SubjectId, TopicId};
use crate::model::{OptionLabel, QuestionBank, QuestionRecord};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: QuestionId,
    question: String,
    #[serde(default)]
    image: Option<String>,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    #[serde(default)]
    correct_option: Option<String>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    hint_image: Option<String>,
    question_type_id: QuestionTypeId,
    subject_id: SubjectId,
    chapter_id: ChapterId,
    #[serde(default)]
    portion_id: Option<PortionId>,
    #[serde(default)]
    topic_id: Option<TopicId>,
}

impl From<TomlQuestion> for QuestionRecord {
    fn from(q: TomlQuestion) -> Self {
        QuestionRecord {
            id: q.id,
            question: q.question,
            image: q.image,
            option_a: q.option_a,
            option_b: q.option_b,
            option_c: q.option_c,
            option_d: q.option_d,
            correct_option: q.correct_option,
            hint: q.hint,
            hint_image: q.hint_image,
            question_type_id: q.question_type_id,
            subject_id: q.subject_id,
            chapter_id: q.chapter_id,
            portion_id: q.portion_id,
            topic_id: q.topic_id,
        }
    }
}

/// JSON banks are either a bare record array or an object with `questions`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonBankFile {
    Records(Vec<QuestionRecord>),
    Bank {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: String,
        questions: Vec<QuestionRecord>,
    },
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn is_bank_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml" || ext == "json")
}

/// Parse a single bank file (`.toml` or `.json`).
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse bank content; the format follows the extension of `source_path`.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    if is_json(source_path) {
        return parse_json_bank(content, source_path);
    }

    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        questions: parsed.questions.into_iter().map(Into::into).collect(),
    })
}

fn parse_json_bank(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: JsonBankFile = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?;

    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bank".to_string());

    Ok(match parsed {
        JsonBankFile::Records(questions) => QuestionBank {
            id: stem.clone(),
            name: stem,
            description: String::new(),
            questions,
        },
        JsonBankFile::Bank {
            id,
            name,
            description,
            questions,
        } => {
            let id = id.unwrap_or(stem);
            QuestionBank {
                name: name.unwrap_or_else(|| id.clone()),
                id,
                description,
                questions,
            }
        }
    })
}

/// Recursively load all bank files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if is_bank_file(&path) {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load one bank file, or every bank under a directory merged into one.
pub fn load_questions(path: &Path) -> Result<Vec<QuestionRecord>> {
    if path.is_dir() {
        let banks = load_bank_directory(path)?;
        Ok(banks.into_iter().flat_map(|b| b.questions).collect())
    } else {
        Ok(parse_bank(path)?.questions)
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<QuestionId>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for common authoring issues.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let warn = |id: &QuestionId, message: String| ValidationWarning {
        question_id: Some(id.clone()),
        message,
    };

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    let mut seen_ids = std::collections::HashSet::new();
    for q in &bank.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(warn(&q.id, format!("duplicate question ID: {}", q.id)));
        }
    }

    for q in &bank.questions {
        match q.correct_option.as_deref() {
            None => warnings.push(warn(&q.id, "correct_option is missing".into())),
            Some(raw) if raw.parse::<OptionLabel>().is_err() => {
                warnings.push(warn(&q.id, format!("correct_option `{raw}` is not one of A-D")))
            }
            Some(_) => {}
        }
    }

    for q in &bank.questions {
        if q.question.trim().is_empty() {
            warnings.push(warn(&q.id, "question text is empty".into()));
        }
        let options = [&q.option_a, &q.option_b, &q.option_c, &q.option_d];
        for (label, text) in OptionLabel::ALL.iter().zip(options) {
            if text.trim().is_empty() {
                warnings.push(warn(&q.id, format!("option {label} is empty")));
            }
        }
    }

    warnings
}

/// Learner answers for offline scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    pub answers: HashMap<QuestionId, OptionLabel>,
    /// Time spent, when known.
    pub elapsed_secs: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlAnswerSheet {
    #[serde(default)]
    elapsed_secs: Option<u32>,
    #[serde(default)]
    answers: HashMap<String, String>,
}

/// Parse an answer sheet file.
pub fn parse_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;

    parse_answer_sheet_str(&content, path)
}

/// Parse answer sheet TOML. Every label must be one of A-D.
pub fn parse_answer_sheet_str(content: &str, source_path: &Path) -> Result<AnswerSheet> {
    let parsed: TomlAnswerSheet = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let answers = parsed
        .answers
        .into_iter()
        .map(|(id, raw)| {
            let label = raw
                .parse::<OptionLabel>()
                .map_err(|e| anyhow::anyhow!("answer for question {id}: {e}"))?;
            Ok((QuestionId::new(id.trim()), label))
        })
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(AnswerSheet {
        answers,
        elapsed_secs: parsed.elapsed_secs,
    })
}
