//! Core data model types for neetprep.
//!
//! Questions as the engine sees them, the wire records the catalog hands
//! back, and the test-variant descriptors that decide which questions make
//! up one attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VariantError;
use crate::ids::{ChapterId, PortionId, QuestionId, QuestionTypeId, SubjectId, TopicId};

/// One of the four option positions of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    /// All labels in display order.
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    /// Zero-based position of this label.
    pub fn index(self) -> usize {
        match self {
            OptionLabel::A => 0,
            OptionLabel::B => 1,
            OptionLabel::C => 2,
            OptionLabel::D => 3,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionLabel::A => write!(f, "A"),
            OptionLabel::B => write!(f, "B"),
            OptionLabel::C => write!(f, "C"),
            OptionLabel::D => write!(f, "D"),
        }
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    /// Accepts `A`, `b`, `optionC`, `option_d` and `Option A`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let letter = lowered
            .strip_prefix("option")
            .map(|rest| rest.trim_start_matches(['_', ' ', '-']))
            .unwrap_or(lowered.as_str());
        match letter {
            "a" => Ok(OptionLabel::A),
            "b" => Ok(OptionLabel::B),
            "c" => Ok(OptionLabel::C),
            "d" => Ok(OptionLabel::D),
            _ => Err(format!("unknown option label: {s}")),
        }
    }
}

/// Hint attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A normalized question, immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    /// Question body (rich text / HTML).
    pub body: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Option texts, indexed by [`OptionLabel::index`].
    pub options: [String; 4],
    /// `None` when the source carried a missing or unrecognised label.
    pub correct_option: Option<OptionLabel>,
    #[serde(default)]
    pub hint: Option<Hint>,
    pub question_type_id: QuestionTypeId,
    pub subject_id: SubjectId,
    pub chapter_id: ChapterId,
}

impl Question {
    /// Text of the option at `label`.
    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }

    /// Whether `label` is the correct answer. Always false without a valid key.
    pub fn is_correct(&self, label: OptionLabel) -> bool {
        self.correct_option == Some(label)
    }
}

/// A question record as delivered by a catalog source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: QuestionId,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub option_a: String,
    #[serde(default)]
    pub option_b: String,
    #[serde(default)]
    pub option_c: String,
    #[serde(default)]
    pub option_d: String,
    #[serde(default)]
    pub correct_option: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub hint_image: Option<String>,
    pub question_type_id: QuestionTypeId,
    pub subject_id: SubjectId,
    pub chapter_id: ChapterId,
    /// Only used by file-backed catalogs for filtering.
    #[serde(default)]
    pub portion_id: Option<PortionId>,
    /// Only used by file-backed catalogs for filtering.
    #[serde(default)]
    pub topic_id: Option<TopicId>,
}

/// How the question set of one attempt is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestVariant {
    FullPortion,
    ByPortion {
        portion: PortionId,
    },
    BySubject {
        portion: PortionId,
        subject: SubjectId,
    },
    ByChapter {
        portion: PortionId,
        subject: SubjectId,
        chapter: ChapterId,
    },
    ByTopics {
        portion: PortionId,
        subject: SubjectId,
        chapter: ChapterId,
        topics: Vec<TopicId>,
        question_count: u32,
    },
}

impl TestVariant {
    /// The selector kind this variant was built from.
    pub fn kind(&self) -> VariantKind {
        match self {
            TestVariant::FullPortion => VariantKind::FullPortion,
            TestVariant::ByPortion { .. } => VariantKind::Portion,
            TestVariant::BySubject { .. } => VariantKind::Subject,
            TestVariant::ByChapter { .. } => VariantKind::Chapter,
            TestVariant::ByTopics { .. } => VariantKind::Topics,
        }
    }

    /// Full mock tests open on an instructions screen; practice sets do not.
    pub fn shows_instructions(&self) -> bool {
        matches!(self, TestVariant::FullPortion | TestVariant::ByPortion { .. })
    }
}

impl fmt::Display for TestVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestVariant::FullPortion => write!(f, "full portion"),
            TestVariant::ByPortion { portion } => write!(f, "portion {portion}"),
            TestVariant::BySubject { portion, subject } => {
                write!(f, "portion {portion} / subject {subject}")
            }
            TestVariant::ByChapter {
                portion,
                subject,
                chapter,
            } => write!(f, "portion {portion} / subject {subject} / chapter {chapter}"),
            TestVariant::ByTopics {
                chapter,
                topics,
                question_count,
                ..
            } => write!(
                f,
                "chapter {chapter} / {} topic(s) / {question_count} question(s)",
                topics.len()
            ),
        }
    }
}

/// Selector kinds, as chosen on a selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    #[serde(rename = "full")]
    FullPortion,
    Portion,
    Subject,
    Chapter,
    Topics,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::FullPortion => write!(f, "full"),
            VariantKind::Portion => write!(f, "portion"),
            VariantKind::Subject => write!(f, "subject"),
            VariantKind::Chapter => write!(f, "chapter"),
            VariantKind::Topics => write!(f, "topics"),
        }
    }
}

impl FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "full_portion" | "full-portion" => Ok(VariantKind::FullPortion),
            "portion" => Ok(VariantKind::Portion),
            "subject" => Ok(VariantKind::Subject),
            "chapter" => Ok(VariantKind::Chapter),
            "topics" | "topic" | "custom" => Ok(VariantKind::Topics),
            other => Err(format!("unknown test variant: {other}")),
        }
    }
}

/// Loosely-typed selection handed over by the host.
///
/// Every field is optional here; [`VariantSelector::resolve`] checks that the
/// fields the chosen kind needs are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSelector {
    pub kind: Option<VariantKind>,
    #[serde(default)]
    pub portion: Option<PortionId>,
    #[serde(default)]
    pub subject: Option<SubjectId>,
    #[serde(default)]
    pub chapter: Option<ChapterId>,
    #[serde(default)]
    pub topics: Vec<TopicId>,
    #[serde(default)]
    pub question_count: Option<u32>,
}

impl VariantSelector {
    pub fn new(kind: VariantKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn portion(mut self, portion: impl Into<PortionId>) -> Self {
        self.portion = Some(portion.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<SubjectId>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn chapter(mut self, chapter: impl Into<ChapterId>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }

    pub fn topics<I, T>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TopicId>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn question_count(mut self, count: u32) -> Self {
        self.question_count = Some(count);
        self
    }

    /// Turn the selection into a concrete variant.
    ///
    /// # Errors
    ///
    /// Returns [`VariantError`] when the kind is missing or a field required
    /// by the kind is absent or blank.
    pub fn resolve(&self) -> Result<TestVariant, VariantError> {
        let kind = self.kind.ok_or(VariantError::MissingKind)?;
        let need = |field: &'static str| VariantError::MissingField { kind, field };
        let portion = || required(&self.portion, PortionId::as_str).ok_or_else(|| need("portion"));
        let subject = || required(&self.subject, SubjectId::as_str).ok_or_else(|| need("subject"));
        let chapter = || required(&self.chapter, ChapterId::as_str).ok_or_else(|| need("chapter"));

        match kind {
            VariantKind::FullPortion => Ok(TestVariant::FullPortion),
            VariantKind::Portion => Ok(TestVariant::ByPortion { portion: portion()? }),
            VariantKind::Subject => Ok(TestVariant::BySubject {
                portion: portion()?,
                subject: subject()?,
            }),
            VariantKind::Chapter => Ok(TestVariant::ByChapter {
                portion: portion()?,
                subject: subject()?,
                chapter: chapter()?,
            }),
            VariantKind::Topics => {
                let portion = portion()?;
                let subject = subject()?;
                let chapter = chapter()?;
                let topics: Vec<TopicId> = self
                    .topics
                    .iter()
                    .map(|t| t.as_str().trim())
                    .filter(|t| !t.is_empty())
                    .map(TopicId::from)
                    .collect();
                if topics.is_empty() {
                    return Err(need("topics"));
                }
                let question_count = match self.question_count {
                    Some(0) => return Err(VariantError::ZeroQuestionCount),
                    Some(n) => n,
                    None => return Err(need("question_count")),
                };
                Ok(TestVariant::ByTopics {
                    portion,
                    subject,
                    chapter,
                    topics,
                    question_count,
                })
            }
        }
    }
}

/// A selector field counts as present only when it holds non-blank text.
fn required<T: From<String>>(value: &Option<T>, text: fn(&T) -> &str) -> Option<T> {
    let trimmed = text(value.as_ref()?).trim();
    (!trimmed.is_empty()).then(|| T::from(trimmed.to_string()))
}

/// A named collection of question records loaded from a bank file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<QuestionRecord>,
}
