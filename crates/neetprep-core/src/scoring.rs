//! Scoring and analytics for a finished attempt.
//!
//! Everything here is a pure function of the questions and the answer map:
//! no clock, no randomness, ordered maps only, so the same inputs always
//! produce the same sheet.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::ids::{ChapterId, QuestionId, QuestionTypeId, SubjectId};
use crate::model::{OptionLabel, Question};

/// Marks awarded per outcome. Negative marking is uniform across question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkingScheme {
    /// Marks for a correct answer.
    pub correct: i32,
    /// Marks for a wrong answer (normally negative).
    pub wrong: i32,
}

impl Default for MarkingScheme {
    fn default() -> Self {
        Self {
            correct: 4,
            wrong: -1,
        }
    }
}

/// Outcome of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
    Unanswered,
}

impl Outcome {
    /// Classify an answer. A question without a valid key is wrong for any answer.
    pub fn of(question: &Question, answer: Option<OptionLabel>) -> Self {
        match answer {
            None => Outcome::Unanswered,
            Some(label) if question.is_correct(label) => Outcome::Correct,
            Some(_) => Outcome::Wrong,
        }
    }

    /// Marks for this outcome under `scheme`.
    pub fn points(self, scheme: &MarkingScheme) -> i64 {
        match self {
            Outcome::Correct => i64::from(scheme.correct),
            Outcome::Wrong => i64::from(scheme.wrong),
            Outcome::Unanswered => 0,
        }
    }
}

/// Attempted / correct / wrong counters for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub attempted: u32,
    pub correct: u32,
    pub wrong: u32,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Correct => {
                self.attempted += 1;
                self.correct += 1;
            }
            Outcome::Wrong => {
                self.attempted += 1;
                self.wrong += 1;
            }
            Outcome::Unanswered => {}
        }
    }
}

/// Breakdown for one question type, split further by subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    #[serde(flatten)]
    pub tally: Tally,
    pub subjects: BTreeMap<SubjectId, Tally>,
}

/// Breakdown for one chapter, tagged with its subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterBreakdown {
    pub subject_id: SubjectId,
    #[serde(flatten)]
    pub tally: Tally,
}

/// Scores and breakdowns of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub score: i64,
    pub total_marks: i64,
    pub total_questions: u32,
    pub answered: u32,
    pub correct: u32,
    pub wrong: u32,
    pub unanswered: u32,
    /// Percentage of attempted questions answered correctly, rounded.
    pub accuracy: u32,
    pub by_type: BTreeMap<QuestionTypeId, TypeBreakdown>,
    pub by_chapter: BTreeMap<ChapterId, ChapterBreakdown>,
}

/// Score an attempt.
///
/// Answers for ids that are not among `questions` are ignored, so
/// `answered + unanswered` always equals the number of questions.
pub fn score_attempt(
    questions: &[Question],
    answers: &HashMap<QuestionId, OptionLabel>,
    scheme: &MarkingScheme,
) -> ScoreSheet {
    let mut score = 0i64;
    let mut totals = Tally::default();
    let mut by_type: BTreeMap<QuestionTypeId, TypeBreakdown> = BTreeMap::new();
    let mut by_chapter: BTreeMap<ChapterId, ChapterBreakdown> = BTreeMap::new();

    for question in questions {
        let outcome = Outcome::of(question, answers.get(&question.id).copied());
        score += outcome.points(scheme);
        totals.record(outcome);

        if outcome == Outcome::Unanswered {
            continue;
        }

        let type_entry = by_type
            .entry(question.question_type_id.clone())
            .or_default();
        type_entry.tally.record(outcome);
        type_entry
            .subjects
            .entry(question.subject_id.clone())
            .or_default()
            .record(outcome);

        by_chapter
            .entry(question.chapter_id.clone())
            .or_insert_with(|| ChapterBreakdown {
                subject_id: question.subject_id.clone(),
                tally: Tally::default(),
            })
            .tally
            .record(outcome);
    }

    let total_questions = count_u32(questions.len());
    let total_marks = i64::from(total_questions) * i64::from(scheme.correct);

    ScoreSheet {
        score,
        total_marks,
        total_questions,
        answered: totals.attempted,
        correct: totals.correct,
        wrong: totals.wrong,
        unanswered: total_questions - totals.attempted,
        accuracy: accuracy_percent(totals.correct, totals.attempted),
        by_type,
        by_chapter,
    }
}

/// `round(100 * correct / answered)`, rounding halves up; 0 when nothing was answered.
pub fn accuracy_percent(correct: u32, answered: u32) -> u32 {
    if answered == 0 {
        return 0;
    }
    let (c, a) = (u64::from(correct), u64::from(answered));
    ((200 * c + a) / (2 * a)) as u32
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: Option<OptionLabel>, qtype: &str, subject: &str, chapter: &str) -> Question {
        Question {
            id: id.into(),
            body: format!("body {id}"),
            image: None,
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: correct,
            hint: None,
            question_type_id: qtype.into(),
            subject_id: subject.into(),
            chapter_id: chapter.into(),
        }
    }

    fn answers(pairs: &[(&str, OptionLabel)]) -> HashMap<QuestionId, OptionLabel> {
        pairs.iter().map(|(id, l)| (QuestionId::from(*id), *l)).collect()
    }

    #[test]
    fn three_question_mixed_attempt() {
        let questions = vec![
            question("q1", Some(OptionLabel::A), "mcq", "phy", "units"),
            question("q2", Some(OptionLabel::C), "mcq", "phy", "units"),
            question("q3", Some(OptionLabel::B), "mcq", "phy", "units"),
        ];
        let sheet = score_attempt(
            &questions,
            &answers(&[("q1", OptionLabel::A), ("q2", OptionLabel::B)]),
            &MarkingScheme::default(),
        );

        assert_eq!(sheet.score, 3);
        assert_eq!(sheet.answered, 2);
        assert_eq!(sheet.correct, 1);
        assert_eq!(sheet.wrong, 1);
        assert_eq!(sheet.unanswered, 1);
        assert_eq!(sheet.accuracy, 50);
        assert_eq!(sheet.total_marks, 12);
    }

    #[test]
    fn score_can_go_negative() {
        let questions = vec![
            question("q1", Some(OptionLabel::A), "mcq", "chem", "mole"),
            question("q2", Some(OptionLabel::A), "mcq", "chem", "mole"),
        ];
        let sheet = score_attempt(
            &questions,
            &answers(&[("q1", OptionLabel::D), ("q2", OptionLabel::C)]),
            &MarkingScheme::default(),
        );
        assert_eq!(sheet.score, -2);
        assert_eq!(sheet.accuracy, 0);
    }

    #[test]
    fn accuracy_uses_attempted_denominator() {
        let mut questions = Vec::new();
        for i in 0..40 {
            questions.push(question(&format!("q{i}"), Some(OptionLabel::B), "mcq", "bio", "cell"));
        }
        let picked: Vec<(String, OptionLabel)> =
            (0..5).map(|i| (format!("q{i}"), OptionLabel::B)).collect();
        let map: HashMap<QuestionId, OptionLabel> =
            picked.iter().map(|(id, l)| (QuestionId::from(id.as_str()), *l)).collect();

        let sheet = score_attempt(&questions, &map, &MarkingScheme::default());
        assert_eq!(sheet.accuracy, 100);
        assert_eq!(sheet.unanswered, 35);
        assert_eq!(sheet.answered + sheet.unanswered, 40);
    }

    #[test]
    fn accuracy_rounds_half_up() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(1, 2), 50);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(accuracy_percent(1, 8), 13);
        assert_eq!(accuracy_percent(7, 7), 100);
    }

    #[test]
    fn missing_answer_key_is_always_wrong() {
        let questions = vec![question("q1", None, "mcq", "phy", "optics")];
        for label in OptionLabel::ALL {
            let sheet = score_attempt(&questions, &answers(&[("q1", label)]), &MarkingScheme::default());
            assert_eq!(sheet.score, -1);
            assert_eq!(sheet.wrong, 1);
        }
    }

    #[test]
    fn breakdowns_skip_unattempted_groups() {
        let questions = vec![
            question("q1", Some(OptionLabel::A), "mcq", "phy", "units"),
            question("q2", Some(OptionLabel::A), "assertion", "chem", "mole"),
            question("q3", Some(OptionLabel::A), "mcq", "bio", "cell"),
            question("q4", Some(OptionLabel::A), "mcq", "phy", "optics"),
        ];
        let sheet = score_attempt(
            &questions,
            &answers(&[
                ("q1", OptionLabel::A),
                ("q3", OptionLabel::C),
                ("q4", OptionLabel::A),
            ]),
            &MarkingScheme::default(),
        );

        assert!(!sheet.by_type.contains_key(&QuestionTypeId::from("assertion")));
        let mcq = &sheet.by_type[&QuestionTypeId::from("mcq")];
        assert_eq!(
            mcq.tally,
            Tally {
                attempted: 3,
                correct: 2,
                wrong: 1
            }
        );
        assert_eq!(
            mcq.subjects[&SubjectId::from("phy")],
            Tally {
                attempted: 2,
                correct: 2,
                wrong: 0
            }
        );
        assert_eq!(mcq.subjects[&SubjectId::from("bio")].wrong, 1);
        assert!(!mcq.subjects.contains_key(&SubjectId::from("chem")));

        assert_eq!(sheet.by_chapter.len(), 3);
        assert!(!sheet.by_chapter.contains_key(&ChapterId::from("mole")));
        let cell = &sheet.by_chapter[&ChapterId::from("cell")];
        assert_eq!(cell.subject_id, SubjectId::from("bio"));
        assert_eq!(cell.tally.wrong, 1);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![
            question("q1", Some(OptionLabel::A), "t1", "s1", "c1"),
            question("q2", Some(OptionLabel::B), "t2", "s2", "c2"),
            question("q3", Some(OptionLabel::C), "t1", "s2", "c3"),
        ];
        let map = answers(&[("q1", OptionLabel::A), ("q2", OptionLabel::D), ("q3", OptionLabel::C)]);
        let first = score_attempt(&questions, &map, &MarkingScheme::default());
        for _ in 0..10 {
            let again = score_attempt(&questions, &map, &MarkingScheme::default());
            assert_eq!(first, again);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&again).unwrap()
            );
        }
    }

    #[test]
    fn answers_for_unknown_ids_are_ignored() {
        let questions = vec![question("q1", Some(OptionLabel::A), "t", "s", "c")];
        let sheet = score_attempt(
            &questions,
            &answers(&[("q1", OptionLabel::A), ("ghost", OptionLabel::B)]),
            &MarkingScheme::default(),
        );
        assert_eq!(sheet.answered, 1);
        assert_eq!(sheet.unanswered, 0);
        assert_eq!(sheet.score, 4);
    }

    #[test]
    fn custom_marking_scheme() {
        let questions = vec![
            question("q1", Some(OptionLabel::A), "t", "s", "c"),
            question("q2", Some(OptionLabel::A), "t", "s", "c"),
        ];
        let scheme = MarkingScheme { correct: 3, wrong: 0 };
        let sheet = score_attempt(
            &questions,
            &answers(&[("q1", OptionLabel::A), ("q2", OptionLabel::B)]),
            &scheme,
        );
        assert_eq!(sheet.score, 3);
        assert_eq!(sheet.total_marks, 6);
    }
}
