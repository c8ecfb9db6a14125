//! In-memory state of one test attempt.
//!
//! `TestSession` is a plain synchronous state machine: the phase, the clock
//! value, the answer sheet and the navigation cursor. It knows nothing about
//! tasks or IO; the engine wraps it in a mutex and drives it from the host and
//! from the countdown task.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NavigationError, SessionError, SubmitError};
use crate::ids::QuestionId;
use crate::model::{OptionLabel, Question, TestVariant};
use crate::report::AttemptTiming;

/// Lifecycle phase of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Instructions,
    Active,
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Instructions => write!(f, "instructions"),
            Phase::Active => write!(f, "active"),
            Phase::Results => write!(f, "results"),
        }
    }
}

/// Progress of the single allowed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Not submitted yet; answers can still change.
    Idle,
    /// Scored and handed to the sink, waiting for the acknowledgement.
    InFlight,
    /// The sink refused; the scored record can be resent.
    Failed(String),
    /// Acknowledged. The phase is `Results`.
    Done,
}

/// Palette status of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionStatus {
    NotVisited,
    Visited,
    Answered,
    Marked,
    AnsweredAndMarked,
}

/// Counts per palette status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteSummary {
    pub not_visited: usize,
    pub visited: usize,
    pub answered: usize,
    pub marked: usize,
    pub answered_and_marked: usize,
}

/// What a countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second consumed; this many remain.
    Running(u32),
    /// The clock hit zero. The caller must trigger submission.
    Expired,
    /// The clock is not running (not active, or submission started).
    Stopped,
}

/// State of one attempt.
#[derive(Debug, Clone)]
pub struct TestSession {
    id: Uuid,
    variant: TestVariant,
    questions: Vec<Question>,
    index_of: HashMap<QuestionId, usize>,
    position: usize,
    answers: HashMap<QuestionId, OptionLabel>,
    visited: HashSet<QuestionId>,
    marked: HashSet<QuestionId>,
    phase: Phase,
    seconds_per_question: u32,
    total_time_secs: u32,
    time_left_secs: u32,
    elapsed_at_submit: Option<u32>,
    submission: Submission,
}

impl TestSession {
    /// Create a session over already-normalized questions.
    ///
    /// Returns `None` for an empty question list. With `show_instructions`
    /// the session waits in `Instructions` for [`TestSession::begin`];
    /// otherwise it starts `Active` with the clock set.
    pub fn new(
        id: Uuid,
        variant: TestVariant,
        questions: Vec<Question>,
        seconds_per_question: u32,
        show_instructions: bool,
    ) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        let index_of = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();

        let mut session = Self {
            id,
            variant,
            questions,
            index_of,
            position: 0,
            answers: HashMap::new(),
            visited: HashSet::new(),
            marked: HashSet::new(),
            phase: Phase::Instructions,
            seconds_per_question,
            total_time_secs: 0,
            time_left_secs: 0,
            elapsed_at_submit: None,
            submission: Submission::Idle,
        };
        if !show_instructions {
            session.activate();
        }
        Some(session)
    }

    // -- phase machine ------------------------------------------------------

    /// Acknowledge the instructions and start the clock.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Instructions {
            return Err(SessionError::InvalidTransition {
                from: self.phase,
                to: Phase::Active,
            });
        }
        self.activate();
        Ok(())
    }

    fn activate(&mut self) {
        let count = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        self.total_time_secs = count.saturating_mul(self.seconds_per_question);
        self.time_left_secs = self.total_time_secs;
        self.phase = Phase::Active;
        self.visited.insert(self.questions[self.position].id.clone());
        tracing::info!(
            attempt = %self.id,
            questions = self.questions.len(),
            total_secs = self.total_time_secs,
            "test started"
        );
    }

    /// Consume one second of the clock.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Active || self.submission != Submission::Idle {
            return TickOutcome::Stopped;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        if self.time_left_secs == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.time_left_secs)
        }
    }

    /// Claim the single submission slot and freeze the answer sheet.
    ///
    /// Only the first caller succeeds; it captures the elapsed time and must
    /// later report back through [`TestSession::finish_submission`].
    pub fn begin_submission(&mut self) -> Result<AttemptTiming, SessionError> {
        match (&self.phase, &self.submission) {
            (Phase::Results, _) | (_, Submission::Done) => return Err(SessionError::AlreadySubmitted),
            (_, Submission::InFlight) | (_, Submission::Failed(_)) => {
                return Err(SessionError::AlreadySubmitting)
            }
            (Phase::Instructions, Submission::Idle) => {
                return Err(SessionError::InvalidTransition {
                    from: Phase::Instructions,
                    to: Phase::Results,
                })
            }
            (Phase::Active, Submission::Idle) => {}
        }

        self.submission = Submission::InFlight;
        let timing = self.timing();
        self.elapsed_at_submit = Some(timing.elapsed_secs());
        Ok(timing)
    }

    /// Reclaim the submission slot after a failed delivery.
    pub fn begin_retry(&mut self) -> Result<(), SessionError> {
        match &self.submission {
            Submission::Failed(_) => {
                self.submission = Submission::InFlight;
                Ok(())
            }
            Submission::InFlight => Err(SessionError::AlreadySubmitting),
            Submission::Done => Err(SessionError::AlreadySubmitted),
            Submission::Idle => Err(SessionError::NothingToRetry),
        }
    }

    /// Record the sink's answer. Success moves the session to `Results`.
    pub fn finish_submission(&mut self, outcome: Result<(), &SubmitError>) {
        if self.submission != Submission::InFlight {
            tracing::warn!(attempt = %self.id, "submission outcome reported without a submission in flight");
            return;
        }
        match outcome {
            Ok(()) => {
                self.submission = Submission::Done;
                self.phase = Phase::Results;
                tracing::info!(attempt = %self.id, "test submitted");
            }
            Err(e) => {
                self.submission = Submission::Failed(e.to_string());
                tracing::warn!(attempt = %self.id, "result submission failed: {e}");
            }
        }
    }

    // -- navigation ---------------------------------------------------------

    fn ensure_mutable(&self) -> Result<(), NavigationError> {
        if self.phase != Phase::Active {
            return Err(NavigationError::NotActive(self.phase));
        }
        if self.submission != Submission::Idle {
            return Err(NavigationError::Frozen);
        }
        Ok(())
    }

    fn known(&self, id: &QuestionId) -> Result<(), NavigationError> {
        if self.index_of.contains_key(id) {
            Ok(())
        } else {
            Err(NavigationError::UnknownQuestion(id.clone()))
        }
    }

    /// Jump to `index` and mark it visited.
    pub fn go_to(&mut self, index: usize) -> Result<(), NavigationError> {
        self.ensure_mutable()?;
        let Some(question) = self.questions.get(index) else {
            return Err(NavigationError::OutOfRange {
                index,
                len: self.questions.len(),
            });
        };
        self.visited.insert(question.id.clone());
        self.position = index;
        tracing::debug!(attempt = %self.id, index, "moved to question");
        Ok(())
    }

    /// Move forward one question; fails at the last question.
    pub fn next(&mut self) -> Result<(), NavigationError> {
        self.go_to(self.position + 1)
    }

    /// Move back one question; fails at the first question.
    pub fn previous(&mut self) -> Result<(), NavigationError> {
        match self.position.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => {
                self.ensure_mutable()?;
                Err(NavigationError::OutOfRange {
                    index: 0,
                    len: self.questions.len(),
                })
            }
        }
    }

    /// Record `label` for `question`, replacing any earlier choice.
    pub fn answer(&mut self, question: &QuestionId, label: OptionLabel) -> Result<(), NavigationError> {
        self.ensure_mutable()?;
        self.known(question)?;
        self.answers.insert(question.clone(), label);
        self.visited.insert(question.clone());
        Ok(())
    }

    /// Like [`TestSession::answer`] with a label typed by the learner.
    pub fn answer_text(&mut self, question: &QuestionId, label: &str) -> Result<(), NavigationError> {
        let label = label
            .parse::<OptionLabel>()
            .map_err(|_| NavigationError::InvalidOption(label.to_string()))?;
        self.answer(question, label)
    }

    /// Remove the answer for `question`; it stays visited.
    pub fn clear_answer(&mut self, question: &QuestionId) -> Result<(), NavigationError> {
        self.ensure_mutable()?;
        self.known(question)?;
        self.answers.remove(question);
        self.visited.insert(question.clone());
        Ok(())
    }

    /// Flip the review flag of `question`. Returns the new flag.
    pub fn toggle_mark(&mut self, question: &QuestionId) -> Result<bool, NavigationError> {
        self.ensure_mutable()?;
        self.known(question)?;
        self.visited.insert(question.clone());
        if self.marked.remove(question) {
            Ok(false)
        } else {
            self.marked.insert(question.clone());
            Ok(true)
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variant(&self) -> &TestVariant {
        &self.variant
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> &Question {
        &self.questions[self.position]
    }

    pub fn answers(&self) -> &HashMap<QuestionId, OptionLabel> {
        &self.answers
    }

    pub fn answer_for(&self, question: &QuestionId) -> Option<OptionLabel> {
        self.answers.get(question).copied()
    }

    pub fn visited(&self) -> &HashSet<QuestionId> {
        &self.visited
    }

    pub fn marked(&self) -> &HashSet<QuestionId> {
        &self.marked
    }

    pub fn total_time_secs(&self) -> u32 {
        self.total_time_secs
    }

    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    pub fn elapsed_at_submit(&self) -> Option<u32> {
        self.elapsed_at_submit
    }

    /// Whether navigation and answers are currently accepted.
    pub fn accepts_input(&self) -> bool {
        self.ensure_mutable().is_ok()
    }

    pub fn timing(&self) -> AttemptTiming {
        AttemptTiming {
            total_secs: self.total_time_secs,
            time_left_secs: self.time_left_secs,
        }
    }

    /// Palette status of the question at `index`.
    pub fn status(&self, index: usize) -> Option<QuestionStatus> {
        let id = &self.questions.get(index)?.id;
        let answered = self.answers.contains_key(id);
        let marked = self.marked.contains(id);
        Some(match (answered, marked) {
            (true, true) => QuestionStatus::AnsweredAndMarked,
            (true, false) => QuestionStatus::Answered,
            (false, true) => QuestionStatus::Marked,
            (false, false) if self.visited.contains(id) => QuestionStatus::Visited,
            (false, false) => QuestionStatus::NotVisited,
        })
    }

    /// Counts of every palette status.
    pub fn palette(&self) -> PaletteSummary {
        let mut summary = PaletteSummary::default();
        for index in 0..self.questions.len() {
            match self.status(index) {
                Some(QuestionStatus::NotVisited) => summary.not_visited += 1,
                Some(QuestionStatus::Visited) => summary.visited += 1,
                Some(QuestionStatus::Answered) => summary.answered += 1,
                Some(QuestionStatus::Marked) => summary.marked += 1,
                Some(QuestionStatus::AnsweredAndMarked) => summary.answered_and_marked += 1,
                None => {}
            }
        }
        summary
    }
}
