//! Attempt orchestrator.
//!
//! `TestEngine` turns a selection into a running attempt: it validates the
//! selector, fetches and normalizes the questions, and hands back a
//! [`TestAttempt`] that owns the session, the countdown and the single
//! submission.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::catalog::normalize;
use crate::error::{NavigationError, SessionError, StartError, SubmitError};
use crate::ids::QuestionId;
use crate::model::{OptionLabel, TestVariant, VariantSelector};
use crate::report::ResultRecord;
use crate::scoring::{score_attempt, MarkingScheme};
use crate::session::{Phase, Submission, TestSession, TickOutcome};
use crate::timer::Countdown;
use crate::traits::{CredentialSource, QuestionCatalog, ResultSink};

/// Configuration for the test engine.
#[derive(Debug, Clone)]
pub struct TestEngineConfig {
    /// Learner the results are filed under.
    pub user_id: String,
    /// Time allowance per question.
    pub seconds_per_question: u32,
    /// Marks per outcome.
    pub marking: MarkingScheme,
    /// Open full mock tests on the instructions screen. When false every
    /// variant starts active.
    pub show_instructions: bool,
    /// Countdown period. One second outside of tests.
    pub tick_interval: Duration,
}

impl Default for TestEngineConfig {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            seconds_per_question: 60,
            marking: MarkingScheme::default(),
            show_instructions: true,
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Progress reporting trait.
///
/// Called from the countdown task as well as from the host, never with the
/// session lock held.
pub trait SessionObserver: Send + Sync {
    fn on_tick(&self, time_left_secs: u32);
    fn on_time_up(&self);
    fn on_submitted(&self, record: &ResultRecord);
    fn on_submit_error(&self, error: &SubmitError);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_tick(&self, _: u32) {}
    fn on_time_up(&self) {}
    fn on_submitted(&self, _: &ResultRecord) {}
    fn on_submit_error(&self, _: &SubmitError) {}
}

/// Result of [`TestEngine::start`].
#[derive(Debug)]
pub enum StartOutcome {
    /// Questions loaded; the attempt is in `Instructions` or `Active`.
    Ready(TestAttempt),
    /// The catalog had nothing for this selection.
    NoQuestions(TestVariant),
}

impl StartOutcome {
    pub fn into_attempt(self) -> Option<TestAttempt> {
        match self {
            StartOutcome::Ready(attempt) => Some(attempt),
            StartOutcome::NoQuestions(_) => None,
        }
    }
}

/// The central test engine.
pub struct TestEngine {
    catalog: Arc<dyn QuestionCatalog>,
    sink: Arc<dyn ResultSink>,
    credentials: Arc<dyn CredentialSource>,
    config: TestEngineConfig,
}

impl TestEngine {
    pub fn new(
        catalog: Arc<dyn QuestionCatalog>,
        sink: Arc<dyn ResultSink>,
        credentials: Arc<dyn CredentialSource>,
        config: TestEngineConfig,
    ) -> Self {
        Self {
            catalog,
            sink,
            credentials,
            config,
        }
    }

    pub fn config(&self) -> &TestEngineConfig {
        &self.config
    }

    /// Start an attempt without progress callbacks.
    pub async fn start(&self, selector: &VariantSelector) -> Result<StartOutcome, StartError> {
        self.start_with_observer(selector, Arc::new(NoopObserver)).await
    }

    /// Validate `selector`, load its questions and open an attempt.
    ///
    /// Must be called inside a tokio runtime: an attempt that opens directly
    /// in `Active` spawns its countdown immediately.
    #[tracing::instrument(skip_all, fields(catalog = self.catalog.name()))]
    pub async fn start_with_observer(
        &self,
        selector: &VariantSelector,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<StartOutcome, StartError> {
        let variant = selector.resolve()?;
        tracing::info!(%variant, "loading questions");

        let records = self.catalog.fetch(&variant).await?;
        let questions = normalize(records);

        let show_instructions = self.config.show_instructions && variant.shows_instructions();
        let Some(session) = TestSession::new(
            Uuid::new_v4(),
            variant.clone(),
            questions,
            self.config.seconds_per_question,
            show_instructions,
        ) else {
            tracing::warn!(%variant, "no questions available");
            return Ok(StartOutcome::NoQuestions(variant));
        };

        let active = session.phase() == Phase::Active;
        let attempt = TestAttempt {
            shared: Arc::new(AttemptShared {
                session: Mutex::new(session),
                pending: Mutex::new(None),
                sink: Arc::clone(&self.sink),
                credentials: Arc::clone(&self.credentials),
                observer,
                marking: self.config.marking,
                user_id: self.config.user_id.clone(),
            }),
            countdown: Mutex::new(Countdown::idle()),
            tick_interval: self.config.tick_interval,
        };
        if active {
            attempt.start_countdown();
        }
        Ok(StartOutcome::Ready(attempt))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the host handle and the countdown task.
struct AttemptShared {
    session: Mutex<TestSession>,
    /// Scored record of the current submission, kept for retries.
    pending: Mutex<Option<ResultRecord>>,
    sink: Arc<dyn ResultSink>,
    credentials: Arc<dyn CredentialSource>,
    observer: Arc<dyn SessionObserver>,
    marking: MarkingScheme,
    user_id: String,
}

impl AttemptShared {
    fn tick(&self) -> TickOutcome {
        let outcome = lock(&self.session).tick();
        match outcome {
            TickOutcome::Running(left) => self.observer.on_tick(left),
            TickOutcome::Expired => self.observer.on_tick(0),
            TickOutcome::Stopped => {}
        }
        outcome
    }

    /// Claim the submission slot and score the frozen answer sheet.
    fn prepare(&self) -> Result<ResultRecord, SessionError> {
        let record = {
            let mut session = lock(&self.session);
            let timing = session.begin_submission()?;
            let sheet = score_attempt(session.questions(), session.answers(), &self.marking);
            ResultRecord::new(
                session.id(),
                self.user_id.clone(),
                session.variant().clone(),
                sheet,
                timing,
                Utc::now(),
            )
        };
        *lock(&self.pending) = Some(record.clone());
        Ok(record)
    }

    async fn deliver(&self, record: ResultRecord) -> Result<ResultRecord, SessionError> {
        let outcome = match self.credentials.credential() {
            Some(credential) => self.sink.submit(&record, &credential).await,
            None => Err(SubmitError::MissingCredential),
        };
        lock(&self.session).finish_submission(outcome.as_ref().map(|_| ()));

        match outcome {
            Ok(()) => {
                tracing::info!(
                    attempt = %record.id,
                    sink = self.sink.name(),
                    score = record.score,
                    "result submitted"
                );
                self.observer.on_submitted(&record);
                Ok(record)
            }
            Err(e) => {
                tracing::error!(attempt = %record.id, sink = self.sink.name(), "submission failed: {e}");
                self.observer.on_submit_error(&e);
                Err(e.into())
            }
        }
    }

    /// Submit because the clock ran out.
    ///
    /// Delivery runs on its own task, so tearing the countdown down does not
    /// cut a request short. A delivery that panics is reported as a failed
    /// submission, leaving the attempt open for a retry.
    async fn submit_on_timeout(self: Arc<Self>) {
        self.observer.on_time_up();
        let record = match self.prepare() {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("timeout submission skipped: {e}");
                return;
            }
        };

        let shared = Arc::clone(&self);
        let delivery = tokio::spawn(async move { shared.deliver(record).await });
        match delivery.await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => tracing::warn!("automatic submission failed, waiting for a retry"),
            Err(e) => {
                let err = SubmitError::Storage(format!("result delivery did not complete: {e}"));
                tracing::error!("automatic submission aborted: {err}");
                lock(&self.session).finish_submission(Err(&err));
                self.observer.on_submit_error(&err);
            }
        }
    }
}

/// Handle to one running attempt.
///
/// Dropping the handle stops the countdown and discards the attempt without
/// submitting. A submission already in flight still completes.
pub struct TestAttempt {
    shared: Arc<AttemptShared>,
    countdown: Mutex<Countdown>,
    tick_interval: Duration,
}

impl fmt::Debug for TestAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = lock(&self.shared.session);
        f.debug_struct("TestAttempt")
            .field("id", &session.id())
            .field("phase", &session.phase())
            .field("questions", &session.len())
            .finish()
    }
}

impl TestAttempt {
    fn start_countdown(&self) {
        let ticker = Arc::clone(&self.shared);
        let expirer = Arc::clone(&self.shared);
        let countdown = Countdown::start(
            self.tick_interval,
            move || ticker.tick(),
            move || expirer.submit_on_timeout(),
        );
        *lock(&self.countdown) = countdown;
    }

    fn stop_countdown(&self) {
        lock(&self.countdown).cancel();
    }

    pub fn id(&self) -> Uuid {
        lock(&self.shared.session).id()
    }

    pub fn phase(&self) -> Phase {
        lock(&self.shared.session).phase()
    }

    pub fn submission(&self) -> Submission {
        lock(&self.shared.session).submission().clone()
    }

    pub fn time_left_secs(&self) -> u32 {
        lock(&self.shared.session).time_left_secs()
    }

    pub fn is_timer_running(&self) -> bool {
        lock(&self.countdown).is_running()
    }

    /// Read the session under the lock.
    pub fn view<R>(&self, f: impl FnOnce(&TestSession) -> R) -> R {
        f(&*lock(&self.shared.session))
    }

    /// A copy of the current session state.
    pub fn snapshot(&self) -> TestSession {
        lock(&self.shared.session).clone()
    }

    /// Leave the instructions screen and start the clock.
    pub fn begin(&self) -> Result<(), SessionError> {
        lock(&self.shared.session).begin()?;
        self.start_countdown();
        Ok(())
    }

    pub fn go_to(&self, index: usize) -> Result<(), NavigationError> {
        lock(&self.shared.session).go_to(index)
    }

    pub fn next(&self) -> Result<(), NavigationError> {
        lock(&self.shared.session).next()
    }

    pub fn previous(&self) -> Result<(), NavigationError> {
        lock(&self.shared.session).previous()
    }

    pub fn answer(&self, question: &QuestionId, label: OptionLabel) -> Result<(), NavigationError> {
        lock(&self.shared.session).answer(question, label)
    }

    pub fn answer_text(&self, question: &QuestionId, label: &str) -> Result<(), NavigationError> {
        lock(&self.shared.session).answer_text(question, label)
    }

    pub fn clear_answer(&self, question: &QuestionId) -> Result<(), NavigationError> {
        lock(&self.shared.session).clear_answer(question)
    }

    pub fn toggle_mark(&self, question: &QuestionId) -> Result<bool, NavigationError> {
        lock(&self.shared.session).toggle_mark(question)
    }

    /// Submit now.
    ///
    /// Loses to a submission already started by the countdown with
    /// [`SessionError::AlreadySubmitting`]. On a sink failure the attempt
    /// stays active with its answers frozen; use [`TestAttempt::retry_submit`].
    pub async fn submit(&self) -> Result<ResultRecord, SessionError> {
        let record = self.shared.prepare()?;
        self.stop_countdown();
        self.shared.deliver(record).await
    }

    /// Resend the record of a failed submission without scoring again.
    pub async fn retry_submit(&self) -> Result<ResultRecord, SessionError> {
        let Some(record) = lock(&self.shared.pending).clone() else {
            return Err(SessionError::NothingToRetry);
        };
        lock(&self.shared.session).begin_retry()?;
        tracing::info!(attempt = %record.id, "retrying result submission");
        self.shared.deliver(record).await
    }

    /// The acknowledged result, once the attempt reached `Results`.
    pub fn result(&self) -> Option<ResultRecord> {
        if self.phase() != Phase::Results {
            return None;
        }
        lock(&self.shared.pending).clone()
    }

    /// Tear the attempt down without submitting.
    ///
    /// A submission the countdown already started is not cancelled: it runs
    /// to completion in the background, so the sink may still record it.
    pub fn abandon(self) {
        self.stop_countdown();
        tracing::info!(attempt = %self.id(), "attempt abandoned");
    }
}
