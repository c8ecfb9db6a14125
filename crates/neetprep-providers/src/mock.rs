//! In-memory adapters for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use neetprep_core::error::{CatalogError, SubmitError};
use neetprep_core::model::{QuestionRecord, TestVariant};
use neetprep_core::report::ResultRecord;
use neetprep_core::traits::{Credential, QuestionCatalog, ResultSink};

/// A mock catalog for driving the engine without a backend.
///
/// Returns the same records for every variant unless a failure is queued.
pub struct MockCatalog {
    records: Vec<QuestionRecord>,
    failure: Mutex<Option<CatalogError>>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last variant requested.
    last_variant: Mutex<Option<TestVariant>>,
}

impl MockCatalog {
    pub fn new(records: Vec<QuestionRecord>) -> Self {
        Self {
            records,
            failure: Mutex::new(None),
            call_count: AtomicU32::new(0),
            last_variant: Mutex::new(None),
        }
    }

    /// Create a catalog that fails every fetch with `error`.
    pub fn failing(error: CatalogError) -> Self {
        let catalog = Self::new(Vec::new());
        *catalog.failure.lock().unwrap() = Some(error);
        catalog
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_variant(&self) -> Option<TestVariant> {
        self.last_variant.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionCatalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, variant: &TestVariant) -> Result<Vec<QuestionRecord>, CatalogError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_variant.lock().unwrap() = Some(variant.clone());

        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.records.clone())
    }
}

/// A mock result sink that keeps everything it accepts.
#[derive(Default)]
pub struct MockResultSink {
    accepted: Mutex<Vec<ResultRecord>>,
    /// Failures returned by the next calls, in order.
    failures: Mutex<VecDeque<SubmitError>>,
    call_count: AtomicU32,
    last_token: Mutex<Option<String>>,
    delay: Duration,
}

impl MockResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next calls with these errors before accepting again.
    pub fn with_failures(failures: impl IntoIterator<Item = SubmitError>) -> Self {
        Self {
            failures: Mutex::new(failures.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Take `delay` to answer each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> Vec<ResultRecord> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for MockResultSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, record: &ResultRecord, credential: &Credential) -> Result<(), SubmitError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_token.lock().unwrap() = Some(credential.token().to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.accepted.lock().unwrap().push(record.clone());
        Ok(())
    }
}
