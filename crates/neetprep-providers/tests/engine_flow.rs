//! End-to-end attempts driven through the engine with in-memory and file
//! adapters.

use std::sync::Arc;
use std::time::Duration;

use neetprep_core::engine::{StartOutcome, TestEngine, TestEngineConfig};
use neetprep_core::error::{CatalogError, SessionError, StartError, SubmitError};
use neetprep_core::ids::{ChapterId, QuestionId, QuestionTypeId, SubjectId};
use neetprep_core::model::{OptionLabel, QuestionRecord, VariantKind, VariantSelector};
use neetprep_core::report::ResultRecord;
use neetprep_core::session::{Phase, QuestionStatus};
use neetprep_core::traits::Credential;
use neetprep_providers::file::{FileCatalog, FileResultSink};
use neetprep_providers::mock::{MockCatalog, MockResultSink};

fn record(id: &str, correct: &str, subject: &str, chapter: &str, kind: &str) -> QuestionRecord {
    QuestionRecord {
        id: QuestionId::from(id),
        question: format!("Question {id}"),
        image: None,
        option_a: "a".into(),
        option_b: "b".into(),
        option_c: "c".into(),
        option_d: "d".into(),
        correct_option: Some(correct.into()),
        hint: None,
        hint_image: None,
        question_type_id: kind.into(),
        subject_id: subject.into(),
        chapter_id: chapter.into(),
        portion_id: Some("11".into()),
        topic_id: None,
    }
}

fn engine(catalog: Arc<MockCatalog>, sink: Arc<MockResultSink>) -> TestEngine {
    TestEngine::new(
        catalog,
        sink,
        Arc::new(Credential::new("bearer-token")),
        TestEngineConfig {
            user_id: "learner-7".into(),
            ..TestEngineConfig::default()
        },
    )
}

fn qid(s: &str) -> QuestionId {
    QuestionId::from(s)
}

#[tokio::test(start_paused = true)]
async fn practice_attempt_with_breakdowns() {
    let catalog = Arc::new(MockCatalog::new(vec![
        record("q1", "A", "phy", "units", "mcq"),
        record("q2", "C", "phy", "units", "mcq"),
        record("q3", "B", "phy", "motion", "assertion"),
        record("q1", "D", "phy", "units", "mcq"),
        record("q4", "D", "chem", "mole", "mcq"),
    ]));
    let sink = Arc::new(MockResultSink::new());
    let engine = engine(Arc::clone(&catalog), Arc::clone(&sink));

    let selector = VariantSelector::new(VariantKind::Subject).portion("11").subject("phy");
    let attempt = engine.start(&selector).await.unwrap().into_attempt().unwrap();
    assert_eq!(catalog.call_count(), 1);
    assert_eq!(attempt.phase(), Phase::Active);
    // duplicate q1 dropped
    assert_eq!(attempt.view(|s| s.len()), 4);
    assert_eq!(attempt.time_left_secs(), 240);

    attempt.answer(&qid("q1"), OptionLabel::A).unwrap();
    attempt.next().unwrap();
    attempt.answer_text(&qid("q2"), "b").unwrap();
    attempt.toggle_mark(&qid("q3")).unwrap();
    attempt.answer(&qid("q3"), OptionLabel::B).unwrap();
    assert_eq!(
        attempt.view(|s| s.status(2)),
        Some(QuestionStatus::AnsweredAndMarked)
    );

    tokio::time::sleep(Duration::from_secs(125)).await;
    let record = attempt.submit().await.unwrap();

    assert_eq!(record.user_id, "learner-7");
    assert_eq!(record.score, 4 - 1 + 4);
    assert_eq!(record.total_marks, 16);
    assert_eq!((record.answered, record.correct, record.wrong, record.unanswered), (3, 2, 1, 1));
    assert_eq!(record.accuracy, 67);
    assert_eq!(record.total_time_taken, "2:05");

    let mcq = &record.results_by_type[&QuestionTypeId::from("mcq")];
    assert_eq!((mcq.tally.attempted, mcq.tally.correct, mcq.tally.wrong), (2, 1, 1));
    assert_eq!(mcq.subjects[&SubjectId::from("phy")].attempted, 2);
    let motion = &record.results_by_chapter[&ChapterId::from("motion")];
    assert_eq!(motion.subject_id.as_str(), "phy");
    assert_eq!(motion.tally.correct, 1);
    assert!(!record.results_by_chapter.contains_key(&ChapterId::from("mole")));

    assert_eq!(sink.call_count(), 1);
    assert_eq!(sink.last_token().as_deref(), Some("bearer-token"));
    assert_eq!(sink.accepted(), vec![record]);
}

#[tokio::test(start_paused = true)]
async fn full_mock_times_out_unattended() {
    let records: Vec<_> = (0..40)
        .map(|i| record(&format!("q{i}"), "A", "bio", "cell", "mcq"))
        .collect();
    let catalog = Arc::new(MockCatalog::new(records));
    let sink = Arc::new(MockResultSink::new());
    let engine = engine(catalog, Arc::clone(&sink));

    let attempt = engine
        .start(&VariantSelector::new(VariantKind::FullPortion))
        .await
        .unwrap()
        .into_attempt()
        .unwrap();
    assert_eq!(attempt.phase(), Phase::Instructions);
    attempt.begin().unwrap();

    tokio::time::sleep(Duration::from_secs(2401)).await;

    assert_eq!(attempt.phase(), Phase::Results);
    let accepted = sink.accepted();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].elapsed_secs, 2400);
    assert_eq!(accepted[0].total_time_taken, "40:00");
    assert_eq!(accepted[0].unanswered, 40);
    assert_eq!(accepted[0].score, 0);
}

#[tokio::test]
async fn catalog_failure_surfaces_as_start_error() {
    let catalog = Arc::new(MockCatalog::failing(CatalogError::Unavailable("offline".into())));
    let engine = engine(catalog, Arc::new(MockResultSink::new()));
    let err = engine
        .start(&VariantSelector::new(VariantKind::Portion).portion("12"))
        .await
        .unwrap_err();
    assert!(matches!(err, StartError::Catalog(CatalogError::Unavailable(_))));
}

#[tokio::test]
async fn topic_selection_without_topics_is_rejected_before_fetch() {
    let catalog = Arc::new(MockCatalog::new(vec![]));
    let engine = engine(Arc::clone(&catalog), Arc::new(MockResultSink::new()));
    let selector = VariantSelector::new(VariantKind::Topics)
        .portion("11")
        .subject("phy")
        .chapter("units")
        .question_count(10);

    assert!(matches!(
        engine.start(&selector).await,
        Err(StartError::Config(_))
    ));
    assert_eq!(catalog.call_count(), 0);
}

#[tokio::test]
async fn empty_selection_reports_no_questions() {
    let engine = engine(Arc::new(MockCatalog::new(vec![])), Arc::new(MockResultSink::new()));
    let outcome = engine
        .start(&VariantSelector::new(VariantKind::Portion).portion("11"))
        .await
        .unwrap();
    assert!(matches!(outcome, StartOutcome::NoQuestions(_)));
}

#[tokio::test(start_paused = true)]
async fn timeout_and_manual_submit_race_submits_once() {
    let catalog = Arc::new(MockCatalog::new(vec![record("q1", "A", "phy", "units", "mcq")]));
    let sink = Arc::new(MockResultSink::new().with_delay(Duration::from_secs(3)));
    let engine = engine(catalog, Arc::clone(&sink));
    let selector = VariantSelector::new(VariantKind::Chapter)
        .portion("11")
        .subject("phy")
        .chapter("units");
    let attempt = engine.start(&selector).await.unwrap().into_attempt().unwrap();

    tokio::time::sleep(Duration::from_millis(60_200)).await;
    assert_eq!(attempt.submit().await, Err(SessionError::AlreadySubmitting));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sink.call_count(), 1);
    assert_eq!(attempt.phase(), Phase::Results);
}

#[tokio::test]
async fn rejected_submission_is_retried_with_same_record() {
    let catalog = Arc::new(MockCatalog::new(vec![record("q1", "A", "phy", "units", "mcq")]));
    let sink = Arc::new(MockResultSink::with_failures([SubmitError::Rejected {
        status: 503,
        message: "maintenance".into(),
    }]));
    let engine = engine(catalog, Arc::clone(&sink));
    let selector = VariantSelector::new(VariantKind::Chapter)
        .portion("11")
        .subject("phy")
        .chapter("units");
    let attempt = engine.start(&selector).await.unwrap().into_attempt().unwrap();
    attempt.answer(&qid("q1"), OptionLabel::A).unwrap();

    let err = attempt.submit().await.unwrap_err();
    assert!(matches!(err, SessionError::Submit(ref e) if e.is_retryable()));
    assert_eq!(attempt.phase(), Phase::Active);

    let record = attempt.retry_submit().await.unwrap();
    assert_eq!(record.score, 4);
    assert_eq!(sink.call_count(), 2);
    assert_eq!(sink.accepted(), vec![record.clone()]);
    assert_eq!(attempt.result(), Some(record));
}

#[tokio::test]
async fn file_bank_to_file_results() {
    let dir = tempfile::tempdir().unwrap();
    let bank = dir.path().join("physics.json");
    std::fs::write(
        &bank,
        serde_json::json!([
            {"id": 1, "question": "Q1", "optionA": "a", "optionB": "b", "optionC": "c",
             "optionD": "d", "correctOption": "optionB", "questionTypeId": "mcq",
             "subjectId": "phy", "chapterId": "units", "portionId": "11"},
            {"id": 2, "question": "Q2", "optionA": "a", "optionB": "b", "optionC": "c",
             "optionD": "d", "correctOption": "d", "questionTypeId": "mcq",
             "subjectId": "phy", "chapterId": "units", "portionId": "11"}
        ])
        .to_string(),
    )
    .unwrap();

    let results_dir = dir.path().join("results");
    let engine = TestEngine::new(
        Arc::new(FileCatalog::open(&bank).unwrap()),
        Arc::new(FileResultSink::new(&results_dir)),
        Arc::new(Credential::new("local")),
        TestEngineConfig::default(),
    );
    let selector = VariantSelector::new(VariantKind::Chapter)
        .portion("11")
        .subject("phy")
        .chapter("units");
    let attempt = engine.start(&selector).await.unwrap().into_attempt().unwrap();
    attempt.answer(&qid("1"), OptionLabel::B).unwrap();
    attempt.answer(&qid("2"), OptionLabel::A).unwrap();
    let record = attempt.submit().await.unwrap();
    assert_eq!(record.score, 3);

    let written: Vec<_> = std::fs::read_dir(&results_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 1);
    assert_eq!(ResultRecord::load_json(&written[0]).unwrap(), record);
}
