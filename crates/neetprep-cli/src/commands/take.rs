//! The `neetprep take` command.
//!
//! Runs one attempt against stdin. The countdown keeps running in the
//! background while the loop waits for input; when it reaches zero the engine
//! submits on its own and the loop picks the result up from the observer
//! channel.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use neetprep_core::engine::{
    SessionObserver, StartOutcome, TestAttempt, TestEngine, TestEngineConfig,
};
use neetprep_core::error::{SessionError, SubmitError};
use neetprep_core::model::OptionLabel;
use neetprep_core::report::{format_clock, ResultRecord};
use neetprep_core::session::{Phase, QuestionStatus, Submission, TestSession};
use neetprep_core::traits::{QuestionCatalog, ResultSink};
use neetprep_providers::config::{
    create_catalog, create_credentials, create_result_sink, load_config_from,
};
use neetprep_providers::file::FileCatalog;

use super::{print_summary, write_reports, SelectorArgs};

/// Callbacks forwarded from the countdown task to the input loop.
enum Event {
    TimeUp,
    Submitted(ResultRecord),
    SubmitFailed(SubmitError),
}

/// Console observer.
struct ConsoleObserver {
    events: UnboundedSender<Event>,
}

impl SessionObserver for ConsoleObserver {
    fn on_tick(&self, time_left_secs: u32) {
        if matches!(time_left_secs, 300 | 60 | 10) {
            eprintln!("\n  {} remaining", format_clock(time_left_secs));
        }
    }

    fn on_time_up(&self) {
        let _ = self.events.send(Event::TimeUp);
    }

    fn on_submitted(&self, record: &ResultRecord) {
        let _ = self.events.send(Event::Submitted(record.clone()));
    }

    fn on_submit_error(&self, error: &SubmitError) {
        let _ = self.events.send(Event::SubmitFailed(error.clone()));
    }
}

/// One line of learner input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Empty,
    Help,
    Begin,
    Next,
    Previous,
    /// Zero-based question index.
    GoTo(usize),
    Answer(String),
    Clear,
    Mark,
    Status,
    Submit,
    Retry,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Command::Empty);
    };
    let arg = parts.next();

    let command = match (head.to_lowercase().as_str(), arg) {
        ("h" | "help" | "?", _) => Command::Help,
        ("b" | "begin" | "start", _) => Command::Begin,
        ("n" | "next", _) => Command::Next,
        ("p" | "prev" | "previous", _) => Command::Previous,
        ("g" | "go" | "goto", Some(n)) => {
            let number: usize = n
                .parse()
                .map_err(|_| format!("not a question number: {n}"))?;
            if number == 0 {
                return Err("question numbers start at 1".to_string());
            }
            Command::GoTo(number - 1)
        }
        ("g" | "go" | "goto", None) => return Err("usage: g <question number>".to_string()),
        ("a" | "answer", Some(label)) => Command::Answer(label.to_string()),
        ("a" | "answer", None) => return Err("usage: a <A|B|C|D>".to_string()),
        ("c" | "clear", _) => Command::Clear,
        ("m" | "mark", _) => Command::Mark,
        ("s" | "status", _) => Command::Status,
        ("submit", _) => Command::Submit,
        ("retry", _) => Command::Retry,
        ("q" | "quit" | "exit", _) => Command::Quit,
        (other, _) => return Err(format!("unknown command `{other}`, type `help`")),
    };
    Ok(command)
}

enum Flow {
    Continue,
    Done(ResultRecord),
    Quit,
}

pub async fn execute(
    selector_args: SelectorArgs,
    bank: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
    no_instructions: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if no_instructions {
        config.show_instructions = false;
    }

    let catalog: Arc<dyn QuestionCatalog> = match (&bank, &config.catalog) {
        (Some(path), _) => Arc::new(FileCatalog::open(path)?),
        (None, Some(catalog)) => Arc::from(create_catalog(catalog, &config.auth)?),
        (None, None) => anyhow::bail!(
            "no question catalog configured; pass --bank or add a [catalog] section to neetprep.toml"
        ),
    };
    let sink: Arc<dyn ResultSink> = Arc::from(create_result_sink(&config.results_or_default())?);
    let engine = TestEngine::new(
        catalog,
        sink,
        create_credentials(&config),
        config.engine_config(),
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer = Arc::new(ConsoleObserver { events: tx });
    let attempt = match engine
        .start_with_observer(&selector_args.to_selector(), observer)
        .await?
    {
        StartOutcome::Ready(attempt) => attempt,
        StartOutcome::NoQuestions(variant) => {
            println!("No questions available for {variant}.");
            return Ok(());
        }
    };

    let Some(record) = run_attempt(&attempt, engine.config(), &mut rx).await? else {
        attempt.abandon();
        println!("Attempt abandoned. Nothing was submitted.");
        return Ok(());
    };

    println!("\nSubmitted.");
    print_summary(&record);

    let output = output.unwrap_or_else(|| config.output_dir.clone());
    for path in write_reports(&record, &output, &format)? {
        eprintln!("Report: {}", path.display());
    }
    Ok(())
}

async fn run_attempt(
    attempt: &TestAttempt,
    config: &TestEngineConfig,
    events: &mut UnboundedReceiver<Event>,
) -> Result<Option<ResultRecord>> {
    if attempt.phase() == Phase::Instructions {
        print_instructions(attempt, config);
    } else {
        show_question(attempt);
    }

    let mut lines = spawn_stdin_reader();
    let mut auto_submitting = false;

    loop {
        prompt(attempt);
        tokio::select! {
            event = events.recv() => match event {
                Some(Event::TimeUp) => {
                    auto_submitting = true;
                    println!("\nTime is up. Submitting your answers...");
                }
                Some(Event::Submitted(record)) => return Ok(Some(record)),
                Some(Event::SubmitFailed(e)) => {
                    if auto_submitting {
                        auto_submitting = false;
                        println!("\n  submission failed: {e}. Type `retry` to send it again.");
                    }
                }
                None => return Ok(attempt.result()),
            },
            line = lines.recv() => {
                let Some(line) = line else {
                    return finish_on_eof(attempt, events).await;
                };
                let line = line.context("failed to read from stdin")?;
                match handle_line(attempt, &line).await {
                    Flow::Continue => {}
                    Flow::Done(record) => return Ok(Some(record)),
                    Flow::Quit => return Ok(None),
                }
            }
        }
    }
}

/// Read stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

async fn handle_line(attempt: &TestAttempt, line: &str) -> Flow {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(message) => {
            println!("  {message}");
            return Flow::Continue;
        }
    };

    let current = attempt.view(|s| s.current().id.clone());
    let outcome: Result<(), String> = match command {
        Command::Empty => Ok(()),
        Command::Help => {
            print_help();
            return Flow::Continue;
        }
        Command::Begin => attempt.begin().map_err(|e| e.to_string()),
        Command::Next => attempt.next().map_err(|e| e.to_string()),
        Command::Previous => attempt.previous().map_err(|e| e.to_string()),
        Command::GoTo(index) => attempt.go_to(index).map_err(|e| e.to_string()),
        Command::Answer(label) => attempt
            .answer_text(&current, &label)
            .map_err(|e| e.to_string()),
        Command::Clear => attempt.clear_answer(&current).map_err(|e| e.to_string()),
        Command::Mark => attempt
            .toggle_mark(&current)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Command::Status => {
            print_palette(attempt);
            return Flow::Continue;
        }
        Command::Submit => match attempt.submit().await {
            Ok(record) => return Flow::Done(record),
            Err(e) => Err(describe_submit_error(&e)),
        },
        Command::Retry => match attempt.retry_submit().await {
            Ok(record) => return Flow::Done(record),
            Err(e) => Err(describe_submit_error(&e)),
        },
        Command::Quit => return Flow::Quit,
    };

    match outcome {
        Ok(()) => show_question(attempt),
        Err(message) => println!("  {message}"),
    }
    Flow::Continue
}

/// Submit whatever is on the sheet when input runs out.
async fn finish_on_eof(
    attempt: &TestAttempt,
    events: &mut UnboundedReceiver<Event>,
) -> Result<Option<ResultRecord>> {
    match (attempt.phase(), attempt.submission()) {
        (Phase::Instructions, _) => Ok(None),
        (Phase::Results, _) => Ok(attempt.result()),
        (Phase::Active, Submission::Failed(_)) => attempt
            .retry_submit()
            .await
            .map(Some)
            .context("failed to submit the test"),
        (Phase::Active, Submission::InFlight) => wait_for_submission(attempt, events).await,
        (Phase::Active, _) => match attempt.submit().await {
            Ok(record) => Ok(Some(record)),
            Err(SessionError::AlreadySubmitting) => wait_for_submission(attempt, events).await,
            Err(e) => Err(e).context("failed to submit the test"),
        },
    }
}

async fn wait_for_submission(
    attempt: &TestAttempt,
    events: &mut UnboundedReceiver<Event>,
) -> Result<Option<ResultRecord>> {
    while let Some(event) = events.recv().await {
        match event {
            Event::Submitted(record) => return Ok(Some(record)),
            Event::SubmitFailed(e) => return Err(e).context("automatic submission failed"),
            Event::TimeUp => {}
        }
    }
    Ok(attempt.result())
}

fn describe_submit_error(error: &SessionError) -> String {
    match error {
        SessionError::Submit(e) if e.is_retryable() => {
            format!("submission failed: {e}. Type `retry` to send it again.")
        }
        SessionError::Submit(e) => format!("submission failed: {e}"),
        other => other.to_string(),
    }
}

fn prompt(attempt: &TestAttempt) {
    let label = match attempt.phase() {
        Phase::Instructions => "instructions".to_string(),
        _ => format_clock(attempt.time_left_secs()),
    };
    print!("[{label}] > ");
    let _ = std::io::stdout().flush();
}

fn print_instructions(attempt: &TestAttempt, config: &TestEngineConfig) {
    let count = attempt.view(|s| s.len());
    let total_secs = u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(config.seconds_per_question);
    println!("Instructions");
    println!("  This test has {count} question(s) and lasts {}.", format_clock(total_secs));
    println!(
        "  A correct answer earns {} marks, a wrong answer {}. Unanswered questions score 0.",
        config.marking.correct, config.marking.wrong
    );
    println!("  The clock starts when you begin.");
    println!("  Your answers are submitted automatically when time runs out.");
    println!("Type `begin` to start, `help` for commands.");
}

fn print_help() {
    println!("  n / p        next / previous question");
    println!("  g <N>        go to question N");
    println!("  a <A-D>      answer the current question");
    println!("  c            clear the current answer");
    println!("  m            mark / unmark for review");
    println!("  s            question palette");
    println!("  submit       submit the test");
    println!("  retry        resend a failed submission");
    println!("  quit         leave without submitting");
}

fn render_question(session: &TestSession) -> String {
    let position = session.position();
    let question = session.current();
    let selected = session.answer_for(&question.id);
    let marked = if session.marked().contains(&question.id) {
        " (marked)"
    } else {
        ""
    };

    let mut out = format!(
        "\nQuestion {}/{}{marked}\n{}\n",
        position + 1,
        session.len(),
        question.body
    );
    if let Some(image) = &question.image {
        out.push_str(&format!("  [image: {image}]\n"));
    }
    for label in OptionLabel::ALL {
        let pick = if selected == Some(label) { "*" } else { " " };
        out.push_str(&format!("{pick} {label}. {}\n", question.option(label)));
    }
    out
}

fn show_question(attempt: &TestAttempt) {
    if attempt.phase() != Phase::Active {
        return;
    }
    print!("{}", attempt.view(render_question));
}

fn palette_symbol(status: QuestionStatus) -> &'static str {
    match status {
        QuestionStatus::NotVisited => ".",
        QuestionStatus::Visited => "-",
        QuestionStatus::Answered => "A",
        QuestionStatus::Marked => "M",
        QuestionStatus::AnsweredAndMarked => "A*",
    }
}

fn render_palette(session: &TestSession) -> String {
    let cells: Vec<String> = (0..session.len())
        .filter_map(|i| session.status(i).map(|s| format!("{}:{}", i + 1, palette_symbol(s))))
        .collect();
    let summary = session.palette();
    format!(
        "  {}\n  answered {}, marked {}, answered+marked {}, visited {}, not visited {}\n",
        cells.join(" "),
        summary.answered,
        summary.marked,
        summary.answered_and_marked,
        summary.visited,
        summary.not_visited
    )
}

fn print_palette(attempt: &TestAttempt) {
    print!("{}", attempt.view(render_palette));
}

#[cfg(test)]
mod tests {
    use super::*;
    use neetprep_core::ids::QuestionId;
    use neetprep_core::model::{Question, TestVariant};
    use uuid::Uuid;

    fn session() -> TestSession {
        let questions = (0..3)
            .map(|i| Question {
                id: QuestionId::new(format!("q{i}")),
                body: format!("Body {i}"),
                image: None,
                options: ["w".into(), "x".into(), "y".into(), "z".into()],
                correct_option: None,
                hint: None,
                question_type_id: "mcq".into(),
                subject_id: "phy".into(),
                chapter_id: "units".into(),
            })
            .collect();
        TestSession::new(Uuid::new_v4(), TestVariant::FullPortion, questions, 60, false).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command(""), Ok(Command::Empty));
        assert_eq!(parse_command("n"), Ok(Command::Next));
        assert_eq!(parse_command("P"), Ok(Command::Previous));
        assert_eq!(parse_command("g 3"), Ok(Command::GoTo(2)));
        assert_eq!(parse_command("a b"), Ok(Command::Answer("b".into())));
        assert_eq!(parse_command("submit"), Ok(Command::Submit));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("g").is_err());
        assert!(parse_command("g 0").is_err());
        assert!(parse_command("g two").is_err());
        assert!(parse_command("a").is_err());
        assert!(parse_command("jump").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn renders_selected_option() {
        let mut session = session();
        session
            .answer(&QuestionId::from("q0"), OptionLabel::C)
            .unwrap();
        let text = render_question(&session);
        assert!(text.contains("Question 1/3"));
        assert!(text.contains("* C. y"));
        assert!(text.contains("  A. w"));
    }

    #[test]
    fn palette_lists_every_question() {
        let mut session = session();
        session.toggle_mark(&QuestionId::from("q1")).unwrap();
        let text = render_palette(&session);
        assert!(text.contains("1:- 2:M 3:."));
        assert!(text.contains("marked 1"));
        assert!(text.contains("not visited 1"));
    }
}
