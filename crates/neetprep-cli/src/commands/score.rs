//! The `neetprep score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use neetprep_core::catalog::normalize;
use neetprep_core::parser;
use neetprep_core::report::{AttemptTiming, ResultRecord};
use neetprep_core::scoring::score_attempt;
use neetprep_core::traits::QuestionCatalog;
use neetprep_providers::config::load_config_from;
use neetprep_providers::file::FileCatalog;

use super::{print_summary, write_reports, SelectorArgs};

pub async fn execute(
    bank: PathBuf,
    answers: PathBuf,
    selector_args: SelectorArgs,
    output: PathBuf,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let variant = selector_args.to_selector().resolve()?;

    let catalog = FileCatalog::open(&bank)?;
    let records = catalog
        .fetch(&variant)
        .await
        .with_context(|| format!("failed to select questions from {}", bank.display()))?;
    let questions = normalize(records);
    anyhow::ensure!(!questions.is_empty(), "no questions in {} for {variant}", bank.display());

    let sheet = parser::parse_answer_sheet(&answers)?;
    let unknown = sheet
        .answers
        .keys()
        .filter(|id| !questions.iter().any(|q| &q.id == *id))
        .count();
    if unknown > 0 {
        eprintln!("Warning: {unknown} answer(s) do not match any selected question and were ignored.");
    }

    let total_secs = u32::try_from(questions.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(config.seconds_per_question);
    let elapsed = sheet.elapsed_secs.unwrap_or(0).min(total_secs);
    let timing = AttemptTiming {
        total_secs,
        time_left_secs: total_secs - elapsed,
    };

    let scored = score_attempt(&questions, &sheet.answers, &config.marking);
    let record = ResultRecord::new(
        Uuid::new_v4(),
        config.user_id.clone(),
        variant,
        scored,
        timing,
        Utc::now(),
    );

    if format.split(',').any(|f| matches!(f.trim(), "text" | "all")) {
        println!("Scored {} question(s) from {}", record.total_questions, bank.display());
        print_summary(&record);
    }
    for path in write_reports(&record, &output, &format)? {
        eprintln!("Report: {}", path.display());
    }
    Ok(())
}
