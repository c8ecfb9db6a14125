//! Subcommand implementations and the helpers they share.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};

use neetprep_core::model::{VariantKind, VariantSelector};
use neetprep_core::report::{format_clock, ResultRecord};
use neetprep_core::scoring::accuracy_percent;
use neetprep_report::html::write_html_report;
use neetprep_report::markdown::generate_markdown;

pub mod init;
pub mod score;
pub mod take;
pub mod validate;

/// Which questions make up the test.
#[derive(Args, Debug, Clone)]
pub struct SelectorArgs {
    /// Test variant: full, portion, subject, chapter, topics
    #[arg(long, default_value = "full")]
    pub variant: VariantKind,

    /// Portion (class) id
    #[arg(long)]
    pub portion: Option<String>,

    /// Subject id
    #[arg(long)]
    pub subject: Option<String>,

    /// Chapter id
    #[arg(long)]
    pub chapter: Option<String>,

    /// Topic ids for a custom test (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// Number of questions for a custom test
    #[arg(long)]
    pub count: Option<u32>,
}

impl SelectorArgs {
    pub fn to_selector(&self) -> VariantSelector {
        let mut selector = VariantSelector::new(self.variant);
        if let Some(portion) = &self.portion {
            selector = selector.portion(portion.as_str());
        }
        if let Some(subject) = &self.subject {
            selector = selector.subject(subject.as_str());
        }
        if let Some(chapter) = &self.chapter {
            selector = selector.chapter(chapter.as_str());
        }
        if !self.topics.is_empty() {
            selector = selector.topics(self.topics.iter().map(|t| t.trim()));
        }
        if let Some(count) = self.count {
            selector = selector.question_count(count);
        }
        selector
    }
}

/// Summary and breakdown tables for one result.
pub fn print_summary(record: &ResultRecord) {
    let mut table = Table::new();
    table.set_header(vec!["Score", "Accuracy", "Answered", "Correct", "Wrong", "Time"]);
    table.add_row(vec![
        Cell::new(format!("{} / {}", record.score, record.total_marks)),
        Cell::new(format!("{}%", record.accuracy)),
        Cell::new(format!("{} of {}", record.answered, record.total_questions)),
        Cell::new(record.correct),
        Cell::new(record.wrong),
        Cell::new(format!(
            "{} of {}",
            record.total_time_taken,
            format_clock(record.total_time_secs)
        )),
    ]);
    println!("{table}");

    if record.results_by_chapter.is_empty() {
        return;
    }
    let mut chapters = Table::new();
    chapters.set_header(vec!["Chapter", "Subject", "Attempted", "Correct", "Wrong", "Accuracy"]);
    for (chapter_id, chapter) in &record.results_by_chapter {
        chapters.add_row(vec![
            Cell::new(chapter_id),
            Cell::new(&chapter.subject_id),
            Cell::new(chapter.tally.attempted),
            Cell::new(chapter.tally.correct),
            Cell::new(chapter.tally.wrong),
            Cell::new(format!(
                "{}%",
                accuracy_percent(chapter.tally.correct, chapter.tally.attempted)
            )),
        ]);
    }
    println!("{chapters}");
}

/// Expand a comma-separated format list. `all` means every file format.
fn parse_formats(format: &str) -> Vec<String> {
    if format.trim() == "all" {
        return vec!["json".into(), "html".into(), "markdown".into()];
    }
    format
        .split(',')
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Write the requested report files into `output`. Returns the paths written.
pub fn write_reports(record: &ResultRecord, output: &Path, format: &str) -> Result<Vec<PathBuf>> {
    let formats = parse_formats(format);
    let mut written = Vec::new();
    if formats.iter().all(|f| f == "text" || f == "none") {
        return Ok(written);
    }

    std::fs::create_dir_all(output)?;
    let timestamp = record.completed_at.format("%Y-%m-%dT%H%M%S");

    for fmt in &formats {
        match fmt.as_str() {
            "json" => {
                let path = output.join(format!("report-{timestamp}.json"));
                record.save_json(&path)?;
                written.push(path);
            }
            "html" => {
                let path = output.join(format!("report-{timestamp}.html"));
                write_html_report(record, &path)?;
                written.push(path);
            }
            "markdown" | "md" => {
                let path = output.join(format!("report-{timestamp}.md"));
                std::fs::write(&path, generate_markdown(record))?;
                written.push(path);
            }
            "text" | "none" => {}
            other => eprintln!("Unknown format: {other}"),
        }
    }
    Ok(written)
}
