//! Markdown report generator.

use neetprep_core::report::{format_clock, ResultRecord};
use neetprep_core::scoring::{accuracy_percent, Tally};

fn tally_row(label: &str, subject: &str, tally: &Tally) -> String {
    format!(
        "| {label} | {subject} | {} | {} | {} | {}% |\n",
        tally.attempted,
        tally.correct,
        tally.wrong,
        accuracy_percent(tally.correct, tally.attempted)
    )
}

/// Render a result record as GitHub-flavored Markdown.
pub fn generate_markdown(record: &ResultRecord) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Result: {}\n\n", record.variant));
    md.push_str(&format!(
        "Learner `{}`, completed {}\n\n",
        record.user_id,
        record.completed_at.format("%Y-%m-%d %H:%M UTC")
    ));

    md.push_str("| | |\n|---|---|\n");
    md.push_str(&format!(
        "| Score | **{} / {}** |\n",
        record.score, record.total_marks
    ));
    md.push_str(&format!("| Accuracy | {}% |\n", record.accuracy));
    md.push_str(&format!(
        "| Answered | {} of {} |\n",
        record.answered, record.total_questions
    ));
    md.push_str(&format!(
        "| Correct / Wrong / Unanswered | {} / {} / {} |\n",
        record.correct, record.wrong, record.unanswered
    ));
    md.push_str(&format!(
        "| Time taken | {} of {} |\n",
        record.total_time_taken,
        format_clock(record.total_time_secs)
    ));

    if !record.results_by_type.is_empty() {
        md.push_str("\n## By question type\n\n");
        md.push_str("| Type | Subject | Attempted | Correct | Wrong | Accuracy |\n");
        md.push_str("|---|---|---|---|---|---|\n");
        for (type_id, breakdown) in &record.results_by_type {
            md.push_str(&tally_row(type_id.as_str(), "all", &breakdown.tally));
            for (subject_id, tally) in &breakdown.subjects {
                md.push_str(&tally_row("", subject_id.as_str(), tally));
            }
        }
    }

    if !record.results_by_chapter.is_empty() {
        md.push_str("\n## By chapter\n\n");
        md.push_str("| Chapter | Subject | Attempted | Correct | Wrong | Accuracy |\n");
        md.push_str("|---|---|---|---|---|---|\n");
        for (chapter_id, chapter) in &record.results_by_chapter {
            md.push_str(&tally_row(
                chapter_id.as_str(),
                chapter.subject_id.as_str(),
                &chapter.tally,
            ));
        }
    }

    md
}
