//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use neetprep_core::ids::ChapterId;
use neetprep_core::report::{format_clock, ResultRecord};
use neetprep_core::scoring::{accuracy_percent, ChapterBreakdown, Tally};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn tally_cells(tally: &Tally) -> String {
    format!(
        "<td>{}</td><td class=\"pass\">{}</td><td class=\"fail\">{}</td><td>{}%</td>",
        tally.attempted,
        tally.correct,
        tally.wrong,
        accuracy_percent(tally.correct, tally.attempted)
    )
}

/// Generate an HTML report for one attempt.
pub fn generate_html(record: &ResultRecord) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>neetprep result: {}</title>\n",
        html_escape(&record.variant.to_string())
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>neetprep result</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Test: <strong>{}</strong> | learner {} | {}</p>\n",
        html_escape(&record.variant.to_string()),
        html_escape(&record.user_id),
        record.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Score card
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<div class=\"cards\">\n");
    let cards = [
        ("Score", format!("{} / {}", record.score, record.total_marks)),
        ("Accuracy", format!("{}%", record.accuracy)),
        (
            "Answered",
            format!("{} of {}", record.answered, record.total_questions),
        ),
        ("Correct", record.correct.to_string()),
        ("Wrong", record.wrong.to_string()),
        ("Unanswered", record.unanswered.to_string()),
        (
            "Time taken",
            format!(
                "{} of {}",
                record.total_time_taken,
                format_clock(record.total_time_secs)
            ),
        ),
    ];
    for (label, value) in cards {
        html.push_str(&format!(
            "<div class=\"card\"><span class=\"label\">{label}</span><span class=\"value\">{}</span></div>\n",
            html_escape(&value)
        ));
    }
    html.push_str("</div>\n");

    if !record.results_by_chapter.is_empty() {
        html.push_str(&generate_bar_chart(&record.results_by_chapter));
    }
    html.push_str("</section>\n");

    // Question type breakdown
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>By question type</h2>\n");
    if record.results_by_type.is_empty() {
        html.push_str("<p class=\"meta\">No questions were attempted.</p>\n");
    } else {
        html.push_str("<table class=\"results-table\">\n");
        html.push_str("<thead><tr><th>Type</th><th>Subject</th><th>Attempted</th><th>Correct</th><th>Wrong</th><th>Accuracy</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for (type_id, breakdown) in &record.results_by_type {
            html.push_str(&format!(
                "<tr class=\"total\"><td>{}</td><td>all</td>{}</tr>\n",
                html_escape(type_id.as_str()),
                tally_cells(&breakdown.tally)
            ));
            for (subject_id, tally) in &breakdown.subjects {
                html.push_str(&format!(
                    "<tr><td></td><td>{}</td>{}</tr>\n",
                    html_escape(subject_id.as_str()),
                    tally_cells(tally)
                ));
            }
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</section>\n");

    // Chapter breakdown
    if !record.results_by_chapter.is_empty() {
        html.push_str("<section class=\"results\">\n");
        html.push_str("<h2>By chapter</h2>\n");
        html.push_str("<table class=\"results-table\" id=\"chapters\">\n");
        html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Chapter</th><th onclick=\"sortTable(1)\">Subject</th><th onclick=\"sortTable(2)\">Attempted</th><th onclick=\"sortTable(3)\">Correct</th><th onclick=\"sortTable(4)\">Wrong</th><th onclick=\"sortTable(5)\">Accuracy</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for (chapter_id, chapter) in &record.results_by_chapter {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td>{}</tr>\n",
                html_escape(chapter_id.as_str()),
                html_escape(chapter.subject_id.as_str()),
                tally_cells(&chapter.tally)
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(record).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(record: &ResultRecord, path: &Path) -> Result<()> {
    let html = generate_html(record);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

/// Horizontal bars of per-chapter accuracy.
fn generate_bar_chart(chapters: &BTreeMap<ChapterId, ChapterBreakdown>) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 200;

    let total_height = chapters.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (chapter_id, chapter)) in chapters.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let accuracy = accuracy_percent(chapter.tally.correct, chapter.tally.attempted) as usize;
        let width = accuracy * max_width / 100;

        let color = if accuracy >= 80 {
            "#22c55e"
        } else if accuracy >= 50 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(chapter_id.as_str())
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            accuracy
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.cards { display: flex; flex-wrap: wrap; gap: 1rem; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 0.75rem 1.25rem; min-width: 8rem; }
.card .label { display: block; color: #6b7280; font-size: 0.8rem; }
.card .value { font-size: 1.4rem; font-weight: bold; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
tr.total { font-weight: bold; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('chapters');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    if (!isNaN(na) && !isNaN(nb)) return asc ? na - nb : nb - na;
    return asc ? va.localeCompare(vb) : vb.localeCompare(va);
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
