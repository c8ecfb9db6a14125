//! neetprep-report — Result report generation.
//!
//! Renders a submitted [`ResultRecord`](neetprep_core::report::ResultRecord)
//! as a self-contained HTML page or as Markdown for terminals and chat.

pub mod html;
pub mod markdown;

#[cfg(test)]
pub(crate) mod tests_support;
