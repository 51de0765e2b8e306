//! Verdict and label styling for CLI output.
//!
//! `console` drops styling when stdout is not a terminal or `NO_COLOR` is set.

use console::{style, StyledObject};

use crate::domain::models::GateVerdict;

/// Green for accepted work, yellow for a gate that gave up.
pub fn colorize_verdict(verdict: GateVerdict) -> StyledObject<&'static str> {
    match verdict {
        GateVerdict::Accepted => style("accepted").green().bold(),
        GateVerdict::BelowThreshold => style("below threshold").yellow().bold(),
    }
}

/// Score colored against its threshold.
pub fn colorize_score(score: f64, threshold: f64) -> StyledObject<String> {
    let text = format!("{score:.2}");
    if score >= threshold {
        style(text).green()
    } else {
        style(text).red()
    }
}

/// Styled label for detail views (bold + dimmed colon).
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}

/// Section header with underline.
pub fn section_header(title: &str) -> String {
    format!("\n{}", style(title).bold().underlined())
}

/// Render a success action result.
pub fn action_success(message: &str) -> String {
    format!("{} {message}", style("\u{2713}").green().bold())
}

/// Render a neutral action result.
pub fn action_skipped(message: &str) -> String {
    format!("{} {message}", style("-").dim())
}
