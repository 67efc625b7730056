//! Terminal progress indicators.
//!
//! Bars draw to stderr and stay hidden when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};

/// Parse a qemu-img `-p` progress marker such as `    (42.50/100%)`.
pub fn parse_percent(line: &str) -> Option<f32> {
    let line = line.trim();
    let inner = line.strip_prefix('(')?.strip_suffix("/100%)")?;
    let percent: f32 = inner.trim().parse().ok()?;
    (0.0..=100.0).contains(&percent).then_some(percent)
}

/// An indeterminate spinner for tools that report no progress.
pub fn spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb
}

/// A 0-100 bar fed from a tool's own progress stream.
pub fn percent_bar(msg: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos:>3}% [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(100);
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("    (0.00/100%)"), Some(0.0));
        assert_eq!(parse_percent("(42.50/100%)"), Some(42.5));
        assert_eq!(parse_percent("  (100.00/100%)  "), Some(100.0));
    }

    #[test]
    fn test_parse_percent_rejects_other_output() {
        assert_eq!(parse_percent(""), None);
        assert_eq!(parse_percent("Image converted"), None);
        assert_eq!(parse_percent("(abc/100%)"), None);
        assert_eq!(parse_percent("(150.00/100%)"), None);
        assert_eq!(parse_percent("(50.00/200%)"), None);
    }

    #[test]
    fn test_bars_construct() {
        let pb = percent_bar("Converting");
        pb.set_position(50);
        assert_eq!(pb.position(), 50);
        pb.finish_and_clear();

        spinner("Archiving").finish_and_clear();
    }
}
