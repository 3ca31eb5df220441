// Copyright (c) 2025 - Cowboy AI, Inc.
//! Terminal decoration for unified diffs

use colored::Colorize;

/// Colorize added, removed and hunk header lines
///
/// Line content is never altered, only wrapped in escape codes, and the
/// `colored` override (`NO_COLOR`, non-tty) is honoured.
pub fn colorize(diff: &str) -> String {
    let mut out = String::with_capacity(diff.len() * 2);
    for line in diff.split_inclusive('\n') {
        let (text, newline) = match line.strip_suffix('\n') {
            Some(text) => (text, "\n"),
            None => (line, ""),
        };
        let decorated = if text.starts_with("+++") || text.starts_with("---") {
            text.bold().to_string()
        } else if text.starts_with('+') {
            text.green().to_string()
        } else if text.starts_with('-') {
            text.red().to_string()
        } else if text.starts_with("@@") {
            text.cyan().to_string()
        } else {
            text.to_string()
        };
        out.push_str(&decorated);
        out.push_str(newline);
    }
    out
}
