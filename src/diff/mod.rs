// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Set Diffs
//!
//! Previews a change set as up to three unified diffs: parameters, tags and
//! template body. Each compares the deployed stack against the proposal;
//! a stack that is not deployed diffs against `/dev/null`.
//!
//! Empty sub-diffs are omitted, the rest are separated by a blank line.
//! Colorization is a separate pass and never changes the text content.

pub mod colorize;
pub mod unified;

pub use colorize::colorize;
pub use unified::{unified_diff, DEV_NULL};

use crate::domain::{ChangeSet, ParameterValue, Tag};
use crate::provisioning::StackDescription;
use unified::text_lines;

/// Lines of context around each hunk
pub const CONTEXT_LINES: usize = 5;

/// What is live for a stack that has been deployed
#[derive(Debug, Clone, Copy)]
pub struct DeployedStack<'a> {
    pub description: &'a StackDescription,
    pub template_body: &'a str,
}

/// Renders change set previews
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    context: usize,
    color: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine {
    pub fn new() -> Self {
        Self {
            context: CONTEXT_LINES,
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Diff `change_set` against `deployed`; empty when nothing differs
    pub fn diff(&self, change_set: &ChangeSet, deployed: Option<DeployedStack<'_>>) -> String {
        let stack = change_set.stack_name.as_str();

        let old_parameters: Vec<String> = deployed
            .map(|d| {
                d.description
                    .parameters
                    .iter()
                    .map(|p| key_value(&p.key, &p.value))
                    .collect()
            })
            .unwrap_or_default();
        let new_parameters: Vec<String> = change_set
            .parameters
            .iter()
            .map(|p| match &p.value {
                ParameterValue::Explicit(value) => key_value(&p.key, value),
                ParameterValue::UsePrevious => {
                    let previous = deployed
                        .and_then(|d| d.description.parameter(&p.key))
                        .unwrap_or("<previous value>");
                    key_value(&p.key, previous)
                }
            })
            .collect();

        let old_tags: Vec<String> = deployed
            .map(|d| sorted_tags(&d.description.tags))
            .unwrap_or_default();
        let new_tags = sorted_tags(&change_set.tags);

        let old_body = deployed.map(|d| text_lines(d.template_body)).unwrap_or_default();
        let new_body = text_lines(&change_set.body);

        let sections = [
            self.section(
                &as_lines(&old_parameters),
                &as_lines(&new_parameters),
                deployed.is_some(),
                &format!("{}/parameters", stack),
            ),
            self.section(
                &as_lines(&old_tags),
                &as_lines(&new_tags),
                deployed.is_some(),
                &format!("{}/tags", stack),
            ),
            self.section(&old_body, &new_body, deployed.is_some(), stack),
        ];

        let text = sections
            .iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        if self.color {
            colorize(&text)
        } else {
            text
        }
    }

    fn section(&self, old: &[&str], new: &[&str], deployed: bool, path: &str) -> String {
        let old_name = if deployed {
            format!("old/{}", path)
        } else {
            DEV_NULL.to_string()
        };
        unified_diff(old, new, &old_name, &format!("new/{}", path), self.context)
    }
}

fn key_value(key: &str, value: &str) -> String {
    format!("{}: {}", key, value)
}

fn sorted_tags(tags: &[Tag]) -> Vec<String> {
    let mut tags: Vec<&Tag> = tags.iter().collect();
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    tags.into_iter().map(|t| key_value(&t.key, &t.value)).collect()
}

fn as_lines(lines: &[String]) -> Vec<&str> {
    lines.iter().map(String::as_str).collect()
}
