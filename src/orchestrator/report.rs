// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment run summary

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::OperationKind;

/// What happened to one stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    NoChange,
    /// Change set registered but not executed
    Skipped,
    Deleted,
    /// Deletion requested for a stack that does not exist
    Absent,
    /// Not processed because the operator quit
    Aborted,
}

impl Outcome {
    pub fn deployed(operation: OperationKind) -> Self {
        match operation {
            OperationKind::Create => Outcome::Created,
            OperationKind::Update => Outcome::Updated,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::NoChange => "no change",
            Outcome::Skipped => "skipped",
            Outcome::Deleted => "deleted",
            Outcome::Absent => "absent",
            Outcome::Aborted => "aborted",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutcome {
    pub stack: String,
    pub outcome: Outcome,
    /// Change set left behind or executed, when one was registered
    pub change_set_id: Option<String>,
}

/// Outcomes of a run in processing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub run_id: Uuid,
    pub stacks: Vec<StackOutcome>,
}

impl DeploymentReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stacks: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        stack: impl Into<String>,
        outcome: Outcome,
        change_set_id: Option<String>,
    ) {
        self.stacks.push(StackOutcome {
            stack: stack.into(),
            outcome,
            change_set_id,
        });
    }

    pub fn outcome(&self, stack: &str) -> Option<Outcome> {
        self.stacks
            .iter()
            .find(|s| s.stack == stack)
            .map(|s| s.outcome)
    }

    /// Stack names in processing order
    pub fn order(&self) -> Vec<&str> {
        self.stacks.iter().map(|s| s.stack.as_str()).collect()
    }

    /// True when the operator quit before the run finished
    pub fn is_aborted(&self) -> bool {
        self.stacks.iter().any(|s| s.outcome == Outcome::Aborted)
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.stacks.iter().map(|s| s.stack.len()).max().unwrap_or(0);
        for entry in &self.stacks {
            write!(f, "{:<width$}  {}", entry.stack, entry.outcome, width = width)?;
            if let Some(id) = &entry.change_set_id {
                write!(f, "  {}", id)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
