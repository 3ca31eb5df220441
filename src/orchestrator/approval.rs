// Copyright (c) 2025 - Cowboy AI, Inc.
//! Operator decisions
//!
//! The interactive prompt lives outside this crate; the orchestrator only
//! sees the [`Approver`] trait.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::ChangeSet;
use crate::errors::{DeployError, DeployResult};

/// Answer to a registered change set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Execute the change set
    Apply,

    /// Show the diff, then ask again
    Diff,

    /// Leave the change set registered and continue with the next stack
    Skip,

    /// Abort the remaining stacks; the change set stays registered
    Quit,
}

/// Source of approvals and missing parameter values
#[async_trait]
pub trait Approver: Send + Sync {
    /// Values for parameters nothing else could resolve
    ///
    /// Called at most once per stack.
    async fn supply_parameters(
        &self,
        stack: &str,
        missing: &[String],
    ) -> DeployResult<BTreeMap<String, String>>;

    async fn review(&self, change_set: &ChangeSet) -> DeployResult<Decision>;

    async fn confirm_deletion(&self, stack: &str) -> DeployResult<bool>;
}

/// Non-interactive approver: applies everything, supplies nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Approver for AutoApprove {
    async fn supply_parameters(
        &self,
        _stack: &str,
        missing: &[String],
    ) -> DeployResult<BTreeMap<String, String>> {
        Err(DeployError::MissingParameters {
            keys: missing.to_vec(),
        })
    }

    async fn review(&self, _change_set: &ChangeSet) -> DeployResult<Decision> {
        Ok(Decision::Apply)
    }

    async fn confirm_deletion(&self, _stack: &str) -> DeployResult<bool> {
        Ok(true)
    }
}
