// Copyright (c) 2025 - Cowboy AI, Inc.
//! Progress presentation

use tracing::{info, warn};

use crate::domain::{Change, StackEvent};
use crate::provisioning::StackOutput;

/// Receives everything the operator should see during a run
///
/// Calls happen on the orchestrator's task, in order.
pub trait Presenter: Send + Sync {
    /// Planned changes of a registered change set
    fn changes(&self, stack: &str, changes: &[Change]);

    fn diff(&self, stack: &str, diff: &str);

    /// One stack event, delivered oldest-first per stack
    fn event(&self, event: &StackEvent);

    fn no_change(&self, stack: &str);

    fn outputs(&self, stack: &str, outputs: &[StackOutput]);

    fn warning(&self, stack: &str, message: &str);
}

/// Presents everything as log records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn changes(&self, stack: &str, changes: &[Change]) {
        info!(stack, count = changes.len(), "Planned changes");
        for change in changes {
            info!(
                stack,
                action = %change.action,
                resource_type = %change.resource_type,
                logical_resource_id = %change.logical_resource_id,
                replacement = change.replacement,
                "Change"
            );
        }
    }

    fn diff(&self, stack: &str, diff: &str) {
        info!(stack, "Diff\n{}", diff);
    }

    fn event(&self, event: &StackEvent) {
        info!(stack = %event.stack_name, "{}", event);
    }

    fn no_change(&self, stack: &str) {
        info!(stack, "No changes to deploy");
    }

    fn outputs(&self, stack: &str, outputs: &[StackOutput]) {
        for output in outputs {
            info!(stack, key = %output.key, value = %output.value, "Output");
        }
    }

    fn warning(&self, stack: &str, message: &str) {
        warn!(stack, "{}", message);
    }
}
