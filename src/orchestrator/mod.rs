// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Orchestration
//!
//! Deploys a set of stacks one at a time in dependency order, and deletes
//! them in the reverse order.
//!
//! # Per-stack flow
//!
//! ```text
//! prepare → pre hooks → pre_create|pre_update hooks
//!   → collect parameters (one interactive retry)
//!   → register ──NoChange──> next stack
//!   → review: Apply | Diff (show, ask again) | Skip | Quit
//!   → protect resources (update) → execute + stream events
//!   → protect resources (create) → outputs
//!   → post_create|post_update hooks → post hooks
//! ```
//!
//! The first error stops the run; stacks already deployed stay deployed.
//! Quitting leaves the current change set registered.

pub mod approval;
pub mod presenter;
pub mod report;

pub use approval::{Approver, AutoApprove, Decision};
pub use presenter::{Presenter, TracingPresenter};
pub use report::{DeploymentReport, Outcome, StackOutcome};

use futures::future;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::context::DeployContext;
use crate::domain::{Change, OperationKind, StackDefinition, StackEvent, StackPolicy};
use crate::errors::{DeployError, DeployResult};
use crate::events::{track_while, EventTracker};
use crate::hooks::{run_hooks, HookRunner, ShellHookRunner};
use crate::lifecycle::ChangeSetLifecycle;
use crate::provisioning::{ProvisioningError, WaitTarget};
use crate::resolver::DependencyGraph;

enum StackRun {
    Finished(Outcome, Option<String>),
    Quit(Option<String>),
}

/// Drives change set lifecycles across a dependency-ordered stack set
pub struct DeploymentOrchestrator {
    ctx: DeployContext,
    approver: Arc<dyn Approver>,
    presenter: Arc<dyn Presenter>,
    hooks: Arc<dyn HookRunner>,
}

impl DeploymentOrchestrator {
    /// Auto-approving orchestrator that logs progress and runs hooks via `sh`
    pub fn new(ctx: DeployContext) -> Self {
        Self {
            ctx,
            approver: Arc::new(AutoApprove),
            presenter: Arc::new(TracingPresenter),
            hooks: Arc::new(ShellHookRunner::new()),
        }
    }

    pub fn with_approver(mut self, approver: Arc<dyn Approver>) -> Self {
        self.approver = approver;
        self
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookRunner>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn context(&self) -> &DeployContext {
        &self.ctx
    }

    /// Stacks in deployment order
    ///
    /// Fails before any remote call on duplicate names, undeclared
    /// dependencies and cycles.
    pub fn plan(stacks: &[StackDefinition]) -> DeployResult<Vec<Arc<StackDefinition>>> {
        let order = DependencyGraph::from_stacks(stacks)?.resolve()?;
        let mut by_name: HashMap<&str, &StackDefinition> =
            stacks.iter().map(|s| (s.name.as_str(), s)).collect();

        order
            .iter()
            .map(|name| {
                by_name
                    .remove(name.as_str())
                    .map(|s| Arc::new(s.clone()))
                    .ok_or_else(|| DeployError::StackDoesNotExist(name.clone()))
            })
            .collect()
    }

    /// Deploy every stack, dependencies first
    pub async fn deploy(&self, stacks: &[StackDefinition]) -> DeployResult<DeploymentReport> {
        let order = Self::plan(stacks)?;
        let mut report = DeploymentReport::new(self.ctx.run_id());
        info!(run_id = %self.ctx.run_id(), stacks = order.len(), "Deployment planned");

        let mut remaining = order.iter();
        while let Some(stack) = remaining.next() {
            let run = self
                .deploy_stack(stack.clone())
                .await
                .map_err(|e| e.in_stack(&stack.name))?;

            match run {
                StackRun::Finished(outcome, change_set_id) => {
                    report.record(&stack.name, outcome, change_set_id);
                }
                StackRun::Quit(change_set_id) => {
                    warn!(stack = %stack.name, "Deployment aborted by operator");
                    report.record(&stack.name, Outcome::Aborted, change_set_id);
                    for rest in remaining.by_ref() {
                        report.record(&rest.name, Outcome::Aborted, None);
                    }
                }
            }
        }

        info!(run_id = %self.ctx.run_id(), "Deployment finished");
        Ok(report)
    }

    async fn deploy_stack(&self, stack: Arc<StackDefinition>) -> DeployResult<StackRun> {
        let mut lifecycle = ChangeSetLifecycle::new(self.ctx.clone(), stack.clone());
        let run = self.run_stack(&mut lifecycle, &stack).await;
        lifecycle.close().await;
        run
    }

    async fn run_stack(
        &self,
        lifecycle: &mut ChangeSetLifecycle,
        stack: &StackDefinition,
    ) -> DeployResult<StackRun> {
        let name = stack.name.as_str();
        lifecycle.prepare().await?;
        let operation = lifecycle.operation();
        info!(stack = name, %operation, "Deploying stack");

        run_hooks(self.hooks.as_ref(), name, operation, &stack.hooks.pre).await?;
        run_hooks(
            self.hooks.as_ref(),
            name,
            operation,
            stack.hooks.before(operation),
        )
        .await?;

        self.collect_parameters(lifecycle).await?;

        let changes = match lifecycle.register().await {
            Ok(changes) => changes.to_vec(),
            Err(e) if e.is_no_change() => {
                self.presenter.no_change(name);
                return Ok(StackRun::Finished(Outcome::NoChange, None));
            }
            Err(e) => return Err(e),
        };
        let change_set_id = lifecycle
            .change_set()
            .and_then(|cs| cs.id())
            .map(str::to_string);

        self.presenter.changes(name, &changes);
        self.warn_destructive(stack, &changes);

        loop {
            let change_set = lifecycle
                .change_set()
                .ok_or_else(|| DeployError::NotPrepared(name.to_string()))?;
            match self.approver.review(change_set).await? {
                Decision::Apply => break,
                Decision::Diff => {
                    let diff = lifecycle.diff().await?;
                    self.presenter.diff(name, &diff);
                }
                Decision::Skip => {
                    info!(stack = name, "Change set skipped");
                    return Ok(StackRun::Finished(Outcome::Skipped, change_set_id));
                }
                Decision::Quit => return Ok(StackRun::Quit(change_set_id)),
            }
        }

        if operation == OperationKind::Update {
            self.protect_resources(stack).await?;
        }
        self.execute(lifecycle).await?;
        if operation == OperationKind::Create {
            self.protect_resources(stack).await?;
        }

        let description = self
            .ctx
            .service()
            .describe_stack(name)
            .await
            .map_err(|e| DeployError::remote(format!("describing stack {}", name), e))?;
        self.presenter.outputs(name, &description.outputs);

        run_hooks(
            self.hooks.as_ref(),
            name,
            operation,
            stack.hooks.after(operation),
        )
        .await?;
        run_hooks(self.hooks.as_ref(), name, operation, &stack.hooks.post).await?;

        Ok(StackRun::Finished(
            Outcome::deployed(operation),
            change_set_id,
        ))
    }

    /// Collect parameters, asking the approver once for missing values
    async fn collect_parameters(&self, lifecycle: &mut ChangeSetLifecycle) -> DeployResult<()> {
        let first = lifecycle.collect_parameters(&BTreeMap::new()).map(|_| ());
        match first {
            Err(DeployError::MissingParameters { keys }) => {
                let name = lifecycle.stack().name.clone();
                info!(stack = %name, missing = ?keys, "Requesting missing parameters");
                let supplied = self.approver.supply_parameters(&name, &keys).await?;
                lifecycle.collect_parameters(&supplied).map(|_| ())
            }
            other => other,
        }
    }

    /// Execute while forwarding stack events to the presenter
    async fn execute(&self, lifecycle: &mut ChangeSetLifecycle) -> DeployResult<()> {
        let (sink, events) = mpsc::channel(self.ctx.config().event_buffer);
        let (result, ()) = future::join(
            lifecycle.execute(sink),
            present_events(events, self.presenter.as_ref()),
        )
        .await;
        result
    }

    /// Apply the blocking policy for a stack's protected resources
    async fn protect_resources(&self, stack: &StackDefinition) -> DeployResult<()> {
        if stack.blocked_resources.is_empty() {
            return Ok(());
        }
        let service = self.ctx.service();
        let name = stack.name.as_str();

        let resources = service
            .describe_stack_resources(name)
            .await
            .map_err(|e| DeployError::remote(format!("listing resources of stack {}", name), e))?;
        for blocked in &stack.blocked_resources {
            if !resources.iter().any(|r| &r.logical_resource_id == blocked) {
                self.presenter.warning(
                    name,
                    &format!("Blocked resource {} does not exist in the stack", blocked),
                );
            }
        }

        let policy = StackPolicy::blocking(&stack.blocked_resources);
        service
            .set_stack_policy(name, &policy)
            .await
            .map_err(|e| DeployError::remote(format!("setting policy of stack {}", name), e))?;
        info!(stack = name, blocked = ?stack.blocked_resources, "Stack policy applied");
        Ok(())
    }

    fn warn_destructive(&self, stack: &StackDefinition, changes: &[Change]) {
        for change in changes.iter().filter(|c| c.is_destructive()) {
            if stack.blocked_resources.contains(&change.logical_resource_id) {
                self.presenter.warning(
                    &stack.name,
                    &format!(
                        "{} of blocked resource {} will be rejected by the stack policy",
                        if change.replacement { "Replacement" } else { "Removal" },
                        change.logical_resource_id
                    ),
                );
            }
        }
    }

    /// Delete every stack, dependents first
    ///
    /// Stacks that do not exist are reported as absent; each deletion is
    /// confirmed through the approver.
    pub async fn delete(&self, stacks: &[StackDefinition]) -> DeployResult<DeploymentReport> {
        let mut order = Self::plan(stacks)?;
        order.reverse();
        let mut report = DeploymentReport::new(self.ctx.run_id());

        for stack in &order {
            let name = stack.name.as_str();
            match self.ctx.service().describe_stack(name).await {
                Ok(_) => {}
                Err(ProvisioningError::StackDoesNotExist(_)) => {
                    info!(stack = name, "Stack does not exist, nothing to delete");
                    report.record(name, Outcome::Absent, None);
                    continue;
                }
                Err(e) => {
                    return Err(DeployError::remote(format!("describing stack {}", name), e)
                        .in_stack(name))
                }
            }

            if !self.approver.confirm_deletion(name).await? {
                report.record(name, Outcome::Skipped, None);
                continue;
            }

            self.delete_stack(name).await.map_err(|e| e.in_stack(name))?;
            report.record(name, Outcome::Deleted, None);
        }

        Ok(report)
    }

    async fn delete_stack(&self, name: &str) -> DeployResult<()> {
        let service = self.ctx.service().clone();
        let config = self.ctx.config();

        let mut tracker = EventTracker::new(name, service.clone());
        tracker.fresh_events().await?;

        info!(stack = name, "Deleting stack");
        let (sink, events) = mpsc::channel::<StackEvent>(config.event_buffer);
        let run = async {
            service
                .delete_stack(name)
                .await
                .map_err(|e| DeployError::remote(format!("deleting stack {}", name), e))?;
            service
                .wait_until_stack(name, WaitTarget::DeleteComplete, config.wait_policy())
                .await
                .map_err(|e| DeployError::remote(format!("waiting for deletion of stack {}", name), e))
        };

        let (result, ()) = future::join(
            track_while(tracker, config.event_poll_interval(), sink, run),
            present_events(events, self.presenter.as_ref()),
        )
        .await;
        result
    }
}

async fn present_events(mut events: mpsc::Receiver<StackEvent>, presenter: &dyn Presenter) {
    while let Some(event) = events.recv().await {
        presenter.event(&event);
    }
}
