// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Set Lifecycle
//!
//! Drives one stack from a resolved definition to a completed deployment.
//! Every remote step is followed by exactly one state machine transition,
//! so [`ChangeSetLifecycle::history`] always reflects what actually
//! happened remotely.
//!
//! ```text
//! prepare ─> collect_parameters ─> register ─┬─> execute ─> Succeeded
//!                                            ├─> NoChange
//!                                            └─> Failed
//! ```
//!
//! Uploaded templates are released as soon as registration finishes,
//! whatever its outcome. Callers that stop earlier release them with
//! [`ChangeSetLifecycle::close`]; a lifecycle dropped without either
//! falls back to releasing from a background task.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::artifact::{place_template, TemplatePlacement};
use crate::context::DeployContext;
use crate::diff::{DeployedStack, DiffEngine};
use crate::domain::{
    Change, ChangeSet, OperationKind, Registration, StackDefinition, StackEvent, Tag,
};
use crate::errors::{DeployError, DeployResult};
use crate::events::{track_while, EventTracker};
use crate::parameters::ParameterCollector;
use crate::provisioning::{
    CreateChangeSetRequest, ProvisioningError, StackDescription, TemplateParameter, WaitTarget,
};
use crate::state_machine::{
    ChangeSetState, LifecycleInput, StateMachineWithHistory, Transition,
};

/// Status reason of a change set that would not change anything
pub const NO_CHANGES_REASON: &str =
    "The submitted information didn't contain changes. Submit different information to create a change set.";

/// Older wording of [`NO_CHANGES_REASON`]
pub const NO_UPDATES_REASON: &str = "No updates are to be performed.";

/// Whether a failed change set's status reason means "nothing to deploy"
///
/// The service only signals this through free text.
pub fn is_no_change_reason(reason: &str) -> bool {
    let reason = reason.trim();
    reason == NO_CHANGES_REASON || reason == NO_UPDATES_REASON
}

/// Time-derived change set name, unique per millisecond
pub fn change_set_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, at.format("%Y%m%d%H%M%S%3f"))
}

/// Deployment of a single stack through one change set
pub struct ChangeSetLifecycle {
    ctx: DeployContext,
    stack: Arc<StackDefinition>,
    fsm: StateMachineWithHistory<ChangeSetState>,
    existing: Option<StackDescription>,
    declared: Option<Vec<TemplateParameter>>,
    placement: Option<TemplatePlacement>,
    change_set: Option<ChangeSet>,
}

impl ChangeSetLifecycle {
    pub fn new(ctx: DeployContext, stack: Arc<StackDefinition>) -> Self {
        Self {
            ctx,
            stack,
            fsm: StateMachineWithHistory::new(ChangeSetState::Built),
            existing: None,
            declared: None,
            placement: None,
            change_set: None,
        }
    }

    pub fn stack(&self) -> &StackDefinition {
        &self.stack
    }

    pub fn state(&self) -> ChangeSetState {
        *self.fsm.current_state()
    }

    /// Every transition taken so far, oldest first
    pub fn history(&self) -> &[Transition<ChangeSetState, LifecycleInput>] {
        self.fsm.get_history()
    }

    /// Live stack description, if the stack has been deployed
    pub fn deployed(&self) -> Option<&StackDescription> {
        self.existing.as_ref().filter(|s| s.is_deployed())
    }

    /// Create for absent or in-review stacks, update otherwise
    pub fn operation(&self) -> OperationKind {
        if self.deployed().is_some() {
            OperationKind::Update
        } else {
            OperationKind::Create
        }
    }

    pub fn change_set(&self) -> Option<&ChangeSet> {
        self.change_set.as_ref()
    }

    /// Inspect the live stack, place the template and validate it
    pub async fn prepare(&mut self) -> DeployResult<()> {
        let name = self.stack.name.clone();

        self.existing = match self.ctx.service().describe_stack(&name).await {
            Ok(description) => Some(description),
            Err(ProvisioningError::StackDoesNotExist(_)) => None,
            Err(e) => {
                self.fail();
                return Err(DeployError::remote(format!("describing stack {}", name), e));
            }
        };

        let key = format!(
            "{}/{}/{}.template",
            self.ctx.config().change_set_prefix,
            name,
            self.ctx.run_id()
        );
        let placement = match place_template(
            self.ctx.artifacts().as_ref(),
            self.ctx.config(),
            &key,
            &self.stack.template_body,
        )
        .await
        {
            Ok(placement) => placement,
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };

        let validated = self
            .ctx
            .service()
            .validate_template(&placement.location)
            .await;
        self.placement = Some(placement);

        match validated {
            Ok(summary) => {
                debug!(
                    stack = %name,
                    operation = %self.operation(),
                    declared = summary.parameters.len(),
                    "Stack prepared"
                );
                self.declared = Some(summary.parameters);
                Ok(())
            }
            Err(e) => {
                self.release_artifact().await;
                self.fail();
                Err(DeployError::remote(
                    format!("validating template of stack {}", name),
                    e,
                ))
            }
        }
    }

    /// Reconcile parameters and build the change set
    ///
    /// `supplied` values take precedence over the definition's overrides.
    /// May be called again after a `MissingParameters` failure.
    pub fn collect_parameters(
        &mut self,
        supplied: &BTreeMap<String, String>,
    ) -> DeployResult<&ChangeSet> {
        let declared = self
            .declared
            .as_deref()
            .ok_or_else(|| DeployError::NotPrepared(self.stack.name.clone()))?;
        let location = self
            .placement
            .as_ref()
            .map(|p| p.location.clone())
            .ok_or_else(|| DeployError::NotPrepared(self.stack.name.clone()))?;

        let mut overrides = self.stack.parameters.clone();
        overrides.extend(supplied.iter().map(|(k, v)| (k.clone(), v.clone())));

        let parameters =
            ParameterCollector::new(declared, &overrides, self.existing.as_ref()).collect()?;

        let change_set = ChangeSet {
            stack_name: self.stack.name.clone(),
            parameters,
            tags: self
                .stack
                .tags
                .iter()
                .map(|(k, v)| Tag::new(k.clone(), v.clone()))
                .collect(),
            template: location,
            body: self.stack.template_body.clone(),
            capabilities: self.stack.capabilities.clone(),
            operation: self.operation(),
            registration: None,
        };
        Ok(self.change_set.insert(change_set))
    }

    /// Submit the change set and wait for it to materialize
    ///
    /// Returns the planned changes in service order. A change set with
    /// nothing to deploy ends in `NoChange` and returns
    /// [`DeployError::NoChange`].
    pub async fn register(&mut self) -> DeployResult<&[Change]> {
        if self.change_set.is_none() {
            return Err(DeployError::NotPrepared(self.stack.name.clone()));
        }
        self.advance(LifecycleInput::Submit)?;

        let name = change_set_name(&self.ctx.config().change_set_prefix, Utc::now());
        let result = match self.change_set.as_ref() {
            Some(change_set) => self.submit(change_set, &name).await,
            None => Err(DeployError::NotPrepared(self.stack.name.clone())),
        };
        self.release_artifact().await;

        match result {
            Ok(registration) => {
                self.advance(LifecycleInput::Materialized)?;
                info!(
                    stack = %self.stack.name,
                    change_set_id = %registration.id,
                    changes = registration.changes.len(),
                    "Change set ready"
                );
                let change_set = self
                    .change_set
                    .as_mut()
                    .ok_or_else(|| DeployError::NotPrepared(self.stack.name.clone()))?;
                Ok(change_set.registration.insert(registration).changes.as_slice())
            }
            Err(e) if e.is_no_change() => {
                self.advance(LifecycleInput::NothingToDeploy)?;
                Err(e)
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    async fn submit(&self, change_set: &ChangeSet, name: &str) -> DeployResult<Registration> {
        let service = self.ctx.service();
        let stack = change_set.stack_name.as_str();

        let request = CreateChangeSetRequest {
            stack_name: stack.to_string(),
            change_set_name: name.to_string(),
            operation: change_set.operation,
            template: change_set.template.clone(),
            parameters: change_set.parameters.clone(),
            tags: change_set.tags.clone(),
            capabilities: change_set.capabilities.clone(),
        };
        let id = service.create_change_set(request).await.map_err(|e| {
            DeployError::remote(format!("creating change set {} for stack {}", name, stack), e)
        })?;
        debug!(stack, change_set_id = %id, operation = %change_set.operation, "Change set submitted");

        match service.wait_until_change_set_created(&id).await {
            Ok(()) => {}
            Err(ProvisioningError::ResourceNotReady(_)) => {
                let page = service
                    .describe_change_set(&id, None)
                    .await
                    .map_err(|e| DeployError::remote(format!("describing change set {}", id), e))?;
                let reason = page.status_reason.unwrap_or_default();
                if is_no_change_reason(&reason) {
                    return Err(DeployError::NoChange {
                        stack: stack.to_string(),
                    });
                }
                return Err(DeployError::ChangeSetFailed {
                    change_set_id: id,
                    status: page.status,
                    reason,
                });
            }
            Err(e) => {
                return Err(DeployError::remote(
                    format!("waiting for change set {}", id),
                    e,
                ))
            }
        }

        let mut changes = Vec::new();
        let mut token: Option<String> = None;
        let mut seen = HashSet::new();
        loop {
            let page = service
                .describe_change_set(&id, token.as_deref())
                .await
                .map_err(|e| DeployError::remote(format!("describing change set {}", id), e))?;
            changes.extend(page.changes);
            let Some(next) = page.next_token else { break };
            if !seen.insert(next.clone()) {
                return Err(DeployError::remote(
                    format!("describing change set {}", id),
                    ProvisioningError::Service(format!("continuation token {} repeated", next)),
                ));
            }
            token = Some(next);
        }

        Ok(Registration {
            id,
            name: name.to_string(),
            changes,
        })
    }

    /// Unified diff of the live stack against the change set
    pub async fn diff(&self) -> DeployResult<String> {
        let change_set = self
            .change_set
            .as_ref()
            .ok_or_else(|| DeployError::NotPrepared(self.stack.name.clone()))?;
        let engine = DiffEngine::new().with_color(self.ctx.config().color);

        let Some(description) = self.deployed() else {
            return Ok(engine.diff(change_set, None));
        };
        let body = self
            .ctx
            .service()
            .get_template(&self.stack.name)
            .await
            .map_err(|e| {
                DeployError::remote(format!("fetching template of stack {}", self.stack.name), e)
            })?;

        Ok(engine.diff(
            change_set,
            Some(DeployedStack {
                description,
                template_body: &body,
            }),
        ))
    }

    /// Execute the registered change set and wait for the stack
    ///
    /// Events recorded while executing are sent to `sink` oldest-first.
    /// The caller must drain `sink` while this runs: once the channel is
    /// full the event poller blocks, and the final drain never completes.
    pub async fn execute(&mut self, sink: mpsc::Sender<StackEvent>) -> DeployResult<()> {
        let (id, operation) = match self.change_set.as_ref() {
            Some(cs) => match cs.id() {
                Some(id) => (id.to_string(), cs.operation),
                None => return Err(DeployError::NotPrepared(self.stack.name.clone())),
            },
            None => return Err(DeployError::NotPrepared(self.stack.name.clone())),
        };
        self.advance(LifecycleInput::Execute)?;

        let service = self.ctx.service().clone();
        let config = self.ctx.config().clone();
        let stack = self.stack.name.clone();

        let mut tracker = EventTracker::new(stack.clone(), service.clone());
        if let Err(e) = tracker.fresh_events().await {
            self.fail();
            return Err(e);
        }

        info!(stack = %stack, change_set_id = %id, %operation, "Executing change set");
        let run = async {
            service
                .execute_change_set(&id)
                .await
                .map_err(|e| DeployError::remote(format!("executing change set {}", id), e))?;
            match service
                .wait_until_stack(&stack, WaitTarget::from(operation), config.wait_policy())
                .await
            {
                Ok(()) => Ok(()),
                Err(ProvisioningError::WaitExhausted { attempts }) => {
                    Err(self.wait_timeout(&id, attempts).await)
                }
                Err(ProvisioningError::ResourceNotReady(detail)) => {
                    Err(self.execution_failure(&id, detail).await)
                }
                Err(e) => Err(DeployError::remote(
                    format!("waiting for stack {}", stack),
                    e,
                )),
            }
        };

        let result = track_while(tracker, config.event_poll_interval(), sink, run).await;
        match result {
            Ok(()) => {
                self.advance(LifecycleInput::Complete)?;
                info!(stack = %stack, status = operation.complete_status(), "Stack complete");
                Ok(())
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    /// Explain a stack that stopped in a failure state
    async fn execution_failure(&self, change_set_id: &str, detail: String) -> DeployError {
        let stack = self.stack.name.clone();
        match self.ctx.service().describe_stack(&stack).await {
            Ok(description) => DeployError::ExecutionFailed {
                stack,
                change_set_id: change_set_id.to_string(),
                status: description.status.to_string(),
                reason: description.status_reason.unwrap_or(detail),
            },
            Err(e) => DeployError::remote(format!("describing failed stack {}", stack), e),
        }
    }

    /// Report the last known stack status once the wait budget is spent
    async fn wait_timeout(&self, change_set_id: &str, attempts: u32) -> DeployError {
        let stack = self.stack.name.clone();
        match self.ctx.service().describe_stack(&stack).await {
            Ok(description) => DeployError::WaitTimeout {
                stack,
                change_set_id: change_set_id.to_string(),
                attempts,
                status: description.status.to_string(),
                reason: description.status_reason.unwrap_or_default(),
            },
            Err(e) => DeployError::remote(format!("describing stalled stack {}", stack), e),
        }
    }

    fn advance(&mut self, input: LifecycleInput) -> DeployResult<()> {
        self.fsm.transition_with_history(input, Utc::now())?;
        debug!(stack = %self.stack.name, state = %self.state(), "Change set state");
        Ok(())
    }

    /// Move to `Failed` unless the machine is already terminal
    fn fail(&mut self) {
        if !self.state().is_terminal() {
            let _ = self.advance(LifecycleInput::Fail);
        }
    }

    /// Release the uploaded template if this lifecycle still holds it
    ///
    /// Safe to call more than once and in any state.
    pub async fn close(&mut self) {
        self.release_artifact().await;
    }

    async fn release_artifact(&mut self) {
        let Some(location) = self.placement.as_mut().and_then(|p| p.uploaded.take()) else {
            return;
        };
        if let Err(e) = self.ctx.artifacts().release(&location).await {
            warn!(stack = %self.stack.name, %location, error = %e, "Failed to release template artifact");
        }
    }
}

impl Drop for ChangeSetLifecycle {
    fn drop(&mut self) {
        let Some(location) = self.placement.as_mut().and_then(|p| p.uploaded.take()) else {
            return;
        };
        let artifacts = self.ctx.artifacts().clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = artifacts.release(&location).await {
                        warn!(%location, error = %e, "Failed to release template artifact");
                    }
                });
            }
            Err(_) => warn!(%location, "Template artifact left behind; no runtime to release it"),
        }
    }
}
