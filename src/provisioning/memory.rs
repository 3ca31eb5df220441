// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Provisioning Service
//!
//! A complete implementation of [`ProvisioningService`] that keeps stacks,
//! change sets and events in process memory. Used for dry runs and as the
//! test double for every lifecycle and orchestrator test.
//!
//! Behaviour mirrors the remote service where the engine depends on it:
//!
//! - creating a change set for an unknown stack registers the stack in
//!   `REVIEW_IN_PROGRESS`
//! - a change set that changes nothing fails with the service's
//!   "didn't contain changes" reason
//! - change listings are paginated with a continuation token
//! - events are listed newest-first
//! - waiters poll with the caller's attempt budget
//!
//! Scripted behaviour (`plan_changes`, `fail_next_change_set`,
//! `fail_execution`, `stall`) lets tests drive the failure paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::{
    ChangeSetPage, CreateChangeSetRequest, ProvisioningError, ProvisioningResult,
    ProvisioningService, StackDescription, StackOutput, StackParameter, StackResource,
    TemplateParameter, TemplateSummary, WaitPolicy, WaitTarget,
};
use crate::artifact::InMemoryArtifactStore;
use crate::domain::{
    Change, ChangeAction, OperationKind, ParameterValue, StackEvent, StackPolicy, StackStatus, Tag,
    TemplateLocation,
};
use crate::lifecycle::NO_CHANGES_REASON;

const STACK_RESOURCE_TYPE: &str = "Stack";

#[derive(Debug, Clone)]
struct SimStack {
    stack_id: String,
    status: StackStatus,
    status_reason: Option<String>,
    body: Option<String>,
    parameters: Vec<StackParameter>,
    tags: Vec<Tag>,
    outputs: Vec<StackOutput>,
    resources: BTreeMap<String, StackResource>,
    /// Newest first
    events: Vec<StackEvent>,
    policy: Option<StackPolicy>,
}

impl SimStack {
    fn new(stack_id: String, status: &str) -> Self {
        Self {
            stack_id,
            status: StackStatus::new(status),
            status_reason: None,
            body: None,
            parameters: Vec::new(),
            tags: Vec::new(),
            outputs: Vec::new(),
            resources: BTreeMap::new(),
            events: Vec::new(),
            policy: None,
        }
    }

    fn is_live(&self) -> bool {
        self.status.as_str() != StackStatus::DELETE_COMPLETE
    }
}

#[derive(Debug, Clone)]
struct SimChangeSet {
    stack_name: String,
    operation: OperationKind,
    status: String,
    status_reason: Option<String>,
    executed: bool,
    changes: Vec<Change>,
    body: String,
    parameters: Vec<StackParameter>,
    tags: Vec<Tag>,
    capabilities: Vec<String>,
}

#[derive(Debug, Default)]
struct SimState {
    stacks: BTreeMap<String, SimStack>,
    change_sets: HashMap<String, SimChangeSet>,
    templates: HashMap<String, Vec<TemplateParameter>>,
    planned: HashMap<String, Vec<Change>>,
    change_set_failures: HashMap<String, String>,
    execution_failures: HashMap<String, String>,
    stalled: HashSet<String>,
    looping_pages: HashSet<String>,
    outputs: HashMap<String, Vec<StackOutput>>,
    next_event: u64,
    next_change_set: u64,
    calls: Vec<String>,
}

impl SimState {
    fn push_event(
        &mut self,
        stack_name: &str,
        resource_type: &str,
        logical_id: &str,
        status: &str,
        reason: Option<&str>,
    ) {
        self.next_event += 1;
        let event = StackEvent {
            event_id: format!("{:x}-{}", self.next_event * 7919, self.next_event),
            stack_name: stack_name.to_string(),
            resource_type: resource_type.to_string(),
            logical_resource_id: logical_id.to_string(),
            status: status.to_string(),
            status_reason: reason.map(str::to_string),
            timestamp: Utc::now(),
        };
        if let Some(stack) = self.stacks.get_mut(stack_name) {
            stack.events.insert(0, event);
        }
    }

    fn live_stack(&self, name: &str) -> ProvisioningResult<&SimStack> {
        self.stacks
            .get(name)
            .filter(|s| s.is_live())
            .ok_or_else(|| missing_stack(name))
    }
}

fn missing_stack(name: &str) -> ProvisioningError {
    ProvisioningError::from_message(format!("Stack with id {} does not exist", name))
}

/// In-memory provisioning service
#[derive(Debug)]
pub struct InMemoryProvisioner {
    state: Mutex<SimState>,
    artifacts: Option<Arc<InMemoryArtifactStore>>,
    page_size: usize,
}

impl Default for InMemoryProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvisioner {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            artifacts: None,
            page_size: 2,
        }
    }

    /// Resolve uploaded template locations through `store`
    pub fn with_artifacts(mut self, store: Arc<InMemoryArtifactStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// Number of changes per describe-change-set page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Parameters validate-template reports for `body`
    pub fn declare_template(&self, body: &str, parameters: Vec<TemplateParameter>) {
        self.lock().templates.insert(body.to_string(), parameters);
    }

    /// Register an already deployed stack
    pub fn seed_stack(
        &self,
        name: &str,
        body: &str,
        parameters: &[(&str, &str)],
        tags: &[(&str, &str)],
    ) {
        let mut state = self.lock();
        let mut stack = SimStack::new(format!("stack/{}", name), StackStatus::CREATE_COMPLETE);
        stack.body = Some(body.to_string());
        stack.parameters = parameters
            .iter()
            .map(|(k, v)| StackParameter {
                key: k.to_string(),
                value: v.to_string(),
            })
            .collect();
        stack.tags = tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect();
        state.stacks.insert(name.to_string(), stack);
        state.push_event(name, STACK_RESOURCE_TYPE, name, StackStatus::CREATE_IN_PROGRESS, None);
        state.push_event(name, STACK_RESOURCE_TYPE, name, StackStatus::CREATE_COMPLETE, None);
    }

    /// Record an event on an existing stack, as if the service had
    pub fn record_event(&self, stack_name: &str, logical_id: &str, status: &str) {
        self.lock()
            .push_event(stack_name, "Resource", logical_id, status, None);
    }

    /// Resource changes the next change set for `stack_name` lists
    pub fn plan_changes(&self, stack_name: &str, changes: Vec<Change>) {
        self.lock().planned.insert(stack_name.to_string(), changes);
    }

    /// Make the next change set for `stack_name` fail with `reason`
    pub fn fail_next_change_set(&self, stack_name: &str, reason: &str) {
        self.lock()
            .change_set_failures
            .insert(stack_name.to_string(), reason.to_string());
    }

    /// Make the next execution against `stack_name` roll back with `reason`
    pub fn fail_execution(&self, stack_name: &str, reason: &str) {
        self.lock()
            .execution_failures
            .insert(stack_name.to_string(), reason.to_string());
    }

    /// Leave executions against `stack_name` in progress forever
    pub fn stall(&self, stack_name: &str) {
        self.lock().stalled.insert(stack_name.to_string());
    }

    /// Make change listings for `stack_name` hand back the same continuation
    /// token on every page
    pub fn repeat_continuation_token(&self, stack_name: &str) {
        self.lock().looping_pages.insert(stack_name.to_string());
    }

    /// Outputs reported once a stack deploys
    pub fn set_outputs(&self, stack_name: &str, outputs: Vec<StackOutput>) {
        self.lock().outputs.insert(stack_name.to_string(), outputs);
    }

    /// Snapshot of a stack, including stacks still in review
    pub fn stack(&self, name: &str) -> Option<StackDescription> {
        let state = self.lock();
        state
            .stacks
            .get(name)
            .filter(|s| s.is_live())
            .map(|s| describe(name, s))
    }

    pub fn policy(&self, stack_name: &str) -> Option<StackPolicy> {
        self.lock()
            .stacks
            .get(stack_name)
            .and_then(|s| s.policy.clone())
    }

    /// Capabilities acknowledged when a change set was created
    pub fn change_set_capabilities(&self, change_set_id: &str) -> Option<Vec<String>> {
        self.lock()
            .change_sets
            .get(change_set_id)
            .map(|cs| cs.capabilities.clone())
    }

    /// Names of the service operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: String) -> MutexGuard<'_, SimState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }

    fn resolve_body(&self, template: &TemplateLocation) -> ProvisioningResult<String> {
        match template {
            TemplateLocation::Inline(body) => Ok(body.clone()),
            TemplateLocation::Url(url) => self
                .artifacts
                .as_ref()
                .and_then(|store| store.read(url))
                .ok_or_else(|| {
                    ProvisioningError::Service(format!("Template URL {} is not readable", url))
                }),
        }
    }
}

fn describe(name: &str, stack: &SimStack) -> StackDescription {
    StackDescription {
        stack_id: stack.stack_id.clone(),
        name: name.to_string(),
        status: stack.status.clone(),
        status_reason: stack.status_reason.clone(),
        parameters: stack.parameters.clone(),
        tags: stack.tags.clone(),
        outputs: stack.outputs.clone(),
    }
}

fn in_progress_status(action: ChangeAction) -> (&'static str, &'static str) {
    match action {
        ChangeAction::Add | ChangeAction::Import => ("CREATE_IN_PROGRESS", "CREATE_COMPLETE"),
        ChangeAction::Modify | ChangeAction::Dynamic => ("UPDATE_IN_PROGRESS", "UPDATE_COMPLETE"),
        ChangeAction::Remove => ("DELETE_IN_PROGRESS", "DELETE_COMPLETE"),
    }
}

#[async_trait]
impl ProvisioningService for InMemoryProvisioner {
    async fn validate_template(
        &self,
        template: &TemplateLocation,
    ) -> ProvisioningResult<TemplateSummary> {
        let body = self.resolve_body(template)?;
        let state = self.record("validate_template".to_string());
        if body.trim().is_empty() {
            return Err(ProvisioningError::Service(
                "Template format error: empty template".to_string(),
            ));
        }
        Ok(TemplateSummary {
            parameters: state.templates.get(&body).cloned().unwrap_or_default(),
        })
    }

    async fn describe_stack(&self, stack_name: &str) -> ProvisioningResult<StackDescription> {
        let state = self.record(format!("describe_stack:{}", stack_name));
        state.live_stack(stack_name).map(|s| describe(stack_name, s))
    }

    async fn create_change_set(
        &self,
        request: CreateChangeSetRequest,
    ) -> ProvisioningResult<String> {
        let body = self.resolve_body(&request.template)?;
        let mut state = self.record(format!("create_change_set:{}", request.stack_name));
        let name = request.stack_name.clone();

        let existing = state.stacks.get(&name).filter(|s| s.is_live()).cloned();
        match (request.operation, &existing) {
            (OperationKind::Create, Some(stack)) if !stack.status.is_review_in_progress() => {
                return Err(ProvisioningError::Service(format!(
                    "Stack [{}] already exists and cannot be created again",
                    name
                )));
            }
            (OperationKind::Create, None) => {
                state.stacks.insert(
                    name.clone(),
                    SimStack::new(format!("stack/{}", name), StackStatus::REVIEW_IN_PROGRESS),
                );
                state.push_event(
                    &name,
                    STACK_RESOURCE_TYPE,
                    &name,
                    StackStatus::REVIEW_IN_PROGRESS,
                    Some("User Initiated"),
                );
            }
            (OperationKind::Update, None) => return Err(missing_stack(&name)),
            _ => {}
        }

        let mut parameters = Vec::with_capacity(request.parameters.len());
        for parameter in &request.parameters {
            let value = match &parameter.value {
                ParameterValue::Explicit(v) => v.clone(),
                ParameterValue::UsePrevious => existing
                    .as_ref()
                    .and_then(|s| s.parameters.iter().find(|p| p.key == parameter.key))
                    .map(|p| p.value.clone())
                    .ok_or_else(|| {
                        ProvisioningError::Service(format!(
                            "Parameter {} has no previous value",
                            parameter.key
                        ))
                    })?,
            };
            parameters.push(StackParameter {
                key: parameter.key.clone(),
                value,
            });
        }

        let planned = state.planned.remove(&name);
        let unchanged = request.operation == OperationKind::Update
            && planned.is_none()
            && existing.as_ref().is_some_and(|s| {
                s.body.as_deref() == Some(body.as_str())
                    && s.parameters == parameters
                    && s.tags == request.tags
            });

        let (status, status_reason) = if let Some(reason) = state.change_set_failures.remove(&name)
        {
            ("FAILED", Some(reason))
        } else if unchanged {
            ("FAILED", Some(NO_CHANGES_REASON.to_string()))
        } else {
            ("CREATE_COMPLETE", None)
        };

        state.next_change_set += 1;
        let id = format!(
            "changeSet/{}/{}/{}",
            name, request.change_set_name, state.next_change_set
        );
        state.change_sets.insert(
            id.clone(),
            SimChangeSet {
                stack_name: name,
                operation: request.operation,
                status: status.to_string(),
                status_reason,
                executed: false,
                changes: planned.unwrap_or_default(),
                body,
                parameters,
                tags: request.tags,
                capabilities: request.capabilities,
            },
        );

        debug!(change_set_id = %id, status, "Change set registered");
        Ok(id)
    }

    async fn describe_change_set(
        &self,
        change_set_id: &str,
        next_token: Option<&str>,
    ) -> ProvisioningResult<ChangeSetPage> {
        let state = self.record(format!("describe_change_set:{}", change_set_id));
        let change_set = state.change_sets.get(change_set_id).ok_or_else(|| {
            ProvisioningError::Service(format!("ChangeSet [{}] does not exist", change_set_id))
        })?;

        let start = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                ProvisioningError::Service(format!("Invalid continuation token {}", token))
            })?,
            None => 0,
        };
        let end = (start + self.page_size).min(change_set.changes.len());
        let next_token = if state.looping_pages.contains(&change_set.stack_name) {
            Some(start.to_string())
        } else {
            (end < change_set.changes.len()).then(|| end.to_string())
        };
        let changes = change_set
            .changes
            .get(start..end)
            .map(<[Change]>::to_vec)
            .unwrap_or_default();

        Ok(ChangeSetPage {
            change_set_id: change_set_id.to_string(),
            status: change_set.status.clone(),
            status_reason: change_set.status_reason.clone(),
            changes,
            next_token,
        })
    }

    async fn execute_change_set(&self, change_set_id: &str) -> ProvisioningResult<()> {
        let mut state = self.record(format!("execute_change_set:{}", change_set_id));
        let change_set = state
            .change_sets
            .get_mut(change_set_id)
            .ok_or_else(|| {
                ProvisioningError::Service(format!("ChangeSet [{}] does not exist", change_set_id))
            })?;
        if change_set.status != "CREATE_COMPLETE" || change_set.executed {
            return Err(ProvisioningError::Service(format!(
                "ChangeSet [{}] cannot be executed in its current status",
                change_set_id
            )));
        }
        change_set.executed = true;
        let change_set = change_set.clone();
        let name = change_set.stack_name.clone();

        let (in_progress, complete, rolled_back) = match change_set.operation {
            OperationKind::Create => (
                StackStatus::CREATE_IN_PROGRESS,
                StackStatus::CREATE_COMPLETE,
                StackStatus::ROLLBACK_COMPLETE,
            ),
            OperationKind::Update => (
                StackStatus::UPDATE_IN_PROGRESS,
                StackStatus::UPDATE_COMPLETE,
                StackStatus::UPDATE_ROLLBACK_COMPLETE,
            ),
        };

        state.push_event(&name, STACK_RESOURCE_TYPE, &name, in_progress, Some("User Initiated"));

        let failure = state.execution_failures.remove(&name);
        let stalled = state.stalled.contains(&name);
        let outputs = state.outputs.get(&name).cloned();

        if stalled {
            if let Some(stack) = state.stacks.get_mut(&name) {
                stack.status = StackStatus::new(in_progress);
                stack.status_reason = Some("User Initiated".to_string());
            }
            return Ok(());
        }

        if let Some(reason) = failure {
            let failed_id = change_set
                .changes
                .first()
                .map(|c| (c.resource_type.clone(), c.logical_resource_id.clone()));
            if let Some((resource_type, logical_id)) = failed_id {
                state.push_event(&name, &resource_type, &logical_id, "CREATE_FAILED", Some(reason.as_str()));
            }
            state.push_event(&name, STACK_RESOURCE_TYPE, &name, rolled_back, Some(reason.as_str()));
            if let Some(stack) = state.stacks.get_mut(&name) {
                stack.status = StackStatus::new(rolled_back);
                stack.status_reason = Some(reason);
            }
            return Ok(());
        }

        for change in &change_set.changes {
            let (started, finished) = in_progress_status(change.action);
            state.push_event(&name, &change.resource_type, &change.logical_resource_id, started, None);
            state.push_event(&name, &change.resource_type, &change.logical_resource_id, finished, None);
        }
        state.push_event(&name, STACK_RESOURCE_TYPE, &name, complete, None);

        if let Some(stack) = state.stacks.get_mut(&name) {
            stack.status = StackStatus::new(complete);
            stack.status_reason = None;
            stack.body = Some(change_set.body.clone());
            stack.parameters = change_set.parameters.clone();
            stack.tags = change_set.tags.clone();
            if let Some(outputs) = outputs {
                stack.outputs = outputs;
            }
            for change in &change_set.changes {
                if change.action == ChangeAction::Remove {
                    stack.resources.remove(&change.logical_resource_id);
                } else {
                    stack.resources.insert(
                        change.logical_resource_id.clone(),
                        StackResource {
                            logical_resource_id: change.logical_resource_id.clone(),
                            physical_resource_id: Some(format!(
                                "{}-{}",
                                name, change.logical_resource_id
                            )),
                            resource_type: change.resource_type.clone(),
                            status: in_progress_status(change.action).1.to_string(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn wait_until_change_set_created(&self, change_set_id: &str) -> ProvisioningResult<()> {
        let state = self.record(format!("wait_until_change_set_created:{}", change_set_id));
        let change_set = state.change_sets.get(change_set_id).ok_or_else(|| {
            ProvisioningError::Service(format!("ChangeSet [{}] does not exist", change_set_id))
        })?;
        match change_set.status.as_str() {
            "CREATE_COMPLETE" => Ok(()),
            _ => Err(ProvisioningError::ResourceNotReady(
                "Waiter ChangeSetCreateComplete failed: terminal failure state".to_string(),
            )),
        }
    }

    async fn wait_until_stack(
        &self,
        stack_name: &str,
        target: WaitTarget,
        policy: WaitPolicy,
    ) -> ProvisioningResult<()> {
        drop(self.record(format!("wait_until_stack:{}:{}", stack_name, target.status())));

        for attempt in 1..=policy.max_attempts {
            {
                let state = self.lock();
                let stack = match state.stacks.get(stack_name) {
                    Some(stack) => stack,
                    None if target == WaitTarget::DeleteComplete => return Ok(()),
                    None => return Err(missing_stack(stack_name)),
                };
                if stack.status.as_str() == target.status() {
                    return Ok(());
                }
                if stack.status.is_failed() {
                    return Err(ProvisioningError::ResourceNotReady(format!(
                        "Waiter encountered a terminal failure state: {}",
                        stack.status
                    )));
                }
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.delay).await;
            }
        }

        Err(ProvisioningError::WaitExhausted {
            attempts: policy.max_attempts,
        })
    }

    async fn describe_stack_events(&self, stack_name: &str) -> ProvisioningResult<Vec<StackEvent>> {
        let state = self.lock();
        state
            .stacks
            .get(stack_name)
            .map(|s| s.events.clone())
            .ok_or_else(|| missing_stack(stack_name))
    }

    async fn describe_stack_resources(
        &self,
        stack_name: &str,
    ) -> ProvisioningResult<Vec<StackResource>> {
        let state = self.record(format!("describe_stack_resources:{}", stack_name));
        state
            .live_stack(stack_name)
            .map(|s| s.resources.values().cloned().collect())
    }

    async fn set_stack_policy(
        &self,
        stack_name: &str,
        policy: &StackPolicy,
    ) -> ProvisioningResult<()> {
        let mut state = self.record(format!("set_stack_policy:{}", stack_name));
        let stack = state
            .stacks
            .get_mut(stack_name)
            .filter(|s| s.is_live())
            .ok_or_else(|| missing_stack(stack_name))?;
        stack.policy = Some(policy.clone());
        Ok(())
    }

    async fn get_template(&self, stack_name: &str) -> ProvisioningResult<String> {
        let state = self.record(format!("get_template:{}", stack_name));
        let stack = state.live_stack(stack_name)?;
        stack.body.clone().ok_or_else(|| {
            ProvisioningError::Service(format!("Stack {} has no deployed template", stack_name))
        })
    }

    async fn delete_stack(&self, stack_name: &str) -> ProvisioningResult<()> {
        let mut state = self.record(format!("delete_stack:{}", stack_name));
        state.live_stack(stack_name)?;
        state.push_event(
            stack_name,
            STACK_RESOURCE_TYPE,
            stack_name,
            StackStatus::DELETE_IN_PROGRESS,
            Some("User Initiated"),
        );
        state.push_event(
            stack_name,
            STACK_RESOURCE_TYPE,
            stack_name,
            StackStatus::DELETE_COMPLETE,
            None,
        );
        if let Some(stack) = state.stacks.get_mut(stack_name) {
            stack.status = StackStatus::new(StackStatus::DELETE_COMPLETE);
            stack.resources.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Parameter;
    use std::time::Duration;

    fn request(stack: &str, operation: OperationKind, body: &str) -> CreateChangeSetRequest {
        CreateChangeSetRequest {
            stack_name: stack.to_string(),
            change_set_name: "cs-1".to_string(),
            operation,
            template: TemplateLocation::Inline(body.to_string()),
            parameters: Vec::new(),
            tags: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_registers_review_stack() {
        let service = InMemoryProvisioner::new();
        service
            .create_change_set(request("app", OperationKind::Create, "body"))
            .await
            .unwrap();

        let stack = service.describe_stack("app").await.unwrap();
        assert!(stack.status.is_review_in_progress());
        assert!(!stack.is_deployed());
    }

    #[tokio::test]
    async fn test_unchanged_update_fails_with_no_changes_reason() {
        let service = InMemoryProvisioner::new();
        service.seed_stack("app", "body", &[], &[]);

        let id = service
            .create_change_set(request("app", OperationKind::Update, "body"))
            .await
            .unwrap();

        let waited = service.wait_until_change_set_created(&id).await;
        assert!(matches!(waited, Err(ProvisioningError::ResourceNotReady(_))));
        let page = service.describe_change_set(&id, None).await.unwrap();
        assert_eq!(page.status_reason.as_deref(), Some(NO_CHANGES_REASON));
    }

    #[tokio::test]
    async fn test_change_listing_is_paginated() {
        let service = InMemoryProvisioner::new().with_page_size(2);
        service.plan_changes(
            "app",
            (0..5)
                .map(|i| Change::new(ChangeAction::Add, "Queue", format!("Q{}", i), false))
                .collect(),
        );
        let id = service
            .create_change_set(request("app", OperationKind::Create, "body"))
            .await
            .unwrap();

        let first = service.describe_change_set(&id, None).await.unwrap();
        assert_eq!(first.changes.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("2"));

        let last = service.describe_change_set(&id, Some("4")).await.unwrap();
        assert_eq!(last.changes.len(), 1);
        assert!(last.next_token.is_none());
    }

    #[tokio::test]
    async fn test_use_previous_requires_existing_value() {
        let service = InMemoryProvisioner::new();
        service.seed_stack("app", "body", &[("Env", "prod")], &[]);

        let mut req = request("app", OperationKind::Update, "body2");
        req.parameters = vec![Parameter::use_previous("Missing")];
        let err = service.create_change_set(req).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Service(_)));
    }

    #[tokio::test]
    async fn test_stalled_stack_exhausts_wait_budget() {
        let service = InMemoryProvisioner::new();
        service.seed_stack("app", "body", &[], &[]);
        service.stall("app");
        let id = service
            .create_change_set(request("app", OperationKind::Update, "body2"))
            .await
            .unwrap();
        service.execute_change_set(&id).await.unwrap();

        let policy = WaitPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        };
        let result = service
            .wait_until_stack("app", WaitTarget::UpdateComplete, policy)
            .await;
        assert_eq!(result, Err(ProvisioningError::WaitExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_deleted_stack_no_longer_described() {
        let service = InMemoryProvisioner::new();
        service.seed_stack("app", "body", &[], &[]);
        service.delete_stack("app").await.unwrap();

        let err = service.describe_stack("app").await.unwrap_err();
        assert!(matches!(err, ProvisioningError::StackDoesNotExist(_)));
        let events = service.describe_stack_events("app").await.unwrap();
        assert_eq!(events[0].status, StackStatus::DELETE_COMPLETE);
    }
}
