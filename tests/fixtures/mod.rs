// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-stack-deploy
//!
//! Deterministic collaborators for lifecycle and orchestrator tests:
//! a fast configuration, a recording presenter, a scripted approver and a
//! recording hook runner. Every remote call goes to an
//! `InMemoryProvisioner`.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use cim_stack_deploy::domain::{Change, ChangeSet, OperationKind, StackEvent};
use cim_stack_deploy::errors::{DeployError, DeployResult};
use cim_stack_deploy::hooks::HookRunner;
use cim_stack_deploy::orchestrator::{Approver, Decision, Presenter};
use cim_stack_deploy::provisioning::{InMemoryProvisioner, StackOutput};
use cim_stack_deploy::{DeployConfig, DeployContext};

pub const NETWORK_BODY: &str = "Resources:\n  Vpc:\n    Type: Network::Vpc\n";
pub const APP_BODY: &str = "Resources:\n  Queue:\n    Type: Messaging::Queue\n";
pub const PARAM_BODY_OLD: &str = "parameters:\n  param1: old_val1\n  param2: old_val2";
pub const PARAM_BODY_NEW: &str = "parameters:\n  param1: new_val1\n  param2: old_val2";

/// Configuration with millisecond waits
pub fn fast_config() -> DeployConfig {
    DeployConfig {
        wait_max_attempts: 5,
        wait_delay_ms: 1,
        event_poll_interval_ms: 5,
        ..DeployConfig::default()
    }
}

pub fn context(service: Arc<InMemoryProvisioner>) -> DeployContext {
    DeployContext::inline(service, fast_config()).expect("valid test config")
}

/// Everything the orchestrator showed, in order
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub changes: Mutex<Vec<(String, Vec<Change>)>>,
    pub diffs: Mutex<Vec<(String, String)>>,
    pub events: Mutex<Vec<StackEvent>>,
    pub no_change: Mutex<Vec<String>>,
    pub outputs: Mutex<Vec<(String, Vec<StackOutput>)>>,
    pub warnings: Mutex<Vec<(String, String)>>,
}

impl RecordingPresenter {
    pub fn event_statuses(&self, stack: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.stack_name == stack)
            .map(|e| format!("{} {}", e.logical_resource_id, e.status))
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .lock()
            .unwrap()
            .iter()
            .map(|(_, w)| w.clone())
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn changes(&self, stack: &str, changes: &[Change]) {
        self.changes
            .lock()
            .unwrap()
            .push((stack.to_string(), changes.to_vec()));
    }

    fn diff(&self, stack: &str, diff: &str) {
        self.diffs
            .lock()
            .unwrap()
            .push((stack.to_string(), diff.to_string()));
    }

    fn event(&self, event: &StackEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn no_change(&self, stack: &str) {
        self.no_change.lock().unwrap().push(stack.to_string());
    }

    fn outputs(&self, stack: &str, outputs: &[StackOutput]) {
        self.outputs
            .lock()
            .unwrap()
            .push((stack.to_string(), outputs.to_vec()));
    }

    fn warning(&self, stack: &str, message: &str) {
        self.warnings
            .lock()
            .unwrap()
            .push((stack.to_string(), message.to_string()));
    }
}

/// Approver answering from a script; `Apply` once the script runs out
#[derive(Debug, Default)]
pub struct ScriptedApprover {
    decisions: Mutex<VecDeque<Decision>>,
    supplied: BTreeMap<String, String>,
    confirm: bool,
    pub reviewed: Mutex<Vec<String>>,
    pub asked_for: Mutex<Vec<Vec<String>>>,
}

impl ScriptedApprover {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            confirm: true,
            ..Self::default()
        }
    }

    pub fn supplying(mut self, key: &str, value: &str) -> Self {
        self.supplied.insert(key.to_string(), value.to_string());
        self
    }

    pub fn refusing_deletion(mut self) -> Self {
        self.confirm = false;
        self
    }
}

#[async_trait]
impl Approver for ScriptedApprover {
    async fn supply_parameters(
        &self,
        _stack: &str,
        missing: &[String],
    ) -> DeployResult<BTreeMap<String, String>> {
        self.asked_for.lock().unwrap().push(missing.to_vec());
        Ok(self.supplied.clone())
    }

    async fn review(&self, change_set: &ChangeSet) -> DeployResult<Decision> {
        self.reviewed
            .lock()
            .unwrap()
            .push(change_set.stack_name.clone());
        Ok(self
            .decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Apply))
    }

    async fn confirm_deletion(&self, _stack: &str) -> DeployResult<bool> {
        Ok(self.confirm)
    }
}

/// Hook runner recording `stack:OPERATION:command`; fails on `fail`
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub runs: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl HookRunner for RecordingHooks {
    async fn run(&self, stack: &str, operation: OperationKind, command: &str) -> DeployResult<()> {
        self.runs
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", stack, operation, command));
        if command == "fail" {
            return Err(DeployError::Hook {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                output: String::new(),
            });
        }
        Ok(())
    }
}

/// Remote calls for one stack, without the argument
pub fn calls_for(service: &InMemoryProvisioner, stack: &str) -> Vec<String> {
    service
        .calls()
        .into_iter()
        .filter(|c| c.split(':').nth(1) == Some(stack) || c.contains(&format!("/{}/", stack)))
        .map(|c| c.split(':').next().unwrap_or_default().to_string())
        .collect()
}
