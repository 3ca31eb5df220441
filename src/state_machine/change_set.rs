// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Set Lifecycle State Machine
//!
//! # States
//!
//! - Built: parameters and template placement decided locally
//! - Registering: change set submitted, waiting for it to materialize
//! - Ready: change set materialized, resource changes listed
//! - NoChange: service reported nothing to deploy (terminal)
//! - Executing: execute issued, waiting for the stack to complete
//! - Succeeded: stack reached create/update complete (terminal)
//! - Failed: any remote failure (terminal)
//!
//! # Inputs
//!
//! - Submit: Built → Registering
//! - Materialized: Registering → Ready
//! - NothingToDeploy: Registering → NoChange
//! - Execute: Ready → Executing
//! - Complete: Executing → Succeeded
//! - Fail: Built | Registering | Ready | Executing → Failed

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Lifecycle state of a single change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSetState {
    Built,
    Registering,
    Ready,
    NoChange,
    Executing,
    Succeeded,
    Failed,
}

impl ChangeSetState {
    /// Terminal states accept no further input
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChangeSetState::NoChange | ChangeSetState::Succeeded | ChangeSetState::Failed
        )
    }
}

impl fmt::Display for ChangeSetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeSetState::Built => "built",
            ChangeSetState::Registering => "registering",
            ChangeSetState::Ready => "ready",
            ChangeSetState::NoChange => "no-change",
            ChangeSetState::Executing => "executing",
            ChangeSetState::Succeeded => "succeeded",
            ChangeSetState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Lifecycle input (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleInput {
    /// Change set submitted to the provisioning service
    Submit,

    /// Change set materialized and its changes listed
    Materialized,

    /// Service reported there is nothing to deploy
    NothingToDeploy,

    /// Execute call issued
    Execute,

    /// Stack reached its terminal complete state
    Complete,

    /// Remote failure at the current step
    Fail,
}

impl fmt::Display for LifecycleInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl StateMachine for ChangeSetState {
    type Input = LifecycleInput;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use ChangeSetState::*;
        use LifecycleInput::*;

        if self.is_terminal() {
            return Err(TransitionError::Terminal(self.to_string()));
        }

        let next = match (self, input) {
            (Built, Submit) => Registering,
            (Registering, Materialized) => Ready,
            (Registering, NothingToDeploy) => NoChange,
            (Ready, Execute) => Executing,
            (Executing, Complete) => Succeeded,
            (_, Fail) => Failed,
            (from, input) => {
                return Err(TransitionError::InvalidTransition {
                    from: from.to_string(),
                    input: input.to_string(),
                })
            }
        };

        Ok((next, ()))
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use ChangeSetState::*;
        use LifecycleInput::*;

        match self {
            Built => vec![Submit, Fail],
            Registering => vec![Materialized, NothingToDeploy, Fail],
            Ready => vec![Execute, Fail],
            Executing => vec![Complete, Fail],
            NoChange | Succeeded | Failed => Vec::new(),
        }
    }
}
