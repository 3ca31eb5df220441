// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Service Contract
//!
//! The remote service that owns stack state. This crate never implements
//! stack CREATE/UPDATE/DELETE semantics itself; it drives them through the
//! narrow [`ProvisioningService`] trait below.
//!
//! # Architecture
//!
//! ```text
//! ChangeSetLifecycle ──┐
//! EventTracker ────────┼──> dyn ProvisioningService ──> remote API
//! DeploymentOrchestrator┘            │
//!                                    └──> InMemoryProvisioner (tests, dry runs)
//! ```
//!
//! Every operation the engine uses is on the trait and nothing else is, so
//! a test double implements the whole contract rather than overriding a
//! few methods of a broader client.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::{
    Change, OperationKind, Parameter, StackEvent, StackPolicy, StackStatus, Tag, TemplateLocation,
};

pub use memory::InMemoryProvisioner;

/// Errors returned by the provisioning service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    /// Describe call for a stack that was never created (or is deleted)
    #[error("{0}")]
    StackDoesNotExist(String),

    /// A waiter reached a terminal failure state
    #[error("Resource not ready: {0}")]
    ResourceNotReady(String),

    /// A waiter used its full attempt budget
    #[error("Waiter gave up after {attempts} attempts")]
    WaitExhausted { attempts: u32 },

    /// Any other service failure
    #[error("{0}")]
    Service(String),
}

impl ProvisioningError {
    /// Classify raw service error text
    ///
    /// The service only signals a missing stack through its message, so
    /// this is the single place that inspects it.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("does not exist") {
            ProvisioningError::StackDoesNotExist(message)
        } else {
            ProvisioningError::Service(message)
        }
    }
}

/// Result type for provisioning calls
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Parameter declared by a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub key: String,
    pub default_value: Option<String>,
}

impl TemplateParameter {
    pub fn required(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default_value: None,
        }
    }

    pub fn with_default(key: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default_value: Some(default.into()),
        }
    }

    /// Declared with a default the service can apply on its own
    pub fn has_default(&self) -> bool {
        self.default_value.as_deref().is_some_and(|d| !d.is_empty())
    }
}

/// Output of validate-template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    /// Declared parameters in template order
    pub parameters: Vec<TemplateParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParameter {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// Output of describe-stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    pub stack_id: String,
    pub name: String,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub parameters: Vec<StackParameter>,
    pub tags: Vec<Tag>,
    pub outputs: Vec<StackOutput>,
}

impl StackDescription {
    /// Deployed at least once; a stack still in review does not count
    pub fn is_deployed(&self) -> bool {
        !self.status.is_review_in_progress()
    }

    /// Current live value of a parameter
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }
}

/// Input of create-change-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChangeSetRequest {
    pub stack_name: String,
    pub change_set_name: String,
    pub operation: OperationKind,
    pub template: TemplateLocation,
    pub parameters: Vec<Parameter>,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<String>,
}

/// One page of describe-change-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetPage {
    pub change_set_id: String,
    pub status: String,
    pub status_reason: Option<String>,
    pub changes: Vec<Change>,
    /// Continuation token; `None` on the last page
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_resource_id: String,
    pub physical_resource_id: Option<String>,
    pub resource_type: String,
    pub status: String,
}

/// Terminal state a stack waiter blocks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    CreateComplete,
    UpdateComplete,
    DeleteComplete,
}

impl From<OperationKind> for WaitTarget {
    fn from(operation: OperationKind) -> Self {
        match operation {
            OperationKind::Create => WaitTarget::CreateComplete,
            OperationKind::Update => WaitTarget::UpdateComplete,
        }
    }
}

impl WaitTarget {
    pub fn status(&self) -> &'static str {
        match self {
            WaitTarget::CreateComplete => StackStatus::CREATE_COMPLETE,
            WaitTarget::UpdateComplete => StackStatus::UPDATE_COMPLETE,
            WaitTarget::DeleteComplete => StackStatus::DELETE_COMPLETE,
        }
    }
}

/// Retry budget for stack waiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// The provisioning service operations used by the engine
#[async_trait]
pub trait ProvisioningService: Send + Sync {
    /// Declared parameter keys and defaults of a template
    async fn validate_template(
        &self,
        template: &TemplateLocation,
    ) -> ProvisioningResult<TemplateSummary>;

    /// Current status, parameters, tags and outputs of a stack
    ///
    /// Fails with [`ProvisioningError::StackDoesNotExist`] for unknown stacks.
    async fn describe_stack(&self, stack_name: &str) -> ProvisioningResult<StackDescription>;

    /// Submit a change set, returning its identifier
    async fn create_change_set(&self, request: CreateChangeSetRequest)
        -> ProvisioningResult<String>;

    /// One page of a change set's status and resource changes
    async fn describe_change_set(
        &self,
        change_set_id: &str,
        next_token: Option<&str>,
    ) -> ProvisioningResult<ChangeSetPage>;

    async fn execute_change_set(&self, change_set_id: &str) -> ProvisioningResult<()>;

    /// Block until the change set has materialized
    ///
    /// Fails with [`ProvisioningError::ResourceNotReady`] when the change set
    /// ends up in a failed state.
    async fn wait_until_change_set_created(&self, change_set_id: &str) -> ProvisioningResult<()>;

    /// Block until the stack reaches `target`, within `policy`
    async fn wait_until_stack(
        &self,
        stack_name: &str,
        target: WaitTarget,
        policy: WaitPolicy,
    ) -> ProvisioningResult<()>;

    /// Most recent stack events, newest first
    async fn describe_stack_events(&self, stack_name: &str) -> ProvisioningResult<Vec<StackEvent>>;

    async fn describe_stack_resources(
        &self,
        stack_name: &str,
    ) -> ProvisioningResult<Vec<StackResource>>;

    async fn set_stack_policy(
        &self,
        stack_name: &str,
        policy: &StackPolicy,
    ) -> ProvisioningResult<()>;

    /// Template text of the deployed stack
    async fn get_template(&self, stack_name: &str) -> ProvisioningResult<String>;

    async fn delete_stack(&self, stack_name: &str) -> ProvisioningResult<()>;
}
