// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Set Value Objects
//!
//! A change set is owned by exactly one stack definition. It starts out with
//! the reconciled parameters, tags and template placement; registration
//! adds the remote identifier and the ordered list of planned changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a change set creates a new stack or updates an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Update,
}

impl OperationKind {
    /// Stack status reached when the operation finishes successfully
    pub fn complete_status(&self) -> &'static str {
        match self {
            OperationKind::Create => "CREATE_COMPLETE",
            OperationKind::Update => "UPDATE_COMPLETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => f.write_str("CREATE"),
            OperationKind::Update => f.write_str("UPDATE"),
        }
    }
}

/// Where the service reads the template from
///
/// Inline bodies and uploaded locations are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateLocation {
    Inline(String),
    Url(String),
}

/// Value submitted for one parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// Explicit value from the operator
    Explicit(String),

    /// Keep whatever the deployed stack currently has
    UsePrevious,
}

/// One parameter assignment in a change set submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn explicit(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ParameterValue::Explicit(value.into()),
        }
    }

    pub fn use_previous(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ParameterValue::UsePrevious,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Planned action on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    Add,
    Modify,
    Remove,
    Import,
    Dynamic,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One planned resource mutation, as listed by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub action: ChangeAction,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub replacement: bool,
}

impl Change {
    pub fn new(
        action: ChangeAction,
        resource_type: impl Into<String>,
        logical_resource_id: impl Into<String>,
        replacement: bool,
    ) -> Self {
        Self {
            action,
            resource_type: resource_type.into(),
            logical_resource_id: logical_resource_id.into(),
            replacement,
        }
    }

    /// True when the change deletes or replaces the underlying resource
    pub fn is_destructive(&self) -> bool {
        self.action == ChangeAction::Remove || self.replacement
    }
}

/// Remote identity assigned to a change set once submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub name: String,
    pub changes: Vec<Change>,
}

/// Proposed mutations for one stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub stack_name: String,

    /// Reconciled parameters in template declaration order
    pub parameters: Vec<Parameter>,

    /// Tags sorted by key
    pub tags: Vec<Tag>,

    pub template: TemplateLocation,

    /// Proposed template text, kept for diffing regardless of placement
    pub body: String,

    pub capabilities: Vec<String>,

    pub operation: OperationKind,

    /// Set once the service accepted the change set
    pub registration: Option<Registration>,
}

impl ChangeSet {
    pub fn id(&self) -> Option<&str> {
        self.registration.as_ref().map(|r| r.id.as_str())
    }

    /// Planned changes, empty until registered
    pub fn changes(&self) -> &[Change] {
        self.registration
            .as_ref()
            .map(|r| r.changes.as_slice())
            .unwrap_or_default()
    }
}
