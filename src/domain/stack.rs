// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Definition Value Object
//!
//! A `StackDefinition` is produced by configuration loading and template
//! rendering (both outside this crate) and is never mutated once handed
//! to the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::change_set::OperationKind;

/// Hook command lists run around a stack deployment
///
/// Each entry is a shell command line. Kind-specific lists only run when
/// the change set creates (or updates) the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hooks {
    pub pre: Vec<String>,
    pub post: Vec<String>,
    pub pre_create: Vec<String>,
    pub post_create: Vec<String>,
    pub pre_update: Vec<String>,
    pub post_update: Vec<String>,
}

impl Hooks {
    /// Kind-specific commands run before registration
    pub fn before(&self, operation: OperationKind) -> &[String] {
        match operation {
            OperationKind::Create => &self.pre_create,
            OperationKind::Update => &self.pre_update,
        }
    }

    /// Kind-specific commands run after execution
    pub fn after(&self, operation: OperationKind) -> &[String] {
        match operation {
            OperationKind::Create => &self.post_create,
            OperationKind::Update => &self.post_update,
        }
    }
}

/// Resolved description of one stack
///
/// # Invariants
/// - `name` is unique within a deployment run
/// - parameter and tag keys are unique (enforced by the map types)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDefinition {
    /// Stack name, also its identity in the dependency graph
    pub name: String,

    /// Fully rendered template text
    pub template_body: String,

    /// Parameter overrides supplied by the operator
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Stack tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Names of stacks that must be deployed first
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Logical resource ids protected from deletion and replacement
    #[serde(default)]
    pub blocked_resources: Vec<String>,

    /// Capabilities acknowledged on change set creation
    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub hooks: Hooks,
}

impl StackDefinition {
    /// Create a definition with a name and rendered template
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_body: template_body.into(),
            parameters: BTreeMap::new(),
            tags: BTreeMap::new(),
            depends_on: Vec::new(),
            blocked_resources: Vec::new(),
            capabilities: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn with_blocked_resource(mut self, logical_id: impl Into<String>) -> Self {
        self.blocked_resources.push(logical_id.into());
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}
