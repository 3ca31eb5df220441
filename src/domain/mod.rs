// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Domain Models
//!
//! Value objects shared by every stage of a deployment run.
//!
//! - [`StackDefinition`] - resolved, immutable description of one stack
//! - [`ChangeSet`] / [`Change`] - proposed mutations for one stack
//! - [`StackEvent`] - remote status event observed while a stack changes
//! - [`StackStatus`] - remote stack status with classification helpers
//! - [`StackPolicy`] - resource protection policy document
//!
//! # Ownership
//!
//! ```text
//! StackDefinition ──1:1──> ChangeSet ──1:N──> Change
//!        │
//!        └── StackEvent (observed, never constructed locally)
//! ```

pub mod change_set;
pub mod event;
pub mod policy;
pub mod stack;
pub mod status;

pub use change_set::{
    Change, ChangeAction, ChangeSet, OperationKind, Parameter, ParameterValue, Registration, Tag,
    TemplateLocation,
};
pub use event::StackEvent;
pub use policy::{PolicyEffect, PolicyStatement, StackPolicy};
pub use stack::{Hooks, StackDefinition};
pub use status::StackStatus;
