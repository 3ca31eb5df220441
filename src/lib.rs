//! Change-set orchestration for infrastructure stack deployments
//!
//! Deploys named stacks to a remote provisioning service in dependency
//! order. Each stack goes through a change set: parameters are reconciled
//! against the live stack, the change set is registered and previewed, and
//! only an approved change set is executed while stack events stream to
//! the operator.
//!
//! # Components
//!
//! - [`resolver`] - dependency ordering and cycle detection
//! - [`parameters`] - parameter reconciliation
//! - [`diff`] - unified diffs of parameters, tags and template body
//! - [`events`] - incremental event tracking and background polling
//! - [`lifecycle`] - the per-stack change set state machine driver
//! - [`orchestrator`] - multi-stack deploy and delete runs
//!
//! The remote side is reached only through [`provisioning::ProvisioningService`]
//! and [`artifact::ArtifactStore`]; in-memory implementations of both ship
//! with the crate.

pub mod artifact;
pub mod config;
pub mod context;
pub mod diff;
pub mod domain;
pub mod errors;
pub mod events;
pub mod hooks;
pub mod lifecycle;
pub mod orchestrator;
pub mod parameters;
pub mod provisioning;
pub mod resolver;
pub mod state_machine;
pub mod telemetry;

// Re-export commonly used types
pub use config::DeployConfig;
pub use context::DeployContext;
pub use diff::DiffEngine;
pub use domain::{Change, ChangeSet, StackDefinition, StackEvent};
pub use errors::{DeployError, DeployResult};
pub use events::EventTracker;
pub use lifecycle::ChangeSetLifecycle;
pub use orchestrator::{DeploymentOrchestrator, DeploymentReport, Outcome};
pub use parameters::ParameterCollector;
pub use provisioning::{InMemoryProvisioner, ProvisioningService};
pub use resolver::DependencyGraph;
