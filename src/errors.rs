//! Error types for deployment operations

use thiserror::Error;

use crate::provisioning::ProvisioningError;
use crate::state_machine::TransitionError;

/// Errors that can occur while planning or deploying stacks
#[derive(Debug, Error)]
pub enum DeployError {
    /// The provisioning service reported nothing to deploy
    #[error("No changes to deploy for stack {stack}")]
    NoChange { stack: String },

    /// The stack has never been deployed
    #[error("Stack {0} does not exist")]
    StackDoesNotExist(String),

    /// The dependency graph contains a cycle
    #[error("Cyclic dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A stack depends on an identifier nobody declared
    #[error("Stack {stack} depends on undeclared stack {dependency}")]
    UnknownDependency { stack: String, dependency: String },

    /// Two stack definitions in one run share a name
    #[error("Stack {0} is defined more than once")]
    DuplicateStack(String),

    /// Parameters without a value, default or previous value
    #[error("Missing parameters: {}", keys.join(", "))]
    MissingParameters { keys: Vec<String> },

    /// Change set could not be materialized
    #[error("Change set {change_set_id} failed with status {status}: {reason}")]
    ChangeSetFailed {
        change_set_id: String,
        status: String,
        reason: String,
    },

    /// Change set executed but the stack did not complete
    #[error("Stack {stack} failed executing change set {change_set_id} with status {status}: {reason}")]
    ExecutionFailed {
        stack: String,
        change_set_id: String,
        status: String,
        reason: String,
    },

    /// Wait budget exhausted
    #[error(
        "Timed out waiting for stack {stack} (change set {change_set_id}) after {attempts} attempts; last status {status}: {reason}"
    )]
    WaitTimeout {
        stack: String,
        change_set_id: String,
        attempts: u32,
        status: String,
        reason: String,
    },

    /// Provisioning service call failed
    #[error("{context}: {source}")]
    Provisioning {
        context: String,
        #[source]
        source: ProvisioningError,
    },

    /// Hook command exited unsuccessfully
    #[error("Hook `{command}` failed ({status}):\n{output}")]
    Hook {
        command: String,
        status: String,
        output: String,
    },

    /// Artifact upload error
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lifecycle step invoked before its prerequisites
    #[error("Change set not prepared: {0}")]
    NotPrepared(String),

    /// Invalid change set state transition
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Background task failed
    #[error("Background task failed: {0}")]
    Task(String),

    /// Error attributed to a single stack
    #[error("{stack}: {source}")]
    Stack {
        stack: String,
        #[source]
        source: Box<DeployError>,
    },
}

/// Result type for deployment operations
pub type DeployResult<T> = Result<T, DeployError>;

impl DeployError {
    /// Wrap a provisioning failure with a description of the call
    pub fn remote(context: impl Into<String>, source: ProvisioningError) -> Self {
        DeployError::Provisioning {
            context: context.into(),
            source,
        }
    }

    /// Attribute this error to a stack, unless it already is
    pub fn in_stack(self, stack: impl Into<String>) -> Self {
        match self {
            DeployError::Stack { .. } => self,
            other => DeployError::Stack {
                stack: stack.into(),
                source: Box::new(other),
            },
        }
    }

    /// True for the benign "nothing to deploy" signal
    pub fn is_no_change(&self) -> bool {
        match self {
            DeployError::NoChange { .. } => true,
            DeployError::Stack { source, .. } => source.is_no_change(),
            _ => false,
        }
    }

    /// True when the stack was found not to exist
    pub fn is_stack_missing(&self) -> bool {
        match self {
            DeployError::StackDoesNotExist(_) => true,
            DeployError::Provisioning { source, .. } => {
                matches!(source, ProvisioningError::StackDoesNotExist(_))
            }
            DeployError::Stack { source, .. } => source.is_stack_missing(),
            _ => false,
        }
    }

    /// Missing parameter keys, if this is a `MissingParameters` error
    pub fn missing_parameters(&self) -> Option<&[String]> {
        match self {
            DeployError::MissingParameters { keys } => Some(keys),
            DeployError::Stack { source, .. } => source.missing_parameters(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DeployError {
    fn from(err: serde_json::Error) -> Self {
        DeployError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Task(err.to_string())
    }
}
