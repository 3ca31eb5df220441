// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack hooks
//!
//! Hook commands run on the orchestrator's task, never concurrently with a
//! stack mutation. Any non-zero exit aborts the run.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::OperationKind;
use crate::errors::{DeployError, DeployResult};

/// Environment variable naming the stack a hook runs for
pub const STACK_ENV: &str = "CIM_DEPLOY_STACK";

/// Environment variable holding `CREATE` or `UPDATE`
pub const OPERATION_ENV: &str = "CIM_DEPLOY_OPERATION";

/// Executes hook command lines
#[async_trait]
pub trait HookRunner: Send + Sync {
    /// Run one command; a failure is returned as [`DeployError::Hook`]
    async fn run(&self, stack: &str, operation: OperationKind, command: &str) -> DeployResult<()>;
}

/// Run `commands` in order, stopping at the first failure
pub async fn run_hooks(
    runner: &dyn HookRunner,
    stack: &str,
    operation: OperationKind,
    commands: &[String],
) -> DeployResult<()> {
    for command in commands {
        info!(stack, %operation, command = %command, "Running hook");
        runner.run(stack, operation, command).await?;
    }
    Ok(())
}

/// Runs hooks through `sh -c`, capturing their output
#[derive(Debug, Clone, Default)]
pub struct ShellHookRunner {
    shell: Option<String>,
}

impl ShellHookRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `shell` instead of `sh`
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: Some(shell.into()),
        }
    }
}

#[async_trait]
impl HookRunner for ShellHookRunner {
    async fn run(&self, stack: &str, operation: OperationKind, command: &str) -> DeployResult<()> {
        let shell = self.shell.as_deref().unwrap_or("sh");
        let output = Command::new(shell)
            .arg("-c")
            .arg(command)
            .env(STACK_ENV, stack)
            .env(OPERATION_ENV, operation.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DeployError::Hook {
                command: command.to_string(),
                status: "spawn failed".to_string(),
                output: e.to_string(),
            })?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(DeployError::Hook {
                command: command.to_string(),
                status: output.status.to_string(),
                output: captured.trim_end().to_string(),
            });
        }

        debug!(stack, command, output = %captured.trim_end(), "Hook finished");
        Ok(())
    }
}
