// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{DeployError, DeployResult};
use crate::provisioning::WaitPolicy;

/// Tunables for a deployment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Bucket for oversized templates; `None` always submits inline
    pub artifact_bucket: Option<String>,

    /// Template size in bytes above which bodies are uploaded
    pub upload_threshold: usize,

    /// Attempts for the stack completion waiter
    pub wait_max_attempts: u32,

    /// Delay between waiter attempts, in milliseconds
    pub wait_delay_ms: u64,

    /// Interval between event polls while a stack changes, in milliseconds
    pub event_poll_interval_ms: u64,

    /// Capacity of the event channel handed to the presenter
    pub event_buffer: usize,

    /// Prefix of generated change set names
    pub change_set_prefix: String,

    /// Colorize diffs for terminal display
    pub color: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            artifact_bucket: None,
            upload_threshold: 51_200,
            wait_max_attempts: 720,
            wait_delay_ms: 5_000,
            event_poll_interval_ms: 2_000,
            event_buffer: 64,
            change_set_prefix: "cim-deploy".to_string(),
            color: false,
        }
    }
}

impl DeployConfig {
    /// Load configuration from `CIM_DEPLOY_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> DeployResult<Self> {
        let mut config = Self::default();

        if let Ok(bucket) = std::env::var("CIM_DEPLOY_BUCKET") {
            if !bucket.is_empty() {
                config.artifact_bucket = Some(bucket);
            }
        }
        if let Some(v) = env_parse("CIM_DEPLOY_UPLOAD_THRESHOLD")? {
            config.upload_threshold = v;
        }
        if let Some(v) = env_parse("CIM_DEPLOY_WAIT_MAX_ATTEMPTS")? {
            config.wait_max_attempts = v;
        }
        if let Some(v) = env_parse("CIM_DEPLOY_WAIT_DELAY_MS")? {
            config.wait_delay_ms = v;
        }
        if let Some(v) = env_parse("CIM_DEPLOY_EVENT_POLL_MS")? {
            config.event_poll_interval_ms = v;
        }
        if let Some(v) = env_parse("CIM_DEPLOY_EVENT_BUFFER")? {
            config.event_buffer = v;
        }
        if let Ok(prefix) = std::env::var("CIM_DEPLOY_CHANGE_SET_PREFIX") {
            config.change_set_prefix = prefix;
        }
        if let Some(v) = env_parse("CIM_DEPLOY_COLOR")? {
            config.color = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or misname a run
    pub fn validate(&self) -> DeployResult<()> {
        if self.upload_threshold == 0 {
            return Err(DeployError::Configuration(
                "upload_threshold must be positive".to_string(),
            ));
        }
        if self.wait_max_attempts == 0 {
            return Err(DeployError::Configuration(
                "wait_max_attempts must be positive".to_string(),
            ));
        }
        if self.event_poll_interval_ms == 0 {
            return Err(DeployError::Configuration(
                "event_poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(DeployError::Configuration(
                "event_buffer must be positive".to_string(),
            ));
        }
        if self.change_set_prefix.is_empty() {
            return Err(DeployError::Configuration(
                "change_set_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            max_attempts: self.wait_max_attempts,
            delay: Duration::from_millis(self.wait_delay_ms),
        }
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }
}

fn env_parse<T: FromStr>(name: &str) -> DeployResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DeployError::Configuration(format!("{}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}
