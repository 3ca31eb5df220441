// Copyright (c) 2025 - Cowboy AI, Inc.
//! Incremental stack event tracking

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::domain::StackEvent;
use crate::errors::{DeployError, DeployResult};
use crate::provisioning::{ProvisioningError, ProvisioningService};

/// Tracks which events of one stack have already been surfaced
///
/// The first call after construction (or [`EventTracker::restart`]) only
/// records the currently visible events as seen and returns nothing, so a
/// stack with a long history does not flood the operator.
pub struct EventTracker {
    stack_name: String,
    service: Arc<dyn ProvisioningService>,
    seen: HashSet<String>,
    started: bool,
}

impl EventTracker {
    pub fn new(stack_name: impl Into<String>, service: Arc<dyn ProvisioningService>) -> Self {
        Self {
            stack_name: stack_name.into(),
            service,
            seen: HashSet::new(),
            started: false,
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Re-establish the baseline on the next call
    pub fn restart(&mut self) {
        self.started = false;
    }

    /// Events not surfaced before, newest first
    ///
    /// A stack that does not exist (yet, or any more) has no events.
    pub async fn fresh_events(&mut self) -> DeployResult<Vec<StackEvent>> {
        let events = match self.service.describe_stack_events(&self.stack_name).await {
            Ok(events) => events,
            Err(ProvisioningError::StackDoesNotExist(_)) => Vec::new(),
            Err(e) => {
                return Err(DeployError::remote(
                    format!("describing events of stack {}", self.stack_name),
                    e,
                ))
            }
        };

        if !self.started {
            self.started = true;
            self.seen.extend(events.into_iter().map(|e| e.event_id));
            debug!(stack = %self.stack_name, seen = self.seen.len(), "Event baseline recorded");
            return Ok(Vec::new());
        }

        let fresh: Vec<StackEvent> = events
            .into_iter()
            .filter(|e| !self.seen.contains(&e.event_id))
            .collect();
        self.seen.extend(fresh.iter().map(|e| e.event_id.clone()));
        Ok(fresh)
    }
}
