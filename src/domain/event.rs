// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Events observed from the provisioning service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote status event for one stack
///
/// Event ids are unique and issued in order by the service, but they are
/// not lexically sortable. The service lists events newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub event_id: String,
    pub stack_name: String,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub status: String,
    pub status_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status,
            self.resource_type,
            self.logical_resource_id
        )?;
        if let Some(reason) = &self.status_reason {
            write!(f, " {}", reason)?;
        }
        Ok(())
    }
}
