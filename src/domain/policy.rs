// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Policy Documents
//!
//! A stack policy blocks update actions on selected resources. The
//! orchestrator uses it to protect resources named in a stack definition's
//! block list from deletion and replacement.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyEffect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: PolicyEffect,
    pub action: Vec<String>,
    pub principal: String,
    pub resource: Vec<String>,
}

/// Stack policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackPolicy {
    pub statement: Vec<PolicyStatement>,
}

impl StackPolicy {
    const BLOCKED_ACTIONS: [&'static str; 2] = ["Update:Replace", "Update:Delete"];

    /// Allow every update on every resource
    pub fn allow_all() -> Self {
        Self {
            statement: vec![Self::allow_statement()],
        }
    }

    /// Deny replacement and deletion of the given logical ids
    pub fn blocking<S: AsRef<str>>(logical_ids: &[S]) -> Self {
        if logical_ids.is_empty() {
            return Self::allow_all();
        }

        let deny = PolicyStatement {
            effect: PolicyEffect::Deny,
            action: Self::BLOCKED_ACTIONS.iter().map(|a| a.to_string()).collect(),
            principal: "*".to_string(),
            resource: logical_ids
                .iter()
                .map(|id| format!("LogicalResourceId/{}", id.as_ref()))
                .collect(),
        };

        Self {
            statement: vec![deny, Self::allow_statement()],
        }
    }

    /// True when `logical_id` is protected by a deny statement
    pub fn blocks(&self, logical_id: &str) -> bool {
        let resource = format!("LogicalResourceId/{}", logical_id);
        self.statement
            .iter()
            .any(|s| s.effect == PolicyEffect::Deny && s.resource.contains(&resource))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn allow_statement() -> PolicyStatement {
        PolicyStatement {
            effect: PolicyEffect::Allow,
            action: vec!["Update:*".to_string()],
            principal: "*".to_string(),
            resource: vec!["*".to_string()],
        }
    }
}
