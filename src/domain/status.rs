// Copyright (c) 2025 - Cowboy AI, Inc.
//! Remote Stack Status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status string reported by the provisioning service
///
/// Kept as text since the service owns the vocabulary; the helpers below
/// classify the values this crate makes decisions on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackStatus(String);

impl StackStatus {
    pub const REVIEW_IN_PROGRESS: &'static str = "REVIEW_IN_PROGRESS";
    pub const CREATE_IN_PROGRESS: &'static str = "CREATE_IN_PROGRESS";
    pub const CREATE_COMPLETE: &'static str = "CREATE_COMPLETE";
    pub const UPDATE_IN_PROGRESS: &'static str = "UPDATE_IN_PROGRESS";
    pub const UPDATE_COMPLETE: &'static str = "UPDATE_COMPLETE";
    pub const DELETE_IN_PROGRESS: &'static str = "DELETE_IN_PROGRESS";
    pub const DELETE_COMPLETE: &'static str = "DELETE_COMPLETE";
    pub const ROLLBACK_COMPLETE: &'static str = "ROLLBACK_COMPLETE";
    pub const UPDATE_ROLLBACK_COMPLETE: &'static str = "UPDATE_ROLLBACK_COMPLETE";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registered but never deployed
    pub fn is_review_in_progress(&self) -> bool {
        self.0 == Self::REVIEW_IN_PROGRESS
    }

    pub fn is_in_progress(&self) -> bool {
        self.0.ends_with("_IN_PROGRESS") && !self.is_review_in_progress()
    }

    /// Failed, or rolled back after a failure
    pub fn is_failed(&self) -> bool {
        self.0.ends_with("_FAILED") || self.0.ends_with("ROLLBACK_COMPLETE")
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StackStatus {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("REVIEW_IN_PROGRESS", false, false ; "review")]
    #[test_case("CREATE_IN_PROGRESS", true, false ; "creating")]
    #[test_case("UPDATE_COMPLETE", false, false ; "updated")]
    #[test_case("ROLLBACK_COMPLETE", false, true ; "rolled back")]
    #[test_case("UPDATE_ROLLBACK_COMPLETE", false, true ; "update rolled back")]
    #[test_case("DELETE_FAILED", false, true ; "delete failed")]
    fn test_classification(status: &str, in_progress: bool, failed: bool) {
        let status = StackStatus::new(status);
        assert_eq!(status.is_in_progress(), in_progress);
        assert_eq!(status.is_failed(), failed);
    }
}
