// Copyright (c) 2025 - Cowboy AI, Inc.
//! Parameter Reconciliation
//!
//! Reconciles the parameters a template declares against operator overrides
//! and the values of the currently deployed stack.
//!
//! # Resolution order (per declared key)
//!
//! 1. Override supplied → explicit value
//! 2. Template default → omitted, the service applies it
//! 3. Stack not deployed → missing
//! 4. Deployed stack has the key → reuse previous value
//! 5. Otherwise → missing
//!
//! All missing keys are reported together so the operator can supply them
//! in one pass.

use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::Parameter;
use crate::errors::{DeployError, DeployResult};
use crate::provisioning::{StackDescription, TemplateParameter};

/// Reconciles declared parameters for one stack
#[derive(Debug, Clone, Copy)]
pub struct ParameterCollector<'a> {
    declared: &'a [TemplateParameter],
    overrides: &'a BTreeMap<String, String>,
    deployed: Option<&'a StackDescription>,
}

impl<'a> ParameterCollector<'a> {
    /// `deployed` is the live stack, or `None` when it was never deployed
    pub fn new(
        declared: &'a [TemplateParameter],
        overrides: &'a BTreeMap<String, String>,
        deployed: Option<&'a StackDescription>,
    ) -> Self {
        Self {
            declared,
            overrides,
            deployed: deployed.filter(|s| s.is_deployed()),
        }
    }

    /// Parameter assignments in template declaration order
    ///
    /// Overrides for keys the template does not declare are ignored.
    pub fn collect(&self) -> DeployResult<Vec<Parameter>> {
        let mut parameters = Vec::with_capacity(self.declared.len());
        let mut missing = Vec::new();

        for declared in self.declared {
            let key = declared.key.as_str();
            if let Some(value) = self.overrides.get(key) {
                parameters.push(Parameter::explicit(key, value.clone()));
            } else if declared.has_default() {
                continue;
            } else if self
                .deployed
                .is_some_and(|stack| stack.parameter(key).is_some())
            {
                parameters.push(Parameter::use_previous(key));
            } else {
                missing.push(key.to_string());
            }
        }

        if !missing.is_empty() {
            return Err(DeployError::MissingParameters { keys: missing });
        }

        let ignored: Vec<_> = self
            .overrides
            .keys()
            .filter(|k| !self.declared.iter().any(|d| &d.key == *k))
            .collect();
        if !ignored.is_empty() {
            debug!(?ignored, "Overrides not declared by template");
        }

        Ok(parameters)
    }
}
