// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-run deployment context

use std::sync::Arc;
use uuid::Uuid;

use crate::artifact::{ArtifactStore, InlineOnly};
use crate::config::DeployConfig;
use crate::errors::DeployResult;
use crate::provisioning::ProvisioningService;

/// Collaborators shared by every component of one deployment run
///
/// Built once per run and cloned into each lifecycle; nothing here is
/// process-global.
#[derive(Clone)]
pub struct DeployContext {
    service: Arc<dyn ProvisioningService>,
    artifacts: Arc<dyn ArtifactStore>,
    config: Arc<DeployConfig>,
    run_id: Uuid,
}

impl DeployContext {
    /// Create a context after validating `config`
    pub fn new(
        service: Arc<dyn ProvisioningService>,
        artifacts: Arc<dyn ArtifactStore>,
        config: DeployConfig,
    ) -> DeployResult<Self> {
        config.validate()?;
        Ok(Self {
            service,
            artifacts,
            config: Arc::new(config),
            run_id: Uuid::now_v7(),
        })
    }

    /// Context that always submits templates inline
    pub fn inline(service: Arc<dyn ProvisioningService>, config: DeployConfig) -> DeployResult<Self> {
        Self::new(service, Arc::new(InlineOnly), config)
    }

    pub fn service(&self) -> &Arc<dyn ProvisioningService> {
        &self.service
    }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactStore> {
        &self.artifacts
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Identifier of this run, used in artifact keys and log records
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl std::fmt::Debug for DeployContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployContext")
            .field("run_id", &self.run_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
