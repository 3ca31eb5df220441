// Copyright (c) 2025 - Cowboy AI, Inc.
//! Artifact Store Contract
//!
//! Template bodies above the configured size threshold are uploaded and
//! referenced by location instead of being sent inline. The upload itself
//! belongs to the store; this module owns only the threshold decision.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use crate::config::DeployConfig;
use crate::domain::TemplateLocation;
use crate::errors::{DeployError, DeployResult};

/// Storage for oversized templates
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `body` and return its location
    ///
    /// An empty string means the store declined the upload and the body
    /// should be sent inline.
    async fn upload(&self, bucket: &str, key: &str, body: &str) -> DeployResult<String>;

    /// Release a previously uploaded artifact
    async fn release(&self, location: &str) -> DeployResult<()>;
}

/// Store used when no bucket is configured; never uploads
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineOnly;

#[async_trait]
impl ArtifactStore for InlineOnly {
    async fn upload(&self, _bucket: &str, _key: &str, _body: &str) -> DeployResult<String> {
        Ok(String::new())
    }

    async fn release(&self, _location: &str) -> DeployResult<()> {
        Ok(())
    }
}

/// Process-local artifact store keyed by `memory://bucket/key` locations
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    objects: Mutex<BTreeMap<String, String>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body stored at `location`, if still present
    pub fn read(&self, location: &str) -> Option<String> {
        self.lock().get(location).cloned()
    }

    /// Number of artifacts currently held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn upload(&self, bucket: &str, key: &str, body: &str) -> DeployResult<String> {
        if bucket.is_empty() {
            return Err(DeployError::Artifact("empty bucket name".to_string()));
        }
        let location = format!("memory://{}/{}", bucket, key);
        self.lock().insert(location.clone(), body.to_string());
        Ok(location)
    }

    async fn release(&self, location: &str) -> DeployResult<()> {
        self.lock().remove(location);
        Ok(())
    }
}

/// Where a template ended up and whether it needs releasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePlacement {
    pub location: TemplateLocation,
    pub uploaded: Option<String>,
}

/// Decide between inline submission and upload
///
/// Uploads only when the body exceeds `config.upload_threshold` and a
/// bucket is configured; an empty location from the store falls back to
/// inline.
pub async fn place_template(
    store: &dyn ArtifactStore,
    config: &DeployConfig,
    key: &str,
    body: &str,
) -> DeployResult<TemplatePlacement> {
    let inline = TemplatePlacement {
        location: TemplateLocation::Inline(body.to_string()),
        uploaded: None,
    };

    let Some(bucket) = config.artifact_bucket.as_deref() else {
        return Ok(inline);
    };
    if body.len() <= config.upload_threshold {
        return Ok(inline);
    }

    let location = store.upload(bucket, key, body).await?;
    if location.is_empty() {
        return Ok(inline);
    }

    debug!(%location, bytes = body.len(), "Uploaded template");
    Ok(TemplatePlacement {
        location: TemplateLocation::Url(location.clone()),
        uploaded: Some(location),
    })
}
