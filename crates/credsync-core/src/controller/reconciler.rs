//! Per-object reconciliation: spec in, target secret out

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::handler::EventHandler;
use crate::error::CredentialError;
use crate::logging::SharedLogger;
use crate::render::{decode_byte_map, encoding_keys, flatten, SecretPayload};
use crate::resolver::{CredentialResolver, ResourceCredentials};
use crate::secrets::{SecretObject, SecretStore, SecretStoreError};
use crate::types::SpecObject;
use crate::{log_debug, log_error, log_info};

/// Pipeline step a reconciliation failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Resolve,
    Flatten,
    Render,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Resolve => "resolve",
            Stage::Flatten => "flatten",
            Stage::Render => "render",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// A failed reconciliation and the stage it stopped at
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ReconcileError {
    pub stage: Stage,
    #[source]
    pub source: CredentialError,
}

impl ReconcileError {
    pub fn new(stage: Stage, source: impl Into<CredentialError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Turns spec objects into target secrets
///
/// Any failure leaves the target store untouched; nothing is retried
/// until the next event for the same object.
pub struct Reconciler {
    resolver: Arc<CredentialResolver>,
    store: Arc<dyn SecretStore>,
    logger: SharedLogger,
}

impl Reconciler {
    pub fn new(resolver: Arc<CredentialResolver>, store: Arc<dyn SecretStore>, logger: SharedLogger) -> Self {
        Self {
            resolver,
            store,
            logger,
        }
    }

    /// Resolve and render the secret for `object` without writing it
    pub async fn render(&self, object: &SpecObject) -> Result<SecretObject, ReconcileError> {
        object.validate().map_err(|e| ReconcileError::new(Stage::Validate, e))?;

        let credentials = self
            .resolve(object)
            .await
            .map_err(|e| ReconcileError::new(Stage::Resolve, e))?;
        let flat = flatten(&credentials).map_err(|e| ReconcileError::new(Stage::Flatten, e))?;

        let encodings = encoding_keys(object.resource_specs());
        let data = decode_byte_map(&flat, &encodings, &self.logger);

        let payload = SecretPayload::render(data, object.secret_type())
            .map_err(|e| ReconcileError::new(Stage::Render, e))?;
        Ok(SecretObject::for_object(object, payload))
    }

    /// Render the secret for `object` and upsert it into the store
    pub async fn reconcile(&self, object: &SpecObject) -> Result<SecretObject, ReconcileError> {
        let secret = self.render(object).await?;
        self.store
            .upsert(&secret)
            .await
            .map_err(|e| ReconcileError::new(Stage::Store, e))?;
        Ok(secret)
    }

    /// Delete the secret owned by `object`; an absent secret is not an error
    pub async fn remove(&self, object: &SpecObject) -> Result<(), ReconcileError> {
        let meta = object.metadata();
        match self.store.delete(&meta.namespace, &meta.name).await {
            Ok(()) | Err(SecretStoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(ReconcileError::new(Stage::Store, e)),
        }
    }

    async fn resolve(&self, object: &SpecObject) -> Result<ResourceCredentials, CredentialError> {
        match object {
            SpecObject::Project(project) => self.resolver.project_credentials(&project.spec).await,
            SpecObject::Resource(resource) => {
                let values = self.resolver.resource_credentials(&resource.spec).await?;
                Ok(ResourceCredentials::from([(resource.spec.label.clone(), values)]))
            }
        }
    }

    async fn apply(&self, object: &SpecObject) {
        match self.reconcile(object).await {
            Ok(secret) => log_info!(
                self.logger,
                "{} {} synced secret {} ({} keys)",
                object.kind(),
                object.key(),
                secret.key(),
                secret.data.len()
            ),
            Err(e) => log_error!(
                self.logger,
                "{} {} ({}): {}",
                object.kind(),
                object.key(),
                object.summary(),
                e
            ),
        }
    }
}

#[async_trait]
impl EventHandler for Reconciler {
    async fn on_add(&self, object: &SpecObject) {
        self.apply(object).await;
    }

    async fn on_update(&self, _old: &SpecObject, new: &SpecObject) {
        self.apply(new).await;
    }

    async fn on_delete(&self, object: &SpecObject) {
        match self.remove(object).await {
            Ok(()) => log_debug!(self.logger, "{} {} deleted", object.kind(), object.key()),
            Err(e) => log_error!(self.logger, "{} {} ({}): {}", object.kind(), object.key(), object.summary(), e),
        }
    }
}
