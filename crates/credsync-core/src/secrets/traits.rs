//! Core traits and types for the target secret store

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::SecretPayload;
use crate::types::{SpecObject, API_VERSION};

/// Back-reference from a secret to the spec object that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
}

impl OwnerReference {
    /// Controller reference pointing at `object`
    pub fn for_object(object: &SpecObject) -> Self {
        let meta = object.metadata();
        Self {
            api_version: API_VERSION.to_string(),
            kind: object.kind().to_string(),
            name: meta.name.clone(),
            uid: meta.uid.clone(),
            controller: true,
        }
    }
}

/// A secret as persisted in the target store
///
/// Data values are raw bytes; on the wire they are base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretObject {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub secret_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default, with = "base64_data")]
    pub data: BTreeMap<String, Vec<u8>>,
}

impl SecretObject {
    /// Secret named and scoped after `owner`, holding `payload`
    pub fn for_object(owner: &SpecObject, payload: SecretPayload) -> Self {
        let meta = owner.metadata();
        Self {
            name: meta.name.clone(),
            namespace: meta.namespace.clone(),
            secret_type: payload.target_type().to_string(),
            owner_references: vec![OwnerReference::for_object(owner)],
            data: payload.data,
        }
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

mod base64_data {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &BTreeMap<String, Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_map(data.iter().map(|(k, v)| (k, STANDARD.encode(v))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        BTreeMap::<String, String>::deserialize(d)?
            .into_iter()
            .map(|(k, v)| {
                let bytes = STANDARD.decode(&v).map_err(de::Error::custom)?;
                Ok((k, bytes))
            })
            .collect()
    }
}

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Secret already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid secret name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Other(String),
}

impl SecretStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretStoreError::NotFound(_))
    }
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Target store the rendered secrets are written to
///
/// Implementations:
/// - In-memory for testing (`MemorySecretStore`)
/// - One JSON file per secret (`DirectorySecretStore`)
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Fetch a secret, `NotFound` if absent
    async fn get(&self, namespace: &str, name: &str) -> SecretStoreResult<SecretObject>;

    /// Create a secret, `AlreadyExists` if present
    async fn create(&self, secret: &SecretObject) -> SecretStoreResult<()>;

    /// Replace an existing secret, `NotFound` if absent
    async fn update(&self, secret: &SecretObject) -> SecretStoreResult<()>;

    /// Delete a secret, `NotFound` if absent
    async fn delete(&self, namespace: &str, name: &str) -> SecretStoreResult<()>;

    /// Update the secret if it exists, otherwise create it
    async fn upsert(&self, secret: &SecretObject) -> SecretStoreResult<()> {
        match self.update(secret).await {
            Err(SecretStoreError::NotFound(_)) => self.create(secret).await,
            other => other,
        }
    }
}
