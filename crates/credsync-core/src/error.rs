//! Errors raised while resolving and rendering credentials

use thiserror::Error;

use crate::providers::ProviderError;
use crate::secrets::SecretStoreError;

/// Errors that abort the reconciliation of a single spec object
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error("team not found: {0}")]
    TeamNotFound(String),

    #[error("project with the given label is not found: {0}")]
    ProjectNotFound(String),

    #[error("resource with the given label is not found: {0}")]
    ResourceNotFound(String),

    #[error("multiple resources labelled '{0}' found, please provide a specific project")]
    MultipleResourcesFound(String),

    #[error("credential '{key}' of resource '{resource}' does not exist and has no default")]
    CredentialDefaultNotSet { resource: String, key: String },

    #[error("key '{0}' is already used, please use an alias")]
    DuplicateAliasKey(String),

    #[error("encoding '{0}' not supported")]
    UnsupportedEncoding(String),

    #[error("secret type '{0}' not supported")]
    UnsupportedSecretType(String),

    #[error("expected {0} to be set")]
    MissingRequiredDockerField(String),

    #[error("unable to parse auth field: {0}")]
    InvalidDockerAuth(String),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("secret store error: {0}")]
    Store(#[from] SecretStoreError),
}

pub type CredentialResult<T> = Result<T, CredentialError>;
