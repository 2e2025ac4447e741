//! credsync Core
//!
//! Resolves declarative project/resource credential specs against an
//! external credential provider and renders them into secret payloads.
//!
//! ## Pipeline
//!
//! Every watch event for a spec object runs through the same stages:
//! - validate the spec (`types`)
//! - resolve the project, fetch resources and credentials (`resolver`)
//! - merge, flatten and decode the values (`resolver`, `render`)
//! - render the payload for the declared secret type (`render`)
//! - upsert or delete the target secret (`secrets`, `controller`)
//!
//! ```rust,ignore
//! use credsync_core::{Controller, CredentialResolver, MemorySecretStore, ConsoleLogger};
//!
//! let resolver = CredentialResolver::connect(provider, Some("my-team"), logger.clone()).await?;
//! let controller = Controller::new(Arc::new(resolver), store, logger);
//! controller.run(project_events, resource_events).await;
//! ```

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod providers;
pub mod resolver;
pub mod render;
pub mod secrets;
pub mod controller;

// Re-export commonly used types
pub use types::{
    CredentialSpec, ResourceSpec, ProjectSpec, SecretType,
    CredentialValue, ObjectMeta, Project, Resource, SpecObject, SpecKind,
};

pub use error::{CredentialError, CredentialResult};

pub use logging::{Logger, SharedLogger, NoOpLogger, ConsoleLogger, MemoryLogger};

pub use config::{ControllerConfig, ConfigError, ConfigResult};

pub use providers::{
    CredentialProvider, ListStream, ProviderId, ProviderError, ProviderResult,
    Team, ProjectRecord, ResourceRecord, CredentialRecord,
    MemoryProvider, HttpProvider,
};

pub use resolver::{
    ProjectResolver, ResourceFetcher, CredentialFetcher, CredentialResolver, merge_credentials,
};

pub use render::{SecretPayload, render_secret, flatten, decode_byte_map, DOCKER_CONFIG_KEY};

pub use secrets::{
    SecretStore, SecretObject, OwnerReference, SecretStoreError, SecretStoreResult,
    MemorySecretStore, DirectorySecretStore,
};

pub use controller::{
    EventHandler, WatchEvent, Reconciler, ReconcileError, Stage, Dispatcher, EventRouter, Controller,
};
