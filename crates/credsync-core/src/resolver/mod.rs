//! Credential resolution against the provider
//!
//! Resolution runs leaf-first:
//! 1. `ProjectResolver` maps team and project labels to identifiers
//! 2. `ResourceFetcher` lists the requested resources in scope
//! 3. `CredentialFetcher` streams their credential bundles
//! 4. `merge_credentials` filters each bundle to the requested keys
//!
//! `CredentialResolver` runs the whole sequence for a spec.

mod project;
mod resources;
mod merge;
mod credentials;

pub use project::ProjectResolver;
pub use resources::{ResourceFetcher, CredentialFetcher};
pub use merge::merge_credentials;
pub use credentials::{CredentialResolver, ResourceCredentials};
