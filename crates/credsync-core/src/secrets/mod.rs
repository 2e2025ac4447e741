//! Target secret store abstractions and implementations
//!
//! - `SecretStore` trait for implementing custom stores
//! - Built-in implementations: `MemorySecretStore`, `DirectorySecretStore`

mod traits;
mod memory_store;
mod directory_store;

pub use traits::{OwnerReference, SecretObject, SecretStore, SecretStoreError, SecretStoreResult};
pub use memory_store::MemorySecretStore;
pub use directory_store::DirectorySecretStore;
