//! Credential provider abstractions
//!
//! The provider holds the actual secret values, organised as
//! team → project → resource → credential key.
//!
//! - `HttpProvider` talks to the provider's REST API
//! - `MemoryProvider` serves a fixed data set (fixtures, tests)

mod traits;
mod error;
mod memory;
mod http;

pub use traits::{
    CredentialProvider, ListStream, ProviderId, Team, ProjectRecord, ResourceRecord,
    CredentialRecord, ProjectQuery, ResourceQuery,
};
pub use error::{ProviderError, ProviderResult};
pub use memory::{MemoryProvider, ProviderFixture};
pub use http::HttpProvider;
