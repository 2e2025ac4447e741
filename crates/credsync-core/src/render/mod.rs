//! Turning merged credentials into secret payloads
//!
//! - `flatten`: merged values per resource into one key/value map
//! - `decode`: per-key decoding of declared encodings
//! - `dockercfg`: registry login config for docker-registry secrets

mod decode;
mod dockercfg;
mod flatten;

use std::collections::BTreeMap;

pub use decode::{decode_byte_map, decode_value, encoding_keys, ValueEncoding};
pub use dockercfg::{
    decode_auth, docker_config, encode_auth, DockerConfig, DockerConfigEntry, DEFAULT_DOCKER_SERVER,
};
pub use flatten::{flatten, flatten_resource};

use crate::error::CredentialResult;
use crate::types::SecretType;

/// Data key holding the rendered docker config
pub const DOCKER_CONFIG_KEY: &str = ".dockercfg";

/// Rendered secret contents ready to be written to a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPayload {
    pub data: BTreeMap<String, Vec<u8>>,
    pub secret_type: SecretType,
}

impl SecretPayload {
    /// Render `data` for `secret_type`
    pub fn render(data: BTreeMap<String, Vec<u8>>, secret_type: SecretType) -> CredentialResult<Self> {
        Ok(Self {
            data: render_secret(data, secret_type)?,
            secret_type,
        })
    }

    /// Type name recorded on the target secret
    pub fn target_type(&self) -> &'static str {
        self.secret_type.target_type()
    }
}

/// Shape decoded data for the given secret type
///
/// Opaque secrets keep the data unchanged. Docker registry secrets replace
/// it with a single `.dockercfg` entry.
pub fn render_secret(
    data: BTreeMap<String, Vec<u8>>,
    secret_type: SecretType,
) -> CredentialResult<BTreeMap<String, Vec<u8>>> {
    match secret_type {
        SecretType::Opaque => Ok(data),
        SecretType::DockerRegistry => {
            let config = docker_config(&data)?;
            Ok(BTreeMap::from([(DOCKER_CONFIG_KEY.to_string(), config)]))
        }
    }
}
