//! Per-key value decoding

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CredentialError, CredentialResult};
use crate::log_error;
use crate::logging::SharedLogger;
use crate::types::ResourceSpec;

/// Encodings a credential value may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    Base64,
}

impl FromStr for ValueEncoding {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(ValueEncoding::Base64),
            other => Err(CredentialError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Decode `value` according to the named encoding
pub fn decode_value(encoding: &str, value: &str) -> CredentialResult<Vec<u8>> {
    match encoding.parse::<ValueEncoding>()? {
        ValueEncoding::Base64 => Ok(STANDARD.decode(value)?),
    }
}

/// Declared encodings keyed by effective key
pub fn encoding_keys<'a>(resources: impl IntoIterator<Item = &'a ResourceSpec>) -> HashMap<String, String> {
    resources
        .into_iter()
        .flat_map(|r| r.credentials.iter())
        .filter(|c| !c.encoding.is_empty())
        .map(|c| (c.effective_key().to_string(), c.encoding.clone()))
        .collect()
}

/// Turn flattened values into bytes, decoding keys that declare an encoding
///
/// A key that fails to decode is logged and keeps its raw string bytes;
/// the other keys are still processed.
pub fn decode_byte_map(
    flat: &BTreeMap<String, String>,
    encodings: &HashMap<String, String>,
    logger: &SharedLogger,
) -> BTreeMap<String, Vec<u8>> {
    flat.iter()
        .map(|(key, value)| {
            let bytes = match encodings.get(key) {
                Some(encoding) => decode_value(encoding, value).unwrap_or_else(|e| {
                    log_error!(logger, "error decoding value for key '{}': {}", key, e);
                    value.as_bytes().to_vec()
                }),
                None => value.as_bytes().to_vec(),
            };
            (key.clone(), bytes)
        })
        .collect()
}
