//! Docker registry login config (`.dockercfg`) rendering

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, CredentialResult};

/// Registry used when `DOCKER_SERVER` is not provided
pub const DEFAULT_DOCKER_SERVER: &str = "https://index.docker.io/v1/";

/// Login entries keyed by registry server
pub type DockerConfig = BTreeMap<String, DockerConfigEntry>;

/// Credentials for one registry
///
/// Serialized with an extra `auth` field holding `base64(username:password)`.
/// When deserializing, a non-empty `auth` takes precedence over the plain
/// username and password fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntryWithAuth", into = "EntryWithAuth")]
pub struct DockerConfigEntry {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
struct EntryWithAuth {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    auth: String,
}

impl From<DockerConfigEntry> for EntryWithAuth {
    fn from(entry: DockerConfigEntry) -> Self {
        let auth = encode_auth(&entry.username, &entry.password);
        Self {
            username: entry.username,
            password: entry.password,
            email: entry.email,
            auth,
        }
    }
}

impl TryFrom<EntryWithAuth> for DockerConfigEntry {
    type Error = CredentialError;

    fn try_from(raw: EntryWithAuth) -> Result<Self, Self::Error> {
        let (username, password) = if raw.auth.is_empty() {
            (raw.username, raw.password)
        } else {
            decode_auth(&raw.auth)?
        };
        Ok(Self {
            username,
            password,
            email: raw.email,
        })
    }
}

/// `base64(username:password)`
pub fn encode_auth(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", username, password))
}

/// Split an `auth` field back into username and password
///
/// Only the first `:` separates the two, so passwords may contain colons.
pub fn decode_auth(auth: &str) -> CredentialResult<(String, String)> {
    let decoded = STANDARD.decode(auth)?;
    let decoded = String::from_utf8_lossy(&decoded);
    match decoded.split_once(':') {
        Some((username, password)) => Ok((username.to_string(), password.to_string())),
        None => Err(CredentialError::InvalidDockerAuth(
            "missing ':' between username and password".to_string(),
        )),
    }
}

/// Build the serialized `.dockercfg` document from flattened credentials
///
/// Reads `DOCKER_SERVER` (optional), `DOCKER_USERNAME`, `DOCKER_PASSWORD`
/// and `DOCKER_EMAIL`. A required key that is absent fails with
/// `MissingRequiredDockerField`; a present but empty value is accepted.
pub fn docker_config(data: &BTreeMap<String, Vec<u8>>) -> CredentialResult<Vec<u8>> {
    let server = docker_key(data, "server", false)?;
    let server = if server.is_empty() {
        DEFAULT_DOCKER_SERVER.to_string()
    } else {
        server
    };

    let entry = DockerConfigEntry {
        username: docker_key(data, "username", true)?,
        password: docker_key(data, "password", true)?,
        email: docker_key(data, "email", true)?,
    };

    let config: DockerConfig = BTreeMap::from([(server, entry)]);
    Ok(serde_json::to_vec(&config)?)
}

fn docker_key(data: &BTreeMap<String, Vec<u8>>, field: &str, required: bool) -> CredentialResult<String> {
    let key = format!("DOCKER_{}", field.to_uppercase());
    match data.get(&key) {
        Some(value) => Ok(String::from_utf8_lossy(value).into_owned()),
        None if required => Err(CredentialError::MissingRequiredDockerField(key)),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    fn login() -> BTreeMap<String, Vec<u8>> {
        data(&[
            ("DOCKER_USERNAME", "u"),
            ("DOCKER_PASSWORD", "p"),
            ("DOCKER_EMAIL", "e@x"),
        ])
    }

    #[test]
    fn test_default_server() {
        let rendered = docker_config(&login()).unwrap();
        let config: DockerConfig = serde_json::from_slice(&rendered).unwrap();

        assert_eq!(config.len(), 1);
        let entry = &config[DEFAULT_DOCKER_SERVER];
        assert_eq!(entry.username, "u");
        assert_eq!(entry.password, "p");
        assert_eq!(entry.email, "e@x");
    }

    #[test]
    fn test_rendered_json_carries_auth() {
        let rendered = docker_config(&login()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&rendered).unwrap();

        assert_eq!(json[DEFAULT_DOCKER_SERVER]["auth"], STANDARD.encode("u:p"));
        assert_eq!(json[DEFAULT_DOCKER_SERVER]["email"], "e@x");
    }

    #[test]
    fn test_explicit_server() {
        let mut input = login();
        input.insert("DOCKER_SERVER".to_string(), b"registry.example.com".to_vec());

        let config: DockerConfig = serde_json::from_slice(&docker_config(&input).unwrap()).unwrap();
        assert!(config.contains_key("registry.example.com"));
    }

    #[test]
    fn test_missing_required_field() {
        let input = data(&[("DOCKER_USERNAME", "u"), ("DOCKER_EMAIL", "e@x")]);
        let err = docker_config(&input).unwrap_err();
        assert!(matches!(err, CredentialError::MissingRequiredDockerField(k) if k == "DOCKER_PASSWORD"));
        assert_eq!(
            CredentialError::MissingRequiredDockerField("DOCKER_PASSWORD".into()).to_string(),
            "expected DOCKER_PASSWORD to be set"
        );
    }

    #[test]
    fn test_empty_values_are_accepted() {
        let input = data(&[("DOCKER_USERNAME", ""), ("DOCKER_PASSWORD", ""), ("DOCKER_EMAIL", "")]);
        assert!(docker_config(&input).is_ok());
    }

    #[test]
    fn test_auth_overrides_plain_fields() {
        let json = format!(
            r#"{{"username":"ignored","password":"ignored","auth":"{}"}}"#,
            STANDARD.encode("alice:s3:cret")
        );
        let entry: DockerConfigEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(entry.username, "alice");
        assert_eq!(entry.password, "s3:cret");
        assert_eq!(entry.email, "");
    }

    #[test]
    fn test_auth_without_colon_is_rejected() {
        assert!(matches!(
            decode_auth(&STANDARD.encode("nocolon")),
            Err(CredentialError::InvalidDockerAuth(_))
        ));

        let json = format!(r#"{{"auth":"{}"}}"#, STANDARD.encode("nocolon"));
        assert!(serde_json::from_str::<DockerConfigEntry>(&json).is_err());
    }
}
