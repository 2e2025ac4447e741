//! Declarative credential specs and their validation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, CredentialResult};

/// Secret payload format a spec renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SecretType {
    /// Generic key/value secret
    #[default]
    Opaque,
    /// Container registry login config
    DockerRegistry,
}

impl SecretType {
    /// Name used in spec documents
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretType::Opaque => "opaque",
            SecretType::DockerRegistry => "docker-registry",
        }
    }

    /// Type recorded on the target secret
    pub fn target_type(&self) -> &'static str {
        match self {
            SecretType::Opaque => "Opaque",
            SecretType::DockerRegistry => "kubernetes.io/dockercfg",
        }
    }
}

impl FromStr for SecretType {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "opaque" => Ok(SecretType::Opaque),
            "docker-registry" => Ok(SecretType::DockerRegistry),
            other => Err(CredentialError::UnsupportedSecretType(other.to_string())),
        }
    }
}

impl TryFrom<String> for SecretType {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SecretType> for String {
    fn from(value: SecretType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for a single credential key of a resource
///
/// Empty strings mean "not set" for every optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    /// Key as stored by the provider
    pub key: String,
    /// Alias the value is exposed under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Value used when the provider does not hold the key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,
    /// Encoding of the provider value (only `base64` is supported)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encoding: String,
}

impl CredentialSpec {
    /// Create a spec for a provider key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set the alias
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    /// Set the value encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Key the value appears under once flattened
    pub fn effective_key(&self) -> &str {
        if self.name.is_empty() {
            &self.key
        } else {
            &self.name
        }
    }

    pub fn validate(&self) -> CredentialResult<()> {
        if self.key.is_empty() {
            return Err(CredentialError::InvalidSpec("credential key is required".to_string()));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// A provider resource and the subset of its credentials to expose
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource label at the provider
    #[serde(rename = "resource", alias = "label", alias = "name")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<SecretType>,
    /// Requested credentials; empty means "every key the provider holds"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialSpec>,
}

impl ResourceSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn with_type(mut self, secret_type: SecretType) -> Self {
        self.secret_type = Some(secret_type);
        self
    }

    pub fn with_credential(mut self, credential: CredentialSpec) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Declared secret type, opaque when unset
    pub fn secret_type(&self) -> SecretType {
        self.secret_type.unwrap_or_default()
    }

    /// Team scope for this resource, if any
    pub fn team(&self) -> Option<&str> {
        non_empty(&self.team)
    }

    /// Check the label and every nested credential
    pub fn validate(&self) -> CredentialResult<()> {
        if self.label.is_empty() {
            return Err(CredentialError::InvalidSpec("resource label is required".to_string()));
        }
        for credential in &self.credentials {
            credential.validate().map_err(|_| {
                CredentialError::InvalidSpec(format!(
                    "resource '{}' has a credential without a key",
                    self.label
                ))
            })?;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_summary(f, &[("resource", &self.label), ("team", &self.team)], self.secret_type)
    }
}

/// A provider project and the resources to pull from it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Project label at the provider
    #[serde(rename = "project", alias = "label", alias = "name")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub team: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<SecretType>,
    /// Resources to include; empty means every resource in the project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceSpec>,
}

impl ProjectSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn with_type(mut self, secret_type: SecretType) -> Self {
        self.secret_type = Some(secret_type);
        self
    }

    pub fn with_resource(mut self, resource: ResourceSpec) -> Self {
        self.resources.push(resource);
        self
    }

    /// Declared secret type, opaque when unset
    pub fn secret_type(&self) -> SecretType {
        self.secret_type.unwrap_or_default()
    }

    pub fn team(&self) -> Option<&str> {
        non_empty(&self.team)
    }

    /// Check the label and every nested resource
    pub fn validate(&self) -> CredentialResult<()> {
        if self.label.is_empty() {
            return Err(CredentialError::InvalidSpec("project label is required".to_string()));
        }
        for resource in &self.resources {
            resource.validate()?;
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for ProjectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_summary(f, &[("project", &self.label), ("team", &self.team)], self.secret_type)
    }
}

fn write_summary(
    f: &mut fmt::Formatter<'_>,
    fields: &[(&str, &str)],
    secret_type: Option<SecretType>,
) -> fmt::Result {
    let mut parts: Vec<String> = fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect();
    if let Some(t) = secret_type {
        parts.push(format!("type: {}", t));
    }
    f.write_str(&parts.join(", "))
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_spec_validation() {
        assert!(CredentialSpec::new("HOST").is_valid());
        assert!(!CredentialSpec::default().is_valid());
    }

    #[test]
    fn test_effective_key() {
        let plain = CredentialSpec::new("HOST");
        assert_eq!(plain.effective_key(), "HOST");

        let aliased = CredentialSpec::new("HOST").with_name("DB_HOST");
        assert_eq!(aliased.effective_key(), "DB_HOST");
    }

    #[test]
    fn test_resource_spec_validation() {
        assert!(!ResourceSpec::default().is_valid());
        assert!(ResourceSpec::new("db").is_valid());

        let bad_credential = ResourceSpec::new("db").with_credential(CredentialSpec::default());
        assert!(matches!(
            bad_credential.validate(),
            Err(CredentialError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_project_spec_validation() {
        assert!(!ProjectSpec::default().is_valid());
        assert!(ProjectSpec::new("production").is_valid());

        let nested = ProjectSpec::new("production").with_resource(ResourceSpec::default());
        assert!(!nested.is_valid());
    }

    #[test]
    fn test_project_spec_display() {
        let cases = [
            (ProjectSpec::default(), ""),
            (ProjectSpec::new("production"), "project: production"),
            (ProjectSpec::default().with_team("manifold"), "team: manifold"),
            (
                ProjectSpec::default().with_type(SecretType::DockerRegistry),
                "type: docker-registry",
            ),
            (
                ProjectSpec::new("production")
                    .with_team("manifold")
                    .with_type(SecretType::DockerRegistry),
                "project: production, team: manifold, type: docker-registry",
            ),
        ];

        for (spec, expected) in cases {
            assert_eq!(spec.to_string(), expected);
        }
    }

    #[test]
    fn test_secret_type_parsing() {
        assert_eq!("".parse::<SecretType>().unwrap(), SecretType::Opaque);
        assert_eq!("opaque".parse::<SecretType>().unwrap(), SecretType::Opaque);
        assert_eq!(
            "docker-registry".parse::<SecretType>().unwrap(),
            SecretType::DockerRegistry
        );

        match "service-account".parse::<SecretType>() {
            Err(CredentialError::UnsupportedSecretType(t)) => assert_eq!(t, "service-account"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resource_spec_from_yaml() {
        let yaml = r#"
resource: db
type: docker-registry
credentials:
  - key: HOST
  - key: PORT
    default: "5432"
  - key: CERT
    name: TLS_CERT
    encoding: base64
"#;
        let spec: ResourceSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.label, "db");
        assert_eq!(spec.secret_type(), SecretType::DockerRegistry);
        assert_eq!(spec.credentials.len(), 3);
        assert_eq!(spec.credentials[1].default, "5432");
        assert_eq!(spec.credentials[2].effective_key(), "TLS_CERT");
        assert_eq!(spec.credentials[2].encoding, "base64");
    }

    #[test]
    fn test_label_aliases() {
        let spec: ResourceSpec = serde_yaml::from_str("label: cache").unwrap();
        assert_eq!(spec.label, "cache");

        let project: ProjectSpec = serde_yaml::from_str("name: staging").unwrap();
        assert_eq!(project.label, "staging");
        assert_eq!(project.secret_type(), SecretType::Opaque);
    }

    #[test]
    fn test_unsupported_type_rejected_at_boundary() {
        let result: Result<ResourceSpec, _> = serde_yaml::from_str("resource: db\ntype: tls");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("tls"), "unexpected error: {}", err);
    }
}
