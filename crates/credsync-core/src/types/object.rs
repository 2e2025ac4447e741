//! Spec objects as delivered by the watch mechanism

use std::fmt;

use serde::{Deserialize, Serialize};

use super::spec::{ProjectSpec, ResourceSpec, SecretType};
use crate::error::{CredentialError, CredentialResult};

/// API group/version of the spec objects
pub const API_VERSION: &str = "credsync.io/v1";

/// Identity of a spec object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: String::new(),
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl Default for ObjectMeta {
    fn default() -> Self {
        Self::new(default_namespace(), "")
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Whether `name` is a DNS-1123 subdomain, the rule object names follow
///
/// Lowercase alphanumeric labels joined by single dots, each label may
/// contain inner `-`, at most 253 characters overall. Such a name can
/// never contain a path separator or a `..` component.
pub fn is_valid_object_name(name: &str) -> bool {
    name.len() <= 253 && name.split('.').all(is_dns_label)
}

/// Whether `namespace` is a DNS-1123 label
pub fn is_valid_namespace(namespace: &str) -> bool {
    namespace.len() <= 63 && is_dns_label(namespace)
}

fn is_dns_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

/// A `Project` spec object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub metadata: ObjectMeta,
    pub spec: ProjectSpec,
}

/// A `Resource` spec object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub metadata: ObjectMeta,
    pub spec: ResourceSpec,
}

/// Kinds of spec objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
    Project,
    Resource,
}

impl SpecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecKind::Project => "Project",
            SpecKind::Resource => "Resource",
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A spec object of either kind, resolved once from the `kind` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SpecObject {
    Project(Project),
    Resource(Resource),
}

impl SpecObject {
    pub fn kind(&self) -> SpecKind {
        match self {
            SpecObject::Project(_) => SpecKind::Project,
            SpecObject::Resource(_) => SpecKind::Resource,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            SpecObject::Project(p) => &p.metadata,
            SpecObject::Resource(r) => &r.metadata,
        }
    }

    /// `namespace/name` of the object
    pub fn key(&self) -> String {
        self.metadata().key()
    }

    pub fn secret_type(&self) -> SecretType {
        match self {
            SpecObject::Project(p) => p.spec.secret_type(),
            SpecObject::Resource(r) => r.spec.secret_type(),
        }
    }

    /// Resource specs whose declared encodings apply to this object
    pub fn resource_specs(&self) -> Vec<&ResourceSpec> {
        match self {
            SpecObject::Project(p) => p.spec.resources.iter().collect(),
            SpecObject::Resource(r) => vec![&r.spec],
        }
    }

    pub fn validate(&self) -> CredentialResult<()> {
        let metadata = self.metadata();
        if metadata.name.is_empty() {
            return Err(CredentialError::InvalidSpec(format!(
                "{} object has no name",
                self.kind()
            )));
        }
        if !is_valid_object_name(&metadata.name) {
            return Err(CredentialError::InvalidSpec(format!(
                "{} name '{}' is not a valid object name",
                self.kind(),
                metadata.name
            )));
        }
        if !is_valid_namespace(&metadata.namespace) {
            return Err(CredentialError::InvalidSpec(format!(
                "{} namespace '{}' is not a valid namespace",
                self.kind(),
                metadata.namespace
            )));
        }
        match self {
            SpecObject::Project(p) => p.spec.validate(),
            SpecObject::Resource(r) => r.spec.validate(),
        }
    }

    /// Human readable spec summary for log lines
    pub fn summary(&self) -> String {
        match self {
            SpecObject::Project(p) => p.spec.to_string(),
            SpecObject::Resource(r) => r.spec.to_string(),
        }
    }
}

impl From<Project> for SpecObject {
    fn from(project: Project) -> Self {
        SpecObject::Project(project)
    }
}

impl From<Resource> for SpecObject {
    fn from(resource: Resource) -> Self {
        SpecObject::Resource(resource)
    }
}
