//! Provider trait definition

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use super::error::ProviderResult;

/// Provider-assigned identifier of a team, project or resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: ProviderId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProviderId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<ProviderId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ProviderId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<ProviderId>,
}

/// One resource's full credential bundle, unfiltered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub resource_id: ProviderId,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Filter for `list_projects`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectQuery {
    pub label: Option<String>,
    pub team_id: Option<ProviderId>,
}

/// Filter for `list_resources`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    pub project_id: Option<ProviderId>,
    pub team_id: Option<ProviderId>,
}

/// Lazy, forward-only sequence of provider records
///
/// Dropping the stream closes it.
pub type ListStream<T> = Pin<Box<dyn Stream<Item = ProviderResult<T>> + Send>>;

/// Credential provider API
///
/// Every list operation is lazy: nothing is requested until the returned
/// stream is polled.
pub trait CredentialProvider: Send + Sync {
    /// Provider name, for log lines
    fn name(&self) -> &str;

    fn list_teams(&self) -> ListStream<Team>;

    fn list_projects(&self, query: ProjectQuery) -> ListStream<ProjectRecord>;

    fn list_resources(&self, query: ResourceQuery) -> ListStream<ResourceRecord>;

    /// Credential bundles for the given resources
    fn list_credentials(&self, resource_ids: Vec<ProviderId>) -> ListStream<CredentialRecord>;
}
