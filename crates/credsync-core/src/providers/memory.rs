//! In-memory credential provider
//!
//! Serves a fixed data set without network access. Used by the CLI's
//! `--fixture` flag and throughout the tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};
use super::traits::{
    CredentialProvider, CredentialRecord, ListStream, ProjectQuery, ProjectRecord, ProviderId,
    ResourceQuery, ResourceRecord, Team,
};

/// Data set served by a `MemoryProvider`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderFixture {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub credentials: Vec<CredentialRecord>,
}

/// In-memory provider backed by a `ProviderFixture`
///
/// # Example
///
/// ```
/// use credsync_core::providers::MemoryProvider;
///
/// let provider = MemoryProvider::new()
///     .with_project("p1", "production")
///     .with_resource("r1", "db", Some("p1"))
///     .with_credentials("r1", [("HOST", "db.internal")]);
/// assert_eq!(provider.project_queries(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryProvider {
    data: RwLock<ProviderFixture>,
    failure: Option<String>,
    project_queries: AtomicUsize,
    credential_queries: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: ProviderFixture) -> Self {
        Self {
            data: RwLock::new(fixture),
            ..Default::default()
        }
    }

    /// Parse a YAML fixture
    pub fn from_yaml(content: &str) -> ProviderResult<Self> {
        let fixture: ProviderFixture = serde_yaml::from_str(content)
            .map_err(|e| ProviderError::Fixture(format!("failed to parse YAML: {}", e)))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Load a YAML fixture from disk
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Make every list operation fail with `message`
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn with_team(self, id: &str, label: &str) -> Self {
        self.data.write().teams.push(Team {
            id: id.into(),
            label: label.to_string(),
        });
        self
    }

    pub fn with_project(self, id: &str, label: &str) -> Self {
        self.data.write().projects.push(ProjectRecord {
            id: id.into(),
            label: label.to_string(),
            team_id: None,
        });
        self
    }

    pub fn with_team_project(self, id: &str, label: &str, team_id: &str) -> Self {
        self.data.write().projects.push(ProjectRecord {
            id: id.into(),
            label: label.to_string(),
            team_id: Some(team_id.into()),
        });
        self
    }

    pub fn with_resource(self, id: &str, label: &str, project_id: Option<&str>) -> Self {
        self.data.write().resources.push(ResourceRecord {
            id: id.into(),
            label: label.to_string(),
            project_id: project_id.map(ProviderId::from),
            team_id: None,
        });
        self
    }

    pub fn with_credentials<'a>(
        self,
        resource_id: &str,
        values: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let values: BTreeMap<String, String> = values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.data.write().credentials.push(CredentialRecord {
            resource_id: resource_id.into(),
            values,
        });
        self
    }

    /// Replace the credential values of a resource
    pub fn set_credential(&self, resource_id: &str, key: &str, value: &str) {
        let mut data = self.data.write();
        let id = ProviderId::from(resource_id);
        match data.credentials.iter_mut().find(|c| c.resource_id == id) {
            Some(record) => {
                record.values.insert(key.to_string(), value.to_string());
            }
            None => data.credentials.push(CredentialRecord {
                resource_id: id,
                values: BTreeMap::from([(key.to_string(), value.to_string())]),
            }),
        }
    }

    /// Number of `list_projects` calls served so far
    pub fn project_queries(&self) -> usize {
        self.project_queries.load(Ordering::SeqCst)
    }

    /// Number of `list_credentials` calls served so far
    pub fn credential_queries(&self) -> usize {
        self.credential_queries.load(Ordering::SeqCst)
    }

    fn serve<T: Send + 'static>(&self, items: Vec<T>) -> ListStream<T> {
        if let Some(message) = &self.failure {
            let err = ProviderError::Other(message.clone());
            return Box::pin(stream::once(async move { Err::<T, ProviderError>(err) }));
        }
        Box::pin(stream::iter(items.into_iter().map(Ok)))
    }
}

impl CredentialProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_teams(&self) -> ListStream<Team> {
        let teams = self.data.read().teams.clone();
        self.serve(teams)
    }

    fn list_projects(&self, query: ProjectQuery) -> ListStream<ProjectRecord> {
        self.project_queries.fetch_add(1, Ordering::SeqCst);
        let projects: Vec<ProjectRecord> = self
            .data
            .read()
            .projects
            .iter()
            .filter(|p| query.label.as_ref().map_or(true, |l| &p.label == l))
            .filter(|p| query.team_id.is_none() || p.team_id == query.team_id)
            .cloned()
            .collect();
        self.serve(projects)
    }

    fn list_resources(&self, query: ResourceQuery) -> ListStream<ResourceRecord> {
        let resources: Vec<ResourceRecord> = self
            .data
            .read()
            .resources
            .iter()
            .filter(|r| query.project_id.is_none() || r.project_id == query.project_id)
            .filter(|r| query.team_id.is_none() || r.team_id.is_none() || r.team_id == query.team_id)
            .cloned()
            .collect();
        self.serve(resources)
    }

    fn list_credentials(&self, resource_ids: Vec<ProviderId>) -> ListStream<CredentialRecord> {
        self.credential_queries.fetch_add(1, Ordering::SeqCst);
        let records: Vec<CredentialRecord> = self
            .data
            .read()
            .credentials
            .iter()
            .filter(|c| resource_ids.contains(&c.resource_id))
            .cloned()
            .collect();
        self.serve(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_list_projects_filters_by_label() {
        let provider = MemoryProvider::new()
            .with_project("p1", "production")
            .with_project("p2", "staging");

        let found: Vec<ProjectRecord> = provider
            .list_projects(ProjectQuery {
                label: Some("staging".to_string()),
                team_id: None,
            })
            .try_collect()
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "p2");
        assert_eq!(provider.project_queries(), 1);
    }

    #[tokio::test]
    async fn test_list_resources_scoped_to_project() {
        let provider = MemoryProvider::new()
            .with_resource("r1", "db", Some("p1"))
            .with_resource("r2", "db", Some("p2"))
            .with_resource("r3", "cache", None);

        let scoped: Vec<ResourceRecord> = provider
            .list_resources(ResourceQuery {
                project_id: Some("p1".into()),
                team_id: None,
            })
            .try_collect()
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);

        let all: Vec<ResourceRecord> = provider
            .list_resources(ResourceQuery::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let provider = MemoryProvider::new()
            .with_team("t1", "acme")
            .with_failure("provider unavailable");
        let result: ProviderResult<Vec<Team>> = provider.list_teams().try_collect().await;
        assert!(matches!(result, Err(ProviderError::Other(m)) if m == "provider unavailable"));
    }

    #[test]
    fn test_fixture_from_yaml() {
        let yaml = r#"
teams:
  - id: t1
    label: acme
projects:
  - id: p1
    label: production
    team_id: t1
resources:
  - id: r1
    label: db
    project_id: p1
credentials:
  - resource_id: r1
    values:
      HOST: db.internal
"#;
        let provider = MemoryProvider::from_yaml(yaml).unwrap();
        let data = provider.data.read();
        assert_eq!(data.teams.len(), 1);
        assert_eq!(data.projects[0].team_id, Some(ProviderId::from("t1")));
        assert_eq!(data.credentials[0].values["HOST"], "db.internal");
    }

    #[test]
    fn test_set_credential() {
        let provider = MemoryProvider::new().with_credentials("r1", [("HOST", "a")]);
        provider.set_credential("r1", "HOST", "b");
        provider.set_credential("r2", "PORT", "1");

        let data = provider.data.read();
        assert_eq!(data.credentials[0].values["HOST"], "b");
        assert_eq!(data.credentials[1].values["PORT"], "1");
    }
}
