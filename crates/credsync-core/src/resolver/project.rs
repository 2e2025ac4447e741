//! Team and project label resolution with process-lifetime caches

use std::collections::HashMap;
use std::sync::Arc;

use futures::TryStreamExt;
use parking_lot::RwLock;

use crate::error::{CredentialError, CredentialResult};
use crate::logging::SharedLogger;
use crate::providers::{CredentialProvider, ProjectQuery, ProviderId};
use crate::{log_debug, log_info};

type ProjectKey = (Option<ProviderId>, String);

/// Maps team and project labels to provider identifiers
///
/// Both caches are append-only: once a label is resolved its identifier
/// is reused until the process exits, even if the provider later renames
/// or reassigns it.
///
/// Lookups take the read lock; a miss releases it, queries the provider
/// without holding any lock and then stores the result under the write
/// lock. Two concurrent misses for the same label may both query the
/// provider; the second insert overwrites the first with the same value.
pub struct ProjectResolver {
    provider: Arc<dyn CredentialProvider>,
    team_id: Option<ProviderId>,
    teams: RwLock<HashMap<String, ProviderId>>,
    projects: RwLock<HashMap<ProjectKey, ProviderId>>,
    logger: SharedLogger,
}

impl ProjectResolver {
    /// Create a resolver without a global team scope
    pub fn new(provider: Arc<dyn CredentialProvider>, logger: SharedLogger) -> Self {
        Self {
            provider,
            team_id: None,
            teams: RwLock::new(HashMap::new()),
            projects: RwLock::new(HashMap::new()),
            logger,
        }
    }

    /// Create a resolver bound to the team labelled `team`
    ///
    /// Fails with `TeamNotFound` if the provider has no such team. An
    /// absent or empty label means no team scope.
    pub async fn with_team(
        provider: Arc<dyn CredentialProvider>,
        team: Option<&str>,
        logger: SharedLogger,
    ) -> CredentialResult<Self> {
        let mut resolver = Self::new(provider, logger);
        if let Some(label) = team.filter(|t| !t.is_empty()) {
            let id = resolver.lookup_team(label).await?;
            log_info!(resolver.logger, "bound to team '{}' ({})", label, id);
            resolver.team_id = Some(id);
        }
        Ok(resolver)
    }

    pub fn provider(&self) -> &Arc<dyn CredentialProvider> {
        &self.provider
    }

    /// Team identifier the resolver was bound to at startup
    pub fn team_id(&self) -> Option<&ProviderId> {
        self.team_id.as_ref()
    }

    /// Resolve a team label, falling back to the global team when absent
    pub async fn resolve_team(&self, label: Option<&str>) -> CredentialResult<Option<ProviderId>> {
        let label = match label.filter(|l| !l.is_empty()) {
            Some(label) => label,
            None => return Ok(self.team_id.clone()),
        };

        if let Some(id) = self.teams.read().get(label) {
            return Ok(Some(id.clone()));
        }

        let id = self.lookup_team(label).await?;
        Ok(Some(id))
    }

    /// Resolve a project label to its identifier
    ///
    /// `None` means no project scope and resolves to `None`.
    pub async fn resolve(
        &self,
        label: Option<&str>,
        team_id: Option<&ProviderId>,
    ) -> CredentialResult<Option<ProviderId>> {
        let label = match label {
            Some(label) => label,
            None => return Ok(None),
        };

        let key: ProjectKey = (team_id.cloned(), label.to_string());
        if let Some(id) = self.projects.read().get(&key) {
            return Ok(Some(id.clone()));
        }

        log_debug!(self.logger, "project '{}' not cached, querying {}", label, self.provider.name());
        let mut projects = self.provider.list_projects(ProjectQuery {
            label: Some(label.to_string()),
            team_id: team_id.cloned(),
        });

        while let Some(project) = projects.try_next().await? {
            if project.label == label {
                self.projects.write().insert(key, project.id.clone());
                return Ok(Some(project.id));
            }
        }

        Err(CredentialError::ProjectNotFound(label.to_string()))
    }

    /// Number of cached project identifiers
    pub fn cached_projects(&self) -> usize {
        self.projects.read().len()
    }

    async fn lookup_team(&self, label: &str) -> CredentialResult<ProviderId> {
        let mut teams = self.provider.list_teams();
        while let Some(team) = teams.try_next().await? {
            if team.label == label {
                self.teams.write().insert(label.to_string(), team.id.clone());
                return Ok(team.id);
            }
        }
        Err(CredentialError::TeamNotFound(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::providers::MemoryProvider;

    fn resolver(provider: Arc<MemoryProvider>) -> ProjectResolver {
        ProjectResolver::new(provider, NoOpLogger::shared())
    }

    #[tokio::test]
    async fn test_no_label_means_no_scope() {
        let provider = Arc::new(MemoryProvider::new());
        let resolver = resolver(provider.clone());

        assert_eq!(resolver.resolve(None, None).await.unwrap(), None);
        assert_eq!(provider.project_queries(), 0);
    }

    #[tokio::test]
    async fn test_resolve_caches_result() {
        let provider = Arc::new(MemoryProvider::new().with_project("p1", "production"));
        let resolver = resolver(provider.clone());

        let first = resolver.resolve(Some("production"), None).await.unwrap();
        let second = resolver.resolve(Some("production"), None).await.unwrap();

        assert_eq!(first, Some(ProviderId::from("p1")));
        assert_eq!(first, second);
        assert_eq!(provider.project_queries(), 1);
        assert_eq!(resolver.cached_projects(), 1);
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let provider = Arc::new(MemoryProvider::new().with_project("p1", "production"));
        let resolver = resolver(provider);

        let err = resolver.resolve(Some("non-existing"), None).await.unwrap_err();
        assert!(matches!(err, CredentialError::ProjectNotFound(l) if l == "non-existing"));
        assert_eq!(resolver.cached_projects(), 0);
    }

    #[tokio::test]
    async fn test_projects_scoped_by_team() {
        let provider = Arc::new(
            MemoryProvider::new()
                .with_team("t1", "acme")
                .with_team("t2", "globex")
                .with_team_project("p1", "production", "t1")
                .with_team_project("p2", "production", "t2"),
        );
        let resolver = ProjectResolver::with_team(provider, Some("acme"), NoOpLogger::shared())
            .await
            .unwrap();

        let acme = resolver.team_id().cloned();
        assert_eq!(acme, Some(ProviderId::from("t1")));
        let id = resolver.resolve(Some("production"), acme.as_ref()).await.unwrap();
        assert_eq!(id, Some(ProviderId::from("p1")));

        let globex = resolver.resolve_team(Some("globex")).await.unwrap();
        let id = resolver.resolve(Some("production"), globex.as_ref()).await.unwrap();
        assert_eq!(id, Some(ProviderId::from("p2")));
    }

    #[tokio::test]
    async fn test_unknown_team_is_an_error() {
        let provider = Arc::new(MemoryProvider::new().with_team("t1", "acme"));
        let result =
            ProjectResolver::with_team(provider, Some("initech"), NoOpLogger::shared()).await;
        assert!(matches!(result, Err(CredentialError::TeamNotFound(t)) if t == "initech"));
    }

    #[tokio::test]
    async fn test_empty_team_means_no_scope() {
        let provider = Arc::new(MemoryProvider::new());
        let resolver = ProjectResolver::with_team(provider, Some(""), NoOpLogger::shared())
            .await
            .unwrap();
        assert!(resolver.team_id().is_none());
        assert_eq!(resolver.resolve_team(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_is_consistent() {
        let provider = Arc::new(MemoryProvider::new().with_project("p1", "production"));
        let resolver = Arc::new(resolver(provider.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = Arc::clone(&resolver);
            handles.push(tokio::spawn(async move {
                resolver.resolve(Some("production"), None).await.unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(ProviderId::from("p1")));
        }
        assert_eq!(resolver.cached_projects(), 1);
        assert!(provider.project_queries() >= 1);
    }
}
