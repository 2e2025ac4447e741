//! End-to-end credential resolution for project and resource specs

use std::collections::{BTreeMap, HashMap};
use std::slice;
use std::sync::Arc;

use futures::TryStreamExt;

use super::merge::merge_credentials;
use super::project::ProjectResolver;
use super::resources::{CredentialFetcher, ResourceFetcher};
use crate::error::{CredentialError, CredentialResult};
use crate::logging::SharedLogger;
use crate::providers::{CredentialProvider, ResourceRecord};
use crate::types::{CredentialValue, ProjectSpec, ResourceSpec};
use crate::{log_debug, log_warn};

/// Merged credential values keyed by resource label
pub type ResourceCredentials = BTreeMap<String, Vec<CredentialValue>>;

/// Resolves specs into merged credential values
///
/// One resolver is shared by every reconciler so that the project cache
/// is shared too.
pub struct CredentialResolver {
    projects: ProjectResolver,
    resources: ResourceFetcher,
    credentials: CredentialFetcher,
    logger: SharedLogger,
}

impl CredentialResolver {
    pub fn new(projects: ProjectResolver, logger: SharedLogger) -> Self {
        let provider = Arc::clone(projects.provider());
        Self {
            projects,
            resources: ResourceFetcher::new(Arc::clone(&provider)),
            credentials: CredentialFetcher::new(provider),
            logger,
        }
    }

    /// Bind to `provider`, resolving the global team label up front
    pub async fn connect(
        provider: Arc<dyn CredentialProvider>,
        team: Option<&str>,
        logger: SharedLogger,
    ) -> CredentialResult<Self> {
        let projects = ProjectResolver::with_team(provider, team, Arc::clone(&logger)).await?;
        Ok(Self::new(projects, logger))
    }

    /// Credentials for every resource of a project spec
    pub async fn project_credentials(&self, spec: &ProjectSpec) -> CredentialResult<ResourceCredentials> {
        spec.validate()?;
        self.resources_credentials(Some(&spec.label), spec.team(), &spec.resources)
            .await
    }

    /// Credentials for a standalone resource spec, without project scope
    ///
    /// Fails with `MultipleResourcesFound` when the label is ambiguous
    /// across the projects in scope.
    pub async fn resource_credentials(&self, spec: &ResourceSpec) -> CredentialResult<Vec<CredentialValue>> {
        spec.validate()?;
        let requested = slice::from_ref(spec);

        let team_id = self.projects.resolve_team(spec.team()).await?;
        let resources = self.resources.fetch(None, team_id.as_ref(), requested).await?;
        if resources.len() > 1 {
            return Err(CredentialError::MultipleResourcesFound(spec.label.clone()));
        }

        let mut merged = self.merge_resources(resources, requested).await?;
        merged
            .remove(&spec.label)
            .ok_or_else(|| CredentialError::ResourceNotFound(spec.label.clone()))
    }

    /// Credentials for `requested` within an optional project and team scope
    ///
    /// With no requested resources every resource in scope is included
    /// with all of its keys.
    pub async fn resources_credentials(
        &self,
        project: Option<&str>,
        team: Option<&str>,
        requested: &[ResourceSpec],
    ) -> CredentialResult<ResourceCredentials> {
        for spec in requested {
            spec.validate()?;
        }

        let team_id = self.projects.resolve_team(team).await?;
        let project_id = self.projects.resolve(project, team_id.as_ref()).await?;
        let resources = self
            .resources
            .fetch(project_id.as_ref(), team_id.as_ref(), requested)
            .await?;

        self.merge_resources(resources, requested).await
    }

    async fn merge_resources(
        &self,
        resources: Vec<ResourceRecord>,
        requested: &[ResourceSpec],
    ) -> CredentialResult<ResourceCredentials> {
        if resources.is_empty() {
            return Ok(ResourceCredentials::new());
        }

        let labels: HashMap<_, _> = resources
            .iter()
            .map(|r| (r.id.clone(), r.label.clone()))
            .collect();
        let ids = resources.into_iter().map(|r| r.id).collect();

        let mut values: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut records = self.credentials.fetch(ids);
        while let Some(record) = records.try_next().await? {
            match labels.get(&record.resource_id) {
                Some(label) => values.entry(label.clone()).or_default().extend(record.values),
                None => log_warn!(
                    self.logger,
                    "ignoring credentials for unrequested resource {}",
                    record.resource_id
                ),
            }
        }
        drop(records);

        let mut merged = ResourceCredentials::new();
        if requested.is_empty() {
            for (label, provided) in &values {
                merged.insert(label.clone(), merge_credentials(label, provided, &[])?);
            }
        } else {
            let none = BTreeMap::new();
            for spec in requested {
                let provided = values.get(&spec.label).unwrap_or(&none);
                let creds = merge_credentials(&spec.label, provided, &spec.credentials)?;
                merged.insert(spec.label.clone(), creds);
            }
        }

        log_debug!(
            self.logger,
            "merged {} credentials across {} resources",
            merged.values().map(Vec::len).sum::<usize>(),
            merged.len()
        );
        Ok(merged)
    }
}
