//! Resource listing and credential bundle streaming

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::TryStreamExt;

use crate::error::{CredentialError, CredentialResult};
use crate::providers::{
    CredentialProvider, CredentialRecord, ListStream, ProviderId, ResourceQuery, ResourceRecord,
};
use crate::types::ResourceSpec;

/// Lists provider resources and keeps the requested subset
#[derive(Clone)]
pub struct ResourceFetcher {
    provider: Arc<dyn CredentialProvider>,
}

impl ResourceFetcher {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }

    /// Fetch the resources named by `requested` within the given scope
    ///
    /// With no requested specs every resource in scope is returned. A
    /// requested label with no match in scope fails with
    /// `ResourceNotFound`, naming every missing label.
    pub async fn fetch(
        &self,
        project_id: Option<&ProviderId>,
        team_id: Option<&ProviderId>,
        requested: &[ResourceSpec],
    ) -> CredentialResult<Vec<ResourceRecord>> {
        for spec in requested {
            spec.validate()?;
        }

        let wanted: BTreeSet<&str> = requested.iter().map(|r| r.label.as_str()).collect();

        let mut listed = self.provider.list_resources(ResourceQuery {
            project_id: project_id.cloned(),
            team_id: team_id.cloned(),
        });

        let mut resources = Vec::new();
        while let Some(resource) = listed.try_next().await? {
            if wanted.is_empty() || wanted.contains(resource.label.as_str()) {
                resources.push(resource);
            }
        }

        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|label| !resources.iter().any(|r| r.label == *label))
            .collect();
        if !missing.is_empty() {
            return Err(CredentialError::ResourceNotFound(missing.join(", ")));
        }

        Ok(resources)
    }
}

/// Streams credential bundles for resolved resources
#[derive(Clone)]
pub struct CredentialFetcher {
    provider: Arc<dyn CredentialProvider>,
}

impl CredentialFetcher {
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self { provider }
    }

    /// Lazily stream one record per resource; the caller drains it
    pub fn fetch(&self, resource_ids: Vec<ProviderId>) -> ListStream<CredentialRecord> {
        self.provider.list_credentials(resource_ids)
    }
}
