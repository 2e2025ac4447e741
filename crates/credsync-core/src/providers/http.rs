//! REST client for the credential provider API
//!
//! Every list operation is a single bearer-authenticated `GET` returning a
//! JSON array. The request is only sent once the stream is first polled.

use futures::{stream, TryStreamExt};
use serde::de::DeserializeOwned;

use super::error::ProviderError;
use super::traits::{
    CredentialProvider, CredentialRecord, ListStream, ProjectQuery, ProjectRecord, ProviderId,
    ResourceQuery, ResourceRecord, Team,
};
use crate::{debug_log, trace_log, warn_log};

type QueryParams = Vec<(&'static str, String)>;

/// Credential provider reached over HTTP
pub struct HttpProvider {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl HttpProvider {
    /// Create a provider client for `api_url` authenticated with `api_token`
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_token: api_token.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    fn list<T>(&self, path: &str, params: QueryParams) -> ListStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url(path);
        let request = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&params);

        let fetch = async move {
            debug_log!("GET {}", url);
            trace_log!("GET {} query {:?}", url, params);
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                warn_log!("GET {} failed with {}: {}", url, status, message);
                return Err(ProviderError::api(status.as_u16(), message));
            }
            let items: Vec<T> = response.json().await?;
            debug_log!("GET {} returned {} records", url, items.len());
            Ok(stream::iter(items.into_iter().map(Ok)))
        };

        Box::pin(stream::once(fetch).try_flatten())
    }
}

fn project_params(query: &ProjectQuery) -> QueryParams {
    let mut params = Vec::new();
    if let Some(label) = &query.label {
        params.push(("label", label.clone()));
    }
    if let Some(team_id) = &query.team_id {
        params.push(("team_id", team_id.to_string()));
    }
    params
}

fn resource_params(query: &ResourceQuery) -> QueryParams {
    let mut params = Vec::new();
    if let Some(project_id) = &query.project_id {
        params.push(("project_id", project_id.to_string()));
    }
    if let Some(team_id) = &query.team_id {
        params.push(("team_id", team_id.to_string()));
    }
    params
}

fn credential_params(resource_ids: &[ProviderId]) -> QueryParams {
    resource_ids
        .iter()
        .map(|id| ("resource_id", id.to_string()))
        .collect()
}

impl CredentialProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn list_teams(&self) -> ListStream<Team> {
        self.list("teams", Vec::new())
    }

    fn list_projects(&self, query: ProjectQuery) -> ListStream<ProjectRecord> {
        self.list("projects", project_params(&query))
    }

    fn list_resources(&self, query: ResourceQuery) -> ListStream<ResourceRecord> {
        self.list("resources", resource_params(&query))
    }

    fn list_credentials(&self, resource_ids: Vec<ProviderId>) -> ListStream<CredentialRecord> {
        self.list("credentials", credential_params(&resource_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    #[test]
    fn test_url_joining() {
        let provider = HttpProvider::new("https://api.example.com/v1/", "token");
        assert_eq!(provider.url("teams"), "https://api.example.com/v1/teams");
        assert_eq!(provider.api_url(), "https://api.example.com/v1/");
    }

    #[test]
    fn test_project_params() {
        assert!(project_params(&ProjectQuery::default()).is_empty());

        let params = project_params(&ProjectQuery {
            label: Some("production".to_string()),
            team_id: Some("t1".into()),
        });
        assert_eq!(
            params,
            vec![("label", "production".to_string()), ("team_id", "t1".to_string())]
        );
    }

    #[test]
    fn test_resource_params() {
        let params = resource_params(&ResourceQuery {
            project_id: Some("p1".into()),
            team_id: None,
        });
        assert_eq!(params, vec![("project_id", "p1".to_string())]);
    }

    #[test]
    fn test_credential_params_repeat_key() {
        let params = credential_params(&["r1".into(), "r2".into()]);
        assert_eq!(
            params,
            vec![("resource_id", "r1".to_string()), ("resource_id", "r2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_surfaces_error() {
        let provider = HttpProvider::new("http://127.0.0.1:9", "token");
        let result: Result<Vec<Team>, ProviderError> = provider.list_teams().try_collect().await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let (url, server) = serve_once("404 Not Found", "no such team").await;
        let provider = HttpProvider::new(url, "token");

        let result: Result<Vec<Team>, ProviderError> = provider.list_teams().try_collect().await;
        match result {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such team");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_sends_auth_and_query() {
        let (url, server) = serve_once("200 OK", r#"[{"resource_id":"r1","values":{"HOST":"db"}}]"#).await;
        let provider = HttpProvider::new(format!("{}/", url), "s3cret");

        let records: Vec<CredentialRecord> = provider
            .list_credentials(vec!["r1".into(), "r2".into()])
            .try_collect()
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values["HOST"], "db");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /credentials?resource_id=r1&resource_id=r2 "));
        assert!(request.contains("authorization: bearer s3cret"));
    }
}
