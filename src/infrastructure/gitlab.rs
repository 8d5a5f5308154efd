//! GitLab REST client
//!
//! Covers the handful of v4 endpoints the manifest removal needs: token
//! check, project lookup, branch creation, file lookup/delete and merge
//! requests. Authenticates with the `PRIVATE-TOKEN` header.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Token;
use crate::error::GitLabError;

/// Source-control operations used by the manifest removal step
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Validate the token
    async fn authenticate(&self) -> Result<(), GitLabError>;

    async fn resolve_project(&self, path: &str) -> Result<Project, GitLabError>;

    /// Create `branch` from `from`; `BranchExists` if it is already there
    async fn create_branch(
        &self,
        project: &Project,
        branch: &str,
        from: &str,
    ) -> Result<(), GitLabError>;

    /// Whether `path` resolves on `git_ref`
    async fn file_exists(
        &self,
        project: &Project,
        path: &str,
        git_ref: &str,
    ) -> Result<bool, GitLabError>;

    async fn delete_file(
        &self,
        project: &Project,
        path: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<(), GitLabError>;

    async fn create_merge_request(
        &self,
        project: &Project,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest, GitLabError>;

    async fn merge(&self, project: &Project, merge_request: &MergeRequest)
        -> Result<(), GitLabError>;
}

/// A resolved GitLab project
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: String,
}

/// An opened merge request
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MergeRequest {
    pub iid: u64,
    pub web_url: String,
}

#[derive(Debug, Serialize)]
struct DeleteFileRequest<'a> {
    branch: &'a str,
    commit_message: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateMergeRequest<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
}

/// GitLab API client
pub struct GitLabClient {
    client: Client,
    api_url: String,
    token: Token,
}

impl GitLabClient {
    /// Create a client for `base_url` (e.g. `https://gitlab.example.com`)
    pub fn new(base_url: &str, token: Token, timeout: Duration) -> Result<Self, GitLabError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("decom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GitLabError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: format!("{}/api/v4", base_url.trim_end_matches('/')),
            token,
        })
    }

    fn project_url(&self, project: &Project) -> String {
        format!("{}/projects/{}", self.api_url, project.id)
    }

    fn file_url(&self, project: &Project, path: &str) -> String {
        format!(
            "{}/repository/files/{}",
            self.project_url(project),
            urlencoding::encode(path)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, GitLabError> {
        request
            .header("PRIVATE-TOKEN", self.token.expose())
            .send()
            .await
            .map_err(|e| GitLabError::Network(e.to_string()))
    }
}

/// Map non-success statuses to typed errors
async fn check(response: Response, resource: &str) -> Result<Response, GitLabError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("GitLab {} for {}: {}", status, resource, body);

    Err(match status {
        StatusCode::UNAUTHORIZED => GitLabError::Unauthorized,
        StatusCode::NOT_FOUND => GitLabError::NotFound {
            resource: resource.to_string(),
        },
        _ => GitLabError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl SourceControl for GitLabClient {
    async fn authenticate(&self) -> Result<(), GitLabError> {
        let url = format!("{}/user", self.api_url);
        check(self.send(self.client.get(&url)).await?, "current user").await?;
        Ok(())
    }

    async fn resolve_project(&self, path: &str) -> Result<Project, GitLabError> {
        let url = format!("{}/projects/{}", self.api_url, urlencoding::encode(path));
        let response = check(self.send(self.client.get(&url)).await?, path).await?;

        response
            .json()
            .await
            .map_err(|e| GitLabError::Network(e.to_string()))
    }

    async fn create_branch(
        &self,
        project: &Project,
        branch: &str,
        from: &str,
    ) -> Result<(), GitLabError> {
        let url = format!("{}/repository/branches", self.project_url(project));
        let request = self
            .client
            .post(&url)
            .query(&[("branch", branch), ("ref", from)]);

        match check(self.send(request).await?, branch).await {
            Ok(_) => Ok(()),
            Err(GitLabError::Http { status: 400, body }) if body.contains("already exists") => {
                Err(GitLabError::BranchExists {
                    branch: branch.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn file_exists(
        &self,
        project: &Project,
        path: &str,
        git_ref: &str,
    ) -> Result<bool, GitLabError> {
        let request = self
            .client
            .get(self.file_url(project, path))
            .query(&[("ref", git_ref)]);

        match check(self.send(request).await?, path).await {
            Ok(_) => Ok(true),
            Err(GitLabError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_file(
        &self,
        project: &Project,
        path: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<(), GitLabError> {
        let request = self
            .client
            .delete(self.file_url(project, path))
            .json(&DeleteFileRequest {
                branch,
                commit_message,
            });

        check(self.send(request).await?, path).await?;
        Ok(())
    }

    async fn create_merge_request(
        &self,
        project: &Project,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest, GitLabError> {
        let url = format!("{}/merge_requests", self.project_url(project));
        let request = self.client.post(&url).json(&CreateMergeRequest {
            source_branch,
            target_branch,
            title,
        });

        let response = check(self.send(request).await?, "merge request").await?;
        response
            .json()
            .await
            .map_err(|e| GitLabError::Network(e.to_string()))
    }

    async fn merge(
        &self,
        project: &Project,
        merge_request: &MergeRequest,
    ) -> Result<(), GitLabError> {
        let url = format!(
            "{}/merge_requests/{}/merge",
            self.project_url(project),
            merge_request.iid
        );

        match check(self.send(self.client.put(&url)).await?, &merge_request.web_url).await {
            Ok(_) => Ok(()),
            // 405: closed or not mergeable, 406: branch cannot be merged
            Err(GitLabError::Http {
                status: 405 | 406,
                body,
            }) => Err(GitLabError::MergeRequestClosed { message: body }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitLabClient {
        GitLabClient::new(&server.uri(), Token::new("glpat-test"), Duration::from_secs(5))
            .unwrap()
    }

    fn project() -> Project {
        Project {
            id: 7,
            path_with_namespace: "platform/gitops".to_string(),
        }
    }

    #[tokio::test]
    async fn test_authenticate_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/user"))
            .and(header("PRIVATE-TOKEN", "glpat-test"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).authenticate().await.unwrap_err();
        assert!(matches!(err, GitLabError::Unauthorized));
    }

    #[tokio::test]
    async fn test_resolve_project_encodes_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/platform%2Fgitops"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "path_with_namespace": "platform/gitops",
                "name": "gitops"
            })))
            .mount(&server)
            .await;

        let resolved = client(&server)
            .resolve_project("platform/gitops")
            .await
            .unwrap();
        assert_eq!(resolved, project());
    }

    #[tokio::test]
    async fn test_create_branch_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/7/repository/branches"))
            .and(query_param("branch", "OPS-42"))
            .and(query_param("ref", "main"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"message": "Branch already exists"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .create_branch(&project(), "OPS-42", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, GitLabError::BranchExists { .. }));
    }

    #[tokio::test]
    async fn test_file_exists_maps_404_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/7/repository/files/apps%2Ffoo.yaml"))
            .and(query_param("ref", "OPS-42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/7/repository/files/apps%2Ffoo.yml"))
            .and(query_param("ref", "OPS-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_path": "apps/foo.yml"})))
            .mount(&server)
            .await;

        let gitlab = client(&server);
        assert!(!gitlab
            .file_exists(&project(), "apps/foo.yaml", "OPS-42")
            .await
            .unwrap());
        assert!(gitlab
            .file_exists(&project(), "apps/foo.yml", "OPS-42")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_file_sends_commit_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v4/projects/7/repository/files/apps%2Ffoo.yaml"))
            .and(body_json(json!({
                "branch": "OPS-42",
                "commit_message": "OPS-42-remove foo"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete_file(&project(), "apps/foo.yaml", "OPS-42", "OPS-42-remove foo")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_merge_closed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/7/merge_requests"))
            .and(body_json(json!({
                "source_branch": "OPS-42",
                "target_branch": "main",
                "title": "OPS-42-remove foo"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "iid": 12,
                "web_url": "https://gitlab.example.com/platform/gitops/-/merge_requests/12"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v4/projects/7/merge_requests/12/merge"))
            .respond_with(ResponseTemplate::new(405).set_body_json(json!({"message": "405 Method Not Allowed"})))
            .mount(&server)
            .await;

        let gitlab = client(&server);
        let mr = gitlab
            .create_merge_request(&project(), "OPS-42", "main", "OPS-42-remove foo")
            .await
            .unwrap();
        assert_eq!(mr.iid, 12);

        let err = gitlab.merge(&project(), &mr).await.unwrap_err();
        assert!(matches!(err, GitLabError::MergeRequestClosed { .. }));
    }
}
