//! Vault HTTP client
//!
//! Thin wrapper over the Vault HTTP API for the secret-store cleanup:
//! token lookup, KV v2 read/destroy, database secrets engine connections and
//! roles, ACL policies and auth-mount roles.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::config::Token;
use crate::error::VaultError;

/// Key-value payload of a secret, sorted by key
pub type SecretData = BTreeMap<String, Value>;

/// Secret-store operations used by the backend cleanup steps
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Whether the token is accepted
    async fn is_authenticated(&self) -> Result<bool, VaultError>;

    /// Latest version of a KV v2 secret; `InvalidPath` when absent
    async fn read_kv(&self, mount: &str, path: &str) -> Result<SecretData, VaultError>;

    /// Delete metadata and every version of a KV v2 secret
    async fn delete_kv_all_versions(&self, mount: &str, path: &str) -> Result<(), VaultError>;

    async fn delete_db_connection(&self, mount: &str, name: &str) -> Result<(), VaultError>;

    async fn list_db_roles(&self, mount: &str) -> Result<Vec<String>, VaultError>;

    async fn delete_db_role(&self, mount: &str, name: &str) -> Result<(), VaultError>;

    async fn list_policies(&self) -> Result<Vec<String>, VaultError>;

    async fn delete_policy(&self, name: &str) -> Result<(), VaultError>;

    async fn list_auth_roles(&self, mount: &str) -> Result<Vec<String>, VaultError>;

    async fn delete_auth_role(&self, mount: &str, name: &str) -> Result<(), VaultError>;
}

#[derive(Debug, Deserialize)]
struct KvResponse {
    data: KvVersion,
}

#[derive(Debug, Deserialize)]
struct KvVersion {
    #[serde(default)]
    data: Option<SecretData>,
}

#[derive(Debug, Default, Deserialize)]
struct Keys {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Keys,
}

/// `sys/policy` answers with the names at the top level and under `data`
#[derive(Debug, Deserialize)]
struct PolicyListResponse {
    #[serde(default)]
    data: Option<Keys>,
    #[serde(default)]
    policies: Vec<String>,
}

/// Vault API client
pub struct VaultClient {
    client: Client,
    base_url: String,
    token: Token,
}

impl VaultClient {
    pub fn new(base_url: &str, token: Token, timeout: Duration) -> Result<Self, VaultError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| VaultError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn request(&self, method: Method, api_path: &str) -> Result<Response, VaultError> {
        let url = format!("{}/v1/{}", self.base_url, api_path);
        debug!("Vault {} {}", method, url);

        self.client
            .request(method, &url)
            .header("X-Vault-Token", self.token.expose())
            .send()
            .await
            .map_err(|e| VaultError::Network(e.to_string()))
    }

    async fn delete(&self, api_path: &str) -> Result<(), VaultError> {
        let response = self.request(Method::DELETE, api_path).await?;
        check(response, api_path).await?;
        Ok(())
    }

    /// Raw `LIST`; a 404 means there is nothing under the path
    async fn list(&self, api_path: &str) -> Result<Vec<String>, VaultError> {
        let list = Method::from_bytes(b"LIST").map_err(|e| VaultError::Network(e.to_string()))?;
        let response = self.request(list, api_path).await?;

        match check(response, api_path).await {
            Ok(response) => {
                let body: ListResponse = response
                    .json()
                    .await
                    .map_err(|e| VaultError::Decode(e.to_string()))?;
                Ok(body.data.keys)
            }
            Err(VaultError::InvalidPath { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

async fn check(response: Response, api_path: &str) -> Result<Response, VaultError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => VaultError::InvalidPath {
            path: api_path.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VaultError::Forbidden {
            status: status.as_u16(),
        },
        _ => VaultError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn is_authenticated(&self) -> Result<bool, VaultError> {
        let response = self
            .request(Method::GET, "auth/token/lookup-self")
            .await?;

        match check(response, "auth/token/lookup-self").await {
            Ok(_) => Ok(true),
            Err(VaultError::Forbidden { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read_kv(&self, mount: &str, path: &str) -> Result<SecretData, VaultError> {
        let api_path = format!("{}/data/{}", mount, path);
        let response = self.request(Method::GET, &api_path).await?;
        let body: KvResponse = check(response, &api_path)
            .await?
            .json()
            .await
            .map_err(|e| VaultError::Decode(e.to_string()))?;

        Ok(body.data.data.unwrap_or_default())
    }

    async fn delete_kv_all_versions(&self, mount: &str, path: &str) -> Result<(), VaultError> {
        self.delete(&format!("{}/metadata/{}", mount, path)).await
    }

    async fn delete_db_connection(&self, mount: &str, name: &str) -> Result<(), VaultError> {
        self.delete(&format!("{}/config/{}", mount, name)).await
    }

    async fn list_db_roles(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        self.list(&format!("{}/roles", mount)).await
    }

    async fn delete_db_role(&self, mount: &str, name: &str) -> Result<(), VaultError> {
        self.delete(&format!("{}/roles/{}", mount, name)).await
    }

    async fn list_policies(&self) -> Result<Vec<String>, VaultError> {
        let response = self.request(Method::GET, "sys/policy").await?;
        let body: PolicyListResponse = check(response, "sys/policy")
            .await?
            .json()
            .await
            .map_err(|e| VaultError::Decode(e.to_string()))?;

        Ok(match body.data {
            Some(data) if !data.keys.is_empty() => data.keys,
            _ => body.policies,
        })
    }

    async fn delete_policy(&self, name: &str) -> Result<(), VaultError> {
        self.delete(&format!("sys/policy/{}", name)).await
    }

    async fn list_auth_roles(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        self.list(&format!("auth/{}/role", mount)).await
    }

    async fn delete_auth_role(&self, mount: &str, name: &str) -> Result<(), VaultError> {
        self.delete(&format!("auth/{}/role/{}", mount, name)).await
    }
}
