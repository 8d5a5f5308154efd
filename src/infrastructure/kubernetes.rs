//! Kubernetes access for finalizer removal
//!
//! Finalizers on the service deployment keep Argo's delete hanging, so they
//! are cleared with a merge patch before the application is removed.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    api::{Api, Patch, PatchParams},
    config::KubeConfigOptions,
    Client, Config,
};
use std::time::Duration;
use tracing::debug;

use crate::error::KubernetesError;

/// Cluster operations used by the finalizer step
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Replace the deployment's finalizer list with an empty one
    async fn clear_finalizers(&self, namespace: &str, name: &str)
        -> Result<(), KubernetesError>;
}

/// Body of the finalizer merge patch
pub fn finalizer_patch() -> serde_json::Value {
    serde_json::json!({ "metadata": { "finalizers": [] } })
}

/// Cluster access through kubeconfig, optionally pinned to a context
pub struct KubeCluster {
    context: Option<String>,
    timeout: Duration,
}

impl KubeCluster {
    pub fn new(context: Option<String>, timeout: Duration) -> Self {
        Self { context, timeout }
    }

    fn context_label(&self) -> String {
        self.context
            .clone()
            .unwrap_or_else(|| "current".to_string())
    }

    /// Create Kubernetes client for the configured context
    async fn create_client(&self) -> Result<Client, KubernetesError> {
        let config = match &self.context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.clone()),
                    ..Default::default()
                };
                Config::from_kubeconfig(&options).await.map_err(|e| {
                    KubernetesError::Config {
                        context: self.context_label(),
                        message: e.to_string(),
                    }
                })?
            }
            None => Config::infer().await.map_err(|e| KubernetesError::Config {
                context: self.context_label(),
                message: e.to_string(),
            })?,
        };

        Client::try_from(config).map_err(|e| KubernetesError::Config {
            context: self.context_label(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn clear_finalizers(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), KubernetesError> {
        let client = self.create_client().await?;
        let deployments: Api<Deployment> = Api::namespaced(client, namespace);
        let patch = finalizer_patch();

        debug!("Patching deployment {}/{}: {}", namespace, name, patch);

        let result = tokio::time::timeout(
            self.timeout,
            deployments.patch(name, &PatchParams::default(), &Patch::Merge(&patch)),
        )
        .await
        .map_err(|_| KubernetesError::Timeout {
            name: name.to_string(),
            timeout_secs: self.timeout.as_secs(),
        })?;

        match result {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                Err(KubernetesError::DeploymentNotFound {
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                })
            }
            Err(e) => Err(KubernetesError::Api(e.to_string())),
        }
    }
}
