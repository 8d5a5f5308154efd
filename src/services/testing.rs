//! In-memory collaborators for workflow tests
//!
//! Every fake appends a line to a shared `CallLog` per call, so tests can
//! assert exactly which external actions a run issued, and in what order.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{DbType, RunConfig, Token};
use crate::error::{GitLabError, KubernetesError, LaunchError, VaultError};
use crate::infrastructure::gitlab::{MergeRequest, Project, SourceControl};
use crate::infrastructure::kubernetes::Cluster;
use crate::infrastructure::launcher::{AppDeleter, LaunchHandle};
use crate::infrastructure::vault::{SecretData, SecretStore};
use crate::ui::Prompter;

/// Configuration for service `foo` in domain `apps`, ticket `OPS-42`
pub fn test_config(backend: bool) -> RunConfig {
    RunConfig {
        gitlab_url: "https://gitlab.example.com".to_string(),
        gitlab_token: Token::new("glpat-test"),
        project_path: "platform/gitops".to_string(),
        argocd_url: "https://argocd.example.com".to_string(),
        vault_url: "https://vault.example.com".to_string(),
        vault_token: Token::new("s.test"),
        source_branch: "main".to_string(),
        ticket_number: "OPS-42".to_string(),
        argoapp_domain: "apps".to_string(),
        service_name: "foo".to_string(),
        backend_service: backend,
        db_type: DbType::Mongodb,
        k8s_namespace: "default".to_string(),
        k8s_context: None,
        vault_secret_engine_name: "configmaps".to_string(),
        backup_dir: PathBuf::from("deleted_configmaps_backup"),
        vault_mysql_mount: None,
        vault_mongodb_mount: Some("mongodb".to_string()),
        vault_auth_mount: "kubernetes".to_string(),
        delete_script: "./delete_argocd_app.sh".to_string(),
        terminal: "gnome-terminal".to_string(),
        request_timeout: Duration::from_secs(5),
        skipped: Vec::new(),
    }
}

/// Shared, ordered record of collaborator calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Whether any entry starts with `prefix`
    pub fn contains(&self, prefix: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e.starts_with(prefix))
    }

    /// Whether any call went to the `namespace` collaborator (e.g. `vault`)
    pub fn touched(&self, namespace: &str) -> bool {
        self.contains(&format!("{}.", namespace))
    }
}

pub struct FakeGitLab {
    pub log: CallLog,
    pub files: Vec<String>,
    pub authenticated: bool,
    pub project_exists: bool,
    pub branch_exists: bool,
    /// Branch creation is rejected (e.g. read-only token)
    pub branch_forbidden: bool,
    pub merge_closed: bool,
}

impl FakeGitLab {
    pub fn new(log: CallLog, files: &[&str]) -> Self {
        Self {
            log,
            files: files.iter().map(|f| f.to_string()).collect(),
            authenticated: true,
            project_exists: true,
            branch_exists: false,
            branch_forbidden: false,
            merge_closed: false,
        }
    }

    pub fn with_files(files: &[&str]) -> Self {
        Self::new(CallLog::default(), files)
    }
}

#[async_trait]
impl SourceControl for FakeGitLab {
    async fn authenticate(&self) -> Result<(), GitLabError> {
        self.log.push("gitlab.authenticate");
        if self.authenticated {
            Ok(())
        } else {
            Err(GitLabError::Unauthorized)
        }
    }

    async fn resolve_project(&self, path: &str) -> Result<Project, GitLabError> {
        self.log.push(format!("gitlab.resolve_project {}", path));
        if !self.project_exists {
            return Err(GitLabError::NotFound {
                resource: path.to_string(),
            });
        }
        Ok(Project {
            id: 7,
            path_with_namespace: path.to_string(),
        })
    }

    async fn create_branch(
        &self,
        _project: &Project,
        branch: &str,
        from: &str,
    ) -> Result<(), GitLabError> {
        self.log
            .push(format!("gitlab.create_branch {} {}", branch, from));
        if self.branch_exists {
            return Err(GitLabError::BranchExists {
                branch: branch.to_string(),
            });
        }
        if self.branch_forbidden {
            return Err(GitLabError::Http {
                status: 403,
                body: "403 Forbidden".to_string(),
            });
        }
        Ok(())
    }

    async fn file_exists(
        &self,
        _project: &Project,
        path: &str,
        git_ref: &str,
    ) -> Result<bool, GitLabError> {
        self.log
            .push(format!("gitlab.file_exists {} {}", path, git_ref));
        Ok(self.files.iter().any(|f| f == path))
    }

    async fn delete_file(
        &self,
        _project: &Project,
        path: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<(), GitLabError> {
        self.log.push(format!(
            "gitlab.delete_file {} {} {}",
            path, branch, commit_message
        ));
        Ok(())
    }

    async fn create_merge_request(
        &self,
        _project: &Project,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<MergeRequest, GitLabError> {
        self.log.push(format!(
            "gitlab.create_merge_request {} {} {}",
            source_branch, target_branch, title
        ));
        Ok(MergeRequest {
            iid: 1,
            web_url: "https://gitlab.example.com/platform/gitops/-/merge_requests/1".to_string(),
        })
    }

    async fn merge(
        &self,
        _project: &Project,
        merge_request: &MergeRequest,
    ) -> Result<(), GitLabError> {
        self.log.push(format!("gitlab.merge {}", merge_request.iid));
        if self.merge_closed {
            return Err(GitLabError::MergeRequestClosed {
                message: "405 Method Not Allowed".to_string(),
            });
        }
        Ok(())
    }
}

pub struct FakeCluster {
    log: CallLog,
    fail: bool,
}

impl FakeCluster {
    pub fn new(log: CallLog, fail: bool) -> Self {
        Self { log, fail }
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn clear_finalizers(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), KubernetesError> {
        self.log
            .push(format!("cluster.clear_finalizers {}/{}", namespace, name));
        if self.fail {
            return Err(KubernetesError::DeploymentNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }
        Ok(())
    }
}

pub struct FakeLauncher {
    log: CallLog,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(log: CallLog, fail: bool) -> Self {
        Self { log, fail }
    }
}

impl AppDeleter for FakeLauncher {
    fn launch(&self, argocd_url: &str, service_name: &str) -> Result<LaunchHandle, LaunchError> {
        self.log
            .push(format!("launcher.launch {} {}", argocd_url, service_name));
        if self.fail {
            return Err(LaunchError::TerminalNotFound {
                terminal: "gnome-terminal".to_string(),
            });
        }
        Ok(LaunchHandle {
            pid: Some(4242),
            command: format!("gnome-terminal -- bash {}", service_name),
        })
    }
}

pub struct FakeVault {
    pub log: CallLog,
    pub authenticated: bool,
    pub secret: Option<SecretData>,
    pub db_roles: Vec<String>,
    pub policies: Vec<String>,
    pub auth_roles: Vec<String>,
    /// Names whose deletion fails
    pub failing: Vec<String>,
    /// Backup file whose presence is recorded when the secret is deleted
    pub backup_probe: Option<PathBuf>,
}

impl FakeVault {
    pub fn new(log: CallLog) -> Self {
        let mut secret = SecretData::new();
        secret.insert("DB_HOST".to_string(), json!("db.internal"));
        Self {
            log,
            authenticated: true,
            secret: Some(secret),
            db_roles: Vec::new(),
            policies: Vec::new(),
            auth_roles: Vec::new(),
            failing: Vec::new(),
            backup_probe: None,
        }
    }

    fn outcome(&self, name: &str) -> Result<(), VaultError> {
        if self.failing.iter().any(|f| f == name) {
            return Err(VaultError::Http {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SecretStore for FakeVault {
    async fn is_authenticated(&self) -> Result<bool, VaultError> {
        self.log.push("vault.is_authenticated");
        Ok(self.authenticated)
    }

    async fn read_kv(&self, mount: &str, path: &str) -> Result<SecretData, VaultError> {
        self.log.push(format!("vault.read_kv {}/{}", mount, path));
        self.secret.clone().ok_or_else(|| VaultError::InvalidPath {
            path: format!("{}/data/{}", mount, path),
        })
    }

    async fn delete_kv_all_versions(&self, mount: &str, path: &str) -> Result<(), VaultError> {
        let backup = match &self.backup_probe {
            Some(probe) if probe.exists() => " backup=present",
            Some(_) => " backup=missing",
            None => "",
        };
        self.log.push(format!(
            "vault.delete_kv_all_versions {}/{}{}",
            mount, path, backup
        ));
        self.outcome(path)
    }

    async fn delete_db_connection(&self, mount: &str, name: &str) -> Result<(), VaultError> {
        self.log
            .push(format!("vault.delete_db_connection {}/{}", mount, name));
        self.outcome(name)
    }

    async fn list_db_roles(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        self.log.push(format!("vault.list_db_roles {}", mount));
        Ok(self.db_roles.clone())
    }

    async fn delete_db_role(&self, mount: &str, name: &str) -> Result<(), VaultError> {
        self.log
            .push(format!("vault.delete_db_role {}/{}", mount, name));
        self.outcome(name)
    }

    async fn list_policies(&self) -> Result<Vec<String>, VaultError> {
        self.log.push("vault.list_policies");
        Ok(self.policies.clone())
    }

    async fn delete_policy(&self, name: &str) -> Result<(), VaultError> {
        self.log.push(format!("vault.delete_policy {}", name));
        self.outcome(name)
    }

    async fn list_auth_roles(&self, mount: &str) -> Result<Vec<String>, VaultError> {
        self.log.push(format!("vault.list_auth_roles {}", mount));
        Ok(self.auth_roles.clone())
    }

    async fn delete_auth_role(&self, mount: &str, name: &str) -> Result<(), VaultError> {
        self.log
            .push(format!("vault.delete_auth_role {}/{}", mount, name));
        self.outcome(name)
    }
}

/// Answers prompts from a fixed script; an exhausted script answers "n"
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask(&self, message: &str) -> std::io::Result<String> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "n".to_string()))
    }
}
