//! Run configuration
//!
//! Built once from the parsed CLI (flags, environment, `.env`) and passed by
//! reference into every step. Nothing reads the environment after this point.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::domain::naming;
use crate::domain::step::{self, StepKind};
use crate::error::ConfigError;

/// A credential that never shows up in logs or `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Database behind a backend service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbType {
    Mysql,
    Mongodb,
    /// Any other value; the database step skips itself
    Unsupported(String),
}

impl DbType {
    pub fn parse(value: &str) -> Self {
        match value {
            "mysql" => Self::Mysql,
            "mongodb" => Self::Mongodb,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mysql => "mysql",
            Self::Mongodb => "mongodb",
            Self::Unsupported(value) => value,
        }
    }

    /// Key naming the secrets engine mount for this type
    pub fn mount_key(&self) -> Option<&'static str> {
        match self {
            Self::Mysql => Some("VAULT_MYSQL_MOUNT"),
            Self::Mongodb => Some("VAULT_MONGODB_MOUNT"),
            Self::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable settings for one decommission run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub gitlab_url: String,
    pub gitlab_token: Token,
    pub project_path: String,
    pub argocd_url: String,
    pub vault_url: String,
    pub vault_token: Token,

    pub source_branch: String,
    pub ticket_number: String,

    pub argoapp_domain: String,
    pub service_name: String,
    pub backend_service: bool,
    pub db_type: DbType,
    pub k8s_namespace: String,
    pub k8s_context: Option<String>,

    pub vault_secret_engine_name: String,
    pub backup_dir: PathBuf,
    pub vault_mysql_mount: Option<String>,
    pub vault_mongodb_mount: Option<String>,
    pub vault_auth_mount: String,

    pub delete_script: String,
    pub terminal: String,
    pub request_timeout: Duration,

    pub skipped: Vec<StepKind>,
}

/// Collects missing keys so they can be reported together
struct Requirements {
    missing: Vec<String>,
}

impl Requirements {
    fn take(&mut self, key: &str, value: Option<String>, needed: bool) -> String {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => {
                if needed && !self.missing.iter().any(|m| m == key) {
                    self.missing.push(key.to_string());
                }
                String::new()
            }
        }
    }
}

impl RunConfig {
    /// Validate the CLI and build the run configuration
    ///
    /// A key is required only when a step that uses it is going to run.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let backend_service = parse_backend_flag(&cli.backend_service);
        let request_timeout = humantime::parse_duration(&cli.request_timeout).map_err(|_| {
            ConfigError::InvalidValue {
                field: "DECOM_REQUEST_TIMEOUT".to_string(),
                value: cli.request_timeout.clone(),
            }
        })?;

        let runs: Vec<StepKind> = step::plan(backend_service, &cli.skip)
            .into_iter()
            .filter(|s| !s.skip)
            .map(|s| s.kind)
            .collect();
        let runs_step = |kind: StepKind| runs.contains(&kind);
        let needs_manifest = runs_step(StepKind::RemoveManifest);
        let needs_vault = runs.iter().any(StepKind::uses_secret_store);
        let needs_db = runs_step(StepKind::DeleteDbConnection);

        let mut req = Requirements {
            missing: Vec::new(),
        };

        let service_name = req.take("SERVICE_NAME", cli.service_name, true);
        let ticket_number = req.take("TICKET_NUMBER", cli.ticket_number, true);

        let gitlab_url = req.take("GITLAB_URL", cli.gitlab_url, needs_manifest);
        let gitlab_token = req.take("GITLAB_TOKEN", cli.gitlab_token, needs_manifest);
        let project_path = req.take("PROJECT_PATH", cli.project_path, needs_manifest);
        let source_branch = req.take("SOURCE_BRANCH", cli.source_branch, needs_manifest);
        let argoapp_domain = req.take("ARGOAPP_DOMAIN", cli.argoapp_domain, needs_manifest);

        let argocd_url = req.take("ARGOCD_URL", cli.argocd_url, runs_step(StepKind::DeleteApp));

        let vault_url = req.take("VAULT_URL", cli.vault_url, needs_vault);
        let vault_token = req.take("VAULT_TOKEN", cli.vault_token, needs_vault);
        let db_type = DbType::parse(&req.take("DB_TYPE", cli.db_type, needs_db));

        let vault_mysql_mount = cli.vault_mysql_mount.filter(|v| !v.trim().is_empty());
        let vault_mongodb_mount = cli.vault_mongodb_mount.filter(|v| !v.trim().is_empty());
        if needs_db {
            let mount = match db_type {
                DbType::Mysql => Some(&vault_mysql_mount),
                DbType::Mongodb => Some(&vault_mongodb_mount),
                DbType::Unsupported(_) => None,
            };
            if let (Some(None), Some(key)) = (mount, db_type.mount_key()) {
                req.missing.push(key.to_string());
            }
        }

        let vault_auth_mount = req.take(
            "VAULT_AUTH_MOUNT",
            cli.vault_auth_mount,
            runs_step(StepKind::DeleteAccessRoles),
        );

        if !req.missing.is_empty() {
            return Err(ConfigError::Missing { keys: req.missing });
        }

        Ok(Self {
            gitlab_url: gitlab_url.trim_end_matches('/').to_string(),
            gitlab_token: Token::new(gitlab_token),
            project_path,
            argocd_url,
            vault_url: vault_url.trim_end_matches('/').to_string(),
            vault_token: Token::new(vault_token),
            source_branch,
            ticket_number,
            argoapp_domain,
            service_name,
            backend_service,
            db_type,
            k8s_namespace: cli.k8s_namespace,
            k8s_context: cli.k8s_context.filter(|c| !c.trim().is_empty()),
            vault_secret_engine_name: cli.vault_secret_engine_name,
            backup_dir: PathBuf::from(cli.vault_configmap_backup_dir),
            vault_mysql_mount,
            vault_mongodb_mount,
            vault_auth_mount,
            delete_script: cli.argocd_delete_script,
            terminal: cli.terminal,
            request_timeout,
            skipped: cli.skip,
        })
    }

    /// Commit message for the manifest removal
    pub fn commit_message(&self) -> String {
        format!("{}-remove {}", self.ticket_number, self.service_name)
    }

    /// The removal branch is named after the ticket
    pub fn new_branch_name(&self) -> &str {
        &self.ticket_number
    }

    pub fn merge_request_title(&self) -> String {
        self.commit_message()
    }

    /// Primary manifest path (the `.yaml` candidate)
    pub fn manifest_file_path(&self) -> String {
        format!("{}/{}.yaml", self.argoapp_domain, self.service_name)
    }

    pub fn manifest_candidates(&self) -> Vec<String> {
        naming::manifest_candidates(&self.argoapp_domain, &self.service_name)
    }

    pub fn backup_file_path(&self) -> PathBuf {
        self.backup_dir.join(format!("{}.yaml", self.service_name))
    }

    /// `{service}-{db_type}`: connection name and role suffix
    pub fn db_object_name(&self) -> String {
        naming::db_object_name(&self.service_name, self.db_type.as_str())
    }

    /// Database secrets engine mount for the configured type
    pub fn db_mount(&self) -> Option<&str> {
        match self.db_type {
            DbType::Mysql => self.vault_mysql_mount.as_deref(),
            DbType::Mongodb => self.vault_mongodb_mount.as_deref(),
            DbType::Unsupported(_) => None,
        }
    }

    /// Ordered step list for this run
    pub fn plan(&self) -> Vec<step::Step> {
        step::plan(self.backend_service, &self.skipped)
    }
}

fn parse_backend_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}
