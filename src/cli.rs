//! CLI definitions for decom
//!
//! Every setting is a flag with an environment fallback, so the usual
//! invocation is a bare `decom` next to a `.env` file.

use clap::Parser;

use crate::domain::step::StepKind;

#[derive(Parser, Debug)]
#[command(
    name = "decom",
    version,
    about = "Decommission a GitOps-deployed service",
    long_about = "Removes a service's Argo manifest, deployment finalizer and Argo application,\n\
                  and for backend services its Vault configmap, database connection, policies and auth roles.\n\
                  Every mutating action is gated behind an operator confirmation."
)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Steps to skip (repeatable or comma separated)
    #[arg(long = "skip", env = "DECOM_SKIP", value_enum, value_delimiter = ',')]
    pub skip: Vec<StepKind>,

    // ── Connections ──────────────────────────────────────────────────────
    /// GitLab base URL
    #[arg(long, env = "GITLAB_URL")]
    pub gitlab_url: Option<String>,

    /// GitLab private token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub gitlab_token: Option<String>,

    /// Path of the GitOps project (group/project)
    #[arg(long, env = "PROJECT_PATH")]
    pub project_path: Option<String>,

    /// Argo CD URL handed to the deletion script
    #[arg(long, env = "ARGOCD_URL")]
    pub argocd_url: Option<String>,

    /// Vault base URL
    #[arg(long, env = "VAULT_URL")]
    pub vault_url: Option<String>,

    /// Vault token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub vault_token: Option<String>,

    // ── Ticket ───────────────────────────────────────────────────────────
    /// Branch the removal branch is created from and merged into
    #[arg(long, env = "SOURCE_BRANCH")]
    pub source_branch: Option<String>,

    /// Ticket number, used as branch name and commit prefix
    #[arg(long, env = "TICKET_NUMBER")]
    pub ticket_number: Option<String>,

    // ── Payload ──────────────────────────────────────────────────────────
    /// Directory of the Argo application manifests
    #[arg(long, env = "ARGOAPP_DOMAIN")]
    pub argoapp_domain: Option<String>,

    /// Service to decommission
    #[arg(long, env = "SERVICE_NAME")]
    pub service_name: Option<String>,

    /// "1" for backend services (Vault cleanup runs)
    #[arg(long, env = "BACKEND_SERVICE", default_value = "0")]
    pub backend_service: String,

    /// Database type of a backend service (mysql or mongodb)
    #[arg(long, env = "DB_TYPE")]
    pub db_type: Option<String>,

    /// Kubernetes namespace of the deployment
    #[arg(long, env = "K8S_NAMESPACE", default_value = "default")]
    pub k8s_namespace: String,

    /// Kubeconfig context (current context when unset)
    #[arg(long, env = "K8S_CONTEXT")]
    pub k8s_context: Option<String>,

    /// KV v2 mount holding configmaps
    #[arg(long, env = "VAULT_SECRET_ENGINE_NAME", default_value = "configmaps")]
    pub vault_secret_engine_name: String,

    /// Directory for configmap backups
    #[arg(
        long,
        env = "VAULT_CONFIGMAP_BACKUP_DIR",
        default_value = "deleted_configmaps_backup"
    )]
    pub vault_configmap_backup_dir: String,

    /// Database secrets engine mount for mysql services
    #[arg(long, env = "VAULT_MYSQL_MOUNT")]
    pub vault_mysql_mount: Option<String>,

    /// Database secrets engine mount for mongodb services
    #[arg(long, env = "VAULT_MONGODB_MOUNT")]
    pub vault_mongodb_mount: Option<String>,

    /// Auth mount whose roles are deleted (e.g. kubernetes, eks)
    #[arg(long, env = "VAULT_AUTH_MOUNT")]
    pub vault_auth_mount: Option<String>,

    // ── Hand-off ─────────────────────────────────────────────────────────
    /// Script that deletes the Argo application
    #[arg(long, env = "ARGOCD_DELETE_SCRIPT", default_value = "./delete_argocd_app.sh")]
    pub argocd_delete_script: String,

    /// Terminal emulator the deletion script is opened in
    #[arg(long, env = "DECOM_TERMINAL", default_value = "gnome-terminal")]
    pub terminal: String,

    /// Timeout for each external call (e.g. 30s, 2m)
    #[arg(long, env = "DECOM_REQUEST_TIMEOUT", default_value = "30s")]
    pub request_timeout: String,
}
