//! Centralized error types for decom
//!
//! Adapter errors (GitLab, Vault, Kubernetes, launcher) are typed so steps can
//! match on them. `DecomError` is the fatal tier: a step only returns it when
//! the whole run must halt.

use thiserror::Error;

/// Exit code for an operator interrupt (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;

/// Conditions that end the run
#[derive(Error, Debug)]
pub enum DecomError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Aborted by operator. Update your .env and re-run.")]
    Aborted,

    #[error("Interrupted by operator")]
    Interrupted,

    #[error("Failed to authenticate with GitLab at {url}. Make sure your private token is valid.")]
    GitLabAuth { url: String },

    #[error("Failed to retrieve project '{project}': {message}")]
    ProjectNotFound { project: String, message: String },

    #[error("Failed to create branch '{branch}' from '{from}': {message}")]
    BranchCreate {
        branch: String,
        from: String,
        message: String,
    },

    #[error("No file found with extensions .yaml or .yml for '{service}' under {domain}/")]
    ManifestNotFound { domain: String, service: String },

    #[error("Failed to authenticate with Vault: {message}")]
    VaultAuth { message: String },

    #[error("Secret not found at {mount}/{path}")]
    SecretNotFound { mount: String, path: String },

    #[error("Failed to read secret {mount}/{path}: {source}")]
    SecretRead {
        mount: String,
        path: String,
        #[source]
        source: VaultError,
    },

    #[error("Failed to write backup {path}: {source}")]
    BackupFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize backup for {service}: {message}")]
    BackupEncode { service: String, message: String },
}

impl DecomError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required configuration missing: {}", .keys.join(", "))]
    Missing { keys: Vec<String> },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// GitLab API errors
#[derive(Error, Debug)]
pub enum GitLabError {
    #[error("GitLab rejected the token (401)")]
    Unauthorized,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Branch '{branch}' already exists")]
    BranchExists { branch: String },

    #[error("Merge request is already closed or cannot be merged: {message}")]
    MergeRequestClosed { message: String },

    #[error("GitLab returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request to GitLab failed: {0}")]
    Network(String),
}

/// Vault API errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault rejected the token ({status})")]
    Forbidden { status: u16 },

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Vault returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request to Vault failed: {0}")]
    Network(String),

    #[error("Unexpected Vault response: {0}")]
    Decode(String),
}

/// Kubernetes errors
#[derive(Error, Debug)]
pub enum KubernetesError {
    #[error("Failed to load kubeconfig (context: {context}): {message}")]
    Config { context: String, message: String },

    #[error("Deployment {name} not found in namespace {namespace}")]
    DeploymentNotFound { name: String, namespace: String },

    #[error("Patch of {name} timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },

    #[error("Kubernetes API error: {0}")]
    Api(String),
}

/// Errors launching the external application-deletion hand-off
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Terminal emulator '{terminal}' not found in PATH")]
    TerminalNotFound { terminal: String },

    #[error("Failed to spawn '{terminal}': {source}")]
    Spawn {
        terminal: String,
        #[source]
        source: std::io::Error,
    },
}
