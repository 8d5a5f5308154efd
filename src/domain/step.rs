//! Step domain types
//!
//! The decommission runbook as an ordered list of steps, each independently
//! skippable, plus the per-step results collected into a run report.

use std::time::Duration;

/// Individual steps of a decommission run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum StepKind {
    /// Delete the Argo application manifest and open a merge request
    #[value(name = "manifest")]
    RemoveManifest,
    /// Clear finalizers on the service deployment
    #[value(name = "finalizer")]
    RemoveFinalizer,
    /// Hand off Argo application deletion to the external script
    #[value(name = "app")]
    DeleteApp,
    /// Back up and delete the configmap secret
    #[value(name = "configmap")]
    BackupConfigmap,
    /// Delete the database connection and its roles
    #[value(name = "db")]
    DeleteDbConnection,
    /// Delete the service's Vault policies
    #[value(name = "policies")]
    DeletePolicies,
    /// Delete the service's auth roles
    #[value(name = "access-roles")]
    DeleteAccessRoles,
}

impl StepKind {
    /// Every step in execution order
    pub const ALL: [StepKind; 7] = [
        Self::RemoveManifest,
        Self::RemoveFinalizer,
        Self::DeleteApp,
        Self::BackupConfigmap,
        Self::DeleteDbConnection,
        Self::DeletePolicies,
        Self::DeleteAccessRoles,
    ];

    /// Get human-readable name for the step
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveManifest => "Remove Argo App YAML",
            Self::RemoveFinalizer => "Remove Finalizer",
            Self::DeleteApp => "Delete Argo App",
            Self::BackupConfigmap => "Backup and Delete Configmap",
            Self::DeleteDbConnection => "Delete Vault DB Connection and Roles",
            Self::DeletePolicies => "Delete Vault Policies",
            Self::DeleteAccessRoles => "Delete Vault Access Roles",
        }
    }

    /// Get emoji for the step
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::RemoveManifest => "📄",
            Self::RemoveFinalizer => "🔓",
            Self::DeleteApp => "🗑️",
            Self::BackupConfigmap => "💾",
            Self::DeleteDbConnection => "🗃️",
            Self::DeletePolicies => "📜",
            Self::DeleteAccessRoles => "🔑",
        }
    }

    /// Whether the step talks to the secret store (backend services only)
    pub fn uses_secret_store(&self) -> bool {
        matches!(
            self,
            Self::BackupConfigmap
                | Self::DeleteDbConnection
                | Self::DeletePolicies
                | Self::DeleteAccessRoles
        )
    }
}

/// A step in the plan, with its skip flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub skip: bool,
}

/// Build the run plan
///
/// Secret-store steps are only planned for backend services.
pub fn plan(backend: bool, skipped: &[StepKind]) -> Vec<Step> {
    StepKind::ALL
        .iter()
        .filter(|kind| backend || !kind.uses_secret_store())
        .map(|kind| Step {
            kind: *kind,
            skip: skipped.contains(kind),
        })
        .collect()
}

/// How a step finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Skipped,
    /// Ran to the end, but some recoverable actions failed
    Partial { failures: usize },
    /// Halted the run
    Failed(String),
}

impl StepStatus {
    /// `Succeeded` when nothing failed, `Partial` otherwise
    pub fn from_failures(failures: usize) -> Self {
        if failures == 0 {
            Self::Succeeded
        } else {
            Self::Partial { failures }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Succeeded => "ok".to_string(),
            Self::Skipped => "skipped".to_string(),
            Self::Partial { failures } => format!("partial ({} failures)", failures),
            Self::Failed(_) => "failed".to_string(),
        }
    }
}

/// Result of executing a step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub kind: StepKind,
    pub status: StepStatus,
    pub duration: Duration,
}

/// Collected step results for one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub results: Vec<StepResult>,
}

impl RunReport {
    pub fn push(&mut self, kind: StepKind, status: StepStatus, duration: Duration) {
        self.results.push(StepResult {
            kind,
            status,
            duration,
        });
    }

    /// Total recoverable failures across all steps
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .map(|r| match r.status {
                StepStatus::Partial { failures } => failures,
                _ => 0,
            })
            .sum()
    }

    #[cfg(test)]
    pub fn status_of(&self, kind: StepKind) -> Option<&StepStatus> {
        self.results
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| &r.status)
    }
}
