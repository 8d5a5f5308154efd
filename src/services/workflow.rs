//! Decommission workflow - runs the step list
//!
//! A single runner loop walks the planned steps in order. Skipped steps are
//! logged and recorded; recoverable failures are counted per step; the first
//! fatal error halts the run and is returned to `main`, which owns the exit
//! code.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::domain::naming::{NameMatcher, SuffixMatcher};
use crate::domain::step::{RunReport, StepKind, StepStatus};
use crate::error::DecomError;
use crate::infrastructure::gitlab::{GitLabClient, SourceControl};
use crate::infrastructure::kubernetes::{Cluster, KubeCluster};
use crate::infrastructure::launcher::{AppDeleter, TerminalLauncher};
use crate::infrastructure::vault::{SecretStore, VaultClient};
use crate::services::{cluster, manifest, secrets};
use crate::ui::{self, Prompter, StdinPrompter};

/// External systems a run talks to
pub struct Collaborators {
    pub source_control: Box<dyn SourceControl>,
    pub cluster: Box<dyn Cluster>,
    pub app_deleter: Box<dyn AppDeleter>,
    pub secret_store: Box<dyn SecretStore>,
    pub prompter: Box<dyn Prompter>,
}

impl Collaborators {
    /// Real clients for `config`; no network traffic happens here
    pub fn live(config: &RunConfig) -> Result<Self> {
        let source_control = GitLabClient::new(
            &config.gitlab_url,
            config.gitlab_token.clone(),
            config.request_timeout,
        )
        .context("Failed to create GitLab client")?;

        let secret_store = VaultClient::new(
            &config.vault_url,
            config.vault_token.clone(),
            config.request_timeout,
        )
        .context("Failed to create Vault client")?;

        Ok(Self {
            source_control: Box::new(source_control),
            cluster: Box::new(KubeCluster::new(
                config.k8s_context.clone(),
                config.request_timeout,
            )),
            app_deleter: Box::new(TerminalLauncher::new(
                config.terminal.clone(),
                config.delete_script.clone(),
            )),
            secret_store: Box::new(secret_store),
            prompter: Box::new(StdinPrompter),
        })
    }
}

/// One decommission run
pub struct Workflow<'a> {
    config: &'a RunConfig,
    deps: &'a Collaborators,
    matcher: Box<dyn NameMatcher>,
}

impl<'a> Workflow<'a> {
    pub fn new(config: &'a RunConfig, deps: &'a Collaborators) -> Self {
        Self {
            config,
            deps,
            matcher: Box::new(SuffixMatcher),
        }
    }

    /// Use a different ownership predicate for roles and policies
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_matcher(mut self, matcher: Box<dyn NameMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Execute the gate and every planned step, recording results in `report`
    pub async fn run(&self, report: &mut RunReport) -> Result<(), DecomError> {
        self.confirm().await?;

        let mut secret_store_ready = false;
        let mut finalizer_failed = false;

        for step in self.config.plan() {
            let kind = step.kind;

            if step.skip {
                info!("[Skipping] {} step as requested.", kind.name());
                report.push(kind, StepStatus::Skipped, Duration::ZERO);
                continue;
            }

            if kind == StepKind::DeleteApp
                && finalizer_failed
                && !cluster::confirm_app_delete_after_failed_finalizer(
                    self.config,
                    self.deps.prompter.as_ref(),
                )
                .await
            {
                warn!(
                    "[Skipping] {} step: finalizers on '{}' were not cleared.",
                    kind.name(),
                    self.config.service_name
                );
                report.push(kind, StepStatus::Skipped, Duration::ZERO);
                continue;
            }

            if kind.uses_secret_store() && !secret_store_ready {
                secrets::acquire(self.deps.secret_store.as_ref()).await?;
                secret_store_ready = true;
            }

            info!(
                "{} Step {} - {}",
                kind.emoji(),
                step_number(kind),
                kind.name()
            );

            let start = Instant::now();
            match self.execute_step(kind).await {
                Ok(status) => {
                    if kind == StepKind::RemoveFinalizer {
                        finalizer_failed = status != StepStatus::Succeeded;
                    }
                    report.push(kind, status, start.elapsed());
                }
                Err(e) => {
                    report.push(kind, StepStatus::Failed(e.to_string()), start.elapsed());
                    return Err(e);
                }
            }
        }

        if self.config.backend_service {
            ui::print_success(&format!(
                "Finished decommissioning backend service {}",
                self.config.service_name
            ));
        } else {
            ui::print_info(&format!(
                "This is a front-end service; finished deleting {}. \
                 Make sure to remove non-utilized API routes and DNS records related to this service.",
                self.config.service_name
            ));
        }

        Ok(())
    }

    /// The single up-front cancellation point
    async fn confirm(&self) -> Result<(), DecomError> {
        let summary = ui::confirmation_summary(self.config);
        let confirmed = self
            .deps
            .prompter
            .confirm(&summary)
            .await
            .unwrap_or(false);

        if !confirmed {
            return Err(DecomError::Aborted);
        }

        info!("Continuing with removing deprecated service...");
        Ok(())
    }

    async fn execute_step(&self, kind: StepKind) -> Result<StepStatus, DecomError> {
        let config = self.config;
        let deps = self.deps;
        let vault = deps.secret_store.as_ref();
        let matcher = self.matcher.as_ref();

        match kind {
            StepKind::RemoveManifest => {
                manifest::remove_manifest(
                    config,
                    deps.source_control.as_ref(),
                    deps.prompter.as_ref(),
                )
                .await
            }
            StepKind::RemoveFinalizer => {
                Ok(cluster::remove_finalizer(config, deps.cluster.as_ref()).await)
            }
            StepKind::DeleteApp => Ok(cluster::delete_app(config, deps.app_deleter.as_ref())),
            StepKind::BackupConfigmap => secrets::backup_and_delete_configmap(config, vault).await,
            StepKind::DeleteDbConnection => {
                Ok(secrets::delete_db_connection_roles(config, vault, matcher).await)
            }
            StepKind::DeletePolicies => Ok(secrets::delete_policies(config, vault, matcher).await),
            StepKind::DeleteAccessRoles => {
                Ok(secrets::delete_access_roles(config, vault, matcher).await)
            }
        }
    }
}

/// 1-based position of a step in the full runbook
fn step_number(kind: StepKind) -> usize {
    StepKind::ALL
        .iter()
        .position(|k| *k == kind)
        .map_or(0, |i| i + 1)
}
