//! Argo manifest removal
//!
//! Deletes the service's application manifest on a ticket branch in the
//! GitOps repository, opens a merge request back into the source branch and
//! optionally merges it.

use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::domain::step::StepStatus;
use crate::error::{DecomError, GitLabError};
use crate::infrastructure::gitlab::{Project, SourceControl};
use crate::ui::Prompter;

pub async fn remove_manifest(
    config: &RunConfig,
    gitlab: &dyn SourceControl,
    prompter: &dyn Prompter,
) -> Result<StepStatus, DecomError> {
    info!(
        "Removing Argo App YAML file for '{}'...",
        config.service_name
    );

    let project = connect(config, gitlab).await?;
    let branch = config.new_branch_name();

    match gitlab
        .create_branch(&project, branch, &config.source_branch)
        .await
    {
        Ok(()) => info!(
            "✅ Branch '{}' created, based on source-branch: {}",
            branch, config.source_branch
        ),
        Err(GitLabError::BranchExists { .. }) => {
            warn!("Branch '{}' already exists, continuing with it", branch)
        }
        // Without the branch there is nothing to probe or delete
        Err(e) => {
            return Err(DecomError::BranchCreate {
                branch: branch.to_string(),
                from: config.source_branch.clone(),
                message: e.to_string(),
            })
        }
    }

    let file = locate_manifest(config, gitlab, &project).await?;
    info!("✅ Found file to delete: {}", file);

    if let Err(e) = gitlab
        .delete_file(&project, &file, branch, &config.commit_message())
        .await
    {
        error!("❌ Failed to delete {}: {}", file, e);
        return Ok(StepStatus::from_failures(1));
    }
    info!("✅ Deleted file: {}", file);

    let title = config.merge_request_title();
    let merge_request = match gitlab
        .create_merge_request(&project, branch, &config.source_branch, &title)
        .await
    {
        Ok(mr) => mr,
        Err(e) => {
            error!("❌ Failed to create merge request: {}", e);
            return Ok(StepStatus::from_failures(1));
        }
    };
    info!("✅ Merge request created: {}", merge_request.web_url);

    let question = format!(
        "\nWould you like to merge this MR now?\n  • Title: {}\n  • URL:   {}\n\nPress Y to merge, or N to skip: ",
        title, merge_request.web_url
    );
    if !prompter.confirm(&question).await.unwrap_or(false) {
        info!("Merge skipped. You can merge manually later.");
        return Ok(StepStatus::Succeeded);
    }

    match gitlab.merge(&project, &merge_request).await {
        Ok(()) => {
            info!("✅ Merge request merged successfully.");
            Ok(StepStatus::Succeeded)
        }
        Err(GitLabError::MergeRequestClosed { message }) => {
            error!(
                "❌ Merge failed: MR is already closed ({}). Merge it manually: {}",
                message, merge_request.web_url
            );
            Ok(StepStatus::from_failures(1))
        }
        Err(e) => {
            error!("❌ Merge failed: {}", e);
            Ok(StepStatus::from_failures(1))
        }
    }
}

/// Validate the token and resolve the GitOps project
async fn connect(config: &RunConfig, gitlab: &dyn SourceControl) -> Result<Project, DecomError> {
    let auth_failed = || DecomError::GitLabAuth {
        url: config.gitlab_url.clone(),
    };

    if let Err(e) = gitlab.authenticate().await {
        error!("GitLab authentication failed: {}", e);
        return Err(auth_failed());
    }

    match gitlab.resolve_project(&config.project_path).await {
        Ok(project) => {
            info!("✅ Connected to GitLab project {}", project.path_with_namespace);
            Ok(project)
        }
        Err(GitLabError::Unauthorized) => Err(auth_failed()),
        Err(e) => Err(DecomError::ProjectNotFound {
            project: config.project_path.clone(),
            message: e.to_string(),
        }),
    }
}

/// First manifest candidate that exists on the removal branch
async fn locate_manifest(
    config: &RunConfig,
    gitlab: &dyn SourceControl,
    project: &Project,
) -> Result<String, DecomError> {
    debug!(
        "Looking for {} (or its .yml variant) on {}",
        config.manifest_file_path(),
        config.new_branch_name()
    );

    for candidate in config.manifest_candidates() {
        match gitlab
            .file_exists(project, &candidate, config.new_branch_name())
            .await
        {
            Ok(true) => return Ok(candidate),
            Ok(false) => {}
            Err(e) => warn!("Could not check {}: {}", candidate, e),
        }
    }

    Err(DecomError::ManifestNotFound {
        domain: config.argoapp_domain.clone(),
        service: config.service_name.clone(),
    })
}
