//! Finalizer removal and Argo application deletion

use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::domain::step::StepStatus;
use crate::infrastructure::kubernetes::Cluster;
use crate::infrastructure::launcher::AppDeleter;
use crate::ui::Prompter;

/// Clear finalizers on the service deployment
///
/// A failure does not stop the run, but the application delete that follows
/// can hang on the leftover finalizers, so it is surfaced as a warning too.
pub async fn remove_finalizer(config: &RunConfig, cluster: &dyn Cluster) -> StepStatus {
    info!("Removing finalizer from '{}'...", config.service_name);

    match cluster
        .clear_finalizers(&config.k8s_namespace, &config.service_name)
        .await
    {
        Ok(()) => {
            info!(
                "✅ Finalizer removed from deployment '{}' in namespace '{}'",
                config.service_name, config.k8s_namespace
            );
            StepStatus::Succeeded
        }
        Err(e) => {
            error!("❌ Failed to remove finalizer: {}", e);
            warn!(
                "Deleting the Argo app for '{}' may hang until its finalizers are cleared",
                config.service_name
            );
            StepStatus::from_failures(1)
        }
    }
}

/// Ask whether to delete the Argo app although its finalizers may remain
///
/// Anything but an explicit yes (including a failed read) declines.
pub async fn confirm_app_delete_after_failed_finalizer(
    config: &RunConfig,
    prompter: &dyn Prompter,
) -> bool {
    let question = format!(
        "\nFinalizer removal failed for deployment '{}' in namespace '{}'.\n\
         Deleting the Argo app now may hang until the finalizers are cleared.\n\
         Press Y to delete the Argo app anyway, or N to skip it: ",
        config.service_name, config.k8s_namespace
    );
    prompter.confirm(&question).await.unwrap_or(false)
}

/// Hand the Argo application deletion to the external script
///
/// Returns as soon as the terminal is spawned. Whether the script succeeds
/// is only visible in its own window.
pub fn delete_app(config: &RunConfig, deleter: &dyn AppDeleter) -> StepStatus {
    info!("Deleting Argo app for '{}'...", config.service_name);

    let status = match deleter.launch(&config.argocd_url, &config.service_name) {
        Ok(handle) => {
            debug!("Launched: {}", handle.command);
            info!(
                "✅ Opened a new terminal to run the deletion script (pid {})",
                handle
                    .pid
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            StepStatus::Succeeded
        }
        Err(e) => {
            error!("❌ Failed to open new terminal: {}", e);
            StepStatus::from_failures(1)
        }
    };

    info!("Not waiting for the deletion script; continuing");
    status
}
