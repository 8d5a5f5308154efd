//! Vault cleanup for backend services
//!
//! Four independent steps sharing one authenticated client: configmap
//! backup and delete, database connection and roles, policies, auth roles.
//! Bulk deletions isolate failures per item.

use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::domain::naming::{select_matching, NameMatcher};
use crate::domain::step::StepStatus;
use crate::error::{DecomError, VaultError};
use crate::infrastructure::backup;
use crate::infrastructure::vault::SecretStore;

/// Verify the secret-store session before any backend step runs
pub async fn acquire(vault: &dyn SecretStore) -> Result<(), DecomError> {
    match vault.is_authenticated().await {
        Ok(true) => {
            info!("✅ Successfully authenticated with Vault.");
            Ok(())
        }
        Ok(false) => Err(DecomError::VaultAuth {
            message: "token was rejected, make sure it is valid".to_string(),
        }),
        Err(e) => Err(DecomError::VaultAuth {
            message: e.to_string(),
        }),
    }
}

/// Back up the configmap secret, then delete every version of it
///
/// The delete is never attempted unless the backup file was written.
pub async fn backup_and_delete_configmap(
    config: &RunConfig,
    vault: &dyn SecretStore,
) -> Result<StepStatus, DecomError> {
    let mount = &config.vault_secret_engine_name;
    let path = &config.service_name;
    info!("Backing up Vault secret: {}/{}", mount, path);

    let data = match vault.read_kv(mount, path).await {
        Ok(data) => data,
        Err(VaultError::InvalidPath { .. }) => {
            return Err(DecomError::SecretNotFound {
                mount: mount.clone(),
                path: path.clone(),
            })
        }
        Err(source) => {
            return Err(DecomError::SecretRead {
                mount: mount.clone(),
                path: path.clone(),
                source,
            })
        }
    };

    let file = config.backup_file_path();
    backup::write_backup(&file, path, &data)?;
    info!("✅ Backup saved at: {}", file.display());

    info!("Deleting secret: {}/{}", mount, path);
    match vault.delete_kv_all_versions(mount, path).await {
        Ok(()) => {
            info!("✅ Secret deleted successfully.");
            Ok(StepStatus::Succeeded)
        }
        Err(e) => {
            error!(
                "❌ Failed to delete secret {}/{} (backup kept at {}): {}",
                mount,
                path,
                file.display(),
                e
            );
            Ok(StepStatus::from_failures(1))
        }
    }
}

/// Delete the service's database connection and every role ending in its name
pub async fn delete_db_connection_roles(
    config: &RunConfig,
    vault: &dyn SecretStore,
    matcher: &dyn NameMatcher,
) -> StepStatus {
    let Some(mount) = config.db_mount() else {
        warn!(
            "Unsupported DB_TYPE '{}', skipping database cleanup",
            config.db_type
        );
        return StepStatus::Skipped;
    };

    let db_name = config.db_object_name();
    info!("Deleting Vault DB connection and roles for '{}'...", db_name);
    let mut failures = 0;

    match vault.delete_db_connection(mount, &db_name).await {
        Ok(()) => info!("✅ Deleted DB connection: {}", db_name),
        Err(e) => {
            error!("❌ Failed to delete DB connection {}: {}", db_name, e);
            failures += 1;
        }
    }

    let roles = match vault.list_db_roles(mount).await {
        Ok(roles) => roles,
        Err(e) => {
            error!("❌ Failed to list DB roles under {}: {}", mount, e);
            failures += 1;
            Vec::new()
        }
    };

    let matching = select_matching(&roles, &db_name, matcher);
    info!("Matching roles: {:?}", matching);

    for role in &matching {
        let result = vault.delete_db_role(mount, role).await;
        failures += record("DB role", role, result);
    }

    StepStatus::from_failures(failures)
}

/// Delete every ACL policy whose name ends with the service name
pub async fn delete_policies(
    config: &RunConfig,
    vault: &dyn SecretStore,
    matcher: &dyn NameMatcher,
) -> StepStatus {
    info!("Deleting Vault policies for '{}'...", config.service_name);

    let policies = match vault.list_policies().await {
        Ok(policies) => policies,
        Err(e) => {
            error!("❌ Failed to list Vault policies: {}", e);
            return StepStatus::from_failures(1);
        }
    };

    let matching = select_matching(&policies, &config.service_name, matcher);
    info!("Matching policies for deletion: {:?}", matching);

    let mut failures = 0;
    for policy in &matching {
        let result = vault.delete_policy(policy).await;
        failures += record("policy", policy, result);
    }

    StepStatus::from_failures(failures)
}

/// Delete every role under the auth mount whose name ends with the service name
pub async fn delete_access_roles(
    config: &RunConfig,
    vault: &dyn SecretStore,
    matcher: &dyn NameMatcher,
) -> StepStatus {
    let mount = &config.vault_auth_mount;
    info!(
        "Deleting Vault access roles for '{}' under auth/{}...",
        config.service_name, mount
    );
    let mut failures = 0;

    let roles = match vault.list_auth_roles(mount).await {
        Ok(roles) => roles,
        Err(e) => {
            error!("❌ Failed to list roles in '{}': {}", mount, e);
            failures += 1;
            Vec::new()
        }
    };

    let matching = select_matching(&roles, &config.service_name, matcher);
    info!("Matching roles for deletion: {:?}", matching);

    for role in &matching {
        let result = vault.delete_auth_role(mount, role).await;
        failures += record("role", role, result);
    }

    StepStatus::from_failures(failures)
}

/// Log one deletion; returns the number of failures (0 or 1)
fn record(kind: &str, name: &str, result: Result<(), VaultError>) -> usize {
    match result {
        Ok(()) => {
            info!("✅ Deleted {}: {}", kind, name);
            0
        }
        Err(e) => {
            error!("❌ Failed to delete {} {}: {}", kind, name, e);
            1
        }
    }
}
