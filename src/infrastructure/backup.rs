//! Local configmap backups
//!
//! The backup file is the only record of a deleted configmap, so it is
//! written and flushed before the secret is touched.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::DecomError;
use crate::infrastructure::vault::SecretData;

/// Serialize a secret payload as a block-style YAML mapping
pub fn render(service: &str, data: &SecretData) -> Result<String, DecomError> {
    serde_yaml::to_string(data).map_err(|e| DecomError::BackupEncode {
        service: service.to_string(),
        message: e.to_string(),
    })
}

/// Write the backup to `path`, creating its parent directory if needed
pub fn write_backup(path: &Path, service: &str, data: &SecretData) -> Result<(), DecomError> {
    let failed = |source: std::io::Error| DecomError::BackupFailed {
        path: path.display().to_string(),
        source,
    };

    let content = render(service, data)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(failed)?;
    }

    let mut file = fs::File::create(path).map_err(failed)?;
    file.write_all(content.as_bytes()).map_err(failed)?;
    file.sync_all().map_err(failed)?;

    Ok(())
}
