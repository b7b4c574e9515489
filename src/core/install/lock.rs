use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::core::error::{InstallerError, InstallerResult};

pub const LOCK_FILE: &str = ".serverpack-installer.lock";
const LOCK_STALE_SECS: i64 = 60 * 60 * 12;

/// Held for the duration of a run; removes the lock file on drop.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    /// Take the advisory lock for `install_dir`.
    ///
    /// A lock left by a dead process or older than twelve hours is cleared
    /// once; a live lock fails with `InstallLocked` instead of waiting.
    pub async fn acquire(install_dir: &Path) -> InstallerResult<Self> {
        let path = install_dir.join(LOCK_FILE);
        for attempt in 0..2 {
            match tokio::fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    let payload = serde_json::json!({
                        "pid": std::process::id(),
                        "timestamp": Utc::now().timestamp(),
                    });
                    file.write_all(payload.to_string().as_bytes())
                        .await
                        .map_err(|e| InstallerError::io(&path, e))?;
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt == 0 && clear_stale_lock(&path).await {
                        continue;
                    }
                    return Err(InstallerError::InstallLocked(path));
                }
                Err(e) => return Err(InstallerError::io(&path, e)),
            }
        }
        Err(InstallerError::InstallLocked(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock {:?}: {}", self.path, e);
        }
    }
}

/// Remove `path` if its owner is gone or it has expired. Unreadable locks
/// are treated as stale.
async fn clear_stale_lock(path: &Path) -> bool {
    let value = match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str::<serde_json::Value>(&content).ok(),
        Err(_) => return false,
    };

    let stale = match value {
        Some(value) => {
            let pid = value.get("pid").and_then(|v| v.as_u64()).unwrap_or_default() as u32;
            let timestamp = value
                .get("timestamp")
                .and_then(|v| v.as_i64())
                .unwrap_or_default();
            let expired = Utc::now().timestamp().saturating_sub(timestamp) > LOCK_STALE_SECS;

            #[cfg(target_os = "linux")]
            let dead = !PathBuf::from(format!("/proc/{pid}")).exists();
            #[cfg(not(target_os = "linux"))]
            let dead = pid == 0;

            expired || dead
        }
        None => true,
    };

    if stale {
        info!("Removing stale lock {:?}", path);
        tokio::fs::remove_file(path).await.is_ok()
    } else {
        false
    }
}
