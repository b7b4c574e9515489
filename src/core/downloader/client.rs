use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::checksum;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::Remote;
use crate::core::manifest::Download;

/// Progress notifications emitted by a running batch.
#[derive(Debug)]
pub enum DownloadEvent {
    Started { key: String },
    Completed { key: String, bytes: u64 },
    Failed { key: String, error: String },
}

/// Running tally of a batch, owned by whoever drains the events.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub succeeded: usize,
    pub failed: Vec<(String, String)>,
    pub in_progress: usize,
    pub bytes: u64,
}

impl DownloadReport {
    pub fn apply(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started { .. } => self.in_progress += 1,
            DownloadEvent::Completed { key, bytes } => {
                self.in_progress = self.in_progress.saturating_sub(1);
                self.succeeded += 1;
                self.bytes += bytes;
                debug!("Downloaded {}", key);
            }
            DownloadEvent::Failed { key, error } => {
                self.in_progress = self.in_progress.saturating_sub(1);
                warn!("Failed to download {}: {}", key, error);
                self.failed.push((key, error));
            }
        }
    }
}

/// Concurrent, checksum-validated downloader.
///
/// Every entry is fetched again even if the file already exists; the
/// declared digest is checked on the in-memory body before anything is
/// written.
#[derive(Clone)]
pub struct Downloader {
    remote: Arc<dyn Remote>,
    /// Maximum number of parallel downloads.
    workers: usize,
}

impl Downloader {
    pub fn new(remote: Arc<dyn Remote>) -> Self {
        Self { remote, workers: 8 }
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    // ── Single file download ────────────────────────────

    /// Download one entry under `root`, creating parent directories.
    pub async fn download_one(&self, root: &Path, entry: &Download) -> InstallerResult<u64> {
        if !entry.is_contained() {
            return Err(InstallerError::UnsafePath(entry.full_relative_path().to_string()));
        }
        let dest = entry.local_path(root);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallerError::io(parent, e))?;
        }

        let bytes = self.remote.get_bytes(&entry.url).await?;

        if entry.has_checksum() {
            if let Some(actual) = checksum::digest_bytes(entry.hash_algorithm, &bytes) {
                if !actual.eq_ignore_ascii_case(&entry.hash) {
                    return Err(InstallerError::ChecksumMismatch {
                        path: entry.full_relative_path().to_string(),
                        expected: entry.hash.clone(),
                        actual,
                    });
                }
            }
        }

        // The handle is dropped at the end of this block, before the next file.
        {
            let mut file = tokio::fs::File::create(&dest)
                .await
                .map_err(|e| InstallerError::io(&dest, e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| InstallerError::io(&dest, e))?;
            file.flush().await.map_err(|e| InstallerError::io(&dest, e))?;
        }

        Ok(bytes.len() as u64)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Start downloading `entries` in the background.
    ///
    /// The returned channel yields one `Started` and one terminal event per
    /// entry and closes when the batch is done.
    pub fn start_batch(&self, root: PathBuf, entries: Vec<Download>) -> mpsc::Receiver<DownloadEvent> {
        let (tx, rx) = mpsc::channel(entries.len().max(1) * 2);
        let this = self.clone();

        info!(
            "Starting batch download: {} files, workers={}",
            entries.len(),
            self.workers
        );

        tokio::spawn(async move {
            stream::iter(entries)
                .map(|entry| {
                    let this = &this;
                    let root = &root;
                    let tx = tx.clone();
                    async move {
                        let key = entry.full_relative_path().to_string();
                        let _ = tx.send(DownloadEvent::Started { key: key.clone() }).await;
                        let event = match this.download_one(root, &entry).await {
                            Ok(bytes) => DownloadEvent::Completed { key, bytes },
                            Err(e) => DownloadEvent::Failed {
                                key,
                                error: e.to_string(),
                            },
                        };
                        let _ = tx.send(event).await;
                    }
                })
                .buffer_unordered(this.workers)
                .collect::<Vec<()>>()
                .await;
        });

        rx
    }

    /// Run a batch to completion and return its tally.
    pub async fn download_all(&self, root: &Path, entries: Vec<Download>) -> DownloadReport {
        let mut rx = self.start_batch(root.to_path_buf(), entries);
        let mut report = DownloadReport::default();
        while let Some(event) = rx.recv().await {
            report.apply(event);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checksum::digest_bytes;
    use crate::core::manifest::HashAlgorithm;
    use crate::core::testing::StaticRemote;

    #[tokio::test]
    async fn batch_writes_verified_files_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good_hash = digest_bytes(HashAlgorithm::Sha1, b"good").unwrap();
        let remote = StaticRemote::new()
            .with_text("https://cdn.test/good", "good")
            .with_text("https://cdn.test/bad", "tampered");
        let downloader = Downloader::new(Arc::new(remote)).with_workers(2);

        let entries = vec![
            Download::new("mods", "https://cdn.test/good", "good.jar", HashAlgorithm::Sha1, good_hash),
            Download::new("mods", "https://cdn.test/bad", "bad.jar", HashAlgorithm::Sha1, "00"),
            Download::unverified("config", "https://cdn.test/missing", "missing.cfg"),
        ];
        let report = downloader.download_all(dir.path(), entries).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.in_progress, 0);
        assert_eq!(std::fs::read(dir.path().join("mods/good.jar")).unwrap(), b"good");
        assert!(!dir.path().join("mods/bad.jar").exists());
    }

    #[tokio::test]
    async fn escaping_entries_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("server");
        std::fs::create_dir_all(&root).unwrap();
        let remote = Arc::new(StaticRemote::new().with_text("https://cdn.test/x", "payload"));
        let downloader = Downloader::new(remote.clone());

        let entry = Download::unverified("libraries/../..", "https://cdn.test/x", "evil.jar");
        let err = downloader.download_one(&root, &entry).await.unwrap_err();
        assert!(matches!(err, InstallerError::UnsafePath(_)));
        assert!(!dir.path().join("evil.jar").exists());
        assert!(remote.requests().is_empty());
    }

    #[tokio::test]
    async fn existing_files_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("mods")).unwrap();
        std::fs::write(dir.path().join("mods/a.jar"), b"stale").unwrap();

        let remote = StaticRemote::new().with_text("https://cdn.test/a", "fresh");
        let downloader = Downloader::new(Arc::new(remote));
        let report = downloader
            .download_all(
                dir.path(),
                vec![Download::unverified("mods", "https://cdn.test/a", "a.jar")],
            )
            .await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(std::fs::read(dir.path().join("mods/a.jar")).unwrap(), b"fresh");
    }
}
