use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use console::Term;
use tracing::{debug, info, warn};

use crate::core::downloader::{DownloadReport, Downloader};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::{HttpRemote, Remote};
use crate::core::java::JavaProvider;
use crate::core::loaders::{CommandRunner, InstallContext, ResolvedLoader, SystemRunner};
use crate::core::manifest::api::FetchedVersion;
use crate::core::manifest::{store, Download, Manifest, PackApi, TargetKind};
use crate::core::prompt::{AutoPrompter, Prompter, TerminalPrompter};
use crate::core::reconcile::{reconcile, Reconciliation};

use super::cleanup::{delete_files, prune_empty_dirs};
use super::lock::InstallLock;
use super::options::InstallOptions;
use super::script::write_start_script;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub pack_name: String,
    pub version_id: u64,
    pub upgrade: bool,
    pub loader: String,
    pub deleted: usize,
    pub pruned_dirs: usize,
    pub downloads: DownloadReport,
    /// False when the run stopped after failed downloads.
    pub completed: bool,
    pub start_script: Option<PathBuf>,
}

impl InstallReport {
    /// Number of downloads that did not succeed.
    pub fn exit_code(&self) -> i32 {
        i32::try_from(self.downloads.failed.len()).unwrap_or(i32::MAX)
    }
}

/// Install with the real network, terminal prompts (unless `auto`) and
/// process runner.
pub async fn install(options: &InstallOptions) -> InstallerResult<InstallReport> {
    let remote: Arc<dyn Remote> = Arc::new(HttpRemote::with_default_client()?);
    let prompter: Box<dyn Prompter> = if options.auto {
        Box::new(AutoPrompter)
    } else {
        Box::new(TerminalPrompter::new())
    };
    Installer::new(options, remote, prompter.as_ref(), &SystemRunner)
        .run()
        .await
}

/// Drives one install or upgrade of a pack version into a directory.
pub struct Installer<'a> {
    options: &'a InstallOptions,
    remote: Arc<dyn Remote>,
    prompter: &'a dyn Prompter,
    runner: &'a dyn CommandRunner,
}

impl<'a> Installer<'a> {
    pub fn new(
        options: &'a InstallOptions,
        remote: Arc<dyn Remote>,
        prompter: &'a dyn Prompter,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            options,
            remote,
            prompter,
            runner,
        }
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        self.prompter.confirm(question, default)
    }

    fn require(&self, question: &str, default: bool) -> InstallerResult<()> {
        if self.confirm(question, default) {
            Ok(())
        } else {
            Err(InstallerError::Aborted(question.to_string()))
        }
    }

    pub async fn run(&self) -> InstallerResult<InstallReport> {
        let root = self.prepare_directory()?;
        let _lock = InstallLock::acquire(&root).await?;

        // ── Target manifest ─────────────────────────────
        let fetched = self.fetch_version().await?;
        let mut manifest = Manifest::from_version_info(&fetched.info);
        if manifest.pack_id == 0 {
            manifest.pack_id = self.options.pack_id;
        }
        let mut report = InstallReport {
            pack_name: manifest.name.clone(),
            version_id: manifest.version_id,
            ..InstallReport::default()
        };

        // ── Previous install ────────────────────────────
        let previous = self.load_previous(&root)?;
        if let Some(previous) = &previous {
            self.check_identity(previous, &manifest)?;
        }

        let (mut working, removed) = match &previous {
            Some(previous) => {
                report.upgrade = true;
                let diff = reconcile(
                    &previous.downloads,
                    &manifest.downloads,
                    &root,
                    self.options.verify_integrity,
                );
                self.gate_reconciliation(diff)
            }
            None => (manifest.downloads.clone(), Vec::new()),
        };

        // ── Dependencies ────────────────────────────────
        let loader = ResolvedLoader::resolve(&manifest)?;
        report.loader = loader.describe();
        let java = JavaProvider::resolve(
            self.remote.as_ref(),
            manifest.target(TargetKind::Runtime),
            self.options.system_java,
        )
        .await;

        let planning_java = java.java_path(&root);
        working.extend(
            loader
                .plan_downloads(&self.context(&root, &planning_java))
                .await?,
        );
        working.extend(java.plan_downloads());
        let working = dedup_by_key(working);

        info!(
            "{} files to download, {} to remove for {} ({})",
            working.len(),
            removed.len(),
            manifest.name,
            report.loader
        );
        self.require(
            &format!("Continue with installation of {}?", manifest.name),
            true,
        )?;

        // Nothing on disk changes before the plan is accepted.
        report.deleted = delete_files(&root, &removed);
        report.pruned_dirs = prune_empty_dirs(&root, &removed).len();

        // ── Downloads ───────────────────────────────────
        report.downloads = self.download(&root, working).await;
        let failed = report.downloads.failed.len();
        if failed > 0 {
            for (key, error) in &report.downloads.failed {
                warn!("  {}: {}", key, error);
            }
            let question = format!("{} download(s) failed. Continue anyway?", failed);
            if !self.confirm(&question, false) {
                warn!("Stopping after {} failed download(s)", failed);
                return Ok(report);
            }
        }

        // ── Install steps ───────────────────────────────
        let java = runtime_after_downloads(java, &report.downloads);
        let java_path = java.java_path(&root);
        java.install(&root)?;
        loader.install(&self.context(&root, &java_path)).await?;

        store::save(&root, &fetched.raw)?;
        info!("Recorded {} version {}", manifest.name, manifest.version_id);

        if self.options.write_start_script {
            let launch = loader.launch_descriptor(&root);
            report.start_script = Some(write_start_script(
                &root,
                &java.relative_path(),
                &launch,
                manifest.specs,
            )?);
        }

        report.completed = true;
        Ok(report)
    }

    fn context<'b>(&'b self, root: &'b Path, java: &'b Path) -> InstallContext<'b> {
        InstallContext {
            install_dir: root,
            remote: self.remote.as_ref(),
            runner: self.runner,
            java,
        }
    }

    /// Create the install directory on confirmation; reject non-directories.
    fn prepare_directory(&self) -> InstallerResult<PathBuf> {
        let root = self.options.install_dir.clone();
        if root.exists() {
            if !root.is_dir() {
                return Err(InstallerError::NotADirectory(root));
            }
            return Ok(root);
        }

        self.require(
            &format!("Path {} does not exist - want to create it?", root.display()),
            true,
        )?;
        std::fs::create_dir_all(&root).map_err(|e| InstallerError::io(&root, e))?;
        info!("Created {:?}", root);
        Ok(root)
    }

    async fn fetch_version(&self) -> InstallerResult<FetchedVersion> {
        let api = PackApi::new(self.remote.as_ref(), &self.options.api_base);
        let pack = api.modpack(self.options.pack_id).await?;
        api.version(&pack, self.options.version).await
    }

    fn load_previous(&self, root: &Path) -> InstallerResult<Option<Manifest>> {
        if !store::exists(root) {
            return Ok(None);
        }
        match store::load(root) {
            Ok(previous) => {
                info!(
                    "Found existing install of {} version {}",
                    previous.name, previous.version_id
                );
                Ok(Some(previous))
            }
            Err(e) => {
                warn!("Unable to read the previous install record: {}", e);
                self.require(
                    "The existing install record is unreadable. Continue as a fresh install? Existing files may be overwritten.",
                    true,
                )?;
                Ok(None)
            }
        }
    }

    fn check_identity(&self, previous: &Manifest, target: &Manifest) -> InstallerResult<()> {
        if previous.same_identity(target) {
            return Ok(());
        }
        let question = if previous.pack_id != target.pack_id {
            warn!(
                "Directory holds pack {} but pack {} was requested",
                previous.pack_id, target.pack_id
            );
            format!(
                "Replace {} (pack {}) with {} (pack {})?",
                previous.name, previous.pack_id, target.name, target.pack_id
            )
        } else {
            format!(
                "Update {} from version {} to {}?",
                target.name, previous.version_id, target.version_id
            )
        };
        self.require(&question, true)
    }

    /// Ask the two override questions. Returns the files to fetch and the
    /// files to remove once the plan is accepted; touches nothing on disk.
    fn gate_reconciliation(&self, diff: Reconciliation) -> (Vec<Download>, Vec<Download>) {
        info!(
            "Upgrade: {} changed, {} new, {} removed, {} unchanged",
            diff.changed.len(),
            diff.added.len(),
            diff.deleted.len(),
            diff.unchanged.len()
        );
        if diff.is_noop() {
            info!("Installed files already match this version");
        }

        let mut keep_local: HashSet<String> = HashSet::new();
        if !diff.locally_modified.is_empty() {
            for entry in &diff.locally_modified {
                warn!("Modified locally: {}", entry.old.full_relative_path());
            }
            let question = format!(
                "{} file(s) were edited locally and changed in this version. Overwrite them?",
                diff.locally_modified.len()
            );
            if !self.confirm(&question, true) {
                keep_local.extend(
                    diff.locally_modified
                        .iter()
                        .map(|e| e.old.full_relative_path().to_string()),
                );
            }
        }

        let mut refetch_suspects = false;
        if !diff.integrity_suspect.is_empty() {
            for entry in &diff.integrity_suspect {
                warn!("Failed verification: {}", entry.full_relative_path());
            }
            let question = format!(
                "{} unchanged file(s) no longer match their checksum. Download them again?",
                diff.integrity_suspect.len()
            );
            refetch_suspects = self.confirm(&question, true);
        }

        let mut working: Vec<Download> = diff
            .changed
            .into_iter()
            .filter(|e| !keep_local.contains(e.new.full_relative_path()))
            .map(|e| e.new)
            .collect();
        working.extend(diff.added);
        if refetch_suspects {
            working.extend(diff.integrity_suspect);
        }
        (working, diff.deleted)
    }

    async fn download(&self, root: &Path, working: Vec<Download>) -> DownloadReport {
        let total = working.len();
        let downloader = Downloader::new(self.remote.clone()).with_workers(self.options.threads);
        let mut events = downloader.start_batch(root.to_path_buf(), working);
        let mut report = DownloadReport::default();
        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        let term = Term::stderr();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => report.apply(event),
                    None => break,
                },
                _ = ticker.tick() => show_progress(&term, &report, total),
            }
        }
        show_progress(&term, &report, total);
        if term.is_term() {
            let _ = term.write_line("");
        }

        info!(
            "Finished {} successful, {} failed, {} incomplete ({} bytes)",
            report.succeeded,
            report.failed.len(),
            report.in_progress,
            report.bytes
        );
        report
    }
}

fn show_progress(term: &Term, report: &DownloadReport, total: usize) {
    let line = format!(
        "Downloaded {}/{} ({} failed, {} in progress)",
        report.succeeded,
        total,
        report.failed.len(),
        report.in_progress
    );
    if term.is_term() {
        let _ = term.clear_line();
        let _ = term.write_str(&line);
    } else {
        debug!("{}", line);
    }
}

/// The runtime to install with: a managed runtime whose archive failed to
/// download falls back to `java` on `PATH`.
fn runtime_after_downloads(java: JavaProvider, downloads: &DownloadReport) -> JavaProvider {
    let missing = java.plan_downloads().iter().any(|planned| {
        downloads
            .failed
            .iter()
            .any(|(key, _)| key == planned.full_relative_path())
    });
    if missing {
        warn!("Java runtime download failed, using system Java instead");
        JavaProvider::System
    } else {
        java
    }
}

/// Keep the first entry per relative path.
fn dedup_by_key(entries: Vec<Download>) -> Vec<Download> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|d| {
            let fresh = seen.insert(d.full_relative_path().to_string());
            if !fresh {
                debug!("Dropping duplicate plan entry {}", d.full_relative_path());
            }
            fresh
        })
        .collect()
}
