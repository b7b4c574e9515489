use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::error::InstallerResult;
use crate::core::manifest::Download;
use crate::core::maven::{NEOFORGE_MAVEN, NEOFORGE_MIRRORS};

use super::context::InstallContext;
use super::installer::{first_existing, modular_launch, LaunchDescriptor, LoaderStrategy};
use super::libraries::{fg3_library_downloads, read_zip_entry, Fg3VersionJson};
use super::process::run_installer;
use super::vanilla::optional_server_download;
use super::version::{GameVersion, LoaderVersion};

/// NeoForge, installed through its official installer.
///
/// From Minecraft 1.20.2 the artifact is `net.neoforged:neoforge:{version}`;
/// the 1.20.1 builds were published as `net.neoforged:forge:{game}-{version}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeoForgeInstaller {
    pub game: GameVersion,
    pub version: LoaderVersion,
}

impl NeoForgeInstaller {
    pub fn new(game: GameVersion, version: LoaderVersion) -> Self {
        Self { game, version }
    }

    pub fn package(&self) -> &'static str {
        if self.game.at_least(1, 20, 2) {
            "neoforge"
        } else {
            "forge"
        }
    }

    /// Version as used in the artifact path.
    pub fn artifact_version(&self) -> String {
        if self.game.at_least(1, 20, 2) {
            self.version.raw.clone()
        } else {
            format!("{}-{}", self.game.raw, self.version.raw)
        }
    }

    fn installer_name(&self) -> String {
        format!("{}-{}-installer.jar", self.package(), self.artifact_version())
    }

    fn artifact_url(&self, file: &str) -> String {
        format!(
            "{}net/neoforged/{}/{}/{}",
            NEOFORGE_MAVEN,
            self.package(),
            self.artifact_version(),
            file
        )
    }
}

#[async_trait]
impl LoaderStrategy for NeoForgeInstaller {
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        info!(
            "Getting downloads for NeoForge {} ({})",
            self.artifact_version(),
            self.package()
        );
        let installer_name = self.installer_name();
        let installer_url = self.artifact_url(&installer_name);
        let json_url = self.artifact_url(&format!(
            "{}-{}.json",
            self.package(),
            self.artifact_version()
        ));

        let mut downloads = vec![Download::unverified("", installer_url.clone(), &installer_name)];

        // install_profile.json only ships inside the installer.
        let installer = match ctx.remote.get_bytes(&installer_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Unable to read NeoForge installer {}: {}", installer_url, e);
                None
            }
        };

        let version_json = match ctx.remote.get_bytes(&json_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("{} unavailable ({}), using the installer's copy", json_url, e);
                installer
                    .as_deref()
                    .and_then(|jar| read_zip_entry(jar, "version.json"))
            }
        };
        let install_profile = installer
            .as_deref()
            .and_then(|jar| read_zip_entry(jar, "install_profile.json"));

        for raw in [version_json, install_profile].into_iter().flatten() {
            match serde_json::from_slice::<Fg3VersionJson>(&raw) {
                Ok(json) => downloads
                    .extend(fg3_library_downloads(ctx.remote, &json, &NEOFORGE_MIRRORS).await),
                Err(e) => warn!("Unreadable NeoForge library list: {}", e),
            }
        }

        downloads.extend(optional_server_download(ctx, &self.game).await);
        Ok(downloads)
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> InstallerResult<()> {
        info!("Running NeoForge installer for {}", self.artifact_version());
        run_installer(ctx.runner, ctx.java, ctx.install_dir, &self.installer_name())
    }

    fn launch_descriptor(&self, install_dir: &Path) -> LaunchDescriptor {
        let args_dir = format!(
            "libraries/net/neoforged/{}/{}",
            self.package(),
            self.artifact_version()
        );
        if let Some(modular) = modular_launch(install_dir, &args_dir) {
            return modular;
        }
        let base = format!("{}-{}", self.package(), self.artifact_version());
        LaunchDescriptor {
            jar: first_existing(
                install_dir,
                &[format!("{}.jar", base), format!("{}-universal.jar", base)],
            ),
            jvm_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::process::SystemRunner;
    use crate::core::testing::StaticRemote;
    use std::io::Write;

    fn neo(game: &str, version: &str) -> NeoForgeInstaller {
        let g = GameVersion::parse(game).unwrap();
        let v = LoaderVersion::parse(version, &g).unwrap();
        NeoForgeInstaller::new(g, v)
    }

    #[test]
    fn package_switches_at_1_20_2() {
        let n = neo("1.20.1", "47.1.84");
        assert_eq!(n.package(), "forge");
        assert_eq!(n.artifact_version(), "1.20.1-47.1.84");
        assert_eq!(
            n.artifact_url(&n.installer_name()),
            "https://maven.neoforged.net/releases/net/neoforged/forge/1.20.1-47.1.84/forge-1.20.1-47.1.84-installer.jar"
        );

        let n = neo("1.20.4", "20.4.80-beta");
        assert_eq!(n.package(), "neoforge");
        assert_eq!(n.installer_name(), "neoforge-20.4.80-beta-installer.jar");
    }

    #[tokio::test]
    async fn plan_reads_both_descriptors_from_installer() {
        let n = neo("1.20.4", "20.4.80-beta");
        let mut jar = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut jar));
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("version.json", opts).unwrap();
            zip.write_all(
                br#"{"libraries":[{"name":"a:b:1","downloads":{"artifact":{"path":"a/b/1/b-1.jar","url":"https://maven.neoforged.net/releases/a/b/1/b-1.jar","sha1":"11"}}}]}"#,
            )
            .unwrap();
            zip.start_file("install_profile.json", opts).unwrap();
            zip.write_all(
                br#"{"libraries":[{"name":"c:d:2","downloads":{"artifact":{"path":"c/d/2/d-2.jar","url":"https://maven.neoforged.net/releases/c/d/2/d-2.jar","sha1":"22"}}}]}"#,
            )
            .unwrap();
            zip.finish().unwrap();
        }
        let remote = StaticRemote::new().with_bytes(&n.artifact_url(&n.installer_name()), jar);
        let dir = tempfile::tempdir().unwrap();
        let ctx = InstallContext {
            install_dir: dir.path(),
            remote: &remote,
            runner: &SystemRunner,
            java: Path::new("java"),
        };

        let plan = n.plan_downloads(&ctx).await.unwrap();
        let keys: Vec<&str> = plan.iter().map(|d| d.full_relative_path()).collect();
        assert_eq!(
            keys,
            vec![
                "neoforge-20.4.80-beta-installer.jar",
                "libraries/a/b/1/b-1.jar",
                "libraries/c/d/2/d-2.jar",
            ]
        );
    }

    #[test]
    fn modular_launch_uses_neoforged_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("user_jvm_args.txt"), b"").unwrap();
        let launch = neo("1.20.4", "20.4.80-beta").launch_descriptor(dir.path());
        assert_eq!(launch.jar, None);
        assert!(launch.jvm_args[1].starts_with("@libraries/net/neoforged/neoforge/20.4.80-beta/"));
    }
}
