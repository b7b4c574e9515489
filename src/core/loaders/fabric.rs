use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::get_json;
use crate::core::manifest::Download;
use crate::core::version::server_jar_name;

use super::context::InstallContext;
use super::installer::{LaunchDescriptor, LoaderStrategy};
use super::vanilla::optional_server_download;
use super::version::GameVersion;

const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";
const LAUNCHER_PROPERTIES: &str = "fabric-server-launcher.properties";

#[derive(Debug, Clone, Deserialize)]
pub struct FabricInstallerBuild {
    pub version: String,
    #[serde(default)]
    pub stable: bool,
}

/// Fabric, served as a single self-bootstrapping launcher jar from Fabric Meta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricServer {
    pub game: GameVersion,
    pub loader_version: String,
}

impl FabricServer {
    pub fn new(game: GameVersion, loader_version: String) -> Self {
        Self {
            game,
            loader_version,
        }
    }

    fn launcher_prefix(&self) -> String {
        format!(
            "fabric-server-mc.{}-loader.{}-launcher.",
            self.game.raw, self.loader_version
        )
    }

    pub fn launcher_name(&self, installer_version: &str) -> String {
        format!("{}{}.jar", self.launcher_prefix(), installer_version)
    }

    async fn installer_version(&self, ctx: &InstallContext<'_>) -> InstallerResult<String> {
        let url = format!("{}/versions/installer", FABRIC_META_BASE);
        let builds: Vec<FabricInstallerBuild> = get_json(ctx.remote, &url)
            .await
            .map_err(|e| InstallerError::LoaderApi(format!("Fabric Meta {}: {}", url, e)))?;

        pick_installer(&builds)
            .map(|b| b.version.clone())
            .ok_or_else(|| InstallerError::LoaderApi("Fabric Meta lists no installer builds".into()))
    }
}

/// First stable build, or the first build when none is marked stable.
pub fn pick_installer(builds: &[FabricInstallerBuild]) -> Option<&FabricInstallerBuild> {
    builds.iter().find(|b| b.stable).or_else(|| builds.first())
}

#[async_trait]
impl LoaderStrategy for FabricServer {
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        info!(
            "Getting downloads for Fabric {} on {}",
            self.loader_version, self.game
        );
        let installer = self.installer_version(ctx).await?;
        let url = format!(
            "{}/versions/loader/{}/{}/{}/server/jar",
            FABRIC_META_BASE, self.game.raw, self.loader_version, installer
        );

        let mut downloads = vec![Download::unverified("", url, &self.launcher_name(&installer))];
        downloads.extend(optional_server_download(ctx, &self.game).await);
        Ok(downloads)
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> InstallerResult<()> {
        let path = ctx.install_dir.join(LAUNCHER_PROPERTIES);
        let body = format!("serverJar={}\n", server_jar_name(&self.game.raw));
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| InstallerError::io(&path, e))?;
        info!("Wrote {}", LAUNCHER_PROPERTIES);
        Ok(())
    }

    fn launch_descriptor(&self, install_dir: &Path) -> LaunchDescriptor {
        let prefix = self.launcher_prefix();
        let mut found: Vec<String> = std::fs::read_dir(install_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|name| name.starts_with(&prefix) && name.ends_with(".jar"))
                    .collect()
            })
            .unwrap_or_default();
        found.sort();

        LaunchDescriptor {
            jar: found.pop(),
            jvm_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::process::SystemRunner;
    use crate::core::testing::StaticRemote;

    fn fabric() -> FabricServer {
        FabricServer::new(GameVersion::parse("1.20.1").unwrap(), "0.15.11".to_string())
    }

    #[test]
    fn picks_first_stable_installer() {
        let builds: Vec<FabricInstallerBuild> = serde_json::from_str(
            r#"[{"version":"1.1.0","stable":false},{"version":"1.0.1","stable":true},{"version":"1.0.0","stable":true}]"#,
        )
        .unwrap();
        assert_eq!(pick_installer(&builds).unwrap().version, "1.0.1");

        let unstable: Vec<FabricInstallerBuild> =
            serde_json::from_str(r#"[{"version":"0.9.0","stable":false}]"#).unwrap();
        assert_eq!(pick_installer(&unstable).unwrap().version, "0.9.0");
        assert!(pick_installer(&[]).is_none());
    }

    #[tokio::test]
    async fn plan_install_and_launch() {
        let dir = tempfile::tempdir().unwrap();
        let remote = StaticRemote::new().with_text(
            "https://meta.fabricmc.net/v2/versions/installer",
            r#"[{"version":"1.0.1","stable":true}]"#,
        );
        let ctx = InstallContext {
            install_dir: dir.path(),
            remote: &remote,
            runner: &SystemRunner,
            java: Path::new("java"),
        };
        let f = fabric();

        let plan = f.plan_downloads(&ctx).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].file_name,
            "fabric-server-mc.1.20.1-loader.0.15.11-launcher.1.0.1.jar"
        );
        assert_eq!(
            plan[0].url,
            "https://meta.fabricmc.net/v2/versions/loader/1.20.1/0.15.11/1.0.1/server/jar"
        );

        f.install(&ctx).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(LAUNCHER_PROPERTIES)).unwrap(),
            "serverJar=minecraft_server.1.20.1.jar\n"
        );

        assert_eq!(f.launch_descriptor(dir.path()).jar, None);
        std::fs::write(dir.path().join(&plan[0].file_name), b"").unwrap();
        assert_eq!(
            f.launch_descriptor(dir.path()).jar.as_deref(),
            Some("fabric-server-mc.1.20.1-loader.0.15.11-launcher.1.0.1.jar")
        );
    }

    #[tokio::test]
    async fn unreachable_meta_is_a_loader_api_error() {
        let dir = tempfile::tempdir().unwrap();
        let remote = StaticRemote::new();
        let ctx = InstallContext {
            install_dir: dir.path(),
            remote: &remote,
            runner: &SystemRunner,
            java: Path::new("java"),
        };
        let err = fabric().plan_downloads(&ctx).await.unwrap_err();
        assert!(matches!(err, InstallerError::LoaderApi(_)));
    }
}
