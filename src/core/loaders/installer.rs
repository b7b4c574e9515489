use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::manifest::{Download, Manifest, TargetKind};

use super::{
    context::InstallContext,
    fabric::FabricServer,
    forge::{ForgeInJar, ForgeInstaller, ForgeUniversal},
    neoforge::NeoForgeInstaller,
    vanilla::VanillaServer,
    version::{GameVersion, LoaderVersion},
};

/// How the server is started once installed: either `-jar {jar}` or a set
/// of `@argfile` JVM arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchDescriptor {
    pub jar: Option<String>,
    pub jvm_args: Vec<String>,
}

impl LaunchDescriptor {
    pub fn jar(name: impl Into<String>) -> Self {
        Self {
            jar: Some(name.into()),
            jvm_args: Vec::new(),
        }
    }

    pub fn args(jvm_args: Vec<String>) -> Self {
        Self { jar: None, jvm_args }
    }
}

#[async_trait]
pub trait LoaderStrategy: Send + Sync {
    /// Files the loader needs, relative to the install root.
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>>;

    /// Post-download step (merging jars, running the vendor installer, ...).
    async fn install(&self, ctx: &InstallContext<'_>) -> InstallerResult<()>;

    /// Inspect the installed tree and describe how to start the server.
    fn launch_descriptor(&self, install_dir: &Path) -> LaunchDescriptor;
}

/// Resolved loader strategy, one variant per installation method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLoader {
    Vanilla(VanillaServer),
    ForgeInJar(ForgeInJar),
    ForgeUniversal(ForgeUniversal),
    ForgeInstaller(ForgeInstaller),
    Fabric(FabricServer),
    NeoForge(NeoForgeInstaller),
}

impl ResolvedLoader {
    /// Pick the strategy for a manifest's game and loader targets.
    pub fn resolve(manifest: &Manifest) -> InstallerResult<Self> {
        let game_target = manifest.target(TargetKind::Game).ok_or_else(|| {
            InstallerError::Loader(format!("Version {} declares no game target", manifest.version_id))
        })?;
        let game = GameVersion::parse(&game_target.version)?;

        let Some(loader) = manifest.target(TargetKind::Loader) else {
            return Ok(Self::Vanilla(VanillaServer::new(game)));
        };

        let resolved = match loader.name.as_str() {
            "" | "vanilla" => Self::Vanilla(VanillaServer::new(game)),
            "forge" => {
                let version = LoaderVersion::parse(&loader.version, &game)?;
                Self::forge(game, version)
            }
            "neoforge" => {
                let version = LoaderVersion::parse(&loader.version, &game)?;
                Self::NeoForge(NeoForgeInstaller::new(game, version))
            }
            "fabric" => Self::Fabric(FabricServer::new(game, loader.version.clone())),
            other => {
                return Err(InstallerError::UnsupportedLoader {
                    name: other.to_string(),
                    version: loader.version.clone(),
                })
            }
        };

        info!("Resolved loader: {}", resolved.describe());
        Ok(resolved)
    }

    /// Forge changed its distribution twice: jar-patching up to 1.5, a
    /// universal jar until 1.12.2 build 2851, and an installer afterwards.
    fn forge(game: GameVersion, version: LoaderVersion) -> Self {
        if game.minor >= 13 || (game.minor == 12 && version.build >= 2851) {
            Self::ForgeInstaller(ForgeInstaller::new(game, version))
        } else if game.minor > 5 {
            Self::ForgeUniversal(ForgeUniversal::new(game, version))
        } else {
            Self::ForgeInJar(ForgeInJar::new(game, version))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Vanilla(s) => format!("vanilla {}", s.game),
            Self::ForgeInJar(s) => format!("forge {} (in-jar) for {}", s.version, s.game),
            Self::ForgeUniversal(s) => format!("forge {} (universal) for {}", s.version, s.game),
            Self::ForgeInstaller(s) => format!("forge {} (installer) for {}", s.version, s.game),
            Self::Fabric(s) => format!("fabric {} for {}", s.loader_version, s.game),
            Self::NeoForge(s) => format!("neoforge {} for {}", s.version, s.game),
        }
    }

    fn strategy(&self) -> &dyn LoaderStrategy {
        match self {
            Self::Vanilla(s) => s,
            Self::ForgeInJar(s) => s,
            Self::ForgeUniversal(s) => s,
            Self::ForgeInstaller(s) => s,
            Self::Fabric(s) => s,
            Self::NeoForge(s) => s,
        }
    }

    pub async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        self.strategy().plan_downloads(ctx).await
    }

    pub async fn install(&self, ctx: &InstallContext<'_>) -> InstallerResult<()> {
        self.strategy().install(ctx).await
    }

    pub fn launch_descriptor(&self, install_dir: &Path) -> LaunchDescriptor {
        self.strategy().launch_descriptor(install_dir)
    }
}

/// `@user_jvm_args.txt @libraries/.../{unix|win}_args.txt` when the modular
/// layout is present. The generated run scripts are removed in that case.
pub(crate) fn modular_launch(install_dir: &Path, args_dir: &str) -> Option<LaunchDescriptor> {
    if !install_dir.join("user_jvm_args.txt").exists() {
        return None;
    }
    for script in ["run.sh", "run.bat"] {
        let _ = std::fs::remove_file(install_dir.join(script));
    }
    let args_file = if cfg!(windows) { "win_args.txt" } else { "unix_args.txt" };
    Some(LaunchDescriptor::args(vec![
        "@user_jvm_args.txt".to_string(),
        format!("@{}/{}", args_dir, args_file),
    ]))
}

/// First candidate present in `install_dir`, else the first candidate.
pub(crate) fn first_existing(install_dir: &Path, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|c| install_dir.join(c.as_str()).is_file())
        .or_else(|| candidates.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::api::VersionInfo;

    fn manifest(game: &str, loader: Option<(&str, &str)>) -> Manifest {
        let mut targets = vec![format!(r#"{{"name":"minecraft","version":"{}","type":"game"}}"#, game)];
        if let Some((name, version)) = loader {
            targets.push(format!(
                r#"{{"name":"{}","version":"{}","type":"modloader"}}"#,
                name, version
            ));
        }
        let info: VersionInfo = serde_json::from_str(&format!(
            r#"{{"id":1,"parent":1,"files":[],"targets":[{}]}}"#,
            targets.join(",")
        ))
        .unwrap();
        Manifest::from_version_info(&info)
    }

    fn resolve(game: &str, loader: Option<(&str, &str)>) -> ResolvedLoader {
        ResolvedLoader::resolve(&manifest(game, loader)).unwrap()
    }

    #[test]
    fn forge_decision_table() {
        assert!(matches!(
            resolve("1.12.2", Some(("forge", "14.23.5.2851"))),
            ResolvedLoader::ForgeInstaller(_)
        ));
        assert!(matches!(
            resolve("1.12", Some(("forge", "1.12.2-14.23.5.2851"))),
            ResolvedLoader::ForgeInstaller(_)
        ));
        assert!(matches!(
            resolve("1.12.2", Some(("forge", "14.23.5.2850"))),
            ResolvedLoader::ForgeUniversal(_)
        ));
        assert!(matches!(
            resolve("1.16.5", Some(("forge", "36.2.39"))),
            ResolvedLoader::ForgeInstaller(_)
        ));
        assert!(matches!(
            resolve("1.7.10", Some(("forge", "10.13.4.1614"))),
            ResolvedLoader::ForgeUniversal(_)
        ));
        assert!(matches!(
            resolve("1.6.4", Some(("forge", "9.11.1.1345"))),
            ResolvedLoader::ForgeUniversal(_)
        ));
        assert!(matches!(
            resolve("1.5.2", Some(("forge", "7.8.1.738"))),
            ResolvedLoader::ForgeInJar(_)
        ));
    }

    #[test]
    fn other_loaders() {
        assert!(matches!(resolve("1.20.1", None), ResolvedLoader::Vanilla(_)));
        assert!(matches!(
            resolve("1.20.1", Some(("fabric", "0.15.11"))),
            ResolvedLoader::Fabric(_)
        ));
        assert!(matches!(
            resolve("1.20.4", Some(("neoforge", "20.4.80-beta"))),
            ResolvedLoader::NeoForge(_)
        ));
    }

    #[test]
    fn unknown_loader_is_unsupported() {
        let err = ResolvedLoader::resolve(&manifest("1.20.1", Some(("quilt", "0.26.0")))).unwrap_err();
        assert!(matches!(err, InstallerError::UnsupportedLoader { .. }));
    }

    #[test]
    fn malformed_versions_are_invalid() {
        let err = ResolvedLoader::resolve(&manifest("1", Some(("forge", "14.23.5.2860")))).unwrap_err();
        assert!(matches!(err, InstallerError::InvalidVersion { .. }));
        let err = ResolvedLoader::resolve(&manifest("1.12.2", Some(("forge", "14.23")))).unwrap_err();
        assert!(matches!(err, InstallerError::InvalidVersion { .. }));
    }

    #[test]
    fn modular_layout_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert!(modular_launch(dir.path(), "libraries/x").is_none());

        std::fs::write(dir.path().join("user_jvm_args.txt"), b"").unwrap();
        std::fs::write(dir.path().join("run.sh"), b"").unwrap();
        let d = modular_launch(dir.path(), "libraries/x").unwrap();
        assert_eq!(d.jar, None);
        assert_eq!(d.jvm_args[0], "@user_jvm_args.txt");
        assert!(d.jvm_args[1].starts_with("@libraries/x/"));
        assert!(!dir.path().join("run.sh").exists());
    }
}
