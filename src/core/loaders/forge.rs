use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::archive::merge_archives;
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::manifest::Download;
use crate::core::maven::FORGE_MIRRORS;
use crate::core::version::{server_download, server_jar_name};

use super::context::InstallContext;
use super::installer::{first_existing, modular_launch, LaunchDescriptor, LoaderStrategy};
use super::libraries::{
    fg3_library_downloads, legacy_library_downloads, read_zip_entry, Fg3VersionJson,
    LegacyVersionJson,
};
use super::process::run_installer;
use super::vanilla::optional_server_download;
use super::version::{GameVersion, LoaderVersion};

const FORGE_VERSIONS: &str = "https://apps.modpacks.ch/versions/net/minecraftforge/forge";
const FML_LIBS: &str = "https://files.minecraftforge.net/fmllibs/";
const INSTMODS_DIR: &str = "instmods";
const FML_LIB_DIR: &str = "lib";

/// `{game}-{loader}`, the id Forge uses in artifact paths.
fn forge_id(game: &GameVersion, version: &LoaderVersion) -> String {
    format!("{}-{}", game.raw, version.raw)
}

fn forge_url(id: &str, file: &str) -> String {
    format!("{}/{}/{}", FORGE_VERSIONS, id, file)
}

/// Remote `forge-{id}.json`, falling back to `version.json` inside the given
/// jar (fetched only when the remote descriptor is missing).
async fn fetch_version_json(ctx: &InstallContext<'_>, id: &str, jar_url: &str) -> Option<Vec<u8>> {
    let json_url = forge_url(id, &format!("forge-{}.json", id));
    match ctx.remote.get_bytes(&json_url).await {
        Ok(bytes) => return Some(bytes),
        Err(e) => debug!("{} unavailable ({}), reading version.json from {}", json_url, e, jar_url),
    }

    match ctx.remote.get_bytes(jar_url).await {
        Ok(jar) => read_zip_entry(&jar, "version.json"),
        Err(e) => {
            warn!("Unable to fetch {}: {}", jar_url, e);
            None
        }
    }
}

// ── Universal (1.6 – 1.12.2 build < 2851) ───────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeUniversal {
    pub game: GameVersion,
    pub version: LoaderVersion,
}

impl ForgeUniversal {
    pub fn new(game: GameVersion, version: LoaderVersion) -> Self {
        Self { game, version }
    }

    fn id(&self) -> String {
        forge_id(&self.game, &self.version)
    }
}

#[async_trait]
impl LoaderStrategy for ForgeUniversal {
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        info!("Getting downloads for Forge universal {}", self.id());
        let id = self.id();
        let universal_name = format!("forge-{}-universal.jar", id);
        let universal_url = forge_url(&id, &universal_name);

        let raw = fetch_version_json(ctx, &id, &universal_url)
            .await
            .ok_or_else(|| {
                InstallerError::Loader(format!("No library list available for Forge {}", id))
            })?;
        let json: LegacyVersionJson = serde_json::from_slice(&raw)?;

        let mut downloads = vec![Download::unverified("", universal_url, &universal_name)];
        downloads.extend(legacy_library_downloads(ctx.remote, &json, &FORGE_MIRRORS).await);
        downloads.extend(optional_server_download(ctx, &self.game).await);
        Ok(downloads)
    }

    async fn install(&self, _ctx: &InstallContext<'_>) -> InstallerResult<()> {
        Ok(())
    }

    fn launch_descriptor(&self, install_dir: &Path) -> LaunchDescriptor {
        let id = self.id();
        let jar = first_existing(
            install_dir,
            &[format!("forge-{}.jar", id), format!("forge-{}-universal.jar", id)],
        );
        LaunchDescriptor {
            jar,
            jvm_args: Vec::new(),
        }
    }
}

// ── Installer (1.12.2 build ≥ 2851 and 1.13+) ───────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeInstaller {
    pub game: GameVersion,
    pub version: LoaderVersion,
}

impl ForgeInstaller {
    pub fn new(game: GameVersion, version: LoaderVersion) -> Self {
        Self { game, version }
    }

    fn id(&self) -> String {
        forge_id(&self.game, &self.version)
    }

    fn installer_name(&self) -> String {
        format!("forge-{}-installer.jar", self.id())
    }
}

#[async_trait]
impl LoaderStrategy for ForgeInstaller {
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        info!("Getting downloads for Forge installer {}", self.id());
        let id = self.id();
        let installer_name = self.installer_name();
        let installer_url = forge_url(&id, &installer_name);

        let mut downloads = vec![Download::unverified("", installer_url.clone(), &installer_name)];

        match fetch_version_json(ctx, &id, &installer_url).await {
            Some(raw) => match serde_json::from_slice::<Fg3VersionJson>(&raw) {
                Ok(json) => {
                    downloads.extend(fg3_library_downloads(ctx.remote, &json, &FORGE_MIRRORS).await)
                }
                Err(e) => warn!("Unreadable Forge {} version.json, installer will fetch libraries: {}", id, e),
            },
            None => warn!("No library list for Forge {}, installer will fetch libraries", id),
        }

        downloads.extend(optional_server_download(ctx, &self.game).await);
        Ok(downloads)
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> InstallerResult<()> {
        info!("Running Forge installer for {}", self.id());
        run_installer(ctx.runner, ctx.java, ctx.install_dir, &self.installer_name())
    }

    fn launch_descriptor(&self, install_dir: &Path) -> LaunchDescriptor {
        let id = self.id();
        if let Some(modular) =
            modular_launch(install_dir, &format!("libraries/net/minecraftforge/forge/{}", id))
        {
            return modular;
        }
        let jar = first_existing(
            install_dir,
            &[format!("forge-{}.jar", id), format!("forge-{}-universal.jar", id)],
        );
        LaunchDescriptor {
            jar,
            jvm_args: Vec::new(),
        }
    }
}

// ── In-jar (1.5.2 and older) ────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeInJar {
    pub game: GameVersion,
    pub version: LoaderVersion,
}

impl ForgeInJar {
    pub fn new(game: GameVersion, version: LoaderVersion) -> Self {
        Self { game, version }
    }

    fn id(&self) -> String {
        forge_id(&self.game, &self.version)
    }

    fn loader_zip_name(&self) -> String {
        format!("forge-{}-universal.zip", self.id())
    }

    fn merged_jar_name(&self) -> String {
        format!("forge-{}.jar", self.id())
    }
}

/// Libraries FML downloads on first start for these old releases.
pub fn fml_libraries(game: &str) -> Vec<String> {
    match game {
        "1.5" | "1.5.1" | "1.5.2" => vec![
            "argo-small-3.2.jar".to_string(),
            "guava-14.0-rc3.jar".to_string(),
            "asm-all-4.1.jar".to_string(),
            "bcprov-jdk15on-148.jar".to_string(),
            format!("deobfuscation_data_{}.zip", game),
            "scala-library.jar".to_string(),
        ],
        "1.4" | "1.4.1" | "1.4.2" | "1.4.3" | "1.4.4" | "1.4.5" | "1.4.6" | "1.4.7" => vec![
            "argo-2.25.jar".to_string(),
            "guava-12.0.1.jar".to_string(),
            "asm-all-4.0.jar".to_string(),
            "bcprov-jdk15on-147.jar".to_string(),
        ],
        _ => Vec::new(),
    }
}

#[async_trait]
impl LoaderStrategy for ForgeInJar {
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        info!("Getting downloads for Forge in-jar {}", self.id());
        let id = self.id();
        let zip_name = self.loader_zip_name();

        let mut downloads = vec![
            server_download(ctx.remote, &self.game.raw).await?,
            Download::unverified("", forge_url(&id, &zip_name), &zip_name),
        ];
        downloads.extend(fml_libraries(&self.game.raw).into_iter().map(|lib| {
            Download::unverified(FML_LIB_DIR, format!("{}{}", FML_LIBS, lib), &lib)
        }));
        Ok(downloads)
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> InstallerResult<()> {
        let dir = ctx.install_dir;
        let mut archives = installed_mods(&dir.join(INSTMODS_DIR))?;
        archives.push(dir.join(self.loader_zip_name()));
        archives.push(dir.join(server_jar_name(&self.game.raw)));

        info!(
            "Merging {} archives into {}",
            archives.len(),
            self.merged_jar_name()
        );
        merge_archives(&archives, &dir.join(self.merged_jar_name()), false, None)
    }

    fn launch_descriptor(&self, _install_dir: &Path) -> LaunchDescriptor {
        LaunchDescriptor::jar(self.merged_jar_name())
    }
}

/// `*.jar` and `*.zip` under `instmods/`, sorted by name. Missing dir is empty.
fn installed_mods(dir: &Path) -> InstallerResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(InstallerError::io(dir, e)),
    };

    let mut mods: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
                Some("jar") | Some("zip")
            )
        })
        .collect();
    mods.sort();
    Ok(mods)
}
