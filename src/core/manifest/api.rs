use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::Remote;

pub const DEFAULT_API_BASE: &str = "https://api.modpacks.ch/public/modpack/";

// ── Wire types ──────────────────────────────────────────

/// `status`/`message` envelope present on every API response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiStatus {
    pub fn check(&self) -> InstallerResult<()> {
        if self.status.as_deref() == Some("error") {
            return Err(InstallerError::Api(
                self.message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }
}

/// Heap sizes in MiB suggested by the pack author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Specs {
    #[serde(default)]
    pub minimum: u32,
    #[serde(default)]
    pub recommended: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Modpack {
    #[serde(flatten)]
    pub status: ApiStatus,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub versions: Vec<VersionSummary>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionSummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub updated: i64,
    #[serde(default)]
    pub specs: Specs,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionInfo {
    #[serde(flatten)]
    pub status: ApiStatus,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent: u64,
    #[serde(default)]
    pub specs: Specs,
    #[serde(default)]
    pub files: Vec<PackFile>,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackFile {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, alias = "clientOnly")]
    pub clientonly: bool,
    #[serde(default, alias = "serverOnly")]
    pub serveronly: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub sha1: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Target {
    pub name: String,
    #[serde(alias = "Version")]
    pub version: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// A fetched version together with the exact body the server returned.
///
/// The raw body is what gets persisted as `version.json`.
#[derive(Debug, Clone)]
pub struct FetchedVersion {
    pub info: VersionInfo,
    pub raw: String,
}

// ── Client ──────────────────────────────────────────────

/// Which version of a pack to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSelector {
    #[default]
    Latest,
    Id(u64),
}

pub struct PackApi<'a> {
    remote: &'a dyn Remote,
    base: String,
}

impl<'a> PackApi<'a> {
    pub fn new(remote: &'a dyn Remote, base: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { remote, base }
    }

    pub async fn modpack(&self, pack_id: u64) -> InstallerResult<Modpack> {
        let url = format!("{}{}", self.base, pack_id);
        debug!("Fetching pack metadata: {}", url);
        let bytes = self.remote.get_bytes(&url).await?;
        let pack: Modpack = serde_json::from_slice(&bytes)?;
        pack.status.check()?;
        Ok(pack)
    }

    /// Resolve `selector` against the pack's version list and fetch the full
    /// version document.
    pub async fn version(
        &self,
        pack: &Modpack,
        selector: VersionSelector,
    ) -> InstallerResult<FetchedVersion> {
        let version_id = select_version(pack, selector)?;
        let url = format!("{}{}/{}", self.base, pack.id, version_id);
        info!("Fetching {} version {}", pack.name, version_id);

        let bytes = self.remote.get_bytes(&url).await?;
        let raw = String::from_utf8(bytes)
            .map_err(|e| InstallerError::Api(format!("Version body is not UTF-8: {}", e)))?;
        let info: VersionInfo = serde_json::from_str(&raw)?;
        info.status.check()?;

        Ok(FetchedVersion { info, raw })
    }
}

/// `Latest` picks the highest version id; an explicit id must exist.
pub fn select_version(pack: &Modpack, selector: VersionSelector) -> InstallerResult<u64> {
    match selector {
        VersionSelector::Latest => pack
            .versions
            .iter()
            .map(|v| v.id)
            .max()
            .ok_or_else(|| InstallerError::Api(format!("Pack {} has no versions", pack.id))),
        VersionSelector::Id(id) => {
            if pack.versions.iter().any(|v| v.id == id) {
                Ok(id)
            } else {
                Err(InstallerError::Api(format!(
                    "Version {} does not exist for pack {}",
                    id, pack.id
                )))
            }
        }
    }
}
