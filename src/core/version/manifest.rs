// ─── Version Manifest ───
// Fetches the Mojang version manifest v2 and looks up server jars.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::{get_json, Remote};
use crate::core::manifest::{Download, HashAlgorithm};

use super::version_file::VersionJson;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level Mojang version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type", default)]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(remote: &dyn Remote) -> InstallerResult<Self> {
        info!("Fetching Minecraft version manifest...");
        let manifest: VersionManifest = get_json(remote, VERSION_MANIFEST_URL).await?;
        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

/// File name the dedicated server jar of `game_version` is stored under.
pub fn server_jar_name(game_version: &str) -> String {
    format!("minecraft_server.{}.jar", game_version)
}

/// Resolve the dedicated server jar of `game_version` into a download placed
/// at the install root.
pub async fn server_download(remote: &dyn Remote, game_version: &str) -> InstallerResult<Download> {
    let manifest = VersionManifest::fetch(remote).await?;
    let entry = manifest.find_version(game_version).ok_or_else(|| {
        InstallerError::Loader(format!("Minecraft {} not found in version manifest", game_version))
    })?;

    let version: VersionJson = get_json(remote, &entry.url).await?;
    let server = version
        .downloads
        .and_then(|d| d.server)
        .ok_or_else(|| {
            InstallerError::Loader(format!("Minecraft {} has no server download", game_version))
        })?;

    Ok(Download::new(
        "",
        server.url,
        &server_jar_name(game_version),
        HashAlgorithm::Sha1,
        server.sha1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::StaticRemote;

    #[test]
    fn deserialize_manifest_entry() {
        let json = r#"{
            "id": "1.20.4",
            "type": "release",
            "url": "https://example.com/1.20.4.json",
            "sha1": "abc123"
        }"#;
        let entry: VersionEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "1.20.4");
        assert_eq!(entry.version_type, "release");
    }

    #[tokio::test]
    async fn resolves_server_jar() {
        let remote = StaticRemote::new()
            .with_text(
                VERSION_MANIFEST_URL,
                r#"{"versions":[{"id":"1.12.2","type":"release","url":"https://meta.test/1.12.2.json"}]}"#,
            )
            .with_text(
                "https://meta.test/1.12.2.json",
                r#"{"id":"1.12.2","downloads":{"server":{"sha1":"abc","size":1,"url":"https://launcher.test/server.jar"}}}"#,
            );

        let d = server_download(&remote, "1.12.2").await.unwrap();
        assert_eq!(d.full_relative_path(), "minecraft_server.1.12.2.jar");
        assert_eq!(d.url, "https://launcher.test/server.jar");
        assert_eq!(d.hash_algorithm, HashAlgorithm::Sha1);

        assert!(server_download(&remote, "1.99").await.is_err());
    }
}
