// ─── Loader library lists ───
// Turns Forge-family version descriptors into library downloads, re-pointing
// each library at the first mirror that actually serves it.

use std::io::{Cursor, Read};

use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::http::Remote;
use crate::core::manifest::{Download, HashAlgorithm};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};

pub const LIBRARIES_DIR: &str = "libraries";

/// Libraries probed against the mirrors at the same time.
const PROBE_CONCURRENCY: usize = 8;

/// Legacy (pre-1.13) Forge `version.json`.
#[derive(Debug, Deserialize)]
pub struct LegacyVersionJson {
    #[serde(default)]
    pub libraries: Vec<LegacyLibrary>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyLibrary {
    pub name: String,
    /// Repository base; Mojang's library host when absent.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "hashes")]
    pub checksums: Vec<String>,
    #[serde(default)]
    pub natives: Option<serde_json::Value>,
}

/// ForgeGradle 3 style descriptor (`version.json`, `install_profile.json`).
#[derive(Debug, Deserialize)]
pub struct Fg3VersionJson {
    #[serde(default)]
    pub libraries: Vec<Fg3Library>,
}

#[derive(Debug, Deserialize)]
pub struct Fg3Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<Fg3Downloads>,
}

#[derive(Debug, Deserialize)]
pub struct Fg3Downloads {
    #[serde(default)]
    pub artifact: Option<Fg3Artifact>,
}

#[derive(Debug, Deserialize)]
pub struct Fg3Artifact {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sha1: String,
}

/// Read one entry of an in-memory zip/jar.
pub fn read_zip_entry(archive: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).ok()?;
    let mut entry = zip.by_name(name).ok()?;
    let mut out = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut out).ok()?;
    Some(out)
}

/// First `mirror + relative_path` answering a HEAD probe, else `fallback`.
pub async fn probe_mirrors(
    remote: &dyn Remote,
    mirrors: &[&str],
    relative_path: &str,
    fallback: &str,
) -> String {
    for mirror in mirrors {
        let candidate = format!("{}{}", mirror, relative_path);
        if remote.exists(&candidate).await {
            return candidate;
        }
    }
    debug!("No mirror serves {}, keeping {}", relative_path, fallback);
    fallback.to_string()
}

/// Drop planned libraries whose path would land outside the install root.
fn contained(downloads: Vec<Download>) -> Vec<Download> {
    downloads
        .into_iter()
        .filter(|d| {
            let ok = d.is_contained();
            if !ok {
                warn!("Skipping library {}: path leaves the install directory", d.full_relative_path());
            }
            ok
        })
        .collect()
}

/// Library downloads of a legacy descriptor.
///
/// The loader's own artifact and native-only entries are skipped.
pub async fn legacy_library_downloads(
    remote: &dyn Remote,
    json: &LegacyVersionJson,
    mirrors: &[&str],
) -> Vec<Download> {
    let planned = json.libraries.iter().filter_map(|lib| {
        if lib.natives.is_some() {
            return None;
        }
        let artifact = match MavenArtifact::parse(&lib.name) {
            Ok(a) => a,
            Err(e) => {
                warn!("Skipping library: {}", e);
                return None;
            }
        };
        if artifact.artifact_id == "forge" || artifact.artifact_id == "minecraftforge" {
            return None;
        }
        let base = lib.url.clone().unwrap_or_else(|| MOJANG_LIBRARIES.to_string());
        Some(async move {
            let url = probe_mirrors(remote, mirrors, &artifact.path(), &artifact.url(&base)).await;
            let (algorithm, hash) = match lib.checksums.first() {
                Some(h) if !h.is_empty() => (HashAlgorithm::Sha1, h.clone()),
                _ => (HashAlgorithm::None, String::new()),
            };
            Download::new(
                &format!("{}/{}", LIBRARIES_DIR, artifact.dir()),
                url,
                &artifact.file_name(),
                algorithm,
                hash,
            )
        })
    }).collect::<Vec<_>>();

    let downloads = stream::iter(planned)
        .buffered(PROBE_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;
    contained(downloads)
}

/// Library downloads of an FG3 descriptor. Entries without a URL are
/// produced by the installer itself and skipped.
pub async fn fg3_library_downloads(
    remote: &dyn Remote,
    json: &Fg3VersionJson,
    mirrors: &[&str],
) -> Vec<Download> {
    let planned = json.libraries.iter().filter_map(|lib| {
        let artifact = lib.downloads.as_ref()?.artifact.as_ref()?;
        if artifact.url.is_empty() || artifact.path.is_empty() {
            return None;
        }
        Some(async move {
            let url = probe_mirrors(remote, mirrors, &artifact.path, &artifact.url).await;
            let (dir, file) = match artifact.path.rsplit_once('/') {
                Some((dir, file)) => (format!("{}/{}", LIBRARIES_DIR, dir), file),
                None => (LIBRARIES_DIR.to_string(), artifact.path.as_str()),
            };
            let algorithm = if artifact.sha1.is_empty() {
                HashAlgorithm::None
            } else {
                HashAlgorithm::Sha1
            };
            Download::new(&dir, url, file, algorithm, artifact.sha1.clone())
        })
    }).collect::<Vec<_>>();

    let downloads = stream::iter(planned)
        .buffered(PROBE_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;
    contained(downloads)
}
