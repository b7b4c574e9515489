// ─── Version File ───
// The parts of a Mojang version JSON a dedicated server needs.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VersionJson {
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub url: String,
}
