use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::api::{Specs, VersionInfo};
use super::download::{Download, HashAlgorithm};

/// Kind of external dependency a pack version declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Game,
    Loader,
    Runtime,
}

impl TargetKind {
    /// Maps the API's `type` field. Unknown kinds are ignored by the caller.
    pub fn from_api(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "game" => Some(TargetKind::Game),
            "modloader" => Some(TargetKind::Loader),
            "runtime" => Some(TargetKind::Runtime),
            _ => None,
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Game => write!(f, "game"),
            TargetKind::Loader => write!(f, "modloader"),
            TargetKind::Runtime => write!(f, "runtime"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTarget {
    pub name: String,
    pub version: String,
}

/// A pack version reduced to what an install needs: the server-side file plan
/// and its dependency targets.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub pack_id: u64,
    pub version_id: u64,
    pub parent_pack_id: u64,
    pub name: String,
    pub specs: Specs,
    pub downloads: Vec<Download>,
    pub targets: BTreeMap<TargetKind, DependencyTarget>,
}

impl Manifest {
    /// Build the server-side plan of `info`.
    ///
    /// Client-only files, files whose URL does not parse and files whose path
    /// leaves the install directory are skipped.
    /// When two files map to the same relative path the first one is kept.
    pub fn from_version_info(info: &VersionInfo) -> Self {
        let mut downloads = Vec::with_capacity(info.files.len());
        let mut seen = HashSet::new();

        for file in &info.files {
            if file.clientonly {
                continue;
            }
            if reqwest::Url::parse(&file.url).is_err() {
                warn!("Skipping {}: invalid url {:?}", file.name, file.url);
                continue;
            }

            let (algorithm, hash) = if file.sha1.trim().is_empty() {
                (HashAlgorithm::None, String::new())
            } else {
                (HashAlgorithm::Sha1, file.sha1.clone())
            };
            let download = Download::new(&file.path, file.url.clone(), &file.name, algorithm, hash);
            if !download.is_contained() {
                warn!(
                    "Skipping {}: path leaves the install directory",
                    download.full_relative_path()
                );
                continue;
            }

            if !seen.insert(download.full_relative_path().to_string()) {
                warn!(
                    "Duplicate file {} in version {}, keeping the first entry",
                    download.full_relative_path(),
                    info.id
                );
                continue;
            }
            downloads.push(download);
        }

        let mut targets = BTreeMap::new();
        for target in &info.targets {
            if let Some(kind) = TargetKind::from_api(&target.kind) {
                targets.entry(kind).or_insert_with(|| DependencyTarget {
                    name: target.name.to_ascii_lowercase(),
                    version: target.version.trim().to_string(),
                });
            }
        }

        Self {
            pack_id: info.parent,
            version_id: info.id,
            parent_pack_id: info.parent,
            name: info.name.clone(),
            specs: info.specs,
            downloads,
            targets,
        }
    }

    pub fn target(&self, kind: TargetKind) -> Option<&DependencyTarget> {
        self.targets.get(&kind)
    }

    /// Whether `other` describes the same pack and version.
    pub fn same_identity(&self, other: &Manifest) -> bool {
        self.pack_id == other.pack_id && self.version_id == other.version_id
    }
}
