use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::http::{get_json, Remote};

use super::runtime::RuntimeError;

const ADOPTIUM_API_BASE: &str = "https://api.adoptium.net/v3/assets";

#[derive(Debug, Clone, Deserialize)]
pub struct AdoptiumRelease {
    #[serde(default)]
    pub binaries: Vec<AdoptiumBinary>,
    pub release_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdoptiumBinary {
    pub image_type: String,
    pub package: AdoptiumPackage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdoptiumPackage {
    pub checksum: String,
    pub link: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// How a runtime version string is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseQuery {
    /// Exact release, e.g. `17.0.2+8`.
    Semver(String),
    /// Newest GA build of a feature release, e.g. `17`.
    Feature(u32),
}

impl ReleaseQuery {
    /// `X.Y.Z` (optionally `+build`) is an exact release. Anything else is
    /// reduced to its feature number, reading `1.8.x` as 8.
    pub fn from_version(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (core, build) = match raw.split_once('+') {
            Some((core, build)) => (core, Some(build)),
            None => (raw, None),
        };
        let parts: Vec<&str> = core.split('.').collect();
        let numeric = |s: &&str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

        let build_ok = build.map_or(true, |b| numeric(&b));
        if parts.len() == 3 && parts.iter().all(numeric) && build_ok {
            return Some(Self::Semver(raw.to_string()));
        }

        let mut numbers = parts.iter().map_while(|p| p.parse::<u32>().ok());
        let first = numbers.next()?;
        if first == 1 {
            numbers.next().map(Self::Feature)
        } else {
            Some(Self::Feature(first))
        }
    }

    fn path(&self) -> String {
        match self {
            Self::Semver(v) => format!("version/{}", v.replace('+', "%2B")),
            Self::Feature(major) => format!("feature_releases/{}/ga", major),
        }
    }
}

/// Platform names as Adoptium spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => "windows",
            "macos" => "mac",
            _ => "linux",
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" => "aarch64",
            "x86" => "x86",
            _ => "x64",
        };
        Self { os, arch }
    }

    fn is_apple_silicon(&self) -> bool {
        self.os == "mac" && self.arch == "aarch64"
    }
}

pub fn release_url(query: &ReleaseQuery, platform: Platform, jre: bool) -> String {
    format!(
        "{}/{}?project=jdk&image_type={}&vendor=eclipse&jvm_impl=hotspot&heap_size=normal&architecture={}&os={}",
        ADOPTIUM_API_BASE,
        query.path(),
        if jre { "jre" } else { "jdk" },
        platform.arch,
        platform.os
    )
}

/// Find a release with at least one binary.
///
/// Apple silicon retries as x64 first; then a missing JRE falls back to a JDK.
pub async fn find_release(
    remote: &dyn Remote,
    query: &ReleaseQuery,
    platform: Platform,
) -> Result<AdoptiumRelease, RuntimeError> {
    let mut attempts = Vec::with_capacity(4);
    for jre in [true, false] {
        attempts.push((platform, jre));
        if platform.is_apple_silicon() {
            attempts.push((Platform { arch: "x64", ..platform }, jre));
        }
    }

    let mut last = None;
    for (platform, jre) in attempts {
        let url = release_url(query, platform, jre);
        debug!("Querying Adoptium {}", url);
        match get_json::<Vec<AdoptiumRelease>>(remote, &url).await {
            Ok(releases) => {
                if let Some(release) = releases.into_iter().find(|r| !r.binaries.is_empty()) {
                    return Ok(release);
                }
                last = Some(format!("no binaries at {}", url));
            }
            Err(e) => {
                warn!("Adoptium query failed ({}): {}", url, e);
                last = Some(e.to_string());
            }
        }
    }
    Err(RuntimeError::InvalidRuntime(format!(
        "no Adoptium release for {:?}: {}",
        query,
        last.unwrap_or_default()
    )))
}
