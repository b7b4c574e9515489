use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::manifest::api::DEFAULT_API_BASE;
use crate::core::manifest::VersionSelector;

/// Environment variable overriding the pack API base URL.
pub const API_URL_ENV: &str = "SERVERPACK_API_URL";

/// Everything one install run is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    pub pack_id: u64,
    pub version: VersionSelector,
    pub install_dir: PathBuf,
    /// Never ask; take every prompt's default.
    pub auto: bool,
    /// Parallel downloads.
    pub threads: usize,
    /// Re-verify files that did not change between versions.
    pub verify_integrity: bool,
    pub write_start_script: bool,
    /// Ignore the pack's Java runtime and use `java` from `PATH`.
    pub system_java: bool,
    pub api_base: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            pack_id: 0,
            version: VersionSelector::Latest,
            install_dir: PathBuf::from("."),
            auto: false,
            threads: default_threads(),
            verify_integrity: false,
            write_start_script: true,
            system_java: false,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl InstallOptions {
    /// `SERVERPACK_API_URL` when set and non-empty, else the public API.
    pub fn api_base_from_env() -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }
}

/// Twice the available parallelism.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(8)
}
