use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::error::InstallerError;
use crate::core::http::Remote;
use crate::core::loaders::process::system_java;
use crate::core::manifest::{DependencyTarget, Download, HashAlgorithm};

use super::adoptium::{find_release, AdoptiumBinary, Platform, ReleaseQuery};
use super::extract::{extract_tar_gz, extract_zip, make_executable};

const JRE_DIR: &str = "jre";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid runtime: {0}")]
    InvalidRuntime(String),
}

impl From<RuntimeError> for InstallerError {
    fn from(value: RuntimeError) -> Self {
        match value {
            RuntimeError::Io { path, source } => InstallerError::Io { path, source },
            RuntimeError::Zip(source) => InstallerError::Zip(source),
            RuntimeError::InvalidRuntime(message) => InstallerError::Runtime(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

/// A pinned Adoptium build to unpack under `jre/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedJre {
    pub release_name: String,
    pub image_type: String,
    pub link: String,
    pub checksum: String,
    pub archive: ArchiveKind,
}

impl ManagedJre {
    fn from_binary(release_name: &str, binary: &AdoptiumBinary) -> Result<Self, RuntimeError> {
        let archive = ArchiveKind::from_name(&binary.package.name).ok_or_else(|| {
            RuntimeError::InvalidRuntime(format!(
                "unknown archive format {}",
                binary.package.name
            ))
        })?;
        reqwest::Url::parse(&binary.package.link).map_err(|e| {
            RuntimeError::InvalidRuntime(format!("bad link {}: {}", binary.package.link, e))
        })?;

        Ok(Self {
            release_name: release_name.to_string(),
            image_type: binary.image_type.clone(),
            link: binary.package.link.clone(),
            checksum: binary.package.checksum.clone(),
            archive,
        })
    }

    fn archive_name(&self) -> String {
        format!("jre.{}", self.archive.extension())
    }

    fn home(&self) -> PathBuf {
        Path::new(JRE_DIR).join(format!("{}-{}", self.release_name, self.image_type))
    }
}

/// Where the `java` used for installers and the launch script comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JavaProvider {
    /// `java` on `PATH`.
    #[default]
    System,
    Adoptium(ManagedJre),
}

impl JavaProvider {
    /// Pick a provider for the manifest's runtime target.
    ///
    /// Lookup failures are logged and fall back to the system Java.
    pub async fn resolve(
        remote: &dyn Remote,
        target: Option<&DependencyTarget>,
        use_system: bool,
    ) -> Self {
        let Some(target) = target else {
            return Self::System;
        };
        if use_system {
            info!("Using system Java instead of {} {}", target.name, target.version);
            return Self::System;
        }
        let Some(query) = ReleaseQuery::from_version(&target.version) else {
            warn!("Unrecognised Java version {:?}, using system Java", target.version);
            return Self::System;
        };

        let resolved = match find_release(remote, &query, Platform::current()).await {
            Ok(release) => match release.binaries.first() {
                Some(binary) => ManagedJre::from_binary(&release.release_name, binary),
                None => Err(RuntimeError::InvalidRuntime("release without binaries".into())),
            },
            Err(e) => Err(e),
        };

        match resolved {
            Ok(jre) => {
                info!("Using Adoptium {} ({})", jre.release_name, jre.image_type);
                Self::Adoptium(jre)
            }
            Err(e) => {
                warn!("No Java runtime for {}: {}, using system Java", target.version, e);
                Self::System
            }
        }
    }

    pub fn plan_downloads(&self) -> Vec<Download> {
        match self {
            Self::System => Vec::new(),
            Self::Adoptium(jre) => vec![Download::new(
                JRE_DIR,
                jre.link.clone(),
                &jre.archive_name(),
                HashAlgorithm::Sha256,
                jre.checksum.clone(),
            )],
        }
    }

    /// Unpack the downloaded archive and remove it.
    pub fn install(&self, install_dir: &Path) -> Result<(), RuntimeError> {
        let Self::Adoptium(jre) = self else {
            return Ok(());
        };
        let dest = install_dir.join(JRE_DIR);
        let archive = dest.join(jre.archive_name());
        info!("Extracting {:?}", archive);

        match jre.archive {
            ArchiveKind::Zip => extract_zip(&archive, &dest)?,
            ArchiveKind::TarGz => extract_tar_gz(&archive, &dest)?,
        }
        std::fs::remove_file(&archive).map_err(|source| RuntimeError::Io {
            path: archive.clone(),
            source,
        })?;

        let java = self.java_path(install_dir);
        if !java.exists() {
            return Err(RuntimeError::InvalidRuntime(format!(
                "{:?} missing after extraction",
                java
            )));
        }
        make_executable(&java)
    }

    /// `java` relative to the install directory, or the bare command.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::System => system_java(),
            Self::Adoptium(jre) => {
                let bin = if cfg!(target_os = "macos") {
                    jre.home().join("Contents").join("Home").join("bin")
                } else {
                    jre.home().join("bin")
                };
                bin.join(system_java())
            }
        }
    }

    pub fn java_path(&self, install_dir: &Path) -> PathBuf {
        match self {
            Self::System => system_java(),
            Self::Adoptium(_) => install_dir.join(self.relative_path()),
        }
    }
}
