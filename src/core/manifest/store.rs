use std::path::{Path, PathBuf};

use tracing::debug;

use super::api::VersionInfo;
use super::model::Manifest;
use crate::core::error::{InstallerError, InstallerResult};

/// Name of the persisted manifest inside an install root.
pub const STATE_FILE: &str = "version.json";

pub fn state_path(install_root: &Path) -> PathBuf {
    install_root.join(STATE_FILE)
}

/// Whether `install_root` holds a previous install.
pub fn exists(install_root: &Path) -> bool {
    state_path(install_root).is_file()
}

/// Read the persisted raw body and rebuild the manifest it describes.
pub fn load(install_root: &Path) -> InstallerResult<Manifest> {
    let path = state_path(install_root);
    let raw = std::fs::read_to_string(&path).map_err(|e| InstallerError::io(&path, e))?;
    let info: VersionInfo = serde_json::from_str(&raw)?;
    debug!("Loaded previous manifest from {:?}", path);
    Ok(Manifest::from_version_info(&info))
}

/// Persist the raw body of a version fetch, byte for byte.
pub fn save(install_root: &Path, raw: &str) -> InstallerResult<()> {
    let path = state_path(install_root);
    std::fs::write(&path, raw).map_err(|e| InstallerError::io(&path, e))?;
    debug!("Saved manifest to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"id":12,"name":"1.2","parent":7,
        "files":[{"name":"a.jar","url":"https://cdn.test/a.jar","path":"./mods/","sha1":"AB12"},
                 {"name":"b.cfg","url":"https://cdn.test/b.cfg","path":"./config/"}],
        "targets":[{"name":"forge","version":"14.23.5.2860","type":"modloader"}]}"#;

    #[test]
    fn persisted_manifest_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!exists(dir.path()));

        save(dir.path(), BODY).unwrap();
        assert!(exists(dir.path()));
        assert_eq!(std::fs::read_to_string(state_path(dir.path())).unwrap(), BODY);

        let original = Manifest::from_version_info(&serde_json::from_str(BODY).unwrap());
        let reloaded = load(dir.path()).unwrap();
        assert!(reloaded.same_identity(&original));
        assert_eq!(reloaded.downloads, original.downloads);
        assert_eq!(reloaded.targets, original.targets);
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), "{not json").unwrap();
        assert!(matches!(load(dir.path()), Err(InstallerError::Json(_))));
    }
}
