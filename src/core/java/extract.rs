use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use super::runtime::RuntimeError;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> RuntimeError + '_ {
    move |source| RuntimeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Unpack a zip into `dest`, keeping its directory layout.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), RuntimeError> {
    let zip_file = File::open(zip_path).map_err(io_err(zip_path))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;
    std::fs::create_dir_all(dest).map_err(io_err(dest))?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let Some(rel_path) = zipped.enclosed_name() else {
            return Err(RuntimeError::InvalidRuntime(format!(
                "unsafe zip entry path {}",
                zipped.name()
            )));
        };

        let out_path = dest.join(rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(io_err(&out_path))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut out = File::create(&out_path).map_err(io_err(&out_path))?;
        std::io::copy(&mut zipped, &mut out).map_err(io_err(&out_path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = zipped.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }
    debug!("Extracted {} entries from {:?}", archive.len(), zip_path);
    Ok(())
}

/// Unpack a gzip-compressed tarball into `dest`.
pub fn extract_tar_gz(tar_path: &Path, dest: &Path) -> Result<(), RuntimeError> {
    let file = File::open(tar_path).map_err(io_err(tar_path))?;
    std::fs::create_dir_all(dest).map_err(io_err(dest))?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let entries = archive.entries().map_err(io_err(tar_path))?;
    for entry in entries {
        let mut entry = entry.map_err(io_err(tar_path))?;
        // unpack_in refuses paths that escape `dest`.
        entry.unpack_in(dest).map_err(io_err(dest))?;
    }
    debug!("Extracted {:?}", tar_path);
    Ok(())
}

pub fn make_executable(path: &Path) -> Result<(), RuntimeError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).map_err(io_err(path))?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(io_err(path))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
