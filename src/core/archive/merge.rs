use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::core::error::{InstallerError, InstallerResult};

const SERVICES_PREFIX: &str = "META-INF/services/";
const MANIFEST: &str = "META-INF/MANIFEST.MF";
const FABRIC_SERVER_LAUNCHER: &str = "net.fabricmc.loader.launch.server.FabricServerLauncher";

/// Merge `archives` into a single zip at `destination`.
///
/// Earlier archives take priority: an entry path is written once, from the
/// first archive that has it. Service registrations under
/// `META-INF/services/` are concatenated across all archives instead, the
/// last archive's lines first. With a
/// `main_class`, source manifests are dropped and a launcher manifest plus
/// `fabric-server-launch.properties` are written.
pub fn merge_archives(
    archives: &[PathBuf],
    destination: &Path,
    delete_sources: bool,
    main_class: Option<&str>,
) -> InstallerResult<()> {
    let main_class = main_class.filter(|m| !m.is_empty());
    let out = File::create(destination).map_err(|e| InstallerError::io(destination, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    let options = SimpleFileOptions::default();

    let mut stored: HashSet<String> = HashSet::new();
    // One chunk of lines per archive, in input order.
    let mut services: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();

    for path in archives {
        let mut archive = match File::open(path).map(ZipArchive::new) {
            Ok(Ok(archive)) => archive,
            Ok(Err(e)) => {
                warn!("Skipping {:?} while merging into {:?}: {}", path, destination, e);
                continue;
            }
            Err(e) => {
                warn!("Skipping {:?} while merging into {:?}: {}", path, destination, e);
                continue;
            }
        };

        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Unreadable entry #{} in {:?}: {}", index, path, e);
                    continue;
                }
            };
            let name = entry.name().to_string();

            if name.starts_with(SERVICES_PREFIX) && !name.ends_with('/') {
                let mut lines = Vec::new();
                for line in BufReader::new(&mut entry).lines() {
                    let Ok(line) = line else { break };
                    let line = line.split('#').next().unwrap_or("").trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                services.entry(name).or_default().push(lines);
                continue;
            }
            if main_class.is_some() && name == MANIFEST {
                continue;
            }
            if !stored.insert(name.clone()) {
                continue;
            }

            if entry.is_dir() {
                writer.add_directory(name.trim_end_matches('/'), options)?;
            } else {
                writer.start_file(name.as_str(), options)?;
                std::io::copy(&mut entry, &mut writer)
                    .map_err(|e| InstallerError::io(destination, e))?;
            }
        }
        debug!("Merged {:?}", path);

        if delete_sources {
            remove_with_empty_parent(path);
        }
    }

    for (name, chunks) in &services {
        writer.start_file(name.as_str(), options)?;
        let mut body = String::new();
        for line in chunks.iter().rev().flatten() {
            body.push_str(line);
            body.push('\n');
        }
        writer
            .write_all(body.as_bytes())
            .map_err(|e| InstallerError::io(destination, e))?;
    }

    if let Some(main_class) = main_class {
        writer.start_file(MANIFEST, options)?;
        writer
            .write_all(
                format!(
                    "Manifest-Version: 1.0\nMain-Class: {}\n",
                    FABRIC_SERVER_LAUNCHER
                )
                .as_bytes(),
            )
            .map_err(|e| InstallerError::io(destination, e))?;

        writer.start_file("fabric-server-launch.properties", options)?;
        writer
            .write_all(format!("launch.mainClass={}\n", main_class).as_bytes())
            .map_err(|e| InstallerError::io(destination, e))?;
    }

    let mut inner = writer.finish()?;
    inner.flush().map_err(|e| InstallerError::io(destination, e))?;
    Ok(())
}

fn remove_with_empty_parent(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Failed to remove merged source {:?}: {}", path, e);
        return;
    }
    if let Some(parent) = path.parent() {
        let empty = std::fs::read_dir(parent)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if empty {
            let _ = std::fs::remove_dir(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn read_entry(path: &Path, name: &str) -> Option<String> {
        let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = zip.by_name(name).ok()?;
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        Some(out)
    }

    #[test]
    fn earlier_archives_win_and_services_are_concatenated() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jar");
        let b = dir.path().join("b.jar");
        make_zip(
            &a,
            &[
                ("shared.txt", "from a"),
                ("META-INF/services/x.Provider", "# header\ncom.a.Impl  # trailing\n\n"),
                ("META-INF/MANIFEST.MF", "Main-Class: a.Main\n"),
            ],
        );
        make_zip(
            &b,
            &[
                ("shared.txt", "from b"),
                ("only_b.txt", "b"),
                ("META-INF/services/x.Provider", "com.b.Impl\n"),
            ],
        );

        let dest = dir.path().join("merged.jar");
        merge_archives(&[a.clone(), b.clone()], &dest, false, None).unwrap();

        assert_eq!(read_entry(&dest, "shared.txt").as_deref(), Some("from a"));
        assert_eq!(read_entry(&dest, "only_b.txt").as_deref(), Some("b"));
        assert_eq!(
            read_entry(&dest, "META-INF/services/x.Provider").as_deref(),
            Some("com.b.Impl\ncom.a.Impl\n")
        );
        assert_eq!(
            read_entry(&dest, "META-INF/MANIFEST.MF").as_deref(),
            Some("Main-Class: a.Main\n")
        );
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn main_class_replaces_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jar");
        make_zip(&a, &[("META-INF/MANIFEST.MF", "Main-Class: a.Main\n")]);

        let dest = dir.path().join("server.jar");
        merge_archives(&[a], &dest, false, Some("net.fabricmc.loader.launch.knot.KnotServer")).unwrap();

        let manifest = read_entry(&dest, "META-INF/MANIFEST.MF").unwrap();
        assert!(manifest.contains("Main-Class: net.fabricmc.loader.launch.server.FabricServerLauncher"));
        assert_eq!(
            read_entry(&dest, "fabric-server-launch.properties").as_deref(),
            Some("launch.mainClass=net.fabricmc.loader.launch.knot.KnotServer\n")
        );
    }

    #[test]
    fn delete_sources_prunes_empty_parent() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staging");
        std::fs::create_dir_all(&staged).unwrap();
        let a = staged.join("a.jar");
        make_zip(&a, &[("x.txt", "x")]);
        let missing = dir.path().join("missing.jar");

        let dest = dir.path().join("merged.jar");
        merge_archives(&[missing, a.clone()], &dest, true, None).unwrap();

        assert!(!a.exists());
        assert!(!staged.exists());
        assert_eq!(read_entry(&dest, "x.txt").as_deref(), Some("x"));
    }
}
