use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::manifest::Download;

/// Delete the files of `entries` under `install_root`.
///
/// Missing files count as deleted. Returns how many entries are gone.
pub fn delete_files(install_root: &Path, entries: &[Download]) -> usize {
    let mut removed = 0;
    for entry in entries {
        if !entry.is_contained() {
            warn!("Not deleting {}: outside the install directory", entry.full_relative_path());
            continue;
        }
        let path = entry.local_path(install_root);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted {}", entry.full_relative_path());
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => removed += 1,
            Err(e) => warn!("Failed to delete {:?}: {}", path, e),
        }
    }
    removed
}

/// Remove directories left empty by deleting `entries`, deepest first.
///
/// Only ancestors of deleted entries are considered and `install_root`
/// itself is never removed. Returns the removed directories.
pub fn prune_empty_dirs(install_root: &Path, entries: &[Download]) -> Vec<PathBuf> {
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
    for entry in entries.iter().filter(|e| e.is_contained()) {
        let mut dir = entry.local_path(install_root).parent().map(Path::to_path_buf);
        while let Some(current) = dir {
            if current == install_root || !current.starts_with(install_root) {
                break;
            }
            dir = current.parent().map(Path::to_path_buf);
            candidates.insert(current);
        }
    }

    let mut ordered: Vec<PathBuf> = candidates.into_iter().collect();
    ordered.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

    let mut removed = Vec::new();
    for dir in ordered {
        let empty = std::fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if empty {
            match std::fs::remove_dir(&dir) {
                Ok(()) => {
                    debug!("Pruned empty directory {:?}", dir);
                    removed.push(dir);
                }
                Err(e) => warn!("Failed to prune {:?}: {}", dir, e),
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> Download {
        let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
        Download::unverified(dir, "https://example.invalid/x", name)
    }

    #[test]
    fn deletes_and_prunes_bottom_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("mods/old/deep")).unwrap();
        std::fs::create_dir_all(root.join("config")).unwrap();
        std::fs::write(root.join("mods/old/deep/a.jar"), b"a").unwrap();
        std::fs::write(root.join("mods/keep.jar"), b"k").unwrap();
        std::fs::write(root.join("config/b.cfg"), b"b").unwrap();

        let gone = vec![
            entry("mods/old/deep/a.jar"),
            entry("config/b.cfg"),
            entry("missing/c.txt"),
        ];
        assert_eq!(delete_files(root, &gone), 3);

        let pruned = prune_empty_dirs(root, &gone);
        assert_eq!(pruned.len(), 3);
        assert!(!root.join("mods/old").exists());
        assert!(!root.join("config").exists());
        assert!(root.join("mods/keep.jar").exists());
        assert!(root.exists());
    }

    #[test]
    fn entries_outside_the_root_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("server");
        std::fs::create_dir_all(root.join("mods")).unwrap();
        std::fs::write(dir.path().join("victim.txt"), b"v").unwrap();

        let gone = vec![
            Download::unverified("../", "https://example.invalid/x", "victim.txt"),
            Download::unverified("mods/../..", "https://example.invalid/x", "victim.txt"),
        ];
        assert_eq!(delete_files(&root, &gone), 0);
        assert!(prune_empty_dirs(&root, &gone).is_empty());
        assert!(dir.path().join("victim.txt").exists());
        assert!(root.join("mods").exists());
    }

    #[test]
    fn root_is_never_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("top.txt"), b"t").unwrap();
        let gone = vec![entry("top.txt")];
        delete_files(root, &gone);
        assert!(prune_empty_dirs(root, &gone).is_empty());
        assert!(root.exists());
    }
}
