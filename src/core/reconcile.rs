use std::cmp::Ordering;
use std::path::Path;

use tracing::debug;

use crate::core::checksum;
use crate::core::manifest::Download;

/// An entry present in both manifests whose declared checksum changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedEntry {
    pub old: Download,
    pub new: Download,
}

/// Classification of every key of two manifests.
///
/// `changed`, `added`, `deleted`, `integrity_suspect` and `unchanged` are
/// disjoint and together cover the union of both key sets.
/// `locally_modified` is a subset of `changed`.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub changed: Vec<ChangedEntry>,
    pub added: Vec<Download>,
    pub deleted: Vec<Download>,
    pub integrity_suspect: Vec<Download>,
    pub unchanged: Vec<Download>,
    pub locally_modified: Vec<ChangedEntry>,
}

impl Reconciliation {
    /// Nothing to fetch or delete.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
            && self.added.is_empty()
            && self.deleted.is_empty()
            && self.integrity_suspect.is_empty()
    }
}

/// Diff the previous plan against the new one.
///
/// With `integrity_check` set, files that are unchanged between the manifests
/// are re-verified on disk and reported as suspects when they fail.
pub fn reconcile(
    old: &[Download],
    new: &[Download],
    install_root: &Path,
    integrity_check: bool,
) -> Reconciliation {
    let mut old_sorted: Vec<&Download> = old.iter().collect();
    let mut new_sorted: Vec<&Download> = new.iter().collect();
    old_sorted.sort_by(|a, b| a.full_relative_path().cmp(b.full_relative_path()));
    new_sorted.sort_by(|a, b| a.full_relative_path().cmp(b.full_relative_path()));

    let mut result = Reconciliation::default();
    let (mut i, mut j) = (0, 0);

    while i < old_sorted.len() && j < new_sorted.len() {
        let (o, n) = (old_sorted[i], new_sorted[j]);
        match o.full_relative_path().cmp(n.full_relative_path()) {
            Ordering::Equal => {
                if !o.same_checksum(n) {
                    result.changed.push(ChangedEntry {
                        old: o.clone(),
                        new: n.clone(),
                    });
                } else if integrity_check && !checksum::verify(n, install_root) {
                    result.integrity_suspect.push(n.clone());
                } else {
                    result.unchanged.push(n.clone());
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                result.deleted.push(o.clone());
                i += 1;
            }
            Ordering::Greater => {
                result.added.push(n.clone());
                j += 1;
            }
        }
    }
    result.deleted.extend(old_sorted[i..].iter().map(|d| (*d).clone()));
    result.added.extend(new_sorted[j..].iter().map(|d| (*d).clone()));

    // A changed entry was hand-edited if what is on disk no longer matches
    // the hash recorded by the previous install. Missing files are not edits.
    result.locally_modified = result
        .changed
        .iter()
        .filter(|c| c.old.local_path(install_root).is_file())
        .filter(|c| !checksum::verify(&c.old, install_root))
        .cloned()
        .collect();

    debug!(
        "Reconciled: {} changed ({} locally modified), {} added, {} deleted, {} suspect, {} unchanged",
        result.changed.len(),
        result.locally_modified.len(),
        result.added.len(),
        result.deleted.len(),
        result.integrity_suspect.len(),
        result.unchanged.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checksum::digest_bytes;
    use crate::core::manifest::HashAlgorithm;
    use std::collections::BTreeSet;

    fn sha1_entry(dir: &str, name: &str, content: &[u8]) -> Download {
        let hash = digest_bytes(HashAlgorithm::Sha1, content).unwrap();
        Download::new(dir, format!("https://cdn.test/{}", name), name, HashAlgorithm::Sha1, hash)
    }

    fn place(root: &Path, entry: &Download, content: &[u8]) {
        let path = entry.local_path(root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn keys<'a>(it: impl Iterator<Item = &'a Download>) -> BTreeSet<String> {
        it.map(|d| d.full_relative_path().to_string()).collect()
    }

    #[test]
    fn classifies_every_key_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let a = sha1_entry("mods", "a.jar", b"a");
        let b = sha1_entry("mods", "b.jar", b"b");
        let b2 = sha1_entry("mods", "b.jar", b"b2");
        let c = sha1_entry("old", "c.jar", b"c");
        let d = sha1_entry("config", "d.cfg", b"d");

        let old = vec![c.clone(), b.clone(), a.clone()];
        let new = vec![d.clone(), a.clone(), b2.clone()];
        let r = reconcile(&old, &new, dir.path(), false);

        assert_eq!(keys(r.unchanged.iter()), keys([a.clone()].iter()));
        assert_eq!(r.changed.len(), 1);
        assert_eq!(r.changed[0].old, b);
        assert_eq!(r.changed[0].new, b2);
        assert_eq!(keys(r.added.iter()), keys([d].iter()));
        assert_eq!(keys(r.deleted.iter()), keys([c].iter()));
        assert!(r.integrity_suspect.is_empty());
        // b.jar is not on disk, so it cannot have been hand-edited.
        assert!(r.locally_modified.is_empty());

        let mut all: Vec<String> = Vec::new();
        all.extend(r.unchanged.iter().map(|d| d.full_relative_path().to_string()));
        all.extend(r.changed.iter().map(|c| c.new.full_relative_path().to_string()));
        all.extend(r.added.iter().map(|d| d.full_relative_path().to_string()));
        all.extend(r.deleted.iter().map(|d| d.full_relative_path().to_string()));
        let union = keys(old.iter().chain(new.iter()));
        assert_eq!(all.len(), union.len());
        assert_eq!(all.into_iter().collect::<BTreeSet<_>>(), union);
    }

    #[test]
    fn identical_manifests_are_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let a = sha1_entry("mods", "a.jar", b"a");
        let b = sha1_entry("", "server.properties", b"b");
        place(dir.path(), &a, b"a");
        place(dir.path(), &b, b"b");

        let plan = vec![a, b];
        let r = reconcile(&plan, &plan, dir.path(), true);
        assert!(r.is_noop());
        assert_eq!(r.unchanged.len(), 2);
    }

    #[test]
    fn integrity_check_flags_tampered_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = sha1_entry("mods", "a.jar", b"a");
        place(dir.path(), &a, b"tampered");

        let plan = vec![a];
        let r = reconcile(&plan, &plan, dir.path(), true);
        assert_eq!(r.integrity_suspect.len(), 1);
        assert!(r.unchanged.is_empty());

        let r = reconcile(&plan, &plan, dir.path(), false);
        assert!(r.integrity_suspect.is_empty());
        assert_eq!(r.unchanged.len(), 1);
    }

    #[test]
    fn hand_edited_changed_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let old_cfg = sha1_entry("config", "x.cfg", b"v1");
        let new_cfg = sha1_entry("config", "x.cfg", b"v2");
        let old_jar = sha1_entry("mods", "y.jar", b"y1");
        let new_jar = sha1_entry("mods", "y.jar", b"y2");
        place(dir.path(), &old_cfg, b"user edit");
        place(dir.path(), &old_jar, b"y1");

        let r = reconcile(
            &[old_cfg.clone(), old_jar],
            &[new_cfg, new_jar],
            dir.path(),
            false,
        );
        assert_eq!(r.changed.len(), 2);
        assert_eq!(r.locally_modified.len(), 1);
        assert_eq!(r.locally_modified[0].old, old_cfg);
    }

    #[test]
    fn empty_sides() {
        let dir = tempfile::tempdir().unwrap();
        let a = sha1_entry("mods", "a.jar", b"a");
        let r = reconcile(&[], &[a.clone()], dir.path(), false);
        assert_eq!(r.added, vec![a.clone()]);
        let r = reconcile(&[a.clone()], &[], dir.path(), false);
        assert_eq!(r.deleted, vec![a]);
    }
}
