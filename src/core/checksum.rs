use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::manifest::{Download, HashAlgorithm};

const CHUNK: usize = 64 * 1024;

/// Check the on-disk file of `entry` under `install_root` against its
/// declared hash.
///
/// Entries without a claim always pass. Any I/O problem (missing file,
/// permission denied) counts as a failed check, never an error.
pub fn verify(entry: &Download, install_root: &Path) -> bool {
    if !entry.has_checksum() {
        return true;
    }

    let path = entry.local_path(install_root);
    match digest_file(&path, entry.hash_algorithm) {
        Some(actual) => {
            let ok = actual.eq_ignore_ascii_case(entry.hash.trim());
            if !ok {
                debug!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    entry.full_relative_path(),
                    entry.hash,
                    actual
                );
            }
            ok
        }
        None => false,
    }
}

/// Hex digest of an in-memory buffer. `None` for [`HashAlgorithm::None`].
pub fn digest_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Option<String> {
    match algorithm {
        HashAlgorithm::None => None,
        HashAlgorithm::Sha1 => Some(hex::encode(Sha1::digest(bytes))),
        HashAlgorithm::Sha256 => Some(hex::encode(Sha256::digest(bytes))),
        HashAlgorithm::Md5 => Some(hex::encode(Md5::digest(bytes))),
    }
}

/// Streaming hex digest of a file. `None` when the file cannot be read or the
/// algorithm is [`HashAlgorithm::None`].
pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> Option<String> {
    match algorithm {
        HashAlgorithm::None => None,
        HashAlgorithm::Sha1 => stream_digest::<Sha1>(path),
        HashAlgorithm::Sha256 => stream_digest::<Sha256>(path),
        HashAlgorithm::Md5 => stream_digest::<Md5>(path),
    }
}

fn stream_digest<D: Digest>(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::with_capacity(CHUNK, file);
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK];

    loop {
        let n = reader.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Some(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha1("hello world") / sha256("hello world")
    const SHA1_HELLO: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const SHA256_HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn matching_sha1_and_sha256_pass() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mods/a.jar", b"hello world");

        let sha1 = Download::new("mods", "u", "a.jar", HashAlgorithm::Sha1, SHA1_HELLO);
        let sha256 = Download::new(
            "mods",
            "u",
            "a.jar",
            HashAlgorithm::Sha256,
            SHA256_HELLO.to_uppercase(),
        );
        assert!(verify(&sha1, dir.path()));
        assert!(verify(&sha256, dir.path()));
    }

    #[test]
    fn one_changed_byte_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mods/a.jar", b"hello worle");
        let entry = Download::new("mods", "u", "a.jar", HashAlgorithm::Sha1, SHA1_HELLO);
        assert!(!verify(&entry, dir.path()));
    }

    #[test]
    fn empty_hash_always_passes() {
        let dir = tempfile::tempdir().unwrap();
        let entry = Download::new("mods", "u", "missing.jar", HashAlgorithm::Sha1, "");
        assert!(verify(&entry, dir.path()));
        let entry = Download::unverified("mods", "u", "missing.jar");
        assert!(verify(&entry, dir.path()));
    }

    #[test]
    fn missing_file_fails_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = Download::new("mods", "u", "missing.jar", HashAlgorithm::Sha1, SHA1_HELLO);
        assert!(!verify(&entry, dir.path()));
    }

    #[test]
    fn digest_bytes_matches_known_values() {
        assert_eq!(
            digest_bytes(HashAlgorithm::Sha1, b"hello world").as_deref(),
            Some(SHA1_HELLO)
        );
        assert_eq!(
            digest_bytes(HashAlgorithm::Md5, b"hello world").as_deref(),
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        assert_eq!(digest_bytes(HashAlgorithm::None, b"x"), None);
    }
}
