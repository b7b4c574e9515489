use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Digest algorithms a pack or loader descriptor can declare for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// No claim to verify.
    #[default]
    None,
    Sha1,
    Sha256,
    Md5,
}

impl HashAlgorithm {
    /// Lenient name lookup (`"sha1"`, `"SHA-256"`, ...). Unknown names map to `None`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => HashAlgorithm::Sha1,
            "sha256" => HashAlgorithm::Sha256,
            "md5" => HashAlgorithm::Md5,
            _ => HashAlgorithm::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::None => "none",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file of a download plan.
///
/// `full_relative_path` is `relative_dir/file_name` with forward slashes and is
/// the identity key used when diffing two manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub relative_dir: String,
    pub url: String,
    pub file_name: String,
    pub hash_algorithm: HashAlgorithm,
    pub hash: String,
    full_relative_path: String,
}

impl Download {
    pub fn new(
        relative_dir: &str,
        url: impl Into<String>,
        file_name: &str,
        hash_algorithm: HashAlgorithm,
        hash: impl Into<String>,
    ) -> Self {
        let relative_dir = normalize_relative(relative_dir);
        let file_name = normalize_relative(file_name);
        let full_relative_path = if relative_dir.is_empty() {
            file_name.clone()
        } else {
            format!("{}/{}", relative_dir, file_name)
        };

        Self {
            relative_dir,
            url: url.into(),
            file_name,
            hash_algorithm,
            hash: hash.into().trim().to_string(),
            full_relative_path,
        }
    }

    /// A download with no declared hash.
    pub fn unverified(relative_dir: &str, url: impl Into<String>, file_name: &str) -> Self {
        Self::new(relative_dir, url, file_name, HashAlgorithm::None, "")
    }

    /// Identity key: `relative_dir/file_name`.
    pub fn full_relative_path(&self) -> &str {
        &self.full_relative_path
    }

    /// Whether the entry makes a checksum claim at all.
    pub fn has_checksum(&self) -> bool {
        self.hash_algorithm != HashAlgorithm::None && !self.hash.is_empty()
    }

    /// Same declared `(algorithm, hash)` pair, hash compared case-insensitively.
    pub fn same_checksum(&self, other: &Download) -> bool {
        self.hash_algorithm == other.hash_algorithm && self.hash.eq_ignore_ascii_case(&other.hash)
    }

    /// Whether the key stays inside the install root: no `..` segment and no
    /// drive or scheme prefix.
    pub fn is_contained(&self) -> bool {
        self.full_relative_path
            .split('/')
            .all(|part| part != ".." && !part.contains(':'))
    }

    /// Absolute location of this entry under `root`.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        self.full_relative_path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(root.to_path_buf(), |path, part| path.join(part))
    }
}

/// Forward slashes, no `./` prefix, no leading or trailing separators.
fn normalize_relative(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_joins_dir_and_name() {
        let d = Download::unverified("./mods/", "https://example.com/a.jar", "a.jar");
        assert_eq!(d.relative_dir, "mods");
        assert_eq!(d.full_relative_path(), "mods/a.jar");
    }

    #[test]
    fn empty_dir_yields_bare_file_name() {
        let d = Download::unverified("./", "https://example.com/a.jar", "a.jar");
        assert_eq!(d.full_relative_path(), "a.jar");
        let d = Download::unverified("", "https://example.com/a.jar", "a.jar");
        assert_eq!(d.full_relative_path(), "a.jar");
    }

    #[test]
    fn backslashes_are_normalized() {
        let d = Download::unverified("config\\sub", "https://example.com/x", "x.cfg");
        assert_eq!(d.full_relative_path(), "config/sub/x.cfg");
    }

    #[test]
    fn local_path_is_rooted() {
        let d = Download::unverified("config/sub", "https://example.com/x", "x.cfg");
        let root = Path::new("/srv/pack");
        assert_eq!(d.local_path(root), root.join("config").join("sub").join("x.cfg"));
    }

    #[test]
    fn parent_segments_are_not_contained() {
        let escaping = [
            Download::unverified("../", "https://example.com/x", "victim.txt"),
            Download::unverified("mods/../../etc", "https://example.com/x", "passwd"),
            Download::unverified("mods", "https://example.com/x", ".."),
            Download::unverified("C:\\Windows", "https://example.com/x", "x.dll"),
        ];
        for d in &escaping {
            assert!(!d.is_contained(), "{} should escape", d.full_relative_path());
        }
        assert!(Download::unverified("./mods/", "https://example.com/a", "a..b.jar").is_contained());
    }

    #[test]
    fn checksum_comparison_ignores_case() {
        let a = Download::new("", "u", "f", HashAlgorithm::Sha1, "ABCDEF");
        let b = Download::new("", "u", "f", HashAlgorithm::Sha1, "abcdef");
        let c = Download::new("", "u", "f", HashAlgorithm::Sha256, "abcdef");
        assert!(a.same_checksum(&b));
        assert!(!a.same_checksum(&c));
    }

    #[test]
    fn algorithm_names_are_lenient() {
        assert_eq!(HashAlgorithm::from_name("SHA-256"), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_name("sha1"), HashAlgorithm::Sha1);
        assert_eq!(HashAlgorithm::from_name("crc32"), HashAlgorithm::None);
    }
}
