pub mod manifest;
pub mod version_file;

pub use manifest::{server_download, server_jar_name, VersionManifest};
pub use version_file::VersionJson;
