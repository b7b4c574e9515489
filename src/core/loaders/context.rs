use std::path::Path;

use crate::core::http::Remote;

use super::process::CommandRunner;

/// Everything a loader strategy needs to plan and install.
pub struct InstallContext<'a> {
    pub install_dir: &'a Path,
    pub remote: &'a dyn Remote,
    pub runner: &'a dyn CommandRunner,
    /// Java used to run external installers.
    pub java: &'a Path,
}
