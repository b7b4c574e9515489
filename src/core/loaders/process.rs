use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::core::error::{InstallerError, InstallerResult};

pub const INSTALLER_ATTEMPTS: u32 = 3;
const INSTALLER_HEAP: &str = "-Xmx2048M";

/// Spawns external programs and waits for them.
///
/// `Ok(None)` means the process ended without an exit code (killed by a signal).
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[String], cwd: &Path) -> io::Result<Option<i32>>;
}

/// Runs commands with `std::process::Command`, inheriting stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String], cwd: &Path) -> io::Result<Option<i32>> {
        let status = Command::new(program).args(args).current_dir(cwd).status()?;
        Ok(status.code())
    }
}

/// `java` executable name resolved through `PATH`.
pub fn system_java() -> PathBuf {
    PathBuf::from(if cfg!(windows) { "java.exe" } else { "java" })
}

/// Run `{java} -Xmx2048M -jar {installer} --installServer` inside `install_dir`.
///
/// The first two attempts use `java`; the last one falls back to the system
/// `java`. On success the installer jar and its log are removed.
pub fn run_installer(
    runner: &dyn CommandRunner,
    java: &Path,
    install_dir: &Path,
    installer: &str,
) -> InstallerResult<()> {
    let args = vec![
        INSTALLER_HEAP.to_string(),
        "-jar".to_string(),
        installer.to_string(),
        "--installServer".to_string(),
    ];

    let mut last_code = None;
    for attempt in 1..=INSTALLER_ATTEMPTS {
        let program = if attempt == INSTALLER_ATTEMPTS {
            if attempt > 1 {
                info!("Installer failed {} times, trying system Java", attempt - 1);
            }
            system_java()
        } else {
            java.to_path_buf()
        };

        info!(
            "Running {} {} (attempt {}/{})",
            program.display(),
            args.join(" "),
            attempt,
            INSTALLER_ATTEMPTS
        );

        match runner.run(&program, &args, install_dir) {
            Ok(Some(0)) => {
                remove_quietly(&install_dir.join(installer));
                remove_quietly(&install_dir.join(format!("{}.log", installer)));
                info!("{} finished", installer);
                return Ok(());
            }
            Ok(code) => {
                warn!("{} exited with {:?}", installer, code);
                last_code = code;
            }
            Err(e) => {
                warn!("Failed to start {}: {}", program.display(), e);
                last_code = None;
            }
        }
    }

    Err(InstallerError::InstallerProcess {
        installer: installer.to_string(),
        attempts: INSTALLER_ATTEMPTS,
        last_code,
    })
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}
