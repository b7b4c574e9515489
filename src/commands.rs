use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use tracing::{error, info};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::install::options::default_threads;
use crate::core::install::{self, InstallOptions, InstallReport};
use crate::core::manifest::VersionSelector;
use crate::core::prompt::{Prompter, TerminalPrompter};

const CURRENT_DIRECTORY: &str = "current directory";

/// Install or upgrade a modpack server.
///
/// Pack and version default to the ones encoded in the executable name
/// (`serverinstall_{pack}_{version}`).
#[derive(Debug, Parser)]
#[command(name = "serverpack-installer", version, about)]
pub struct Cli {
    /// Pack id.
    pub pack: Option<u64>,

    /// Version id, or `latest`.
    #[arg(value_name = "VERSION")]
    pub pack_version: Option<String>,

    /// Ask no questions, use defaults.
    #[arg(long)]
    pub auto: bool,

    /// Directory to install in (asked for when omitted, default: current directory).
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Parallel downloads (default: twice the CPU count).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Re-verify files that are unchanged between versions.
    #[arg(long)]
    pub verify: bool,

    /// Do not write start.sh / start.bat.
    #[arg(long)]
    pub no_script: bool,

    /// Use `java` from PATH instead of downloading the pack's runtime.
    #[arg(long)]
    pub system_java: bool,

    /// Pack API base URL (also SERVERPACK_API_URL).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Debug logging for every module.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Pack and version ids from an executable name like
/// `serverinstall_61_191` or `serverinstall_61_191.exe`.
pub fn ids_from_executable(name: &str) -> Option<(u64, u64)> {
    let rest = name.strip_prefix("serverinstall_")?;
    let mut parts = rest.splitn(3, '_');
    let pack = leading_number(parts.next()?)?;
    let version = leading_number(parts.next()?)?;
    Some((pack, version))
}

fn leading_number(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn parse_selector(raw: &str) -> InstallerResult<VersionSelector> {
    if raw.eq_ignore_ascii_case("latest") {
        return Ok(VersionSelector::Latest);
    }
    raw.parse::<u64>()
        .map(VersionSelector::Id)
        .map_err(|_| InstallerError::InvalidVersion {
            raw: raw.to_string(),
            reason: "expected a version id or \"latest\"".to_string(),
        })
}

impl Cli {
    /// Resolve flags, the executable name and the environment into options.
    pub fn into_options(
        self,
        executable: Option<&str>,
        prompter: &dyn Prompter,
    ) -> InstallerResult<InstallOptions> {
        let from_name = executable.and_then(ids_from_executable);

        let pack_id = match (self.pack, from_name) {
            (Some(pack), _) => pack,
            (None, Some((pack, _))) => pack,
            (None, None) => {
                return Err(InstallerError::Other(
                    "No pack id given and none found in the executable name".to_string(),
                ))
            }
        };
        let version = match (&self.pack_version, from_name) {
            (Some(raw), _) => parse_selector(raw)?,
            (None, Some((pack, version))) if self.pack.map_or(true, |p| p == pack) => {
                VersionSelector::Id(version)
            }
            _ => VersionSelector::Latest,
        };

        let install_dir = match self.path {
            Some(path) => path,
            None if self.auto => PathBuf::from("."),
            None => {
                let answer = prompter.input(
                    "Where would you like to install the server?",
                    CURRENT_DIRECTORY,
                );
                let answer = answer.trim();
                if answer.is_empty() || answer == CURRENT_DIRECTORY {
                    PathBuf::from(".")
                } else {
                    PathBuf::from(answer)
                }
            }
        };

        Ok(InstallOptions {
            pack_id,
            version,
            install_dir,
            auto: self.auto,
            threads: self.threads.filter(|t| *t > 0).unwrap_or_else(default_threads),
            verify_integrity: self.verify,
            write_start_script: !self.no_script,
            system_java: self.system_java,
            api_base: self
                .api_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(InstallOptions::api_base_from_env),
        })
    }
}

fn executable_name() -> Option<String> {
    let arg0 = std::env::args_os().next()?;
    Path::new(&arg0)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

fn print_summary(report: &InstallReport) {
    let failed = report.downloads.failed.len();
    let headline = if report.completed {
        style(format!(
            "{} version {} installed",
            report.pack_name, report.version_id
        ))
        .green()
        .bold()
    } else {
        style(format!(
            "{} version {} not installed",
            report.pack_name, report.version_id
        ))
        .red()
        .bold()
    };
    eprintln!("{}", headline);
    eprintln!(
        "  {} downloaded, {} failed, {} removed",
        report.downloads.succeeded, failed, report.deleted
    );
    if let Some(script) = &report.start_script {
        eprintln!("  start with {}", style(script.display()).cyan());
    }
}

/// Parse the command line, install, and map the outcome to an exit code:
/// the number of failed downloads, or 1 for a fatal error.
pub async fn execute(cli: Cli) -> i32 {
    let auto = cli.auto;
    let prompter = TerminalPrompter::new();
    let executable = executable_name();
    let options = match cli.into_options(executable.as_deref(), &prompter) {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };
    info!(
        "Installing pack {} ({:?}) into {:?}{}",
        options.pack_id,
        options.version,
        options.install_dir,
        if auto { " [auto]" } else { "" }
    );

    match install::install(&options).await {
        Ok(report) => {
            print_summary(&report);
            report.exit_code()
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}
