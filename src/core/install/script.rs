use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::loaders::LaunchDescriptor;
use crate::core::manifest::api::Specs;

const DEFAULT_RECOMMENDED_MB: u32 = 4096;
const DEFAULT_MINIMUM_MB: u32 = 3072;
const EULA_URL: &str = "https://account.mojang.com/documents/minecraft_eula";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Shell,
    Batch,
}

impl ScriptKind {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Batch
        } else {
            Self::Shell
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Shell => "start.sh",
            Self::Batch => "start.bat",
        }
    }
}

/// JVM flags and target, e.g. `-XX:+UseG1GC ... -Xmx4096M -Xms3072M -jar server.jar nogui`.
pub fn launch_arguments(launch: &LaunchDescriptor, specs: Specs) -> String {
    let recommended = if specs.recommended == 0 {
        DEFAULT_RECOMMENDED_MB
    } else {
        specs.recommended
    };
    let minimum = if specs.minimum == 0 {
        DEFAULT_MINIMUM_MB
    } else {
        specs.minimum
    };

    let mut parts = vec![
        "-XX:+UseG1GC".to_string(),
        "-XX:+UnlockExperimentalVMOptions".to_string(),
        format!("-Xmx{}M", recommended),
        format!("-Xms{}M", minimum),
    ];
    if let Some(jar) = &launch.jar {
        parts.push("-jar".to_string());
        parts.push(jar.clone());
    }
    parts.extend(launch.jvm_args.iter().cloned());
    parts.push("nogui".to_string());
    parts.join(" ")
}

pub fn render(kind: ScriptKind, java: &str, launch: &LaunchDescriptor, specs: Specs) -> String {
    let command = format!("\"{}\" {}", java, launch_arguments(launch, specs));
    match kind {
        ScriptKind::Shell => format!(
            "#!/usr/bin/env bash\n\
             cd \"$(dirname \"$0\")\"\n\
             if ! grep -qs \"eula=true\" eula.txt; then\n\
             \x20   if [ \"$ACCEPT_EULA\" = \"true\" ]; then\n\
             \x20       echo \"eula=true\" > eula.txt\n\
             \x20   else\n\
             \x20       echo \"Do you agree to the Mojang EULA available at {eula} ?\"\n\
             \x20       read -N 1 -p \"[y/n] \" EULA\n\
             \x20       echo\n\
             \x20       if [ \"$EULA\" = \"y\" ]; then\n\
             \x20           echo \"eula=true\" > eula.txt\n\
             \x20       else\n\
             \x20           exit 1\n\
             \x20       fi\n\
             \x20   fi\n\
             fi\n\
             exec {command}\n",
            eula = EULA_URL,
            command = command
        ),
        ScriptKind::Batch => [
            "@echo off".to_string(),
            "cd /d \"%~dp0\"".to_string(),
            ">nul 2>nul find \"eula=true\" eula.txt && goto START".to_string(),
            "IF /I \"%ACCEPT_EULA%\" EQU \"true\" goto ACCEPT".to_string(),
            format!("echo Do you agree to the Mojang EULA available at {} ?", EULA_URL),
            "set /p EULA=[y/n] ".to_string(),
            "IF /I \"%EULA%\" NEQ \"y\" goto END".to_string(),
            ":ACCEPT".to_string(),
            "echo eula=true>eula.txt".to_string(),
            ":START".to_string(),
            command,
            ":END".to_string(),
            String::new(),
        ]
        .join("\r\n"),
    }
}

/// Write the platform start script into `install_dir`.
pub fn write_start_script(
    install_dir: &Path,
    java: &Path,
    launch: &LaunchDescriptor,
    specs: Specs,
) -> InstallerResult<PathBuf> {
    let kind = ScriptKind::current();
    let java = java.to_string_lossy().replace('\\', "/");
    let java = match kind {
        ScriptKind::Shell => java,
        ScriptKind::Batch => java.replace('/', "\\"),
    };
    let path = install_dir.join(kind.file_name());
    std::fs::write(&path, render(kind, &java, launch, specs))
        .map_err(|e| InstallerError::io(&path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| InstallerError::io(&path, e))?;
    }

    info!("Wrote {}", kind.file_name());
    Ok(path)
}
