use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::core::error::InstallerResult;
use crate::core::manifest::Download;
use crate::core::version::{server_download, server_jar_name};

use super::context::InstallContext;
use super::installer::{LaunchDescriptor, LoaderStrategy};
use super::version::GameVersion;

/// Plain Mojang dedicated server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanillaServer {
    pub game: GameVersion,
}

impl VanillaServer {
    pub fn new(game: GameVersion) -> Self {
        Self { game }
    }
}

#[async_trait]
impl LoaderStrategy for VanillaServer {
    async fn plan_downloads(&self, ctx: &InstallContext<'_>) -> InstallerResult<Vec<Download>> {
        info!("Getting downloads for vanilla {}", self.game);
        Ok(vec![server_download(ctx.remote, &self.game.raw).await?])
    }

    async fn install(&self, _ctx: &InstallContext<'_>) -> InstallerResult<()> {
        Ok(())
    }

    fn launch_descriptor(&self, _install_dir: &Path) -> LaunchDescriptor {
        LaunchDescriptor::jar(server_jar_name(&self.game.raw))
    }
}

/// Server jar for loaders that can fetch it themselves if this fails.
pub(crate) async fn optional_server_download(
    ctx: &InstallContext<'_>,
    game: &GameVersion,
) -> Option<Download> {
    match server_download(ctx.remote, &game.raw).await {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!(
                "Unable to get the Minecraft {} server jar, the loader will try again: {}",
                game,
                e
            );
            None
        }
    }
}
