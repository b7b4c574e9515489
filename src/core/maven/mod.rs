mod artifact;

pub use artifact::MavenArtifact;

/// Repositories the Forge-family loaders pull libraries from.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net/";
pub const MODPACKS_CH_VERSIONS: &str = "https://apps.modpacks.ch/versions/";
pub const CREEPERHOST_MAVEN: &str = "https://maven.creeperhost.net/";
pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net/";
pub const NEOFORGE_MAVEN: &str = "https://maven.neoforged.net/releases/";

/// Probe order for Forge libraries.
pub const FORGE_MIRRORS: [&str; 4] = [
    MOJANG_LIBRARIES,
    MODPACKS_CH_VERSIONS,
    CREEPERHOST_MAVEN,
    FORGE_MAVEN,
];

/// Probe order for NeoForge libraries.
pub const NEOFORGE_MIRRORS: [&str; 2] = [NEOFORGE_MAVEN, MOJANG_LIBRARIES];
