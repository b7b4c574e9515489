// ─── Server Pack Installer Core ───
// Installs a modpack server and upgrades it in place between versions.
//
// Architecture:
//   core/
//     manifest/    Pack API client, download plan model, persisted version.json
//     checksum     On-disk digest verification
//     reconcile    Old/new plan diff (changed, added, deleted, suspects)
//     downloader/  Concurrent downloads with digest validation
//     version/     Mojang manifest + server jar lookup
//     maven/       Artifact coordinates and repository mirrors
//     loaders/     Vanilla, Forge (in-jar, universal, installer), NeoForge, Fabric
//     java/        Adoptium runtime lookup and extraction
//     archive/     Jar merging for legacy Forge
//     install/     Orchestrator, lock, cleanup, start script
//     http, prompt  Network and terminal seams

pub mod archive;
pub mod checksum;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod java;
pub mod loaders;
pub mod manifest;
pub mod maven;
pub mod prompt;
pub mod reconcile;
pub mod version;

#[cfg(test)]
pub mod testing;
