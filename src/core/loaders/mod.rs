pub mod context;
pub mod fabric;
pub mod forge;
pub mod installer;
pub mod libraries;
pub mod neoforge;
pub mod process;
pub mod vanilla;
pub mod version;

pub use context::InstallContext;
pub use installer::{LaunchDescriptor, LoaderStrategy, ResolvedLoader};
pub use process::{CommandRunner, SystemRunner};
