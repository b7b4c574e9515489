pub mod cleanup;
pub mod lock;
pub mod options;
pub mod orchestrator;
pub mod script;

pub use options::InstallOptions;
pub use orchestrator::{install, InstallReport, Installer};
