pub mod api;
pub mod download;
pub mod model;
pub mod store;

pub use api::{PackApi, VersionSelector};
pub use download::{Download, HashAlgorithm};
pub use model::{DependencyTarget, Manifest, TargetKind};
