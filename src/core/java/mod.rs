pub mod adoptium;
pub mod extract;
pub mod runtime;

pub use runtime::{JavaProvider, RuntimeError};
