//! Pure data types for muster — host settings, command output, responses.
//!
//! This crate is a leaf dependency with no async runtime and no I/O. It
//! exists so that transports and embedders can work with muster's type
//! system without pulling in the engine's dependencies.

pub mod output;
pub mod response;
pub mod settings;

// Flat re-exports for convenience
pub use output::*;
pub use response::*;
pub use settings::*;
