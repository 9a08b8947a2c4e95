//! Infrastructure layer: host boundary implementations and DI container
//!
//! This layer implements the host boundary traits, the process-wide
//! channels, manifest loading and the wiring of it all.

pub mod di;
pub mod error;
pub mod events;
pub mod flags;
pub mod manifest;
pub mod render;
pub mod traits;

pub use error::{InfraError, InfraResult};
