//! Application layer: contributors, registry and the composition engine
//!
//! This layer orchestrates domain logic and depends on host boundary traits.

pub mod bridge;
pub mod contributor;
pub mod error;
pub mod error_ext;
pub mod mount;
pub mod registry;
pub mod services;

pub use bridge::{CallbackBridge, HostRequest};
pub use contributor::{Contributor, MenuContext};
pub use error::{ApplicationError, ApplicationResult, ContributorError, ContributorResult};
pub use error_ext::ContributorResultExt;
pub use mount::MountHandle;
pub use registry::{ContributorRegistry, RegisteredContributor};
