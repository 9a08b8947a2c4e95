//! Domain layer: tree nodes, events and menus
//!
//! This layer is independent of contributors, channels and configuration.

pub mod arena;
pub mod error;
pub mod event;
pub mod menu;
pub mod node;

pub use arena::{NodeArena, TreeNode};
pub use error::{DomainError, DomainResult};
pub use event::{ActionType, DataKind, DataPayload, ProcessedActionData};
pub use menu::{MenuCommand, MenuItem};
pub use node::{ContributorId, NodeKey, NodeSpec, NodeView, TreeNodeType, TypeNodeData};
