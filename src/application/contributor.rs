//! Contributor contract: the unit of extension of the navigation tree.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::application::bridge::CallbackBridge;
use crate::application::mount::MountHandle;
use crate::application::ContributorResult;
use crate::domain::{DataPayload, MenuItem, NodeSpec, NodeView, ProcessedActionData, TypeNodeData};

/// Arguments of a context-menu request.
#[derive(Debug, Clone, Copy)]
pub struct MenuContext<'a> {
    /// The node that was right-clicked
    pub node: &'a NodeView,
    /// Data of the node's parent, None for composed roots
    pub parent: Option<&'a TypeNodeData>,
    /// Data of the currently selected node, if any
    pub selected: Option<&'a TypeNodeData>,
}

/// A self-contained extension unit providing one fragment of the tree.
///
/// Dispatch hooks (`context_menu_items`, `can_drop`, `handle_delete`) must not
/// fail: a contributor that does not own a node type answers `None`/`false`
/// so the engine can ask the next one. Node types are expected to be
/// partitioned across contributors; the first contributor in tree order that
/// answers wins.
#[async_trait]
pub trait Contributor: Send + Sync {
    /// Name used in logs and for `[contributors.<name>]` config overrides.
    fn name(&self) -> &str;

    /// Sort key, constant for the contributor's lifetime.
    fn tree_order(&self) -> i32;

    /// Re-read whenever the engine reconciles enablement.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Mount points of this contributor. `Ok(None)` means "no root nodes".
    async fn root_nodes(&self) -> ContributorResult<Option<Vec<NodeSpec>>>;

    /// Repopulate the mounted subtree in place. Must be idempotent.
    async fn refresh_nodes(&self, mount: MountHandle) -> ContributorResult<()>;

    fn context_menu_items(&self, _ctx: &MenuContext<'_>) -> Option<Vec<MenuItem>> {
        None
    }

    fn should_refresh_on_data_change(&self, _event: &ProcessedActionData) -> bool {
        false
    }

    /// Claims a delete by returning the future that performs it.
    fn handle_delete(
        &self,
        _node: &NodeView,
        _id: &str,
    ) -> Option<BoxFuture<'static, ContributorResult<()>>> {
        None
    }

    fn can_drop(&self, _target: &NodeView, _payload: &DataPayload) -> bool {
        false
    }

    async fn handle_drop(
        &self,
        _target: &NodeView,
        _payload: &DataPayload,
        _source_label: Option<&str>,
    ) -> ContributorResult<()> {
        Ok(())
    }

    /// Called once, after the registry is assembled.
    fn set_callbacks(&self, _bridge: Arc<CallbackBridge>) {}
}
