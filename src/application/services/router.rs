//! Routes generic UI events to the engine or the bridge.
//!
//! Render adapters translate their toolkit events into [`TreeEvent`] and
//! never talk to contributors directly.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::bridge::CallbackBridge;
use crate::application::services::engine::{RefreshReport, TreeCompositionEngine};
use crate::application::ApplicationResult;
use crate::domain::{DataPayload, MenuItem, NodeKey, ProcessedActionData};

#[derive(Debug, Clone)]
pub enum TreeEvent {
    Select(NodeKey),
    ContextMenu {
        node: NodeKey,
        selected: Option<NodeKey>,
    },
    DragOver {
        target: NodeKey,
        payload: DataPayload,
    },
    Drop {
        target: NodeKey,
        payload: DataPayload,
        source_label: Option<String>,
    },
    Delete(NodeKey),
    Toggle {
        node: NodeKey,
        expanded: bool,
    },
    DataChanged(ProcessedActionData),
}

#[derive(Debug)]
pub enum TreeEventOutcome {
    Navigated(bool),
    Menu(Option<Vec<MenuItem>>),
    DropAllowed(bool),
    Dropped(bool),
    Deleted(bool),
    Toggled,
    Refreshed(RefreshReport),
    /// The event referenced a node that is gone or carries no id
    Ignored,
}

pub struct TreeEventRouter {
    engine: Arc<TreeCompositionEngine>,
    bridge: Arc<CallbackBridge>,
}

impl TreeEventRouter {
    pub fn new(engine: Arc<TreeCompositionEngine>, bridge: Arc<CallbackBridge>) -> Self {
        Self { engine, bridge }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn dispatch(&self, event: TreeEvent) -> ApplicationResult<TreeEventOutcome> {
        let outcome = match event {
            TreeEvent::Select(key) => match self.engine.node(key) {
                Some(view) => TreeEventOutcome::Navigated(self.bridge.navigate_to_node(&view.data)),
                None => TreeEventOutcome::Ignored,
            },
            TreeEvent::ContextMenu { node, selected } => {
                TreeEventOutcome::Menu(self.engine.context_menu_items(node, selected))
            }
            TreeEvent::DragOver { target, payload } => {
                TreeEventOutcome::DropAllowed(self.engine.can_drop(target, &payload))
            }
            TreeEvent::Drop {
                target,
                payload,
                source_label,
            } => TreeEventOutcome::Dropped(
                self.engine
                    .handle_drop(target, &payload, source_label.as_deref())
                    .await?,
            ),
            TreeEvent::Delete(key) => {
                let id = self.engine.node(key).and_then(|view| view.data.id);
                match id {
                    Some(id) => {
                        TreeEventOutcome::Deleted(self.engine.handle_delete(key, &id).await?)
                    }
                    None => {
                        debug!("delete: node {} has no id", key);
                        TreeEventOutcome::Ignored
                    }
                }
            }
            TreeEvent::Toggle { node, expanded } => {
                self.engine.set_expanded(node, expanded)?;
                TreeEventOutcome::Toggled
            }
            TreeEvent::DataChanged(event) => {
                let report = self.engine.refresh_nodes_for_data_change(&event).await?;
                TreeEventOutcome::Refreshed(report)
            }
        };
        Ok(outcome)
    }
}

impl std::fmt::Debug for TreeEventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEventRouter")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
