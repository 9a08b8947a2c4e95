//! Capability record injected into every contributor.
//!
//! Contributors must not depend on the dialog machinery or the router. They
//! get this narrow record instead, and ask for a tree refresh by message
//! rather than by calling back into the engine.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::ApplicationResult;
use crate::domain::{ProcessedActionData, TypeNodeData};
use crate::infrastructure::traits::{
    DialogHandler, EditRequest, Navigator, NoopDialogs, NoopNavigator,
};

/// Requests a contributor can send to the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    RefreshTree,
}

pub struct CallbackBridge {
    dialogs: Arc<dyn DialogHandler>,
    navigator: Arc<dyn Navigator>,
    requests: mpsc::UnboundedSender<HostRequest>,
}

impl CallbackBridge {
    pub fn new(
        dialogs: Arc<dyn DialogHandler>,
        navigator: Arc<dyn Navigator>,
        requests: mpsc::UnboundedSender<HostRequest>,
    ) -> Self {
        Self {
            dialogs,
            navigator,
            requests,
        }
    }

    /// Stub bridge for contributor tests: dialogs report no change,
    /// navigation and refresh requests go nowhere.
    pub fn noop() -> Self {
        let (requests, _) = mpsc::unbounded_channel();
        Self::new(Arc::new(NoopDialogs), Arc::new(NoopNavigator), requests)
    }

    pub async fn handle_edit(
        &self,
        request: EditRequest,
    ) -> ApplicationResult<Option<ProcessedActionData>> {
        debug!("handle_edit: component={}", request.component);
        self.dialogs.open_edit_dialog(request).await
    }

    pub async fn handle_tenant_edit(
        &self,
        data: Option<Value>,
        only_currency: bool,
    ) -> ApplicationResult<Option<ProcessedActionData>> {
        debug!("handle_tenant_edit: only_currency={}", only_currency);
        self.dialogs.open_tenant_dialog(data, only_currency).await
    }

    /// Navigates to the node's route. Group nodes are ignored; returns
    /// whether a navigation happened.
    pub fn navigate_to_node(&self, data: &TypeNodeData) -> bool {
        match (&data.route, &data.id) {
            (Some(route), Some(id)) => {
                self.navigator.navigate(route, id, data.use_query_params);
                true
            }
            _ => false,
        }
    }

    pub fn refresh_tree(&self) {
        if self.requests.send(HostRequest::RefreshTree).is_err() {
            warn!("refresh_tree: host loop is gone, request dropped");
        }
    }
}

impl std::fmt::Debug for CallbackBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBridge").finish_non_exhaustive()
    }
}
