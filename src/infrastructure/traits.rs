//! Host boundary traits for testability
//!
//! These traits abstract what the host application supplies (dialogs,
//! routing, drawing), allowing the engine and contributors to be tested
//! with stub implementations.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::application::ApplicationResult;
use crate::domain::{NodeView, ProcessedActionData};

/// Request to open an edit/create dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    /// Identifies which dialog the host should open
    pub component: String,
    pub parent_object: Option<Value>,
    /// Object being edited, None when creating
    pub data: Option<Value>,
    pub title_key: String,
}

impl EditRequest {
    pub fn new(component: impl Into<String>, title_key: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            parent_object: None,
            data: None,
            title_key: title_key.into(),
        }
    }

    pub fn with_parent_object(mut self, value: Value) -> Self {
        self.parent_object = Some(value);
        self
    }

    pub fn with_data(mut self, value: Value) -> Self {
        self.data = Some(value);
        self
    }
}

/// Opens concrete edit dialogs. Implemented by the host, never by the engine.
///
/// Both operations resolve to `None` when the user closed the dialog without
/// changing anything, and to the resulting event otherwise.
#[async_trait]
pub trait DialogHandler: Send + Sync {
    async fn open_edit_dialog(
        &self,
        request: EditRequest,
    ) -> ApplicationResult<Option<ProcessedActionData>>;

    async fn open_tenant_dialog(
        &self,
        data: Option<Value>,
        only_currency: bool,
    ) -> ApplicationResult<Option<ProcessedActionData>>;
}

/// Routing boundary: the single `navigate(route, id)` call.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str, id: &str, use_query_params: bool);
}

/// Turns the composed root list into something visible.
pub trait RenderAdapter: Send + Sync {
    fn render(&self, roots: &[NodeView]) -> String;
}

// ============================================================
// STUB IMPLEMENTATIONS
// ============================================================

/// Dialog handler that never changes anything.
#[derive(Debug, Default)]
pub struct NoopDialogs;

#[async_trait]
impl DialogHandler for NoopDialogs {
    async fn open_edit_dialog(
        &self,
        _request: EditRequest,
    ) -> ApplicationResult<Option<ProcessedActionData>> {
        Ok(None)
    }

    async fn open_tenant_dialog(
        &self,
        _data: Option<Value>,
        _only_currency: bool,
    ) -> ApplicationResult<Option<ProcessedActionData>> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: &str, _id: &str, _use_query_params: bool) {}
}

/// Navigator for headless hosts: records the navigation in the log.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: &str, id: &str, use_query_params: bool) {
        if use_query_params {
            info!("navigate: {}?id={}", route, id);
        } else {
            info!("navigate: {}/{}", route, id);
        }
    }
}
