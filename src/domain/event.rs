//! Data-change events broadcast after any mutation in the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of outcomes a dialog or CRUD mutation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    NoChange,
    Created,
    Updated,
    Deleted,
    Rejected,
}

/// Discriminator for event and drag payloads, the event-side counterpart of
/// [`TreeNodeType`](crate::domain::TreeNodeType).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataKind(String);

impl DataKind {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DataKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Tagged domain payload. Contributors dispatch on `kind` and may read `value`
/// without the engine knowing its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    pub kind: DataKind,
    #[serde(default)]
    pub value: Value,
}

impl DataPayload {
    pub fn new(kind: impl Into<String>, value: Value) -> Self {
        Self {
            kind: DataKind::new(kind),
            value,
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_str() == kind
    }
}

/// Generic "something changed" event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedActionData {
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_error: Option<String>,
}

impl ProcessedActionData {
    pub fn new(action: ActionType, data: Option<DataPayload>) -> Self {
        Self {
            action,
            data,
            transformed_error: None,
        }
    }

    pub fn no_change() -> Self {
        Self::new(ActionType::NoChange, None)
    }

    pub fn created(data: DataPayload) -> Self {
        Self::new(ActionType::Created, Some(data))
    }

    pub fn updated(data: DataPayload) -> Self {
        Self::new(ActionType::Updated, Some(data))
    }

    pub fn deleted(data: DataPayload) -> Self {
        Self::new(ActionType::Deleted, Some(data))
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            action: ActionType::Rejected,
            data: None,
            transformed_error: Some(error.into()),
        }
    }

    /// True when the event carries a payload tagged `kind`.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.data.as_ref().is_some_and(|d| d.is_kind(kind))
    }

    pub fn is_change(&self) -> bool {
        !matches!(self.action, ActionType::NoChange | ActionType::Rejected)
    }
}
