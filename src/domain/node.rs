//! Node payloads: the engine-level tag carried by every row, and the owned
//! shapes used to describe and snapshot subtrees.

use std::fmt;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Contributor-scoped discriminator used for menu, delete and refresh dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeNodeType(String);

impl TreeNodeType {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreeNodeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for TreeNodeType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TreeNodeType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Stable identity token handed to a contributor at registration.
///
/// Mounted subtrees are keyed by this token, never by array position, so
/// enabling or disabling another contributor cannot misroute a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContributorId(Uuid);

impl ContributorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContributorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a node in the arena. Generational, so a key to a removed node
/// never resolves to a node inserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(pub(crate) Index);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "{}v{}", slot, generation)
    }
}

/// Engine-level tag and payload of a node.
///
/// `parent_object` and `entity_object` are opaque snapshots of whatever
/// domain objects the owning contributor associated with the node; the engine
/// never inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeNodeData {
    pub tree_node_type: TreeNodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_object: Option<Value>,
    #[serde(default)]
    pub use_query_params: bool,
}

impl TypeNodeData {
    pub fn new(tree_node_type: impl Into<String>) -> Self {
        Self {
            tree_node_type: TreeNodeType::new(tree_node_type),
            route: None,
            id: None,
            parent_object: None,
            entity_object: None,
            use_query_params: false,
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_parent_object(mut self, value: Value) -> Self {
        self.parent_object = Some(value);
        self
    }

    pub fn with_entity_object(mut self, value: Value) -> Self {
        self.entity_object = Some(value);
        self
    }

    pub fn with_query_params(mut self) -> Self {
        self.use_query_params = true;
        self
    }

    /// Group nodes have no id and cannot be navigated to.
    pub fn is_navigable(&self) -> bool {
        self.route.is_some() && self.id.is_some()
    }
}

/// Owned description of a subtree, as produced by contributors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub label: String,
    #[serde(default)]
    pub expanded: bool,
    pub data: TypeNodeData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(label: impl Into<String>, data: TypeNodeData) -> Self {
        Self {
            label: label.into(),
            expanded: false,
            data,
            children: Vec::new(),
        }
    }

    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<NodeSpec>) -> Self {
        self.children = children;
        self
    }

    /// Same node without its descendants.
    pub fn shallow(&self) -> Self {
        Self {
            label: self.label.clone(),
            expanded: self.expanded,
            data: self.data.clone(),
            children: Vec::new(),
        }
    }
}

/// Owned snapshot of an arena subtree, handed to renderers and contributor hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub key: NodeKey,
    pub label: String,
    pub expanded: bool,
    pub data: TypeNodeData,
    pub children: Vec<NodeView>,
}

impl NodeView {
    pub fn node_type(&self) -> &TreeNodeType {
        &self.data.tree_node_type
    }

    /// Preorder search by key within this snapshot.
    pub fn find(&self, key: NodeKey) -> Option<&NodeView> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(key))
    }

    /// Follows a path of labels starting at this node's children.
    pub fn find_by_labels(&self, labels: &[&str]) -> Option<&NodeView> {
        match labels.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .children
                .iter()
                .find(|child| child.label == *head)
                .and_then(|child| child.find_by_labels(rest)),
        }
    }
}
