use generational_arena::Arena;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{ContributorId, NodeKey, NodeSpec, NodeView, TypeNodeData};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Display text, possibly replaced on refresh
    pub label: String,
    pub expanded: bool,
    pub data: TypeNodeData,
    /// Contributor that mounted this node's subtree
    pub owner: ContributorId,
    /// Parent key, None for composed roots
    pub parent: Option<NodeKey>,
    /// Ordered child keys
    pub children: Vec<NodeKey>,
}

/// Arena storage for every node of the composed navigation tree.
///
/// Roots are not tracked here: the ordered root list belongs to the
/// composition engine. The arena only knows parent/child links and owners.
#[derive(Debug, Default)]
pub struct NodeArena {
    arena: Arena<TreeNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.arena.contains(key.0)
    }

    pub fn get(&self, key: NodeKey) -> Option<&TreeNode> {
        self.arena.get(key.0)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut TreeNode> {
        self.arena.get_mut(key.0)
    }

    pub fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.get(key).and_then(|node| node.parent)
    }

    /// Inserts `spec` and all its descendants, attaching the new subtree to
    /// `parent` (appended after existing children) or leaving it detached as
    /// a root when `parent` is None.
    #[instrument(level = "trace", skip(self, spec), fields(label = %spec.label))]
    pub fn insert_tree(
        &mut self,
        spec: NodeSpec,
        parent: Option<NodeKey>,
        owner: ContributorId,
    ) -> DomainResult<NodeKey> {
        validate_spec(&spec)?;
        if let Some(parent_key) = parent {
            if !self.contains(parent_key) {
                return Err(DomainError::NodeNotFound(parent_key));
            }
        }

        let mut top = None;
        let mut stack = vec![(spec, parent)];

        while let Some((current, parent_key)) = stack.pop() {
            let NodeSpec {
                label,
                expanded,
                data,
                children,
            } = current;

            let key = NodeKey(self.arena.insert(TreeNode {
                label,
                expanded,
                data,
                owner,
                parent: parent_key,
                children: Vec::new(),
            }));

            if let Some(parent_node) = parent_key.and_then(|p| self.get_mut(p)) {
                parent_node.children.push(key);
            }
            if top.is_none() {
                top = Some(key);
            }

            // Reverse so siblings are popped, and therefore appended, in order
            for child in children.into_iter().rev() {
                stack.push((child, Some(key)));
            }
        }

        top.ok_or_else(|| DomainError::InvalidNodeSpec("empty subtree".to_string()))
    }

    /// Appends a new subtree below `parent`.
    pub fn append_child(&mut self, parent: NodeKey, spec: NodeSpec) -> DomainResult<NodeKey> {
        let owner = self
            .get(parent)
            .map(|node| node.owner)
            .ok_or(DomainError::NodeNotFound(parent))?;
        self.insert_tree(spec, Some(parent), owner)
    }

    /// Drops every descendant of `key` and inserts `specs` in their place.
    ///
    /// All specs are validated before anything is removed, so a bad spec
    /// leaves the previous children intact.
    #[instrument(level = "debug", skip(self, specs), fields(count = specs.len()))]
    pub fn replace_children(
        &mut self,
        key: NodeKey,
        specs: Vec<NodeSpec>,
    ) -> DomainResult<Vec<NodeKey>> {
        let owner = self
            .get(key)
            .map(|node| node.owner)
            .ok_or(DomainError::NodeNotFound(key))?;
        for spec in &specs {
            validate_spec(spec)?;
        }

        let old_children = self
            .get_mut(key)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in old_children {
            self.remove_detached(child);
        }

        specs
            .into_iter()
            .map(|spec| self.insert_tree(spec, Some(key), owner))
            .collect()
    }

    /// Removes `key` and its descendants, detaching it from its parent.
    /// Returns the number of nodes removed.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, key: NodeKey) -> DomainResult<usize> {
        let parent = self
            .get(key)
            .map(|node| node.parent)
            .ok_or(DomainError::NodeNotFound(key))?;

        if let Some(parent_node) = parent.and_then(|p| self.get_mut(p)) {
            parent_node.children.retain(|child| *child != key);
        }
        Ok(self.remove_detached(key))
    }

    fn remove_detached(&mut self, key: NodeKey) -> usize {
        let keys: Vec<NodeKey> = self.iter_subtree(key).map(|(k, _)| k).collect();
        for k in &keys {
            self.arena.remove(k.0);
        }
        keys.len()
    }

    /// True when `key` is `ancestor` itself or lies below it.
    pub fn is_descendant(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.parent_of(k);
        }
        false
    }

    pub fn set_expanded(&mut self, key: NodeKey, expanded: bool) -> DomainResult<()> {
        let node = self.get_mut(key).ok_or(DomainError::NodeNotFound(key))?;
        node.expanded = expanded;
        Ok(())
    }

    /// Owned snapshot of the subtree rooted at `key`.
    pub fn view(&self, key: NodeKey) -> Option<NodeView> {
        let node = self.get(key)?;
        Some(NodeView {
            key,
            label: node.label.clone(),
            expanded: node.expanded,
            data: node.data.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.view(*child))
                .collect(),
        })
    }

    pub fn depth(&self, key: NodeKey) -> usize {
        match self.get(key) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|child| self.depth(*child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Preorder traversal of the subtree rooted at `key`.
    pub fn iter_subtree(&self, key: NodeKey) -> SubtreeIterator<'_> {
        SubtreeIterator::new(self, key)
    }
}

fn validate_spec(spec: &NodeSpec) -> DomainResult<()> {
    let mut stack = vec![spec];
    while let Some(current) = stack.pop() {
        if current.data.tree_node_type.as_str().is_empty() {
            return Err(DomainError::InvalidNodeSpec(format!(
                "node '{}' has an empty tree node type",
                current.label
            )));
        }
        stack.extend(current.children.iter());
    }
    Ok(())
}

pub struct SubtreeIterator<'a> {
    arena: &'a NodeArena,
    stack: Vec<NodeKey>,
}

impl<'a> SubtreeIterator<'a> {
    fn new(arena: &'a NodeArena, start: NodeKey) -> Self {
        let mut stack = Vec::new();
        if arena.contains(start) {
            stack.push(start);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for SubtreeIterator<'a> {
    type Item = (NodeKey, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.arena.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}
