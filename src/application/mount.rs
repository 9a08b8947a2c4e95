//! Write capability scoped to one contributor's mounted subtree.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{
    ContributorId, DomainError, DomainResult, NodeArena, NodeKey, NodeSpec, NodeView, TypeNodeData,
};

/// Handle passed to [`Contributor::refresh_nodes`](crate::application::Contributor::refresh_nodes).
///
/// Every write is checked against the mount point, so a contributor can only
/// change nodes at or below the node it was mounted at. Each call takes the
/// arena lock for its own duration only; do not expect two calls to be atomic
/// together.
#[derive(Clone)]
pub struct MountHandle {
    arena: Arc<Mutex<NodeArena>>,
    mount: NodeKey,
    owner: ContributorId,
}

impl MountHandle {
    pub(crate) fn new(arena: Arc<Mutex<NodeArena>>, mount: NodeKey, owner: ContributorId) -> Self {
        Self {
            arena,
            mount,
            owner,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.mount
    }

    pub fn owner(&self) -> ContributorId {
        self.owner
    }

    /// Snapshot of the mounted subtree. Fails if the mount was removed, e.g.
    /// because the contributor was disabled while a refresh was in flight.
    pub fn view(&self) -> DomainResult<NodeView> {
        self.arena
            .lock()
            .view(self.mount)
            .ok_or(DomainError::NodeNotFound(self.mount))
    }

    pub fn set_label(&self, label: impl Into<String>) -> DomainResult<()> {
        self.set_label_of(self.mount, label)
    }

    pub fn set_label_of(&self, key: NodeKey, label: impl Into<String>) -> DomainResult<()> {
        let mut arena = self.arena.lock();
        self.check(&arena, key)?;
        if let Some(node) = arena.get_mut(key) {
            node.label = label.into();
        }
        Ok(())
    }

    pub fn set_data(&self, data: TypeNodeData) -> DomainResult<()> {
        let mut arena = self.arena.lock();
        self.check(&arena, self.mount)?;
        if let Some(node) = arena.get_mut(self.mount) {
            node.data = data;
        }
        Ok(())
    }

    pub fn set_expanded(&self, expanded: bool) -> DomainResult<()> {
        let mut arena = self.arena.lock();
        self.check(&arena, self.mount)?;
        arena.set_expanded(self.mount, expanded)
    }

    /// Replaces the mount's children. Calling this twice with the same specs
    /// leaves one copy, which makes refreshes idempotent.
    pub fn replace_children(&self, specs: Vec<NodeSpec>) -> DomainResult<Vec<NodeKey>> {
        self.replace_children_of(self.mount, specs)
    }

    pub fn replace_children_of(
        &self,
        key: NodeKey,
        specs: Vec<NodeSpec>,
    ) -> DomainResult<Vec<NodeKey>> {
        let mut arena = self.arena.lock();
        self.check(&arena, key)?;
        arena.replace_children(key, specs)
    }

    pub fn append_child(&self, parent: NodeKey, spec: NodeSpec) -> DomainResult<NodeKey> {
        let mut arena = self.arena.lock();
        self.check(&arena, parent)?;
        arena.append_child(parent, spec)
    }

    fn check(&self, arena: &NodeArena, key: NodeKey) -> DomainResult<()> {
        if !arena.contains(self.mount) {
            return Err(DomainError::NodeNotFound(self.mount));
        }
        if !arena.is_descendant(self.mount, key) {
            return Err(DomainError::OutsideSubtree {
                mount: self.mount,
                key,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle")
            .field("mount", &self.mount)
            .field("owner", &self.owner)
            .finish()
    }
}
