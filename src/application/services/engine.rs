//! Tree composition engine
//!
//! Builds one navigation tree out of every enabled contributor's fragment,
//! keeps each fragment attached to its contributor across refreshes, and
//! routes menu/drag/drop/delete requests to the first contributor that
//! claims them.
//!
//! ## Composition
//!
//! ```text
//! registry (sorted)        arena                      roots
//!   A(order 0) ──────────▶ [A-root]─┬─ a1              [A-root,
//!   C(order 1) ──────────▶ [C-root] └─ a2               C-root,
//!   B(order 2) ──────────▶ [B-root]─── b1               B-root]
//!
//! mounts: { id(A) → [A-root], id(C) → [C-root], id(B) → [B-root] }
//! ```
//!
//! Mounts are keyed by contributor identity, so enabling or disabling one
//! contributor never shifts another one's refresh target.
//!
//! ## Locking
//!
//! `composition` and `arena` are only held for synchronous sections, never
//! across `.await` or a contributor call. When both are needed the
//! composition lock is taken first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::application::bridge::CallbackBridge;
use crate::application::contributor::MenuContext;
use crate::application::mount::MountHandle;
use crate::application::registry::{ContributorRegistry, RegisteredContributor};
use crate::application::{
    ApplicationError, ApplicationResult, ContributorError, ContributorResult, ContributorResultExt,
};
use crate::config::FailurePolicy;
use crate::domain::{
    ContributorId, DataPayload, DomainError, DomainResult, MenuItem, NodeArena, NodeKey, NodeSpec,
    NodeView, ProcessedActionData,
};

/// Observable lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Building,
    Ready,
    /// Ready, with `in_flight` refresh rounds still running. Rounds may overlap.
    Refreshing { in_flight: usize },
}

/// A contributor left out of a round because its source failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorFailure {
    pub id: ContributorId,
    pub name: String,
    pub message: String,
}

impl ContributorFailure {
    fn new(entry: &RegisteredContributor, error: &ContributorError) -> Self {
        Self {
            id: entry.id(),
            name: entry.name().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Length of the composed root list
    pub roots: usize,
    /// Contributors that mounted at least one root
    pub mounted: Vec<String>,
    /// Contributors that answered "no root nodes"
    pub empty: Vec<String>,
    pub failed: Vec<ContributorFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<ContributorFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub mounted: Vec<String>,
    pub unmounted: Vec<String>,
    /// Newly mounted contributors refreshed right after mounting
    pub refreshed: Vec<String>,
    pub failed: Vec<ContributorFailure>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty() && self.unmounted.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Building,
    Ready,
}

#[derive(Debug)]
struct Composition {
    phase: Phase,
    in_flight: usize,
    /// Contributors taken into account by the last build/reconcile, sorted
    active: Vec<ContributorId>,
    mounts: HashMap<ContributorId, Vec<NodeKey>>,
    roots: Vec<NodeKey>,
}

impl Composition {
    fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            in_flight: 0,
            active: Vec::new(),
            mounts: HashMap::new(),
            roots: Vec::new(),
        }
    }

    fn rebuild_roots(&mut self) {
        let roots = self
            .active
            .iter()
            .filter_map(|id| self.mounts.get(id))
            .flatten()
            .copied()
            .collect();
        self.roots = roots;
    }
}

/// Marks a refresh round as in flight for the lifetime of the guard.
struct RefreshGuard<'a> {
    composition: &'a Mutex<Composition>,
}

impl<'a> RefreshGuard<'a> {
    fn enter(composition: &'a Mutex<Composition>) -> Self {
        composition.lock().in_flight += 1;
        Self { composition }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut composition = self.composition.lock();
        composition.in_flight = composition.in_flight.saturating_sub(1);
    }
}

type Fetched<'a> = Vec<(&'a RegisteredContributor, ContributorResult<Option<Vec<NodeSpec>>>)>;
type Succeeded<'a> = Vec<(&'a RegisteredContributor, Option<Vec<NodeSpec>>)>;

pub struct TreeCompositionEngine {
    registry: ContributorRegistry,
    policy: FailurePolicy,
    refresh_on_mount: bool,
    arena: Arc<Mutex<NodeArena>>,
    composition: Mutex<Composition>,
    callbacks_installed: AtomicBool,
}

impl TreeCompositionEngine {
    pub fn new(registry: ContributorRegistry, policy: FailurePolicy) -> Self {
        Self {
            registry,
            policy,
            refresh_on_mount: true,
            arena: Arc::new(Mutex::new(NodeArena::new())),
            composition: Mutex::new(Composition::new()),
            callbacks_installed: AtomicBool::new(false),
        }
    }

    /// Whether contributors mounted by `reconcile_enablement` are refreshed
    /// right away. On by default.
    pub fn with_refresh_on_mount(mut self, enabled: bool) -> Self {
        self.refresh_on_mount = enabled;
        self
    }

    pub fn registry(&self) -> &ContributorRegistry {
        &self.registry
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn state(&self) -> EngineState {
        let composition = self.composition.lock();
        match (composition.phase, composition.in_flight) {
            (Phase::Uninitialized, _) => EngineState::Uninitialized,
            (Phase::Building, _) => EngineState::Building,
            (Phase::Ready, 0) => EngineState::Ready,
            (Phase::Ready, in_flight) => EngineState::Refreshing { in_flight },
        }
    }

    /// Hands the bridge to every registered contributor, enabled or not.
    /// Only the first call has an effect.
    pub fn install_callbacks(&self, bridge: Arc<CallbackBridge>) -> bool {
        if self.callbacks_installed.swap(true, Ordering::SeqCst) {
            debug!("install_callbacks: already installed");
            return false;
        }
        for entry in self.registry.entries() {
            entry.contributor().set_callbacks(bridge.clone());
        }
        true
    }

    // ============================================================
    // Composition
    // ============================================================

    /// Builds the composed tree, replacing any previous one.
    ///
    /// Every active contributor is asked for its roots in registry order;
    /// the tree is installed once all of them have answered.
    #[instrument(level = "debug", skip(self))]
    pub async fn build_tree(&self) -> ApplicationResult<BuildReport> {
        let previous = {
            let mut composition = self.composition.lock();
            let previous = composition.phase;
            composition.phase = Phase::Building;
            previous
        };

        let active = self.registry.active();
        let fetched = self.fetch_roots(&active).await;

        match self.install_tree(&active, fetched) {
            Ok(report) => {
                info!(
                    "build_tree: {} roots from {} contributors, {} failed",
                    report.roots,
                    report.mounted.len(),
                    report.failed.len()
                );
                Ok(report)
            }
            Err(e) => {
                self.composition.lock().phase = previous;
                Err(e)
            }
        }
    }

    async fn fetch_roots<'a>(&self, entries: &[&'a RegisteredContributor]) -> Fetched<'a> {
        if entries.is_empty() {
            debug!("fetch_roots: no contributors");
            return Vec::new();
        }
        let requests = entries.iter().map(|entry| async move {
            debug!("fetch_roots: requesting {}", entry.name());
            (*entry, entry.contributor().root_nodes().await)
        });
        join_all(requests).await
    }

    /// Splits fetched roots into successes and failures. Under
    /// `FailTogether` the first failure in registry order becomes the error.
    fn split_fetched<'a>(
        &self,
        fetched: Fetched<'a>,
    ) -> ApplicationResult<(Succeeded<'a>, Vec<ContributorFailure>)> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut first_error = None;

        for (entry, result) in fetched {
            match result {
                Ok(specs) => succeeded.push((entry, specs)),
                Err(e) => {
                    warn!("contributor {} failed to provide roots: {}", entry.name(), e);
                    failed.push(ContributorFailure::new(entry, &e));
                    if first_error.is_none() {
                        first_error = Some((entry.name().to_string(), e));
                    }
                }
            }
        }

        match (self.policy, first_error) {
            (FailurePolicy::FailTogether, Some((name, source))) => {
                Err(ApplicationError::Contributor { name, source })
            }
            _ => Ok((succeeded, failed)),
        }
    }

    fn install_tree(
        &self,
        active: &[&RegisteredContributor],
        fetched: Fetched<'_>,
    ) -> ApplicationResult<BuildReport> {
        let (succeeded, mut failed) = self.split_fetched(fetched)?;

        let mut composition = self.composition.lock();
        let mut arena = self.arena.lock();

        let mut report = BuildReport::default();
        let mut mounts = HashMap::new();
        let mut unmounted = Vec::new();

        for (entry, specs) in succeeded {
            match specs.filter(|s| !s.is_empty()) {
                None => report.empty.push(entry.name().to_string()),
                Some(specs) => match mount_specs(&mut arena, entry.id(), specs) {
                    Ok(keys) => {
                        report.mounted.push(entry.name().to_string());
                        mounts.insert(entry.id(), keys);
                    }
                    Err(e) => {
                        warn!("contributor {} returned invalid roots: {}", entry.name(), e);
                        if self.policy == FailurePolicy::FailTogether {
                            for key in mounts.into_values().flatten() {
                                arena.remove_subtree(key).ok();
                            }
                            return Err(ApplicationError::Contributor {
                                name: entry.name().to_string(),
                                source: e.into(),
                            });
                        }
                        let source: ContributorError = e.into();
                        failed.push(ContributorFailure::new(entry, &source));
                        unmounted.push(entry.id());
                    }
                },
            }
        }

        // Drop the previous tree only once the new one is in place
        for key in std::mem::take(&mut composition.mounts)
            .into_values()
            .flatten()
        {
            arena.remove_subtree(key).ok();
        }

        let failed_ids: Vec<ContributorId> = failed.iter().map(|f| f.id).collect();
        composition.active = active
            .iter()
            .map(|e| e.id())
            .filter(|id| !failed_ids.contains(id) && !unmounted.contains(id))
            .collect();
        composition.mounts = mounts;
        composition.rebuild_roots();
        composition.phase = Phase::Ready;

        report.roots = composition.roots.len();
        report.failed = failed;
        Ok(report)
    }

    /// Refreshes every mounted, enabled contributor.
    #[instrument(level = "debug", skip(self))]
    pub async fn refresh_all_nodes(&self) -> ApplicationResult<RefreshReport> {
        let targets = self.registry.active();
        self.refresh_targets(targets).await
    }

    /// Refreshes the contributors interested in `event`.
    ///
    /// Rounds are neither cancelled nor serialized: two overlapping rounds
    /// for the same contributor both run, and the one completing last
    /// determines the subtree.
    #[instrument(level = "debug", skip(self, event), fields(action = ?event.action))]
    pub async fn refresh_nodes_for_data_change(
        &self,
        event: &ProcessedActionData,
    ) -> ApplicationResult<RefreshReport> {
        let targets: Vec<&RegisteredContributor> = self
            .registry
            .active()
            .into_iter()
            .filter(|entry| entry.contributor().should_refresh_on_data_change(event))
            .collect();
        if targets.is_empty() {
            debug!("refresh_nodes_for_data_change: no contributor interested");
            return Ok(RefreshReport::default());
        }
        self.refresh_targets(targets).await
    }

    async fn refresh_targets(
        &self,
        targets: Vec<&RegisteredContributor>,
    ) -> ApplicationResult<RefreshReport> {
        let mounted: Vec<(&RegisteredContributor, NodeKey)> = {
            let composition = self.composition.lock();
            targets
                .into_iter()
                .filter_map(|entry| {
                    composition
                        .mounts
                        .get(&entry.id())
                        .and_then(|keys| keys.first())
                        .map(|key| (entry, *key))
                })
                .collect()
        };
        if mounted.is_empty() {
            return Ok(RefreshReport::default());
        }

        let _guard = RefreshGuard::enter(&self.composition);
        let calls = mounted.iter().map(|(entry, key)| {
            let handle = MountHandle::new(self.arena.clone(), *key, entry.id());
            async move {
                debug!("refresh: {} at {}", entry.name(), handle.key());
                (*entry, entry.contributor().refresh_nodes(handle).await)
            }
        });
        let results = join_all(calls).await;

        let mut report = RefreshReport::default();
        let mut first_error = None;
        for (entry, result) in results {
            match result {
                Ok(()) => report.refreshed.push(entry.name().to_string()),
                Err(e) => {
                    warn!("contributor {} failed to refresh: {}", entry.name(), e);
                    report.failed.push(ContributorFailure::new(entry, &e));
                    if first_error.is_none() {
                        first_error = Some((entry.name().to_string(), e));
                    }
                }
            }
        }

        match (self.policy, first_error) {
            (FailurePolicy::FailTogether, Some((name, source))) => {
                Err(ApplicationError::Contributor { name, source })
            }
            _ => Ok(report),
        }
    }

    /// Re-evaluates enablement: unmounts contributors that were switched off
    /// and mounts those switched on, at their sorted position, refreshing
    /// them unless disabled with [`with_refresh_on_mount`](Self::with_refresh_on_mount).
    /// Contributors whose last build failed are retried.
    #[instrument(level = "debug", skip(self))]
    pub async fn reconcile_enablement(&self) -> ApplicationResult<ReconcileReport> {
        let active = self.registry.active();
        let active_ids: Vec<ContributorId> = active.iter().map(|e| e.id()).collect();

        let (enabled, disabled) = {
            let composition = self.composition.lock();
            if composition.phase == Phase::Uninitialized {
                debug!("reconcile_enablement: nothing built yet");
                return Ok(ReconcileReport::default());
            }
            let enabled: Vec<&RegisteredContributor> = active
                .iter()
                .filter(|e| !composition.active.contains(&e.id()))
                .copied()
                .collect();
            let disabled: Vec<ContributorId> = composition
                .active
                .iter()
                .filter(|id| !active_ids.contains(id))
                .copied()
                .collect();
            (enabled, disabled)
        };

        let mut report = ReconcileReport::default();

        if !disabled.is_empty() {
            let mut composition = self.composition.lock();
            let mut arena = self.arena.lock();
            for id in &disabled {
                for key in composition.mounts.remove(id).unwrap_or_default() {
                    arena.remove_subtree(key).ok();
                }
                let name = self
                    .registry
                    .get(*id)
                    .map(|e| e.name().to_string())
                    .unwrap_or_else(|| id.to_string());
                info!("reconcile: unmounted {}", name);
                report.unmounted.push(name);
            }
            composition.active.retain(|id| !disabled.contains(id));
            composition.rebuild_roots();
        }

        if !enabled.is_empty() {
            let fetched = self.fetch_roots(&enabled).await;
            let (succeeded, failed) = self.split_fetched(fetched)?;
            report.failed = failed;

            let mut newly_mounted = Vec::new();
            {
                let mut composition = self.composition.lock();
                let mut arena = self.arena.lock();
                for (entry, specs) in succeeded {
                    if let Some(specs) = specs.filter(|s| !s.is_empty()) {
                        match mount_specs(&mut arena, entry.id(), specs) {
                            Ok(keys) => {
                                info!("reconcile: mounted {}", entry.name());
                                composition.mounts.insert(entry.id(), keys);
                                report.mounted.push(entry.name().to_string());
                                newly_mounted.push(entry);
                            }
                            Err(e) => {
                                warn!("contributor {} returned invalid roots: {}", entry.name(), e);
                                let source: ContributorError = e.into();
                                report.failed.push(ContributorFailure::new(entry, &source));
                                continue;
                            }
                        }
                    }
                    composition.active.push(entry.id());
                }
                // Restore registry order
                composition
                    .active
                    .sort_by_key(|id| active_ids.iter().position(|o| o == id));
                composition.rebuild_roots();
            }

            // Mounted roots may be shallow until their first refresh
            if self.refresh_on_mount && !newly_mounted.is_empty() {
                let refreshed = self.refresh_targets(newly_mounted).await?;
                report.refreshed = refreshed.refreshed;
                report.failed.extend(refreshed.failed);
            }
        }

        Ok(report)
    }

    // ============================================================
    // Dispatch
    // ============================================================

    /// Menu of the first contributor, in tree order, that returns a
    /// non-empty one. Menus are never merged.
    #[instrument(level = "debug", skip(self))]
    pub fn context_menu_items(
        &self,
        node: NodeKey,
        selected: Option<NodeKey>,
    ) -> Option<Vec<MenuItem>> {
        let (view, parent, selected) = {
            let arena = self.arena.lock();
            let view = arena.view(node)?;
            let parent = arena
                .parent_of(node)
                .and_then(|p| arena.get(p))
                .map(|n| n.data.clone());
            let selected = selected
                .and_then(|k| arena.get(k))
                .map(|n| n.data.clone());
            (view, parent, selected)
        };
        let ctx = MenuContext {
            node: &view,
            parent: parent.as_ref(),
            selected: selected.as_ref(),
        };

        self.registry.active().into_iter().find_map(|entry| {
            let items = entry
                .contributor()
                .context_menu_items(&ctx)
                .filter(|items| !items.is_empty())?;
            debug!("context menu for {} from {}", view.node_type(), entry.name());
            Some(items)
        })
    }

    pub fn can_drop(&self, target: NodeKey, payload: &DataPayload) -> bool {
        let Some(view) = self.node(target) else {
            return false;
        };
        self.registry
            .active()
            .into_iter()
            .any(|entry| entry.contributor().can_drop(&view, payload))
    }

    /// Hands the drop to the first contributor whose `can_drop` answers
    /// true. Returns false when nobody claims it.
    #[instrument(level = "debug", skip(self, payload), fields(kind = %payload.kind))]
    pub async fn handle_drop(
        &self,
        target: NodeKey,
        payload: &DataPayload,
        source_label: Option<&str>,
    ) -> ApplicationResult<bool> {
        let Some(view) = self.node(target) else {
            debug!("handle_drop: unknown target {}", target);
            return Ok(false);
        };
        for entry in self.registry.active() {
            if entry.contributor().can_drop(&view, payload) {
                debug!("handle_drop: claimed by {}", entry.name());
                entry
                    .contributor()
                    .handle_drop(&view, payload, source_label)
                    .await
                    .for_contributor(entry.name())?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs the delete of the first contributor that claims the node.
    #[instrument(level = "debug", skip(self))]
    pub async fn handle_delete(&self, node: NodeKey, id: &str) -> ApplicationResult<bool> {
        let Some(view) = self.node(node) else {
            debug!("handle_delete: unknown node {}", node);
            return Ok(false);
        };
        for entry in self.registry.active() {
            if let Some(delete) = entry.contributor().handle_delete(&view, id) {
                debug!("handle_delete: claimed by {}", entry.name());
                delete.await.for_contributor(entry.name())?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Forwards every broadcast data-change event to
    /// [`refresh_nodes_for_data_change`](Self::refresh_nodes_for_data_change),
    /// one event at a time, until the channel closes.
    pub fn spawn_data_change_listener(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<ProcessedActionData>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if let Err(e) = self.refresh_nodes_for_data_change(&event).await {
                            warn!("data change refresh failed: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("data change listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("data change channel closed");
                        break;
                    }
                }
            }
        })
    }

    // ============================================================
    // Read access for renderers
    // ============================================================

    /// Number of enabled contributors.
    pub fn contributor_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn root_keys(&self) -> Vec<NodeKey> {
        self.composition.lock().roots.clone()
    }

    /// Snapshot of the composed tree in root order.
    pub fn portfolio_trees(&self) -> Vec<NodeView> {
        let roots = self.root_keys();
        let arena = self.arena.lock();
        roots.into_iter().filter_map(|key| arena.view(key)).collect()
    }

    pub fn node(&self, key: NodeKey) -> Option<NodeView> {
        self.arena.lock().view(key)
    }

    pub fn mount_of(&self, id: ContributorId) -> Vec<NodeKey> {
        self.composition
            .lock()
            .mounts
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshots of the roots mounted by the contributor called `name`.
    pub fn contributor_roots(&self, name: &str) -> Vec<NodeView> {
        let Some(entry) = self.registry.find_by_name(name) else {
            return Vec::new();
        };
        let keys = self.mount_of(entry.id());
        let arena = self.arena.lock();
        keys.into_iter().filter_map(|key| arena.view(key)).collect()
    }

    pub fn set_expanded(&self, key: NodeKey, expanded: bool) -> DomainResult<()> {
        self.arena.lock().set_expanded(key, expanded)
    }

    /// Flips the expansion flag and returns the new value.
    pub fn toggle_expanded(&self, key: NodeKey) -> DomainResult<bool> {
        let mut arena = self.arena.lock();
        let expanded = !arena
            .get(key)
            .map(|n| n.expanded)
            .ok_or(DomainError::NodeNotFound(key))?;
        arena.set_expanded(key, expanded)?;
        Ok(expanded)
    }
}

/// Inserts a contributor's roots, rolling back the ones already inserted if
/// a later one is invalid.
fn mount_specs(
    arena: &mut NodeArena,
    owner: ContributorId,
    specs: Vec<NodeSpec>,
) -> DomainResult<Vec<NodeKey>> {
    let mut keys = Vec::with_capacity(specs.len());
    for spec in specs {
        match arena.insert_tree(spec, None, owner) {
            Ok(key) => keys.push(key),
            Err(e) => {
                for key in keys {
                    arena.remove_subtree(key).ok();
                }
                return Err(e);
            }
        }
    }
    Ok(keys)
}

impl std::fmt::Debug for TreeCompositionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeCompositionEngine")
            .field("contributors", &self.registry.len())
            .field("policy", &self.policy)
            .field("refresh_on_mount", &self.refresh_on_mount)
            .field("state", &self.state())
            .finish()
    }
}
