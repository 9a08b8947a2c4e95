#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use navcompose::application::{
    CallbackBridge, Contributor, ContributorError, ContributorResult, MenuContext, MountHandle,
};
use navcompose::domain::{
    DataPayload, MenuItem, NodeSpec, NodeView, ProcessedActionData, TypeNodeData,
};

enum Roots {
    One(String),
    None,
    Fail(String),
}

/// Configurable in-memory contributor.
///
/// Its root is typed `<name>_root`, its children `<name>_item` with the
/// child label as id.
pub struct TestContributor {
    name: String,
    order: i32,
    enabled: AtomicBool,
    roots: Roots,
    children: Vec<String>,
    refresh_on: Vec<String>,
    menu: Option<(String, Vec<String>)>,
    drop_kind: Option<String>,
    deletable: Option<String>,
    fail_refresh: bool,
    delay: Option<Duration>,
    refresh_delays: Vec<Duration>,
    refreshes: AtomicUsize,
    callbacks_set: AtomicUsize,
    drops: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    bridge: OnceLock<Arc<CallbackBridge>>,
}

impl TestContributor {
    pub fn new(name: &str, order: i32) -> Self {
        Self {
            name: name.to_string(),
            order,
            enabled: AtomicBool::new(true),
            roots: Roots::One(name.to_uppercase()),
            children: Vec::new(),
            refresh_on: Vec::new(),
            menu: None,
            drop_kind: None,
            deletable: None,
            fail_refresh: false,
            delay: None,
            refresh_delays: Vec::new(),
            refreshes: AtomicUsize::new(0),
            callbacks_set: AtomicUsize::new(0),
            drops: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            bridge: OnceLock::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn without_roots(mut self) -> Self {
        self.roots = Roots::None;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.roots = Roots::Fail(message.to_string());
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn disabled(self) -> Self {
        self.enabled.store(false, Ordering::SeqCst);
        self
    }

    /// Answer `root_nodes` only after `delay`.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The n-th refresh waits `delays[n]` before installing its children,
    /// and tags each child label with `@n`.
    pub fn staggered_refresh(mut self, delays: &[Duration]) -> Self {
        self.refresh_delays = delays.to_vec();
        self
    }

    pub fn with_children(mut self, labels: &[&str]) -> Self {
        self.children = labels.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn refresh_on(mut self, kind: &str) -> Self {
        self.refresh_on.push(kind.to_string());
        self
    }

    /// Offer `labels` as menu for nodes of `node_type`. An empty list
    /// answers `Some(vec![])`.
    pub fn with_menu(mut self, node_type: &str, labels: &[&str]) -> Self {
        self.menu = Some((
            node_type.to_string(),
            labels.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn accepts_drop(mut self, kind: &str) -> Self {
        self.drop_kind = Some(kind.to_string());
        self
    }

    pub fn deletes(mut self, node_type: &str) -> Self {
        self.deletable = Some(node_type.to_string());
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn root_type(&self) -> String {
        format!("{}_root", self.name)
    }

    pub fn item_type(&self) -> String {
        format!("{}_item", self.name)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// How many times `set_callbacks` was called.
    pub fn callbacks_set(&self) -> usize {
        self.callbacks_set.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> Vec<String> {
        self.drops.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().clone()
    }

    pub fn bridge(&self) -> Option<Arc<CallbackBridge>> {
        self.bridge.get().cloned()
    }
}

#[async_trait]
impl Contributor for TestContributor {
    fn name(&self) -> &str {
        &self.name
    }

    fn tree_order(&self) -> i32 {
        self.order
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn root_nodes(&self) -> ContributorResult<Option<Vec<NodeSpec>>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.roots {
            Roots::One(label) => Ok(Some(vec![NodeSpec::new(
                label.clone(),
                TypeNodeData::new(self.root_type()),
            )])),
            Roots::None => Ok(None),
            Roots::Fail(message) => Err(ContributorError::failed(message.clone())),
        }
    }

    async fn refresh_nodes(&self, mount: MountHandle) -> ContributorResult<()> {
        let call = self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.refresh_delays.get(call) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_refresh {
            return Err(ContributorError::failed("backend down"));
        }
        let staggered = !self.refresh_delays.is_empty();
        let specs = self
            .children
            .iter()
            .map(|label| {
                let data = TypeNodeData::new(self.item_type()).with_id(label.clone());
                if staggered {
                    NodeSpec::new(format!("{}@{}", label, call), data)
                } else {
                    NodeSpec::new(label.clone(), data)
                }
            })
            .collect();
        mount.replace_children(specs)?;
        Ok(())
    }

    fn context_menu_items(&self, ctx: &MenuContext<'_>) -> Option<Vec<MenuItem>> {
        let (node_type, labels) = self.menu.as_ref()?;
        if ctx.node.node_type() != node_type.as_str() {
            return None;
        }
        Some(labels.iter().map(|l| MenuItem::new(l.clone())).collect())
    }

    fn should_refresh_on_data_change(&self, event: &ProcessedActionData) -> bool {
        self.refresh_on.iter().any(|kind| event.is_kind(kind))
    }

    fn handle_delete(
        &self,
        node: &NodeView,
        id: &str,
    ) -> Option<BoxFuture<'static, ContributorResult<()>>> {
        let node_type = self.deletable.as_ref()?;
        if node.node_type() != node_type.as_str() {
            return None;
        }
        self.deletes.lock().push(id.to_string());
        Some(async { Ok(()) }.boxed())
    }

    fn can_drop(&self, _target: &NodeView, payload: &DataPayload) -> bool {
        self.drop_kind
            .as_deref()
            .is_some_and(|kind| payload.is_kind(kind))
    }

    async fn handle_drop(
        &self,
        target: &NodeView,
        _payload: &DataPayload,
        _source_label: Option<&str>,
    ) -> ContributorResult<()> {
        self.drops.lock().push(target.label.clone());
        Ok(())
    }

    fn set_callbacks(&self, bridge: Arc<CallbackBridge>) {
        self.callbacks_set.fetch_add(1, Ordering::SeqCst);
        let _ = self.bridge.set(bridge);
    }
}

pub fn contributors(list: &[&Arc<TestContributor>]) -> Vec<Arc<dyn Contributor>> {
    list.iter()
        .map(|c| Arc::clone(c) as Arc<dyn Contributor>)
        .collect()
}

pub fn root_labels(roots: &[NodeView]) -> Vec<String> {
    roots.iter().map(|r| r.label.clone()).collect()
}

pub fn child_labels(node: &NodeView) -> Vec<String> {
    node.children.iter().map(|c| c.label.clone()).collect()
}

/// Polls `condition` until it holds or one second passed.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
