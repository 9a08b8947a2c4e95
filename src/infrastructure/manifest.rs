//! Contributors described by a TOML manifest.
//!
//! ```toml
//! [[contributor]]
//! name = "watchlists"
//! order = 1
//! feature = "watchlists"          # optional: enabled while the flag is set
//! refresh_on = ["watchlist"]      # data kinds that trigger a refresh
//! drop_targets = ["watchlist"]
//! drop_kinds = ["security"]
//! deletable = ["watchlist"]
//!
//! [contributor.root]
//! label = "Watchlists"
//! expanded = true
//! data = { tree_node_type = "watchlist_root" }
//!
//! [[contributor.root.children]]
//! label = "Tech"
//! data = { tree_node_type = "watchlist", route = "watchlist", id = "1" }
//!
//! [[contributor.menu]]
//! node_type = "watchlist"
//! items = ["Edit", "-", "Delete"]
//! ```
//!
//! The root is mounted without children; `refresh_nodes` installs them.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::application::{
    CallbackBridge, Contributor, ContributorResult, MenuContext, MountHandle,
};
use crate::domain::{
    DataKind, DataPayload, MenuItem, NodeSpec, NodeView, ProcessedActionData, TreeNodeType,
};
use crate::infrastructure::flags::{FeatureFlags, FlagHandle};
use crate::infrastructure::{InfraError, InfraResult};

const SEPARATOR: &str = "-";

/// Menu entries offered for one node type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestMenu {
    pub node_type: TreeNodeType,
    pub items: Vec<String>,
}

/// One `[[contributor]]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContributorManifest {
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub refresh_on: Vec<DataKind>,
    #[serde(default)]
    pub drop_targets: Vec<TreeNodeType>,
    #[serde(default)]
    pub drop_kinds: Vec<DataKind>,
    #[serde(default)]
    pub deletable: Vec<TreeNodeType>,
    #[serde(default)]
    pub menu: Vec<ManifestMenu>,
    /// None: the contributor has no root nodes
    #[serde(default)]
    pub root: Option<NodeSpec>,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default, rename = "contributor")]
    contributors: Vec<ContributorManifest>,
}

pub struct ManifestContributor {
    manifest: ContributorManifest,
    flag: Option<FlagHandle>,
    callbacks: OnceLock<Arc<CallbackBridge>>,
    refreshes: AtomicUsize,
}

impl ManifestContributor {
    /// Binds the manifest's `feature` (if any) to `flags`.
    pub fn new(manifest: ContributorManifest, flags: &FeatureFlags) -> Self {
        let flag = manifest.feature.as_ref().map(|name| flags.flag(name.as_str()));
        Self {
            manifest,
            flag,
            callbacks: OnceLock::new(),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn manifest(&self) -> &ContributorManifest {
        &self.manifest
    }

    /// How many times `refresh_nodes` ran.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn request_refresh(&self) {
        if let Some(bridge) = self.callbacks.get() {
            bridge.refresh_tree();
        }
    }
}

#[async_trait]
impl Contributor for ManifestContributor {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn tree_order(&self) -> i32 {
        self.manifest.order
    }

    fn is_enabled(&self) -> bool {
        self.flag.as_ref().map_or(true, FlagHandle::is_enabled)
    }

    async fn root_nodes(&self) -> ContributorResult<Option<Vec<NodeSpec>>> {
        Ok(self.manifest.root.as_ref().map(|root| vec![root.shallow()]))
    }

    #[instrument(level = "debug", skip(self, mount), fields(contributor = %self.manifest.name))]
    async fn refresh_nodes(&self, mount: MountHandle) -> ContributorResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if let Some(root) = &self.manifest.root {
            mount.set_label(root.label.clone())?;
            let keys = mount.replace_children(root.children.clone())?;
            debug!("refreshed {} children", keys.len());
        }
        Ok(())
    }

    fn context_menu_items(&self, ctx: &MenuContext<'_>) -> Option<Vec<MenuItem>> {
        let menu = self
            .manifest
            .menu
            .iter()
            .find(|m| &m.node_type == ctx.node.node_type())?;
        let items = menu
            .items
            .iter()
            .map(|label| match label.as_str() {
                SEPARATOR => MenuItem::separator(),
                label => MenuItem::new(label),
            })
            .collect();
        Some(items)
    }

    fn should_refresh_on_data_change(&self, event: &ProcessedActionData) -> bool {
        event
            .data
            .as_ref()
            .is_some_and(|data| self.manifest.refresh_on.contains(&data.kind))
    }

    fn handle_delete(
        &self,
        node: &NodeView,
        id: &str,
    ) -> Option<BoxFuture<'static, ContributorResult<()>>> {
        if !self.manifest.deletable.contains(node.node_type()) {
            return None;
        }
        let name = self.manifest.name.clone();
        let label = node.label.clone();
        let id = id.to_string();
        let bridge = self.callbacks.get().cloned();
        Some(
            async move {
                info!("{}: deleted {} ({})", name, label, id);
                if let Some(bridge) = bridge {
                    bridge.refresh_tree();
                }
                Ok(())
            }
            .boxed(),
        )
    }

    fn can_drop(&self, target: &NodeView, payload: &DataPayload) -> bool {
        self.manifest.drop_targets.contains(target.node_type())
            && self.manifest.drop_kinds.contains(&payload.kind)
    }

    async fn handle_drop(
        &self,
        target: &NodeView,
        payload: &DataPayload,
        source_label: Option<&str>,
    ) -> ContributorResult<()> {
        info!(
            "{}: dropped {} from {} onto {}",
            self.manifest.name,
            payload.kind,
            source_label.unwrap_or("-"),
            target.label
        );
        self.request_refresh();
        Ok(())
    }

    fn set_callbacks(&self, bridge: Arc<CallbackBridge>) {
        if self.callbacks.set(bridge).is_err() {
            debug!("{}: callbacks already set", self.manifest.name);
        }
    }
}

impl std::fmt::Debug for ManifestContributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestContributor")
            .field("name", &self.manifest.name)
            .field("order", &self.manifest.order)
            .field("feature", &self.manifest.feature)
            .finish()
    }
}

/// Parses manifest text. `path` is only used in error messages.
pub fn parse_manifest(content: &str, path: &Path) -> InfraResult<Vec<ContributorManifest>> {
    let file: ManifestFile =
        toml::from_str(content).map_err(|e| InfraError::manifest(path, e.to_string()))?;

    let mut seen = HashSet::new();
    for manifest in &file.contributors {
        if manifest.name.trim().is_empty() {
            return Err(InfraError::manifest(path, "contributor without a name"));
        }
        if !seen.insert(manifest.name.as_str()) {
            return Err(InfraError::manifest(
                path,
                format!("duplicate contributor: {}", manifest.name),
            ));
        }
    }
    Ok(file.contributors)
}

/// Reads a manifest file and builds one contributor per `[[contributor]]`.
#[instrument(level = "debug", skip(flags))]
pub fn load_manifest(path: &Path, flags: &FeatureFlags) -> InfraResult<Vec<ManifestContributor>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read manifest {}", path.display()), e))?;
    let manifests = parse_manifest(&content, path)?;
    debug!("load_manifest: {} contributors", manifests.len());
    Ok(manifests
        .into_iter()
        .map(|manifest| ManifestContributor::new(manifest, flags))
        .collect())
}
