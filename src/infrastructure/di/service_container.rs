//! Service container for dependency injection
//!
//! Wires settings, flags, the data-change bus, the registry, the engine and
//! the callback bridge together, and owns the background tasks that keep the
//! tree in sync.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::application::services::{BuildReport, TreeCompositionEngine, TreeEventRouter};
use crate::application::{CallbackBridge, Contributor, ContributorRegistry, HostRequest};
use crate::config::Settings;
use crate::domain::ProcessedActionData;
use crate::infrastructure::events::DataChangeBus;
use crate::infrastructure::flags::FeatureFlags;
use crate::infrastructure::manifest::load_manifest;
use crate::infrastructure::traits::{
    DialogHandler, Navigator, NoopDialogs, RenderAdapter, TracingNavigator,
};
use crate::infrastructure::InfraResult;

/// Container holding the engine and everything around it.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Session flags, seeded from `settings.features`
    pub flags: FeatureFlags,

    pub bus: DataChangeBus,
    pub engine: Arc<TreeCompositionEngine>,
    pub bridge: Arc<CallbackBridge>,
    pub router: TreeEventRouter,

    host_requests: Mutex<Option<mpsc::UnboundedReceiver<HostRequest>>>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceContainer {
    /// Create a container for a headless host: dialogs never change
    /// anything and navigation is logged.
    pub fn new(
        settings: Settings,
        flags: FeatureFlags,
        contributors: Vec<Arc<dyn Contributor>>,
    ) -> Self {
        Self::with_deps(
            settings,
            flags,
            contributors,
            Arc::new(NoopDialogs),
            Arc::new(TracingNavigator),
        )
    }

    /// Create a container whose contributors come from a manifest file.
    pub fn from_manifest(settings: Settings, manifest: &Path) -> InfraResult<Self> {
        let flags = Self::flags_for(&settings);
        let contributors = load_manifest(manifest, &flags)?
            .into_iter()
            .map(|c| Arc::new(c) as Arc<dyn Contributor>)
            .collect();
        Ok(Self::new(settings, flags, contributors))
    }

    /// Flags seeded from the settings; build these before the contributors
    /// that read them.
    pub fn flags_for(settings: &Settings) -> FeatureFlags {
        FeatureFlags::from_map(settings.features.clone())
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        flags: FeatureFlags,
        contributors: Vec<Arc<dyn Contributor>>,
        dialogs: Arc<dyn DialogHandler>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let settings = Arc::new(settings);
        let bus = DataChangeBus::new(settings.engine.event_buffer);

        let registry = ContributorRegistry::with_overrides(contributors, &settings);
        let engine = Arc::new(
            TreeCompositionEngine::new(registry, settings.engine.failure_policy)
                .with_refresh_on_mount(settings.engine.refresh_on_build),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Arc::new(CallbackBridge::new(dialogs, navigator, tx));
        engine.install_callbacks(bridge.clone());

        let router = TreeEventRouter::new(engine.clone(), bridge.clone());

        Self {
            settings,
            flags,
            bus,
            engine,
            bridge,
            router,
            host_requests: Mutex::new(Some(rx)),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Builds the tree and starts the background tasks.
    ///
    /// Calling it again rebuilds the tree but does not start more tasks.
    #[instrument(level = "debug", skip(self))]
    pub async fn start(&self) -> InfraResult<BuildReport> {
        let report = self.engine.build_tree().await?;
        if self.settings.engine.refresh_on_build {
            self.engine.refresh_all_nodes().await?;
        }

        if self.started.swap(true, Ordering::SeqCst) {
            debug!("start: background tasks already running");
            return Ok(report);
        }

        let mut tasks = self.tasks.lock();
        tasks.push(
            self.engine
                .clone()
                .spawn_data_change_listener(self.bus.subscribe()),
        );
        if let Some(requests) = self.host_requests.lock().take() {
            tasks.push(spawn_host_loop(self.engine.clone(), requests));
        }
        tasks.push(spawn_flag_watcher(
            self.engine.clone(),
            self.flags.subscribe(),
        ));
        info!("started with {} contributors", self.engine.contributor_count());

        Ok(report)
    }

    /// Publishes a data-change event; returns the receiver count.
    pub fn publish(&self, event: ProcessedActionData) -> usize {
        self.bus.publish(event)
    }

    pub fn render(&self, renderer: &dyn RenderAdapter) -> String {
        renderer.render(&self.engine.portfolio_trees())
    }

    /// Stops the background tasks.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for ServiceContainer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Serves contributors' `refresh_tree` requests.
fn spawn_host_loop(
    engine: Arc<TreeCompositionEngine>,
    mut requests: mpsc::UnboundedReceiver<HostRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            match request {
                HostRequest::RefreshTree => {
                    if let Err(e) = engine.refresh_all_nodes().await {
                        warn!("requested refresh failed: {}", e);
                    }
                }
            }
        }
        debug!("host request channel closed");
    })
}

/// Reconciles enablement whenever a feature flag changes.
fn spawn_flag_watcher(
    engine: Arc<TreeCompositionEngine>,
    mut changes: watch::Receiver<u64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let generation = *changes.borrow_and_update();
            debug!("feature flags changed (generation {})", generation);
            match engine.reconcile_enablement().await {
                Ok(report) if !report.is_empty() => info!(
                    "reconciled: +{:?} -{:?}, refreshed {:?}",
                    report.mounted, report.unmounted, report.refreshed
                ),
                Ok(_) => {}
                Err(e) => warn!("reconcile failed: {}", e),
            }
        }
    })
}
