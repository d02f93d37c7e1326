//! Startup loading and the daemon lifecycle.
//!
//! `Starting`: adapters and plugins are built from config; any failure aborts
//! with nothing left running. `Running`: one dispatch worker per adapter.
//! `ShuttingDown`: workers joined, plugins torn down. `Stopped`: done.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use ava_adapters::{Adapter, AdapterLink, AdapterRegistry, AdapterSpec};
use ava_core::{AvaConfig, AvaError, DaemonState};
use ava_plugins::{Plugin, PluginRegistry, PluginSpec};

use crate::dispatch::{run_worker, PluginSet};
use crate::shutdown::{teardown_plugins, ShutdownCoordinator};

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub workers: usize,
    pub teardown_failures: usize,
}

/// A fully loaded daemon: adapters built, plugins loaded and frozen.
pub struct Daemon {
    adapters: Vec<Arc<dyn Adapter>>,
    plugins: PluginSet,
    coordinator: ShutdownCoordinator,
}

impl Daemon {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self {
            adapters,
            plugins: plugins.into(),
            coordinator: ShutdownCoordinator::new(),
        }
    }

    /// Build every adapter and plugin named in `config`.
    pub async fn load(
        config: &AvaConfig,
        adapters: &AdapterRegistry,
        plugins: &PluginRegistry,
    ) -> Result<Self, AvaError> {
        let adapters = load_adapters(config, adapters)?;
        let plugins = load_plugins(config, plugins).await?;
        Ok(Self::new(adapters, plugins))
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Observe lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<DaemonState> {
        self.coordinator.subscribe()
    }

    /// Start every adapter, dispatch until `signal` resolves (or every adapter
    /// has closed), then tear down.
    ///
    /// # Errors
    ///
    /// - `Adapter`: an adapter failed to start. Nothing is dispatched; the
    ///   adapters already started are stopped and the plugins torn down
    ///   before returning.
    pub async fn run<S>(self, signal: S) -> Result<RunReport, AvaError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let Daemon {
            adapters,
            plugins,
            coordinator,
        } = self;

        let links = match start_adapters(&adapters).await {
            Ok(links) => links,
            Err(e) => {
                teardown_plugins(&plugins).await;
                coordinator.set_state(DaemonState::Stopped);
                return Err(e);
            }
        };

        let listener = coordinator.listen(signal);
        let mut workers = JoinSet::new();
        for (adapter, link) in adapters.iter().zip(links) {
            let adapter = Arc::clone(adapter);
            let plugins = Arc::clone(&plugins);
            let token = coordinator.token();
            workers.spawn(async move {
                let name = adapter.name().to_string();
                let exit = run_worker(adapter, link, plugins, token).await;
                (name, exit)
            });
        }
        coordinator.set_state(DaemonState::Running);

        let joined = coordinator.wait_for_workers(&mut workers).await;
        listener.abort();
        coordinator.set_state(DaemonState::ShuttingDown);

        let teardown_failures = teardown_plugins(&plugins).await;
        stop_adapters(&adapters).await;

        coordinator.set_state(DaemonState::Stopped);
        info!(workers = joined, teardown_failures, "daemon stopped");
        Ok(RunReport {
            workers: joined,
            teardown_failures,
        })
    }
}

/// Construct every configured adapter, in declaration order.
pub fn load_adapters(
    config: &AvaConfig,
    registry: &AdapterRegistry,
) -> Result<Vec<Arc<dyn Adapter>>, AvaError> {
    config
        .adapters
        .iter()
        .map(|cfg| {
            let spec = AdapterSpec {
                name: cfg.name.clone(),
                environment: cfg.environment.clone(),
                buffer: config.daemon.outbound_buffer,
            };
            let adapter = registry.build(&spec).map_err(|e| AvaError::Adapter {
                name: cfg.name.clone(),
                reason: e.to_string(),
            })?;
            info!(adapter = %cfg.name, "Adapter loaded");
            Ok(adapter)
        })
        .collect()
}

/// Load every configured plugin, in load order.
///
/// On failure the plugins loaded so far are stopped before the error is
/// returned.
pub async fn load_plugins(
    config: &AvaConfig,
    registry: &PluginRegistry,
) -> Result<Vec<Arc<dyn Plugin>>, AvaError> {
    let mut loaded: Vec<Arc<dyn Plugin>> = Vec::with_capacity(config.plugins.len());
    for cfg in &config.plugins {
        let spec = PluginSpec::from_config(cfg, &config.daemon);
        match registry.load(cfg.runtime.as_str(), spec).await {
            Ok(plugin) => {
                info!(image = %cfg.image, runtime = cfg.runtime.as_str(), "Plugin loaded");
                loaded.push(plugin);
            }
            Err(e) => {
                teardown_plugins(&loaded).await;
                return Err(AvaError::Plugin {
                    image: cfg.image.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(loaded)
}

/// Start all adapters before any message is dispatched.
///
/// If one fails, the adapters started before it are stopped again.
async fn start_adapters(adapters: &[Arc<dyn Adapter>]) -> Result<Vec<AdapterLink>, AvaError> {
    let mut links = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        match adapter.start().await {
            Ok(link) => links.push(link),
            Err(e) => {
                let started = links.len();
                // An adapter's writer only finishes once its outbound sender is gone.
                drop(links);
                stop_adapters(&adapters[..started]).await;
                return Err(AvaError::Adapter {
                    name: adapter.name().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(links)
}

async fn stop_adapters(adapters: &[Arc<dyn Adapter>]) {
    for adapter in adapters {
        if let Err(e) = adapter.stop().await {
            warn!(adapter = adapter.name(), error = %e, "adapter stop failed");
        }
    }
}
