use std::time::Duration;

use ava_core::{
    config::DEFAULT_CONTAINER_CLI, DaemonConfig, Environment, PluginConfig, PluginFilter,
};

/// Everything a runtime needs to load one plugin.
#[derive(Debug, Clone)]
pub struct PluginSpec {
    /// Container image or shell command, depending on the runtime.
    pub image: String,

    /// Variables exported to the plugin process.
    pub environment: Environment,

    /// Eligibility flags, copied verbatim onto the loaded handle.
    pub filter: PluginFilter,

    /// Kill an invocation that runs longer than this. `None` = no limit.
    pub timeout: Option<Duration>,

    /// Container CLI binary (`docker`, `podman`, …) for the container runtime.
    pub container_cli: String,
}

impl PluginSpec {
    pub fn new(image: impl Into<String>, environment: Environment, filter: PluginFilter) -> Self {
        Self {
            image: image.into(),
            environment,
            filter,
            timeout: None,
            container_cli: DEFAULT_CONTAINER_CLI.to_string(),
        }
    }

    /// Build a spec from a plugin descriptor and the daemon-wide settings.
    pub fn from_config(plugin: &PluginConfig, daemon: &DaemonConfig) -> Self {
        Self {
            image: plugin.image.clone(),
            environment: plugin.environment.clone(),
            filter: plugin.filter.clone(),
            timeout: plugin.timeout_secs.map(Duration::from_secs),
            container_cli: daemon.container_cli.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_container_cli(mut self, cli: impl Into<String>) -> Self {
        self.container_cli = cli.into();
        self
    }
}
