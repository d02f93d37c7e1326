use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AvaError, Result};
use crate::types::{Environment, PluginFilter};

/// Files looked up in the working directory when no path is given, in order.
pub const CONFIG_CANDIDATES: &[&str] = &["ava.yml", "ava.yaml", "ava.toml"];
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;
pub const DEFAULT_CONTAINER_CLI: &str = "docker";

/// Top-level config (ava.yml / ava.toml + AVA_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvaConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Adapters in declaration order.
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
    /// Plugins in load order. Order decides reply order for a message.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Capacity of each adapter's outbound reply channel.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Container CLI used by the `container` plugin runtime.
    #[serde(default = "default_container_cli")]
    pub container_cli: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            container_cli: DEFAULT_CONTAINER_CLI.to_string(),
        }
    }
}

/// One adapter descriptor: registry key plus its environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
}

/// How a plugin's `image` is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginRuntime {
    /// Container image run once per message.
    #[default]
    Container,
    /// Local shell command (`sh -c <image>`).
    Command,
}

impl PluginRuntime {
    /// Key under which the runtime is registered in the plugin registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginRuntime::Container => "container",
            PluginRuntime::Command => "command",
        }
    }
}

/// One plugin descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    pub image: String,
    #[serde(default)]
    pub runtime: PluginRuntime,
    #[serde(default)]
    pub environment: Environment,
    #[serde(flatten)]
    pub filter: PluginFilter,
    /// Kill an invocation that runs longer than this. No limit when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_outbound_buffer() -> usize {
    DEFAULT_OUTBOUND_BUFFER
}
fn default_container_cli() -> String {
    DEFAULT_CONTAINER_CLI.to_string()
}

impl AvaConfig {
    /// Load config from YAML or TOML with AVA_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ava.yml, ava.yaml, ava.toml in the working directory
    ///
    /// Nested keys are overridden with a double underscore, e.g.
    /// `AVA_DAEMON__OUTBOUND_BUFFER=16`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = match config_path {
            Some(p) => {
                let path = PathBuf::from(p);
                if !path.is_file() {
                    return Err(AvaError::ConfigNotFound {
                        candidates: vec![p.to_string()],
                    });
                }
                path
            }
            None => infer_config_path(Path::new("."))?,
        };
        debug!(path = %path.display(), "loading config");

        let figment = if is_toml(&path) {
            Figment::new().merge(Toml::file(&path))
        } else {
            Figment::new().merge(Yaml::file(&path))
        };

        let config: AvaConfig = figment
            .merge(Env::prefixed("AVA_").split("__"))
            .extract()
            .map_err(|e| AvaError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.adapters.is_empty() {
            return Err(AvaError::Config("no adapters configured".to_string()));
        }
        if self.daemon.outbound_buffer == 0 {
            return Err(AvaError::Config(
                "daemon.outbound_buffer must be greater than zero".to_string(),
            ));
        }
        if let Some(a) = self.adapters.iter().find(|a| a.name.trim().is_empty()) {
            return Err(AvaError::Config(format!(
                "adapter with empty name (environment: {:?})",
                a.environment.keys().collect::<Vec<_>>()
            )));
        }
        if let Some(pos) = self.plugins.iter().position(|p| p.image.trim().is_empty()) {
            return Err(AvaError::Config(format!("plugins[{pos}]: image is empty")));
        }
        Ok(())
    }
}

/// Return the first config candidate that exists under `dir`.
pub fn infer_config_path(dir: &Path) -> Result<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| AvaError::ConfigNotFound {
            candidates: CONFIG_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        })
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}
