use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    command::CommandPlugin,
    container::ContainerPlugin,
    error::{PluginError, Result},
    plugin::Plugin,
    spec::PluginSpec,
};

/// Builds plugin handles for one runtime kind.
#[async_trait]
pub trait PluginFactory: Send + Sync {
    async fn load(&self, spec: PluginSpec) -> Result<Arc<dyn Plugin>>;
}

struct ContainerFactory;

#[async_trait]
impl PluginFactory for ContainerFactory {
    async fn load(&self, spec: PluginSpec) -> Result<Arc<dyn Plugin>> {
        Ok(Arc::new(ContainerPlugin::load(spec).await?))
    }
}

struct CommandFactory;

#[async_trait]
impl PluginFactory for CommandFactory {
    async fn load(&self, spec: PluginSpec) -> Result<Arc<dyn Plugin>> {
        Ok(Arc::new(CommandPlugin::new(spec)))
    }
}

/// Maps a runtime kind (`container`, `command`, …) to its factory.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, Box<dyn PluginFactory>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `container` and `command` runtimes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("container", Box::new(ContainerFactory));
        registry.register("command", Box::new(CommandFactory));
        registry
    }

    /// Register a factory, replacing any previous one for `runtime`.
    pub fn register(&mut self, runtime: &str, factory: Box<dyn PluginFactory>) {
        debug!(runtime, "registering plugin runtime");
        self.factories.insert(runtime.to_string(), factory);
    }

    pub async fn load(&self, runtime: &str, spec: PluginSpec) -> Result<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(runtime)
            .ok_or_else(|| PluginError::UnknownRuntime(runtime.to_string()))?;
        factory.load(spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ava_core::{Environment, PluginFilter};

    #[tokio::test]
    async fn loads_command_runtime() {
        let registry = PluginRegistry::with_builtins();
        let plugin = registry
            .load(
                "command",
                PluginSpec::new("cat", Environment::new(), PluginFilter::default()),
            )
            .await
            .unwrap();
        assert_eq!(plugin.name(), "cat");
        assert_eq!(plugin.run("hi").await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn unknown_runtime_is_rejected() {
        let registry = PluginRegistry::with_builtins();
        let result = registry
            .load(
                "wasm",
                PluginSpec::new("x", Environment::new(), PluginFilter::default()),
            )
            .await;
        assert!(matches!(result, Err(PluginError::UnknownRuntime(ref r)) if r == "wasm"));
    }

    #[tokio::test]
    async fn custom_factory_can_be_registered() {
        struct Refusing;

        #[async_trait]
        impl PluginFactory for Refusing {
            async fn load(&self, spec: PluginSpec) -> Result<Arc<dyn Plugin>> {
                Err(PluginError::LoadFailed {
                    image: spec.image,
                    reason: "refused".into(),
                })
            }
        }

        let mut registry = PluginRegistry::new();
        registry.register("refusing", Box::new(Refusing));
        let result = registry
            .load(
                "refusing",
                PluginSpec::new("img", Environment::new(), PluginFilter::default()),
            )
            .await;
        assert!(matches!(result, Err(PluginError::LoadFailed { .. })));
    }

    #[tokio::test]
    async fn default_registry_has_no_runtimes() {
        let registry = PluginRegistry::default();
        let result = registry
            .load(
                "command",
                PluginSpec::new("cat", Environment::new(), PluginFilter::default()),
            )
            .await;
        assert!(matches!(result, Err(PluginError::UnknownRuntime(_))));
    }
}
