use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{adapter::Adapter, error::AdapterError, shell::ShellAdapter, types::AdapterSpec};

/// Constructor registered under an adapter name.
pub type AdapterFactory = fn(&AdapterSpec) -> Result<Arc<dyn Adapter>, AdapterError>;

/// Maps the `name` of an adapter descriptor to its constructor.
///
/// Populated once at process start; lookups afterwards are read-only.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Create an empty registry with no adapters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the adapters shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ShellAdapter::NAME, ShellAdapter::factory);
        registry
    }

    /// Register a factory.
    ///
    /// If a factory with the same name is already registered it is replaced.
    pub fn register(&mut self, name: &str, factory: AdapterFactory) {
        debug!(adapter = %name, "registering adapter factory");
        self.factories.insert(name.to_string(), factory);
    }

    /// Build the adapter named by `spec.name`.
    pub fn build(&self, spec: &AdapterSpec) -> Result<Arc<dyn Adapter>, AdapterError> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| AdapterError::Unknown(spec.name.clone()))?;
        let adapter = factory(spec)?;
        info!(adapter = %spec.name, "adapter constructed");
        Ok(adapter)
    }
}
