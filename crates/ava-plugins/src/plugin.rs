use async_trait::async_trait;

use ava_core::PluginFilter;

use crate::error::Result;

/// A loaded responder.
///
/// Handles are built once at startup, frozen into the shared plugin list and
/// then only read by dispatch workers until the shutdown coordinator calls
/// [`Plugin::stop`].
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Human-readable identifier used in logs (the image or command).
    fn name(&self) -> &str;

    /// Static eligibility flags, fixed at load time.
    fn filter(&self) -> &PluginFilter;

    /// Run the plugin with `input` and return its raw output.
    ///
    /// The dispatch worker awaits this before moving on, so a slow plugin
    /// delays later plugins for the same message.
    async fn run(&self, input: &str) -> Result<String>;

    /// Tear the plugin down. Idempotent and best-effort: a second call is a
    /// no-op and later `run` calls fail with `PluginError::Stopped`.
    async fn stop(&self) -> Result<()>;
}
