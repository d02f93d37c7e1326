use async_trait::async_trait;

use ava_core::{Message, PluginFilter};

use crate::{error::AdapterError, types::AdapterLink};

/// Common interface implemented by every chat adapter (shell, Slack, IRC, …).
///
/// Implementations must be `Send + Sync` so one handle can be shared between
/// the dispatch worker that drives it and the daemon that stops it.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable lowercase identifier for this adapter (e.g. `"shell"`).
    fn name(&self) -> &str;

    /// Connect to the chat surface and return the channel bundle the dispatch
    /// loop consumes.
    ///
    /// Called once per adapter at startup. A failure here is fatal for the
    /// daemon, which never runs with a partially started adapter set.
    async fn start(&self) -> Result<AdapterLink, AdapterError>;

    /// Decide whether a plugin with `filter` should see `msg`.
    ///
    /// What counts as a direct message or a mention is adapter knowledge, so
    /// the decision lives here rather than in the dispatch loop. Must be pure:
    /// no state is kept between calls.
    fn should_run(&self, filter: &PluginFilter, msg: &Message) -> bool;

    /// Flush pending output and release the connection.
    ///
    /// Called after the adapter's dispatch worker has finished, so no more
    /// replies will be queued.
    async fn stop(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}
