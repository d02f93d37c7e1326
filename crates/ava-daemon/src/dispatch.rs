//! Per-adapter dispatch worker.
//!
//! One worker runs per adapter. It waits on three things at once: the next
//! inbound message, the next reported error, and the shared shutdown token.
//! Messages are handled one at a time in arrival order, and for each message
//! the plugins run one at a time in load order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ava_adapters::{Adapter, AdapterError, AdapterLink, ErrorSink};
use ava_core::Message;
use ava_plugins::Plugin;

/// Loaded plugins in load order, frozen after startup.
pub type PluginSet = Arc<[Arc<dyn Plugin>]>;

/// Why a dispatch worker returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The shutdown token was cancelled.
    Shutdown,
    /// The adapter closed its inbound stream.
    InboundClosed,
}

/// Drive one adapter until shutdown or until its inbound stream closes.
///
/// Shutdown is cooperative: the token is only observed between messages, so
/// an in-flight plugin call always runs to completion first.
pub async fn run_worker(
    adapter: Arc<dyn Adapter>,
    link: AdapterLink,
    plugins: PluginSet,
    shutdown: CancellationToken,
) -> WorkerExit {
    let AdapterLink {
        mut inbound,
        outbound,
        errors,
        mut error_events,
    } = link;
    let name = adapter.name().to_string();
    info!(adapter = %name, plugins = plugins.len(), "dispatch worker started");

    let exit = loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break WorkerExit::Shutdown,

            Some(err) = error_events.recv() => {
                error!(adapter = %name, error = %err, "adapter error");
            }

            msg = inbound.recv() => match msg {
                Some(msg) => {
                    handle_message(adapter.as_ref(), &plugins, &msg, &outbound, &errors).await;
                }
                None => {
                    warn!(adapter = %name, "adapter closed its inbound stream");
                    break WorkerExit::InboundClosed;
                }
            },
        }
    };

    // Errors reported by the last message must not be lost.
    drain_errors(&name, &mut error_events);
    info!(adapter = %name, reason = ?exit, "dispatch worker finished");
    exit
}

/// Route one inbound message through every eligible plugin, in load order.
///
/// Emits at most one reply per (message, plugin) pair. A failing plugin is
/// reported to `errors` and never stops the remaining plugins.
pub async fn handle_message(
    adapter: &dyn Adapter,
    plugins: &[Arc<dyn Plugin>],
    msg: &Message,
    outbound: &mpsc::Sender<Message>,
    errors: &ErrorSink,
) {
    debug!(adapter = adapter.name(), channel = %msg.channel, body = %msg.body, "message received");

    for plugin in plugins {
        if !adapter.should_run(plugin.filter(), msg) {
            debug!(plugin = plugin.name(), channel = %msg.channel, "not running plugin");
            continue;
        }
        debug!(plugin = plugin.name(), channel = %msg.channel, "running plugin");

        let raw = match plugin.run(&msg.body).await {
            Ok(raw) => raw,
            Err(e) => {
                let _ = errors.send(AdapterError::Plugin {
                    plugin: plugin.name().to_string(),
                    source: Box::new(e),
                });
                continue;
            }
        };

        let body = trim_reply(&raw);
        debug!(plugin = plugin.name(), response = %body, "plugin response");

        if outbound.send(msg.reply(body)).await.is_err() {
            warn!(
                adapter = adapter.name(),
                plugin = plugin.name(),
                "outbound channel closed, reply dropped"
            );
        }
    }
}

/// Strip exactly one trailing `\n`; everything else is kept verbatim.
pub fn trim_reply(raw: &str) -> &str {
    raw.strip_suffix('\n').unwrap_or(raw)
}

fn drain_errors(adapter: &str, events: &mut mpsc::UnboundedReceiver<AdapterError>) {
    while let Ok(err) = events.try_recv() {
        error!(adapter, error = %err, "adapter error");
    }
}
