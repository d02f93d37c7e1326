//! `ava-daemon`: routes chat messages from adapters through plugins.
//!
//! The binary (`ava`) loads the config, builds adapters and plugins through
//! their registries and hands them to [`Daemon::run`]. Everything with real
//! concurrency lives here: the per-adapter [`dispatch`] worker and the
//! [`shutdown`] coordinator.

pub mod daemon;
pub mod dispatch;
pub mod shutdown;

pub use daemon::{Daemon, RunReport};
pub use dispatch::{handle_message, run_worker, trim_reply, PluginSet, WorkerExit};
pub use shutdown::{interrupt_signal, teardown_plugins, ShutdownCoordinator};
