//! Error types for the ava-plugins crate.

use thiserror::Error;

/// All errors that can originate from loading, invoking or stopping a plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No factory is registered for the requested runtime.
    #[error("Unknown plugin runtime: {0}")]
    UnknownRuntime(String),

    /// The plugin could not be prepared (image missing, pull failed, …).
    #[error("Load failed ({image}): {reason}")]
    LoadFailed { image: String, reason: String },

    /// Child-process spawn failed.
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// The plugin ran but exited unsuccessfully.
    #[error("Plugin exited with status {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    /// The plugin succeeded but its stdout is not valid UTF-8.
    #[error("Plugin output is not valid UTF-8: {0}")]
    InvalidOutput(String),

    /// Invocation exceeded the plugin's configured time budget.
    #[error("Plugin timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The plugin has been torn down and no longer accepts invocations.
    #[error("Plugin stopped: {0}")]
    Stopped(String),

    /// Teardown left resources behind.
    #[error("Teardown failed: {0}")]
    Teardown(String),

    /// Underlying I/O failure (pipe read/write).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, PluginError>;
