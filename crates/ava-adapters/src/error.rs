use thiserror::Error;

/// Boxed error carried on an adapter's error channel for failures raised
/// outside this crate (plugin invocations).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur within any adapter, plus the errors reported to an
/// adapter's error channel.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No factory is registered under the requested name.
    #[error("Unknown adapter: {0}")]
    Unknown(String),

    /// A required or malformed environment entry.
    #[error("Invalid environment ({key}): {reason}")]
    InvalidEnvironment { key: String, reason: String },

    /// The underlying transport could not be established.
    #[error("Start failed: {0}")]
    StartFailed(String),

    /// An inbound line or frame could not be decoded.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// A plugin invocation failed while handling a message from this adapter.
    #[error("Plugin ({plugin}) failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: BoxError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
