use thiserror::Error;

/// Startup-phase errors. Every variant is fatal for the daemon.
#[derive(Debug, Error)]
pub enum AvaError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// None of the candidate config files exist in the working directory.
    #[error("No {} file found!", .candidates.join(" or "))]
    ConfigNotFound { candidates: Vec<String> },

    #[error("Error loading adapter ({name}): {reason}")]
    Adapter { name: String, reason: String },

    #[error("Error loading plugin (image: {image}): {reason}")]
    Plugin { image: String, reason: String },
}

impl AvaError {
    /// Short error code, logged as the `code` field when startup fails.
    pub fn code(&self) -> &'static str {
        match self {
            AvaError::Config(_) => "CONFIG_ERROR",
            AvaError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            AvaError::Adapter { .. } => "ADAPTER_ERROR",
            AvaError::Plugin { .. } => "PLUGIN_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AvaError>;
