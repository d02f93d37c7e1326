//! `ava-core`: shared types, configuration loading and errors for the Ava
//! message-routing daemon.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AdapterConfig, AvaConfig, DaemonConfig, PluginConfig, PluginRuntime};
pub use error::{AvaError, Result};
pub use types::{DaemonState, Environment, Message, PluginFilter};
