//! Sandboxed responders invoked by the Ava dispatch loop.
//!
//! Two runtimes ship with the crate:
//! - `container`: the plugin `image` is a container image, run once per message
//!   with the message body on stdin (`docker run --rm -i …`)
//! - `command`: the plugin `image` is a shell command run via `sh -c`
//!
//! Both follow the same contract: stdin carries the message body, stdout is
//! the reply, a non-zero exit status is a failure.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ava_core::{Environment, PluginFilter};
//! use ava_plugins::{PluginRegistry, PluginSpec};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = PluginRegistry::with_builtins();
//!     let spec = PluginSpec::new("tr a-z A-Z", Environment::new(), PluginFilter::default());
//!     let plugin = registry.load("command", spec).await.unwrap();
//!     println!("{}", plugin.run("hello").await.unwrap());
//!     plugin.stop().await.unwrap();
//! }
//! ```

pub mod command;
pub mod container;
pub mod error;
pub mod plugin;
pub mod process;
pub mod registry;
pub mod spec;

pub use command::CommandPlugin;
pub use container::ContainerPlugin;
pub use error::{PluginError, Result};
pub use plugin::Plugin;
pub use registry::{PluginFactory, PluginRegistry};
pub use spec::PluginSpec;
