pub mod adapter;
pub mod eligibility;
pub mod error;
pub mod registry;
pub mod shell;
pub mod types;

pub use adapter::Adapter;
pub use error::{AdapterError, BoxError};
pub use registry::{AdapterFactory, AdapterRegistry};
pub use shell::ShellAdapter;
pub use types::{AdapterEnd, AdapterLink, AdapterSpec, ErrorSink};
