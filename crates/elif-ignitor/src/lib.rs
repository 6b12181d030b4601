//! # elif-ignitor
//!
//! Application bootstrap for elif.rs: reads the project rc-configuration,
//! builds the container, registers and boots providers, wires autoloads, runs
//! preload scripts and starts the HTTP listener, always in that order.

pub mod autoload;
pub mod bootstrap;
pub mod config;
pub mod container;
pub mod error;
pub mod http;
pub mod loader;
pub mod logging;
pub mod preload;
pub mod providers;

pub use bootstrap::{BootstrapPhase, BootstrapReport, BootstrapState, Ignitor, RunIntent};
pub use config::{Env, MapEnv, PreloadEntry, ProcessEnv, RcConfig};
pub use container::{Container, Helpers};
pub use error::{BootstrapFailure, IgnitorError, IgnitorResult};
pub use loader::{AppLoader, LoadOutcome, Module, ModuleLoader};
pub use providers::{AppDescriptor, ProviderCatalog, ProviderError, ServiceProvider};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
