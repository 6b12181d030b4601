#[allow(clippy::module_inception)]
pub mod container;
pub mod helpers;

pub use container::{Container, ContainerError};
pub use helpers::{bind_helpers, create_container, Helpers, HELPERS_ALIAS, HELPERS_BINDING};
