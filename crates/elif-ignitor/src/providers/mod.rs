pub mod descriptor;
pub mod lifecycle;
pub mod provider;
pub mod registrar;

pub use descriptor::*;
pub use lifecycle::*;
pub use provider::*;
pub use registrar::*;
