pub mod env;
pub mod rc;

pub use env::*;
pub use rc::*;
