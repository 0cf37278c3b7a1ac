//! Intermediate representation produced by the compiler.

pub mod types;
pub mod validate;

pub use types::*;
pub use validate::{ValidationError, execution_order, validate_definition};
