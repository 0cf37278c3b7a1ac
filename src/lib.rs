pub mod diagnostic;
pub mod error;
pub mod ir;
pub mod lower;
pub mod parse;
pub mod types;
pub mod wasm;

pub use error::{CompileError, ErrorKind};
pub use lower::{Context, compile, create_step};
