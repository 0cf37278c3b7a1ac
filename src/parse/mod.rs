//! Parse phase: YAML bytes → location-annotated `Node` tree.

pub mod document;
pub mod node;
pub mod origin;

pub use document::{Document, StepShape};
pub use node::{Node, NodeValue};
pub use origin::Origin;

use std::sync::Arc;

use crate::error::CompileError;

/// Decode a workflow document and check its outer shape.
///
/// `filename` is only used to tag origins and to name the root workflow.
pub fn parse(bytes: &[u8], filename: &str) -> Result<Document, CompileError> {
    let file: Arc<str> = Arc::from(filename);
    let source = std::str::from_utf8(bytes).map_err(|e| {
        CompileError::syntax(
            format!("invalid UTF-8 at byte {}", e.valid_up_to()),
            Origin::file_start(Arc::clone(&file)),
        )
    })?;

    let root = node::load(source, filename)?;
    document::validate_root(&root)?;

    tracing::debug!(file = filename, "parsed workflow document");

    Ok(Document {
        name: document::workflow_name(filename),
        file,
        root,
    })
}
