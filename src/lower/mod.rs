//! Lowering phase: parsed document → `StepDefinition` tree.
//!
//! Compilation is a single depth-first walk. The first error aborts it and
//! no partial tree is ever returned.

pub mod builder;
pub mod deferred;
pub mod resolve;

use crate::error::CompileError;
use crate::ir::types::{StepDefinition, WorkflowDefinition};
use crate::parse::{self, Document};
use crate::types::TypeSystem;

use builder::StepBuilder;
use resolve::TypeResolver;

/// What a compilation reads from besides the document itself.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    types: &'a dyn TypeSystem,
}

impl<'a> Context<'a> {
    pub fn new(types: &'a dyn TypeSystem) -> Self {
        Context { types }
    }

    pub fn types(&self) -> &'a dyn TypeSystem {
        self.types
    }
}

/// Compile the workflow document `bytes`, read from `filename`.
pub fn compile(ctx: &Context<'_>, filename: &str, bytes: &[u8]) -> Result<WorkflowDefinition, CompileError> {
    let document = parse::parse(bytes, filename)?;
    lower(ctx, &document)
}

/// Compile a document into its root step.
pub fn create_step(ctx: &Context<'_>, filename: &str, bytes: &[u8]) -> Result<StepDefinition, CompileError> {
    compile(ctx, filename, bytes).map(WorkflowDefinition::into_step)
}

/// Lower an already parsed document.
pub fn lower(ctx: &Context<'_>, document: &Document) -> Result<WorkflowDefinition, CompileError> {
    let mut resolver = TypeResolver::new(ctx.types);
    let root = StepBuilder::new(&mut resolver).build_root(&document.name, &document.root)?;

    tracing::debug!(
        file = %document.file,
        workflow = %root.identifier,
        steps = root.steps.len(),
        "compiled workflow"
    );

    Ok(WorkflowDefinition {
        file: document.file.to_string(),
        root,
    })
}
