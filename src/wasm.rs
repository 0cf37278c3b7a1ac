//! WASM entry points for browser use.
//!
//! Resource types are supplied as a JSON declaration document, see
//! `TypeRegistry::from_json`.

use wasm_bindgen::prelude::*;

use crate::error::CompileError;
use crate::ir::types::WorkflowDefinition;
use crate::ir::validate::ValidationError;
use crate::lower::Context;
use crate::types::TypeRegistry;

/// Compile a workflow YAML document.
/// Returns a JSON object with either `definition` (success) or `errors` (failure).
#[wasm_bindgen]
pub fn compile_workflow(filename: &str, yaml: &str, types_json: &str) -> JsValue {
    let result = match compile_inner(filename, yaml, types_json) {
        Ok(definition) => CompileResult::Success { definition },
        Err(errors) => CompileResult::Errors { errors },
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Compile and run dependency validation.
/// Returns a JSON array of error objects, empty when the workflow is valid.
#[wasm_bindgen]
pub fn validate_workflow(filename: &str, yaml: &str, types_json: &str) -> JsValue {
    let errors = match compile_inner(filename, yaml, types_json) {
        Ok(definition) => crate::ir::validate_definition(&definition.into_step())
            .into_iter()
            .map(ErrorDto::from)
            .collect(),
        Err(errors) => errors,
    };
    serde_wasm_bindgen::to_value(&errors).unwrap_or(JsValue::NULL)
}

fn compile_inner(
    filename: &str,
    yaml: &str,
    types_json: &str,
) -> Result<WorkflowDefinition, Vec<ErrorDto>> {
    let registry = TypeRegistry::from_json(types_json).map_err(|e| {
        vec![ErrorDto {
            code: "R001".into(),
            kind: "TypeDeclarations".into(),
            message: e.to_string(),
            file: None,
            line: None,
            column: None,
            step_id: None,
        }]
    })?;
    let ctx = Context::new(&registry);
    crate::lower::compile(&ctx, filename, yaml.as_bytes()).map_err(|e| vec![ErrorDto::from(e)])
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(serde::Serialize, serde::Deserialize)]
struct ErrorDto {
    code: String,
    kind: String,
    /// Fully formatted diagnostic.
    message: String,
    file: Option<String>,
    line: Option<usize>,
    column: Option<usize>,
    step_id: Option<String>,
}

impl From<CompileError> for ErrorDto {
    fn from(e: CompileError) -> Self {
        ErrorDto {
            code: e.kind.code().into(),
            kind: e.kind.to_string(),
            message: e.to_string(),
            file: Some(e.origin.file.to_string()),
            line: Some(e.origin.line),
            column: Some(e.origin.column),
            step_id: None,
        }
    }
}

impl From<ValidationError> for ErrorDto {
    fn from(e: ValidationError) -> Self {
        ErrorDto {
            code: e.code.into(),
            kind: "Dependency".into(),
            message: e.message,
            file: None,
            line: None,
            column: None,
            step_id: e.step_id,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "status")]
enum CompileResult {
    #[serde(rename = "success")]
    Success { definition: WorkflowDefinition },
    #[serde(rename = "errors")]
    Errors { errors: Vec<ErrorDto> },
}
