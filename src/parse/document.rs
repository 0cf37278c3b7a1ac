//! Workflow-document schema: root shape and step shape classification.

use std::sync::Arc;

use super::node::{Node, NodeValue};
use crate::error::CompileError;

pub const PARAMETERS: &str = "parameters";
pub const RETURNS: &str = "returns";
pub const STEPS: &str = "steps";

const RESERVED: [&str; 3] = [PARAMETERS, RETURNS, STEPS];

/// A parsed workflow document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Name of the root workflow, the file stem of the document.
    pub name: String,
    pub file: Arc<str>,
    pub root: Node,
}

/// The two shapes a step mapping can take.
#[derive(Debug, Clone, Copy)]
pub enum StepShape<'a> {
    Workflow {
        parameters: Option<&'a Node>,
        returns: Option<&'a Node>,
        /// Mapping of child name to child step.
        steps: &'a Node,
    },
    Resource {
        parameters: Option<&'a Node>,
        returns: Option<&'a Node>,
        /// The key holding the resource type expression.
        type_key: &'a Node,
        /// Attribute mapping, or null.
        attributes: &'a Node,
    },
}

/// Name of the root workflow for `filename`: its base name without extension.
pub fn workflow_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(0) | None => base.to_string(),
        Some(dot) => base[..dot].to_string(),
    }
}

/// Check the outer shape of a document: a mapping that describes a workflow.
pub fn validate_root(root: &Node) -> Result<(), CompileError> {
    if root.as_mapping().is_none() {
        return Err(CompileError::document(
            format!("workflow document must be a mapping, got a {}", root.kind_name()),
            root.origin.clone(),
        ));
    }
    if root.get(STEPS).is_none() {
        return Err(CompileError::document(
            format!("workflow document has no '{}'", STEPS),
            root.origin.clone(),
        ));
    }
    match classify("workflow document", root)? {
        StepShape::Workflow { .. } => Ok(()),
        StepShape::Resource { type_key, .. } => Err(CompileError::document(
            "workflow document must not declare a resource type",
            type_key.origin.clone(),
        )),
    }
}

/// Decide whether `node` describes a workflow or a resource step.
///
/// `what` names the step in diagnostics.
pub fn classify<'a>(what: &str, node: &'a Node) -> Result<StepShape<'a>, CompileError> {
    let Some(entries) = node.as_mapping() else {
        return Err(CompileError::document(
            format!("{} must be a mapping, got a {}", what, node.kind_name()),
            node.origin.clone(),
        ));
    };

    let mut parameters = None;
    let mut returns = None;
    let mut steps = None;
    let mut others: Vec<(&Node, &Node)> = Vec::new();

    for (key, value) in entries {
        match key.as_str() {
            Some(PARAMETERS) => parameters = Some(value),
            Some(RETURNS) => returns = Some(value),
            Some(STEPS) => steps = Some(value),
            _ => others.push((key, value)),
        }
    }

    if let Some(steps) = steps {
        if let Some((key, _)) = others.first() {
            return Err(CompileError::document(
                format!(
                    "{} has unexpected key '{}', expected one of {}",
                    what,
                    key.key_text().unwrap_or_default(),
                    RESERVED.join(", ")
                ),
                key.origin.clone(),
            ));
        }
        if steps.as_mapping().is_none() {
            return Err(CompileError::document(
                format!("'{}' of {} must be a mapping, got a {}", STEPS, what, steps.kind_name()),
                steps.origin.clone(),
            ));
        }
        return Ok(StepShape::Workflow {
            parameters,
            returns,
            steps,
        });
    }

    match others.as_slice() {
        [] => Err(CompileError::document(
            format!("{} must declare either '{}' or a resource type", what, STEPS),
            node.origin.clone(),
        )),
        [(type_key, attributes)] => {
            if type_key.as_str().is_none() {
                return Err(CompileError::document(
                    format!("resource type of {} must be a string", what),
                    type_key.origin.clone(),
                ));
            }
            if !matches!(attributes.value, NodeValue::Mapping(_) | NodeValue::Null) {
                return Err(CompileError::document(
                    format!(
                        "attributes of {} must be a mapping, got a {}",
                        what,
                        attributes.kind_name()
                    ),
                    attributes.origin.clone(),
                ));
            }
            Ok(StepShape::Resource {
                parameters,
                returns,
                type_key,
                attributes,
            })
        }
        [_, (extra, _), ..] => Err(CompileError::document(
            format!(
                "{} declares more than one resource type, unexpected '{}'",
                what,
                extra.key_text().unwrap_or_default()
            ),
            extra.origin.clone(),
        )),
    }
}
