//! IR type definitions for compiled workflows.
//!
//! The IR is the compiler's only output: a tree of `StepDefinition`s that a
//! runtime registers and executes. It is immutable once built and carries
//! the `Origin` of every declaration for diagnostics.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::parse::Origin;
use crate::types::Type;

// =============================================================================
// VALUES
// =============================================================================

/// A literal, possibly containing deferred computations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Undef,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Hash(IndexMap<String, Value>),
    Deferred(Deferred),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undef => "Undef",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Deferred(_) => "Deferred",
        }
    }

    /// True when no `Deferred` appears anywhere in the value.
    pub fn is_literal(&self) -> bool {
        match self {
            Value::Deferred(_) => false,
            Value::Array(items) => items.iter().all(Value::is_literal),
            Value::Hash(entries) => entries.values().all(Value::is_literal),
            _ => true,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(d) => Some(d),
            _ => None,
        }
    }

    /// Names of the `$name` variable references in the value, in order of
    /// first appearance and without the `$`.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Value::Deferred(d) => {
                if let Some(name) = d.variable() {
                    if !out.iter().any(|n| n == name) {
                        out.push(name.to_string());
                    }
                }
                for arg in &d.arguments {
                    arg.collect_variables(out);
                }
            }
            Value::Array(items) => items.iter().for_each(|i| i.collect_variables(out)),
            Value::Hash(entries) => entries.values().for_each(|v| v.collect_variables(out)),
            _ => {}
        }
    }
}

/// A function call whose evaluation is postponed to execution time.
///
/// A variable reference `$name` is a `Deferred` named `$name` with no
/// arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deferred {
    pub name: String,
    pub arguments: Vec<Value>,
}

impl Deferred {
    pub fn new(name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Deferred {
            name: name.into(),
            arguments,
        }
    }

    /// The referenced variable name when this is a `$name` reference.
    pub fn variable(&self) -> Option<&str> {
        self.name.strip_prefix('$')
    }
}

// =============================================================================
// TYPES AND PARAMETERS
// =============================================================================

/// A resolved type plus the origin of the text that produced it.
///
/// Equality compares the type only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeReference {
    #[serde(rename = "type")]
    pub ty: Type,
    pub origin: Origin,
}

impl TypeReference {
    pub fn new(ty: Type, origin: Origin) -> Self {
        TypeReference { ty, origin }
    }
}

impl PartialEq for TypeReference {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl Eq for TypeReference {}

impl std::fmt::Display for TypeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ty)
    }
}

/// A formal input or output of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeReference,
    /// Default computed by the runtime when the caller supplies nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

// =============================================================================
// STEPS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum StepDefinition {
    Workflow(WorkflowStep),
    Resource(ResourceStep),
}

/// A container of ordered child steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub identifier: String,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<Parameter>,
    pub steps: Vec<StepDefinition>,
    pub origin: Origin,
}

/// A single typed resource operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStep {
    pub identifier: String,
    pub parameters: Vec<Parameter>,
    pub returns: Vec<Parameter>,
    pub resource_type: TypeReference,
    pub attributes: IndexMap<String, Value>,
    pub origin: Origin,
}

impl StepDefinition {
    pub fn identifier(&self) -> &str {
        match self {
            StepDefinition::Workflow(w) => &w.identifier,
            StepDefinition::Resource(r) => &r.identifier,
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        match self {
            StepDefinition::Workflow(w) => &w.parameters,
            StepDefinition::Resource(r) => &r.parameters,
        }
    }

    pub fn returns(&self) -> &[Parameter] {
        match self {
            StepDefinition::Workflow(w) => &w.returns,
            StepDefinition::Resource(r) => &r.returns,
        }
    }

    pub fn origin(&self) -> &Origin {
        match self {
            StepDefinition::Workflow(w) => &w.origin,
            StepDefinition::Resource(r) => &r.origin,
        }
    }

    pub fn style(&self) -> &'static str {
        match self {
            StepDefinition::Workflow(_) => "workflow",
            StepDefinition::Resource(_) => "resource",
        }
    }

    pub fn as_workflow(&self) -> Option<&WorkflowStep> {
        match self {
            StepDefinition::Workflow(w) => Some(w),
            StepDefinition::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceStep> {
        match self {
            StepDefinition::Resource(r) => Some(r),
            StepDefinition::Workflow(_) => None,
        }
    }

    /// Depth-first search for the step with `identifier`.
    pub fn find(&self, identifier: &str) -> Option<&StepDefinition> {
        if self.identifier() == identifier {
            return Some(self);
        }
        match self {
            StepDefinition::Workflow(w) => w.steps.iter().find_map(|s| s.find(identifier)),
            StepDefinition::Resource(_) => None,
        }
    }
}

impl WorkflowStep {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl ResourceStep {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// A compiled workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Path of the workflow file the definition was compiled from.
    pub file: String,
    pub root: WorkflowStep,
}

impl WorkflowDefinition {
    pub fn into_step(self) -> StepDefinition {
        StepDefinition::Workflow(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_reference_equality_ignores_origin() {
        let a = TypeReference::new(Type::String, Origin::new("a.yaml", 1, 1));
        let b = TypeReference::new(Type::String, Origin::new("b.yaml", 9, 4));
        assert_eq!(a, b);
        assert_ne!(a, TypeReference::new(Type::Integer, Origin::new("a.yaml", 1, 1)));
    }

    #[test]
    fn variables_are_collected_once_in_order() {
        let value = Value::Array(vec![
            Value::Deferred(Deferred::new("$b", vec![])),
            Value::Deferred(Deferred::new(
                "join",
                vec![
                    Value::Deferred(Deferred::new("$a", vec![])),
                    Value::Deferred(Deferred::new("$b", vec![])),
                ],
            )),
        ]);
        assert_eq!(value.variables(), ["b", "a"]);
        assert!(!value.is_literal());
    }

    #[test]
    fn step_serializes_with_style_tag() {
        let step = StepDefinition::Workflow(WorkflowStep {
            identifier: "wf".into(),
            parameters: vec![],
            returns: vec![],
            steps: vec![],
            origin: Origin::new("wf.yaml", 1, 1),
        });
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["style"], "workflow");
        assert_eq!(json["identifier"], "wf");
    }
}
