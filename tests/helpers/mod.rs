#![allow(dead_code)]

use indexmap::IndexMap;

use yaml_workflow::ir::*;
use yaml_workflow::types::{ConversionError, Type, TypeError, TypeRegistry, TypeSystem};
use yaml_workflow::{CompileError, Context};

// =============================================================================
// Fixtures
// =============================================================================

/// The resource types every fixture is written against.
pub fn registry() -> TypeRegistry {
    TypeRegistry::from_json(include_str!("../fixtures/types.json"))
        .expect("fixture types should load")
}

/// Read `tests/fixtures/<name>`.
pub fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path, e))
}

/// Compile `tests/fixtures/<name>`, tagging origins with `fixtures/<name>`.
pub fn compile_fixture(name: &str) -> Result<WorkflowDefinition, CompileError> {
    let types = registry();
    let ctx = Context::new(&types);
    yaml_workflow::compile(&ctx, &format!("fixtures/{}", name), &fixture(name))
}

/// Compile an inline document against the fixture types.
pub fn compile_str(filename: &str, source: &str) -> Result<WorkflowDefinition, CompileError> {
    let types = registry();
    let ctx = Context::new(&types);
    yaml_workflow::compile(&ctx, filename, source.as_bytes())
}

pub fn param_names(params: &[Parameter]) -> Vec<&str> {
    params.iter().map(|p| p.name.as_str()).collect()
}

pub fn param_types(params: &[Parameter]) -> Vec<String> {
    params.iter().map(|p| p.ty.to_string()).collect()
}

// =============================================================================
// A minimal type system
// =============================================================================

/// Knows `String`, `Integer` and one resource type `Thing { size: Integer }`.
pub struct FakeTypes;

impl TypeSystem for FakeTypes {
    fn parse_type(&self, text: &str) -> Result<Type, TypeError> {
        match text {
            "String" => Ok(Type::String),
            "Integer" => Ok(Type::Integer),
            "Thing" => Ok(Type::object("Thing")),
            t if t.contains('[') => Err(TypeError::Syntax {
                message: format!("fake parser rejects '{}'", t),
            }),
            t => Err(TypeError::Unresolved { name: t.to_string() }),
        }
    }

    fn attributes_of(&self, resource: &Type) -> IndexMap<String, Type> {
        let mut attributes = IndexMap::new();
        if *resource == Type::object("Thing") {
            attributes.insert("size".to_string(), Type::Integer);
        }
        attributes
    }

    fn convert(&self, value: &Value, target: &Type) -> Result<Value, ConversionError> {
        match (target, value) {
            (_, Value::Deferred(_)) => Ok(value.clone()),
            (Type::Integer, Value::Integer(_)) | (Type::String, Value::String(_)) => {
                Ok(value.clone())
            }
            (Type::Integer, Value::String(s)) => s
                .parse()
                .map(Value::Integer)
                .map_err(|_| ConversionError::new(format!("fake cannot convert '{}'", s))),
            _ => Err(ConversionError::new(format!(
                "fake cannot convert {} to {}",
                value.type_name(),
                target
            ))),
        }
    }
}
