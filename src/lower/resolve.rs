//! Bridge between the compiler and the `TypeSystem`.
//!
//! Every type expression of a compilation goes through one `TypeResolver`,
//! which caches results per expression text so a reference always resolves
//! to the same type. Failures are translated into `CompileError`s anchored
//! at the origin of the referencing text.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::CompileError;
use crate::ir::types::{TypeReference, Value};
use crate::parse::Origin;
use crate::types::{ConversionError, Type, TypeError, TypeSystem};

pub struct TypeResolver<'a> {
    types: &'a dyn TypeSystem,
    resolved: HashMap<String, Type>,
    attributes: HashMap<Type, IndexMap<String, Type>>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(types: &'a dyn TypeSystem) -> Self {
        TypeResolver {
            types,
            resolved: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    /// Resolve `text` into a type reference tagged with `origin`.
    pub fn resolve(&mut self, text: &str, origin: &Origin) -> Result<TypeReference, CompileError> {
        let key = text.trim();
        if let Some(ty) = self.resolved.get(key) {
            tracing::trace!(expr = key, "type cache hit");
            return Ok(TypeReference::new(ty.clone(), origin.clone()));
        }

        let ty = self.types.parse_type(key).map_err(|e| match e {
            TypeError::Unresolved { name } => CompileError::unresolved_type(&name, origin.clone()),
            TypeError::Syntax { message } => CompileError::type_syntax(message, origin.clone()),
        })?;
        tracing::trace!(expr = key, resolved = %ty, "type resolved");

        self.resolved.insert(key.to_string(), ty.clone());
        Ok(TypeReference::new(ty, origin.clone()))
    }

    /// The `Any` type, used where no type is declared.
    pub fn any(&self, origin: &Origin) -> TypeReference {
        TypeReference::new(Type::Any, origin.clone())
    }

    /// Attribute types of a resource type.
    pub fn attributes_of(&mut self, resource: &Type) -> &IndexMap<String, Type> {
        let types = self.types;
        self.attributes
            .entry(resource.clone())
            .or_insert_with(|| types.attributes_of(resource))
    }

    pub fn convert(&self, value: &Value, target: &Type) -> Result<Value, ConversionError> {
        self.types.convert(value, target)
    }
}
