//! Type vocabulary shared with the external type system, and the capability
//! the compiler needs from it.
//!
//! The compiler only talks to a `TypeSystem`. `TypeRegistry` is the
//! reference implementation; callers and tests may supply their own.

pub mod expr;
pub mod registry;

pub use registry::{RegistryError, TypeRegistry};

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ir::types::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Any,
    String,
    Integer,
    Float,
    Boolean,
    Array(Box<Type>),
    Hash(Box<Type>, Box<Type>),
    Optional(Box<Type>),
    /// A named, attribute-bearing type such as a resource type.
    Object(String),
}

impl Type {
    /// Wrap in `Optional` unless the type already admits undef.
    pub fn optional(self) -> Type {
        match self {
            Type::Any | Type::Optional(_) => self,
            other => Type::Optional(Box::new(other)),
        }
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn hash(key: Type, value: Type) -> Type {
        Type::Hash(Box::new(key), Box::new(value))
    }

    pub fn object(name: impl Into<String>) -> Type {
        Type::Object(name.into())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::String => write!(f, "String"),
            Type::Integer => write!(f, "Integer"),
            Type::Float => write!(f, "Float"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Array(element) if **element == Type::Any => write!(f, "Array"),
            Type::Array(element) => write!(f, "Array[{}]", element),
            Type::Hash(key, value) if **key == Type::Any && **value == Type::Any => {
                write!(f, "Hash")
            }
            Type::Hash(key, value) => write!(f, "Hash[{}, {}]", key, value),
            Type::Optional(inner) => write!(f, "Optional[{}]", inner),
            Type::Object(name) => write!(f, "{}", name),
        }
    }
}

/// Structural parse: every name that is not built in becomes an `Object`.
impl FromStr for Type {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        expr::parse_with(s, |name| Some(Type::object(name)))
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Failure to turn a type expression into a `Type`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// The expression parses but names an unknown type.
    #[error("Reference to unresolved type '{name}'")]
    Unresolved { name: String },
    /// The expression is not syntactically valid.
    #[error("{message}")]
    Syntax { message: String },
}

/// A literal could not be coerced to its declared type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        ConversionError {
            message: message.into(),
        }
    }
}

/// What the compiler needs from a type system.
pub trait TypeSystem {
    /// Parse and resolve a type expression.
    fn parse_type(&self, text: &str) -> Result<Type, TypeError>;

    /// Attributes of a resource type with their declared types, in
    /// declaration order. Empty for types without attributes.
    fn attributes_of(&self, resource: &Type) -> IndexMap<String, Type>;

    /// Coerce a literal to `target`. `Deferred` values, including those
    /// nested in arrays and hashes, are returned unchanged while the rest
    /// of the value is still checked.
    fn convert(&self, value: &Value, target: &Type) -> Result<Value, ConversionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_canonical() {
        let ty = Type::hash(Type::String, Type::String);
        assert_eq!(ty.to_string(), "Hash[String, String]");
        assert_eq!(Type::array(Type::Any).to_string(), "Array");
        assert_eq!(Type::String.optional().to_string(), "Optional[String]");
    }

    #[test]
    fn optional_does_not_rewrap() {
        let once = Type::Integer.optional();
        assert_eq!(once.clone().optional(), once);
        assert_eq!(Type::Any.optional(), Type::Any);
    }

    #[test]
    fn serde_uses_the_canonical_string() {
        let ty = Type::object("Aws::Vpc").optional();
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"Optional[Aws::Vpc]\"");
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
