//! Reference `TypeSystem`: a registry of declared resource types plus the
//! built-in scalar coercions.

use indexmap::IndexMap;
use serde::Deserialize;

use super::{ConversionError, Type, TypeError, TypeSystem, expr};
use crate::ir::types::Value;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to parse type declarations: {0}")]
    Json(#[from] serde_json::Error),
    #[error("type '{type_name}', attribute '{attribute}': {source}")]
    Attribute {
        type_name: String,
        attribute: String,
        #[source]
        source: TypeError,
    },
    #[error("'{0}' is not a valid type name")]
    InvalidName(String),
}

/// JSON shape of one declared type.
#[derive(Debug, Clone, Default, Deserialize)]
struct Declaration {
    #[serde(default)]
    attributes: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, IndexMap<String, Type>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load declarations of the form
    /// `{ "Aws::Vpc": { "attributes": { "cidrBlock": "String" } } }`.
    ///
    /// Attribute types may refer to any type declared in the same document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let declarations: IndexMap<String, Declaration> = serde_json::from_str(json)?;
        let mut registry = TypeRegistry::new();
        for name in declarations.keys() {
            registry.reserve(name)?;
        }
        for (name, declaration) in &declarations {
            for (attribute, text) in &declaration.attributes {
                let ty = registry
                    .parse_type(text)
                    .map_err(|source| RegistryError::Attribute {
                        type_name: name.clone(),
                        attribute: attribute.clone(),
                        source,
                    })?;
                registry.add_attribute(name, attribute, ty);
            }
        }
        Ok(registry)
    }

    /// Declare a resource type with already resolved attribute types.
    pub fn declare<I, S>(&mut self, name: &str, attributes: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        self.reserve(name)?;
        for (attribute, ty) in attributes {
            self.add_attribute(name, &attribute.into(), ty);
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn reserve(&mut self, name: &str) -> Result<(), RegistryError> {
        if !matches!(name.parse::<Type>(), Ok(Type::Object(_))) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        self.types.entry(name.to_string()).or_default();
        Ok(())
    }

    fn add_attribute(&mut self, type_name: &str, attribute: &str, ty: Type) {
        if let Some(attributes) = self.types.get_mut(type_name) {
            attributes.insert(attribute.to_string(), ty);
        }
    }

    fn coerce(&self, value: &Value, target: &Type) -> Result<Value, ConversionError> {
        if let Value::Deferred(_) = value {
            return Ok(value.clone());
        }
        match (target, value) {
            (Type::Any, _) => Ok(value.clone()),
            (Type::Optional(_), Value::Undef) => Ok(Value::Undef),
            (Type::Optional(inner), _) => self.coerce(value, inner),

            (Type::String, Value::String(_)) => Ok(value.clone()),
            (Type::String, Value::Integer(i)) => Ok(Value::String(i.to_string())),
            (Type::String, Value::Float(f)) => Ok(Value::String(f.to_string())),
            (Type::String, Value::Boolean(b)) => Ok(Value::String(b.to_string())),

            (Type::Integer, Value::Integer(_)) => Ok(value.clone()),
            (Type::Integer, Value::Float(f)) if f.fract() == 0.0 && in_i64_range(*f) => {
                Ok(Value::Integer(*f as i64))
            }
            (Type::Integer, Value::Boolean(b)) => Ok(Value::Integer(i64::from(*b))),
            (Type::Integer, Value::String(s)) => parse_integer(s)
                .map(Value::Integer)
                .ok_or_else(|| unparsable(target, s)),

            (Type::Float, Value::Float(_)) => Ok(value.clone()),
            (Type::Float, Value::Integer(i)) => Ok(Value::Float(*i as f64)),
            (Type::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| unparsable(target, s)),

            (Type::Boolean, Value::Boolean(_)) => Ok(value.clone()),
            (Type::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(Value::Boolean(true)),
                "false" | "no" => Ok(Value::Boolean(false)),
                _ => Err(unparsable(target, s)),
            },

            (Type::Array(element), Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.coerce(item, element)
                        .map_err(|e| ConversionError::new(format!("index {}: {}", i, e)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            (Type::Hash(key_type, value_type), Value::Hash(entries)) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let canonical = self
                        .coerce(&Value::String(key.clone()), key_type)
                        .map_err(|e| ConversionError::new(format!("key '{}': {}", key, e)))?;
                    let converted = self
                        .coerce(entry, value_type)
                        .map_err(|e| ConversionError::new(format!("key '{}': {}", key, e)))?;
                    out.insert(key_text(&canonical).unwrap_or_else(|| key.clone()), converted);
                }
                Ok(Value::Hash(out))
            }

            (Type::Object(name), Value::Hash(entries)) => {
                let attributes = self.attributes_of(target);
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let Some(attribute_type) = attributes.get(key) else {
                        return Err(ConversionError::new(format!(
                            "{} has no attribute named {}",
                            name, key
                        )));
                    };
                    let converted = self
                        .coerce(entry, attribute_type)
                        .map_err(|e| ConversionError::new(format!("key '{}': {}", key, e)))?;
                    out.insert(key.clone(), converted);
                }
                Ok(Value::Hash(out))
            }

            _ => Err(ConversionError::new(format!(
                "expects {} value, got {}",
                with_article(target),
                value.type_name()
            ))),
        }
    }
}

impl TypeSystem for TypeRegistry {
    fn parse_type(&self, text: &str) -> Result<Type, TypeError> {
        expr::parse_with(text, |name| {
            self.types.contains_key(name).then(|| Type::object(name))
        })
    }

    fn attributes_of(&self, resource: &Type) -> IndexMap<String, Type> {
        match resource {
            Type::Object(name) => self.types.get(name).cloned().unwrap_or_default(),
            _ => IndexMap::new(),
        }
    }

    fn convert(&self, value: &Value, target: &Type) -> Result<Value, ConversionError> {
        self.coerce(value, target)
    }
}

/// Integer literal with optional sign and `0x`, `0b` or leading-zero octal radix.
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, text[1..].trim_start()),
        b'+' => (false, text[1..].trim_start()),
        _ => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        parse_radix(hex, 16)?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        parse_radix(bin, 2)?
    } else if digits.len() > 1 && digits.starts_with('0') {
        parse_radix(&digits[1..], 8)?
    } else {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Unsigned digits in `radix`. A sign after the radix prefix is rejected.
fn parse_radix(digits: &str, radix: u32) -> Option<i64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

/// Whole floats in this range convert to `i64` without saturating.
fn in_i64_range(f: f64) -> bool {
    f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Text a converted hash key is stored under.
fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unparsable(target: &Type, text: &str) -> ConversionError {
    ConversionError::new(format!(
        "expects {} value, got String '{}'",
        with_article(target),
        text
    ))
}

fn with_article(ty: &Type) -> String {
    let text = ty.to_string();
    let article = match text.chars().next() {
        Some('A' | 'E' | 'I' | 'O' | 'U') => "an",
        _ => "a",
    };
    format!("{} {}", article, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: &str = r#"{
        "Aws::Vpc": {
            "attributes": {
                "cidrBlock": "String",
                "enableDnsSupport": "Boolean",
                "tags": "Hash[String, String]",
                "vpcId": "String"
            }
        },
        "Kubernetes::Namespace": {
            "attributes": {
                "metadata": "Kubernetes::ObjectMeta"
            }
        },
        "Kubernetes::ObjectMeta": {
            "attributes": { "name": "String", "generation": "Optional[Integer]" }
        }
    }"#;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_json(TYPES).expect("declarations should load")
    }

    #[test]
    fn declared_types_resolve() {
        let reg = registry();
        assert_eq!(reg.parse_type("Aws::Vpc").unwrap(), Type::object("Aws::Vpc"));
        assert!(matches!(
            reg.parse_type("Aws::Subnet"),
            Err(TypeError::Unresolved { .. })
        ));
    }

    #[test]
    fn attributes_keep_declaration_order() {
        let reg = registry();
        let names: Vec<String> = reg
            .attributes_of(&Type::object("Aws::Vpc"))
            .into_keys()
            .collect();
        assert_eq!(names, ["cidrBlock", "enableDnsSupport", "tags", "vpcId"]);
    }

    #[test]
    fn forward_references_between_declarations() {
        let reg = registry();
        let attrs = reg.attributes_of(&Type::object("Kubernetes::Namespace"));
        assert_eq!(attrs["metadata"], Type::object("Kubernetes::ObjectMeta"));
    }

    #[test]
    fn bad_attribute_type_is_reported() {
        let err = TypeRegistry::from_json(r#"{"A::B": {"attributes": {"x": "Nope"}}}"#)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type 'A::B', attribute 'x': Reference to unresolved type 'Nope'"
        );
    }

    #[test]
    fn string_to_integer_radixes() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("- 42"), Some(-42));
        assert_eq!(parse_integer("0x1f"), Some(31));
        assert_eq!(parse_integer("0b101"), Some(5));
        assert_eq!(parse_integer("017"), Some(15));
        assert_eq!(parse_integer("three"), None);
        assert_eq!(parse_integer("0x-1"), None);
        assert_eq!(parse_integer("0x+1"), None);
        assert_eq!(parse_integer("0b"), None);
        assert_eq!(parse_integer("-0x10"), Some(-16));
    }

    #[test]
    fn whole_floats_outside_i64_do_not_saturate() {
        let reg = registry();
        assert_eq!(
            reg.convert(&Value::Float(42.0), &Type::Integer).unwrap(),
            Value::Integer(42)
        );
        let err = reg.convert(&Value::Float(1e300), &Type::Integer).unwrap_err();
        assert_eq!(err.to_string(), "expects an Integer value, got Float");
        assert!(reg.convert(&Value::Float(-1e19), &Type::Integer).is_err());
    }

    #[test]
    fn hash_keys_are_stored_converted() {
        let reg = registry();
        let mut entries = IndexMap::new();
        entries.insert("0x1".to_string(), Value::string("a"));
        let converted = reg
            .convert(&Value::Hash(entries), &Type::hash(Type::Integer, Type::String))
            .unwrap();
        let Value::Hash(converted) = converted else {
            panic!("Expected a hash, got {:?}", converted);
        };
        let keys: Vec<&str> = converted.keys().map(String::as_str).collect();
        assert_eq!(keys, ["1"]);
    }

    #[test]
    fn deferred_leaves_pass_through_conversion() {
        let reg = registry();
        let mut metadata = IndexMap::new();
        metadata.insert(
            "name".to_string(),
            Value::Deferred(crate::ir::types::Deferred::new("$namespace", vec![])),
        );
        metadata.insert("generation".to_string(), Value::string("many"));
        let err = reg
            .convert(&Value::Hash(metadata.clone()), &Type::object("Kubernetes::ObjectMeta"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "key 'generation': expects an Integer value, got String 'many'"
        );

        metadata.insert("generation".to_string(), Value::string("7"));
        let converted = reg
            .convert(&Value::Hash(metadata), &Type::object("Kubernetes::ObjectMeta"))
            .unwrap();
        let Value::Hash(converted) = converted else {
            panic!("Expected a hash, got {:?}", converted);
        };
        assert!(converted["name"].as_deferred().is_some());
        assert_eq!(converted["generation"], Value::Integer(7));
    }

    #[test]
    fn scalar_conversion_failures() {
        let reg = registry();
        let err = reg
            .convert(&Value::string("three"), &Type::Integer)
            .unwrap_err();
        assert_eq!(err.to_string(), "expects an Integer value, got String 'three'");

        let err = reg
            .convert(&Value::Integer(1), &Type::hash(Type::String, Type::String))
            .unwrap_err();
        assert_eq!(err.to_string(), "expects a Hash[String, String] value, got Integer");
    }

    #[test]
    fn nested_object_conversion() {
        let reg = registry();
        let mut meta = IndexMap::new();
        meta.insert("name".to_string(), Value::string("lyra"));
        meta.insert("generation".to_string(), Value::string("3"));
        let converted = reg
            .convert(&Value::Hash(meta), &Type::object("Kubernetes::ObjectMeta"))
            .unwrap();
        let Value::Hash(out) = converted else {
            panic!("Expected hash");
        };
        assert_eq!(out["generation"], Value::Integer(3));
    }

    #[test]
    fn unknown_nested_attribute() {
        let reg = registry();
        let mut meta = IndexMap::new();
        meta.insert("selfLink".to_string(), Value::string("me"));
        let err = reg
            .convert(&Value::Hash(meta), &Type::object("Kubernetes::ObjectMeta"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Kubernetes::ObjectMeta has no attribute named selfLink"
        );
    }

    #[test]
    fn optional_accepts_undef() {
        let reg = registry();
        assert_eq!(
            reg.convert(&Value::Undef, &Type::String.optional()).unwrap(),
            Value::Undef
        );
        assert!(reg.convert(&Value::Undef, &Type::String).is_err());
    }
}
