//! Step compiler: walk the document depth-first and build the
//! `StepDefinition` tree, resolving types, validating attributes and
//! recording deferred values on the way.

use indexmap::IndexMap;
use tracing::debug;

use super::deferred;
use super::resolve::TypeResolver;
use crate::error::CompileError;
use crate::ir::types::*;
use crate::parse::document::{self, StepShape};
use crate::parse::{Node, NodeValue, Origin};
use crate::types::Type;

/// Separator between the path segments of a step identifier.
pub const SEPARATOR: &str = "::";

/// One entry of a `parameters` or `returns` block, before resolution.
struct Declaration<'n> {
    name: String,
    origin: Origin,
    type_node: Option<&'n Node>,
    value: Option<DeclaredValue<'n>>,
}

enum DeclaredValue<'n> {
    Value(&'n Node),
    Lookup(&'n Node),
}

impl<'n> Declaration<'n> {
    fn named(name: &str, origin: &Origin) -> Self {
        Declaration {
            name: name.to_string(),
            origin: origin.clone(),
            type_node: None,
            value: None,
        }
    }
}

pub struct StepBuilder<'r, 'a> {
    resolver: &'r mut TypeResolver<'a>,
}

impl<'r, 'a> StepBuilder<'r, 'a> {
    pub fn new(resolver: &'r mut TypeResolver<'a>) -> Self {
        StepBuilder { resolver }
    }

    /// Compile the root of a document into the workflow named `name`.
    pub fn build_root(&mut self, name: &str, root: &Node) -> Result<WorkflowStep, CompileError> {
        match document::classify(&format!("workflow '{}'", name), root)? {
            StepShape::Workflow {
                parameters,
                returns,
                steps,
            } => self.build_workflow(name.to_string(), &root.origin, parameters, returns, steps),
            StepShape::Resource { type_key, .. } => Err(CompileError::document(
                "workflow document must not declare a resource type",
                type_key.origin.clone(),
            )),
        }
    }

    fn build_step(&mut self, identifier: String, node: &Node) -> Result<StepDefinition, CompileError> {
        let step = match document::classify(&format!("step '{}'", identifier), node)? {
            StepShape::Workflow {
                parameters,
                returns,
                steps,
            } => StepDefinition::Workflow(self.build_workflow(
                identifier,
                &node.origin,
                parameters,
                returns,
                steps,
            )?),
            StepShape::Resource {
                parameters,
                returns,
                type_key,
                attributes,
            } => StepDefinition::Resource(self.build_resource(
                identifier,
                &node.origin,
                parameters,
                returns,
                type_key,
                attributes,
            )?),
        };
        Ok(step)
    }

    fn build_workflow(
        &mut self,
        identifier: String,
        origin: &Origin,
        parameters: Option<&Node>,
        returns: Option<&Node>,
        steps: &Node,
    ) -> Result<WorkflowStep, CompileError> {
        let parameters = self.parameters(&identifier, parameters)?;
        let returns = declarations(&identifier, document::RETURNS, returns)?
            .into_iter()
            .map(|decl| self.workflow_return(&identifier, decl))
            .collect::<Result<Vec<_>, _>>()?;

        let mut children = Vec::new();
        for (key, child) in steps.as_mapping().unwrap_or_default() {
            let name = step_name(key)?;
            let child_id = format!("{}{}{}", identifier, SEPARATOR, name);
            children.push(self.build_step(child_id, child)?);
        }

        debug!(
            identifier = %identifier,
            style = "workflow",
            steps = children.len(),
            "compiled step"
        );

        Ok(WorkflowStep {
            identifier,
            parameters,
            returns,
            steps: children,
            origin: origin.clone(),
        })
    }

    fn build_resource(
        &mut self,
        identifier: String,
        origin: &Origin,
        parameters: Option<&Node>,
        returns: Option<&Node>,
        type_key: &Node,
        attributes: &Node,
    ) -> Result<ResourceStep, CompileError> {
        let resource_type = self
            .resolver
            .resolve(type_key.as_str().unwrap_or_default(), &type_key.origin)?;
        let attribute_types = self.resolver.attributes_of(&resource_type.ty).clone();
        let mut parameters = self.parameters(&identifier, parameters)?;

        let mut values = IndexMap::new();
        let mut implicit: Vec<Parameter> = Vec::new();
        for (key, node) in attributes.as_mapping().unwrap_or_default() {
            let name = key.key_text().unwrap_or_default();
            let Some(attribute_type) = attribute_types.get(&name) else {
                return Err(CompileError::unresolved_attribute(
                    &resource_type.to_string(),
                    &name,
                    key.origin.clone(),
                ));
            };

            // Deferred leaves inside a literal pass through the conversion.
            let value = deferred::build(node);
            let value = if value.as_deferred().is_none() {
                self.resolver
                    .convert(&value, attribute_type)
                    .map_err(|e| CompileError::type_mismatch(&identifier, e, node.origin.clone()))?
            } else {
                value
            };

            // A reference that is the whole value takes the attribute's type.
            let whole = value.as_deferred().and_then(Deferred::variable);
            for variable in value.variables() {
                if parameters.iter().chain(&implicit).any(|p| p.name == variable) {
                    continue;
                }
                let ty = if whole == Some(variable.as_str()) {
                    attribute_type.clone()
                } else {
                    Type::Any
                };
                implicit.push(Parameter {
                    name: variable,
                    ty: TypeReference::new(ty, node.origin.clone()),
                    value: None,
                });
            }

            values.insert(name, value);
        }
        parameters.extend(implicit);

        let returns = declarations(&identifier, document::RETURNS, returns)?
            .into_iter()
            .map(|decl| self.resource_return(&identifier, &resource_type, &attribute_types, decl))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            identifier = %identifier,
            style = "resource",
            resource_type = %resource_type,
            "compiled step"
        );

        Ok(ResourceStep {
            identifier,
            parameters,
            returns,
            resource_type,
            attributes: values,
            origin: origin.clone(),
        })
    }

    fn parameters(&mut self, identifier: &str, node: Option<&Node>) -> Result<Vec<Parameter>, CompileError> {
        declarations(identifier, document::PARAMETERS, node)?
            .into_iter()
            .map(|decl| self.parameter(identifier, decl))
            .collect()
    }

    fn parameter(&mut self, identifier: &str, decl: Declaration<'_>) -> Result<Parameter, CompileError> {
        let ty = match decl.type_node {
            Some(node) => self.resolver.resolve(type_text(node)?, &node.origin)?,
            None => self.resolver.any(&decl.origin),
        };

        let value = match decl.value {
            None => None,
            Some(DeclaredValue::Lookup(node)) => Some(deferred::lookup(&lookup_key(node)?)),
            Some(DeclaredValue::Value(node)) => {
                let value = deferred::build(node);
                if value.as_deferred().is_none() && decl.type_node.is_some() {
                    let converted = self
                        .resolver
                        .convert(&value, &ty.ty)
                        .map_err(|e| CompileError::type_mismatch(identifier, e, node.origin.clone()))?;
                    Some(converted)
                } else {
                    Some(value)
                }
            }
        };

        Ok(Parameter {
            name: decl.name,
            ty,
            value,
        })
    }

    fn workflow_return(&mut self, identifier: &str, decl: Declaration<'_>) -> Result<Parameter, CompileError> {
        reject_return_value(identifier, &decl)?;
        let ty = match decl.type_node {
            Some(node) => self.resolver.resolve(type_text(node)?, &node.origin)?,
            None => self.resolver.any(&decl.origin),
        };
        Ok(Parameter {
            name: decl.name,
            ty,
            value: None,
        })
    }

    /// Returns of a resource name its attributes and are optional, since
    /// the resource may not produce them.
    fn resource_return(
        &mut self,
        identifier: &str,
        resource_type: &TypeReference,
        attribute_types: &IndexMap<String, Type>,
        decl: Declaration<'_>,
    ) -> Result<Parameter, CompileError> {
        reject_return_value(identifier, &decl)?;
        let (ty, origin) = match decl.type_node {
            Some(node) => {
                let declared = self.resolver.resolve(type_text(node)?, &node.origin)?;
                (declared.ty, declared.origin)
            }
            None => match attribute_types.get(&decl.name) {
                Some(ty) => (ty.clone(), decl.origin.clone()),
                None => {
                    return Err(CompileError::unresolved_attribute(
                        &resource_type.to_string(),
                        &decl.name,
                        decl.origin,
                    ));
                }
            },
        };
        Ok(Parameter {
            name: decl.name,
            ty: TypeReference::new(ty.optional(), origin),
            value: None,
        })
    }
}

fn reject_return_value(identifier: &str, decl: &Declaration<'_>) -> Result<(), CompileError> {
    if decl.value.is_some() {
        return Err(CompileError::document(
            format!(
                "return '{}' of step '{}' cannot have a value",
                decl.name, identifier
            ),
            decl.origin.clone(),
        ));
    }
    Ok(())
}

/// Scalar keys name steps by their text, so `1:` names step `1`.
fn step_name(key: &Node) -> Result<String, CompileError> {
    let name = match key.value {
        NodeValue::Null => None,
        _ => key.key_text(),
    };
    match name {
        Some(name) if !name.is_empty() && !name.contains(SEPARATOR) => Ok(name),
        _ => Err(CompileError::document(
            format!(
                "step name must be a non-empty scalar without '{}'",
                SEPARATOR
            ),
            key.origin.clone(),
        )),
    }
}

fn type_text(node: &Node) -> Result<&str, CompileError> {
    node.as_str().ok_or_else(|| {
        CompileError::document(
            format!("type must be a string, got a {}", node.kind_name()),
            node.origin.clone(),
        )
    })
}

fn lookup_key(node: &Node) -> Result<String, CompileError> {
    match &node.value {
        NodeValue::Sequence(_) | NodeValue::Mapping(_) | NodeValue::Null => {
            Err(CompileError::document(
                format!("lookup key must be a scalar, got a {}", node.kind_name()),
                node.origin.clone(),
            ))
        }
        _ => Ok(node.key_text().unwrap_or_default()),
    }
}

/// Read a `parameters` or `returns` block in any of its accepted forms:
/// a single name, a list of names or `{name, type?, value?, lookup?}`
/// entries, or a map of name to type or `{type?, value?, lookup?}`.
fn declarations<'n>(
    identifier: &str,
    block: &str,
    node: Option<&'n Node>,
) -> Result<Vec<Declaration<'n>>, CompileError> {
    let Some(node) = node else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    match &node.value {
        NodeValue::Null => {}
        NodeValue::String(name) => out.push(Declaration::named(name, &node.origin)),
        NodeValue::Sequence(items) => {
            for item in items {
                out.push(list_entry(block, item)?);
            }
        }
        NodeValue::Mapping(entries) => {
            for (key, value) in entries {
                out.push(map_entry(block, key, value)?);
            }
        }
        _ => {
            return Err(CompileError::document(
                format!(
                    "'{}' of step '{}' must be a mapping, a sequence or a name, got a {}",
                    block,
                    identifier,
                    node.kind_name()
                ),
                node.origin.clone(),
            ));
        }
    }

    for (i, decl) in out.iter().enumerate() {
        if out[..i].iter().any(|d| d.name == decl.name) {
            return Err(CompileError::document(
                format!(
                    "duplicate entry '{}' in '{}' of step '{}'",
                    decl.name, block, identifier
                ),
                decl.origin.clone(),
            ));
        }
    }
    Ok(out)
}

fn list_entry<'n>(block: &str, item: &'n Node) -> Result<Declaration<'n>, CompileError> {
    if let Some(name) = item.as_str() {
        return Ok(Declaration::named(name, &item.origin));
    }
    if item.as_mapping().is_none() {
        return Err(CompileError::document(
            format!(
                "entry of '{}' must be a name or a mapping, got a {}",
                block,
                item.kind_name()
            ),
            item.origin.clone(),
        ));
    }
    let name = match item.get("name") {
        Some(name) => name.as_str().ok_or_else(|| {
            CompileError::document(
                format!("name in '{}' must be a string", block),
                name.origin.clone(),
            )
        })?,
        None => {
            return Err(CompileError::document(
                format!("entry of '{}' has no 'name'", block),
                item.origin.clone(),
            ));
        }
    };
    let mut decl = Declaration::named(name, &item.origin);
    read_fields(block, &mut decl, item, true)?;
    Ok(decl)
}

fn map_entry<'n>(block: &str, key: &'n Node, value: &'n Node) -> Result<Declaration<'n>, CompileError> {
    let name = key.as_str().ok_or_else(|| {
        CompileError::document(
            format!("name in '{}' must be a string", block),
            key.origin.clone(),
        )
    })?;
    let mut decl = Declaration::named(name, &key.origin);
    match &value.value {
        NodeValue::Null => {}
        NodeValue::String(_) => decl.type_node = Some(value),
        NodeValue::Mapping(_) => read_fields(block, &mut decl, value, false)?,
        _ => {
            return Err(CompileError::document(
                format!(
                    "'{}' in '{}' must be a type or a mapping, got a {}",
                    name,
                    block,
                    value.kind_name()
                ),
                value.origin.clone(),
            ));
        }
    }
    Ok(decl)
}

fn read_fields<'n>(
    block: &str,
    decl: &mut Declaration<'n>,
    node: &'n Node,
    allow_name: bool,
) -> Result<(), CompileError> {
    for (key, value) in node.as_mapping().unwrap_or_default() {
        let field = match key.as_str() {
            Some("name") if allow_name => continue,
            Some("type") => {
                decl.type_node = Some(value);
                continue;
            }
            Some(field @ ("value" | "lookup")) => field,
            _ => {
                return Err(CompileError::document(
                    format!(
                        "unexpected key '{}' in '{}' entry '{}'",
                        key.key_text().unwrap_or_default(),
                        block,
                        decl.name
                    ),
                    key.origin.clone(),
                ));
            }
        };
        if decl.value.is_some() {
            return Err(CompileError::document(
                format!(
                    "'{}' entry '{}' cannot have both 'value' and 'lookup'",
                    block, decl.name
                ),
                key.origin.clone(),
            ));
        }
        decl.value = Some(match field {
            "lookup" => DeclaredValue::Lookup(value),
            _ => DeclaredValue::Value(value),
        });
    }
    Ok(())
}
