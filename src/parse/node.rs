//! Location-tracking YAML loader.
//!
//! Builds a `Node` tree from the event stream of `yaml-rust2`, attaching the
//! decoder's marker to every node as an `Origin`.

use std::collections::HashMap;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::origin::Origin;
use crate::error::CompileError;

#[derive(Debug, Clone)]
pub struct Node {
    pub value: NodeValue,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
pub enum NodeValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    /// Entries in document order. Keys are always scalars and unique.
    Mapping(Vec<(Node, Node)>),
}

impl Node {
    pub fn new(value: NodeValue, origin: Origin) -> Self {
        Node { value, origin }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            NodeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match &self.value {
            NodeValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.value {
            NodeValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, NodeValue::Null)
    }

    /// Scalar rendered as the key text it was written as.
    pub fn key_text(&self) -> Option<String> {
        match &self.value {
            NodeValue::Null => Some(String::new()),
            NodeValue::Boolean(b) => Some(b.to_string()),
            NodeValue::Integer(i) => Some(i.to_string()),
            NodeValue::Float(f) => Some(f.to_string()),
            NodeValue::String(s) => Some(s.clone()),
            NodeValue::Sequence(_) | NodeValue::Mapping(_) => None,
        }
    }

    /// Value of `key` in a mapping node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|(_, v)| v)
    }

    /// Key and value nodes of `key` in a mapping node.
    pub fn entry(&self, key: &str) -> Option<(&Node, &Node)> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(k, v)| (k, v))
    }

    /// Human name of the node's shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.value {
            NodeValue::Null => "null",
            NodeValue::Boolean(_) => "boolean",
            NodeValue::Integer(_) => "integer",
            NodeValue::Float(_) => "float",
            NodeValue::String(_) => "string",
            NodeValue::Sequence(_) => "sequence",
            NodeValue::Mapping(_) => "mapping",
        }
    }
}

/// Load the first YAML document in `source`.
///
/// An empty stream yields a null node at the start of the file.
pub fn load(source: &str, file: &str) -> Result<Node, CompileError> {
    let base = Origin::file_start(file);
    let mut loader = Loader::new(base.clone());
    let mut parser = Parser::new_from_str(source);

    parser.load(&mut loader, false).map_err(|e| {
        let mark = e.marker();
        CompileError::syntax(e.info(), origin_of(&base, mark))
    })?;

    if let Some(err) = loader.error {
        return Err(err);
    }
    Ok(loader
        .documents
        .into_iter()
        .next()
        .unwrap_or_else(|| Node::new(NodeValue::Null, base)))
}

fn origin_of(base: &Origin, mark: &Marker) -> Origin {
    base.at(mark.line(), mark.col() + 1)
}

enum Frame {
    Sequence {
        items: Vec<Node>,
        origin: Origin,
        anchor: usize,
    },
    Mapping {
        entries: Vec<(Node, Node)>,
        pending_key: Option<Node>,
        origin: Origin,
        anchor: usize,
    },
}

struct Loader {
    base: Origin,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Node>,
    documents: Vec<Node>,
    error: Option<CompileError>,
}

impl Loader {
    fn new(base: Origin) -> Self {
        Loader {
            base,
            stack: Vec::new(),
            anchors: HashMap::new(),
            documents: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: CompileError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn complete(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        self.insert(node);
    }

    fn insert(&mut self, node: Node) {
        let result = match self.stack.last_mut() {
            None => {
                self.documents.push(node);
                Ok(())
            }
            Some(Frame::Sequence { items, .. }) => {
                items.push(node);
                Ok(())
            }
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                None => match node.key_text() {
                    Some(_) => {
                        *pending_key = Some(node);
                        Ok(())
                    }
                    None => Err(CompileError::document(
                        format!("mapping key must be a scalar, got a {}", node.kind_name()),
                        node.origin,
                    )),
                },
                Some(key) => {
                    let text = key.key_text();
                    if entries.iter().any(|(k, _)| k.key_text() == text) {
                        Err(CompileError::document(
                            format!("duplicate key '{}'", text.unwrap_or_default()),
                            key.origin,
                        ))
                    } else {
                        entries.push((key, node));
                        Ok(())
                    }
                }
            },
        };
        if let Err(err) = result {
            self.fail(err);
        }
    }
}

impl MarkedEventReceiver for Loader {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        let origin = origin_of(&self.base, &mark);
        match event {
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Sequence {
                items: Vec::new(),
                origin,
                anchor,
            }),
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Mapping {
                entries: Vec::new(),
                pending_key: None,
                origin,
                anchor,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence {
                    items,
                    origin,
                    anchor,
                }) => self.complete(Node::new(NodeValue::Sequence(items), origin), anchor),
                Some(Frame::Mapping {
                    entries,
                    origin,
                    anchor,
                    ..
                }) => self.complete(Node::new(NodeValue::Mapping(entries), origin), anchor),
                None => {}
            },
            Event::Scalar(text, style, anchor, ..) => {
                let value = if style == TScalarStyle::Plain {
                    resolve_plain(&text)
                } else {
                    NodeValue::String(text)
                };
                self.complete(Node::new(value, origin), anchor);
            }
            Event::Alias(id) => match self.anchors.get(&id) {
                Some(node) => {
                    let node = Node::new(node.value.clone(), origin);
                    self.insert(node);
                }
                None => self.fail(CompileError::syntax("unknown anchor", origin)),
            },
            _ => {}
        }
    }
}

/// YAML 1.2 core schema resolution of a plain scalar.
fn resolve_plain(text: &str) -> NodeValue {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return NodeValue::Null,
        "true" | "True" | "TRUE" => return NodeValue::Boolean(true),
        "false" | "False" | "FALSE" => return NodeValue::Boolean(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return NodeValue::Float(f64::INFINITY);
        }
        "-.inf" | "-.Inf" | "-.INF" => return NodeValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return NodeValue::Float(f64::NAN),
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0o", 8)] {
        let Some(digits) = text.strip_prefix(prefix) else {
            continue;
        };
        if !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix)) {
            if let Ok(i) = i64::from_str_radix(digits, radix) {
                return NodeValue::Integer(i);
            }
        }
    }

    let numeric = text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if numeric {
        let digits = text.trim_start_matches(['+', '-']);
        if digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = text.parse::<i64>() {
                return NodeValue::Integer(i);
            }
        }
        if let Ok(f) = text.parse::<f64>() {
            return NodeValue::Float(f);
        }
    }

    NodeValue::String(text.to_string())
}
