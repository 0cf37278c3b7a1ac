//! Turn parsed value nodes into `Value`s, recognizing deferred calls.
//!
//! A string scalar written as `name(arg, ...)` becomes a `Deferred` call and
//! `$name` becomes a variable reference. Everything else is a literal.
//! Nothing is evaluated and function names are not checked.

use indexmap::IndexMap;

use crate::ir::types::{Deferred, Value};
use crate::parse::{Node, NodeValue};

/// Build the value of `node`, descending into mappings and sequences.
pub fn build(node: &Node) -> Value {
    match &node.value {
        NodeValue::Null => Value::Undef,
        NodeValue::Boolean(b) => Value::Boolean(*b),
        NodeValue::Integer(i) => Value::Integer(*i),
        NodeValue::Float(f) => Value::Float(*f),
        NodeValue::String(s) => build_str(s),
        NodeValue::Sequence(items) => Value::Array(items.iter().map(build).collect()),
        NodeValue::Mapping(entries) => {
            let mut hash = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                hash.insert(key.key_text().unwrap_or_default(), build(value));
            }
            Value::Hash(hash)
        }
    }
}

/// Deferred form of `text` if it has one, otherwise a string literal.
pub fn build_str(text: &str) -> Value {
    match parse_deferred(text) {
        Some(deferred) => Value::Deferred(deferred),
        None => Value::String(text.to_string()),
    }
}

/// `lookup('key')`, the value a `lookup:` shorthand stands for.
pub fn lookup(key: &str) -> Value {
    Value::Deferred(Deferred::new("lookup", vec![Value::string(key)]))
}

/// Parse a whole string as a variable reference or a call.
pub fn parse_deferred(text: &str) -> Option<Deferred> {
    let mut cursor = Cursor::new(text.trim());
    let deferred = match cursor.peek()? {
        '$' => cursor.variable()?,
        _ => cursor.call()?,
    };
    cursor.skip_ws();
    cursor.at_end().then_some(deferred)
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Cursor {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn identifier(&mut self) -> Option<String> {
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }
        Some(self.take_while(|c| c.is_alphanumeric() || c == '_' || c == ':'))
    }

    fn variable(&mut self) -> Option<Deferred> {
        if !self.eat('$') {
            return None;
        }
        let name = self.identifier()?;
        Some(Deferred::new(format!("${}", name), Vec::new()))
    }

    /// `identifier '(' [arg (',' arg)*] ')'`
    fn call(&mut self) -> Option<Deferred> {
        let name = self.identifier()?;
        if !self.eat('(') {
            return None;
        }
        let mut arguments = Vec::new();
        self.skip_ws();
        if self.eat(')') {
            return Some(Deferred::new(name, arguments));
        }
        loop {
            arguments.push(self.argument()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(')') {
                return Some(Deferred::new(name, arguments));
            }
            return None;
        }
    }

    fn argument(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '\'' | '"' => self.quoted().map(Value::String),
            '$' => self.variable().map(Value::Deferred),
            _ => {
                let start = self.pos;
                if let Some(call) = self.call() {
                    return Some(Value::Deferred(call));
                }
                self.pos = start;
                let bare = self.take_while(|c| !matches!(c, ',' | '(' | ')'));
                let bare = bare.trim();
                if bare.is_empty() {
                    return None;
                }
                Some(bare_literal(bare))
            }
        }
    }

    /// Single- or double-quoted string with backslash escapes.
    fn quoted(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek()?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }
}

fn bare_literal(text: &str) -> Value {
    match text {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        "undef" | "null" | "~" => return Value::Undef,
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    Value::string(text)
}
