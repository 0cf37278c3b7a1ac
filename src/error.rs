//! Unified compiler error type used across all phases.

use crate::parse::Origin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed YAML.
    ParseSyntaxError,
    /// Well-formed YAML that does not have the shape of a workflow document.
    InvalidDocument,
    /// Type expression names a type the type system does not know.
    UnresolvedType,
    /// Type expression is not syntactically valid.
    TypeSyntaxError,
    /// Attribute is not defined on the resource type.
    UnresolvedAttribute,
    /// Value cannot be converted to its declared type.
    TypeMismatch,
}

impl ErrorKind {
    /// Stable short code, used by the WASM surface.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::ParseSyntaxError => "P001",
            ErrorKind::InvalidDocument => "S001",
            ErrorKind::UnresolvedType => "T001",
            ErrorKind::TypeSyntaxError => "T002",
            ErrorKind::UnresolvedAttribute => "A001",
            ErrorKind::TypeMismatch => "C001",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ParseSyntaxError => write!(f, "ParseSyntaxError"),
            ErrorKind::InvalidDocument => write!(f, "InvalidDocument"),
            ErrorKind::UnresolvedType => write!(f, "UnresolvedType"),
            ErrorKind::TypeSyntaxError => write!(f, "TypeSyntaxError"),
            ErrorKind::UnresolvedAttribute => write!(f, "UnresolvedAttribute"),
            ErrorKind::TypeMismatch => write!(f, "TypeMismatch"),
        }
    }
}

/// The single error a failed compilation produces.
///
/// `cause` holds the already formatted message of a collaborator error
/// (type system, value conversion) and is rendered verbatim.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub origin: Origin,
    pub cause: Option<String>,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::diagnostic::format(self))
    }
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, origin: Origin) -> Self {
        CompileError {
            kind,
            message: message.into(),
            origin,
            cause: None,
        }
    }

    pub fn syntax(message: impl Into<String>, origin: Origin) -> Self {
        Self::new(ErrorKind::ParseSyntaxError, message, origin)
    }

    pub fn document(message: impl Into<String>, origin: Origin) -> Self {
        Self::new(ErrorKind::InvalidDocument, message, origin)
    }

    pub fn unresolved_type(name: &str, origin: Origin) -> Self {
        Self::new(
            ErrorKind::UnresolvedType,
            format!("Reference to unresolved type '{}'", name),
            origin,
        )
    }

    pub fn type_syntax(message: impl Into<String>, origin: Origin) -> Self {
        Self::new(ErrorKind::TypeSyntaxError, message, origin)
    }

    pub fn unresolved_attribute(resource_type: &str, attribute: &str, origin: Origin) -> Self {
        Self::new(
            ErrorKind::UnresolvedAttribute,
            format!("A {} has no attribute named {}", resource_type, attribute),
            origin,
        )
    }

    pub fn type_mismatch(identifier: &str, cause: impl ToString, origin: Origin) -> Self {
        CompileError {
            kind: ErrorKind::TypeMismatch,
            message: format!("error while building call {}", identifier),
            origin,
            cause: Some(cause.to_string()),
        }
    }
}
