//! Source coordinates attached to every parsed node.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Where a piece of the workflow document came from.
///
/// Lines and columns are 1-based. The file name is shared between all
/// origins produced from the same document. Origins never take part in
/// equality of the entities that carry them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origin {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Origin {
    pub fn new(file: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Origin {
            file: file.into(),
            line,
            column,
        }
    }

    /// Origin pointing at the start of `file`.
    pub fn file_start(file: impl Into<Arc<str>>) -> Self {
        Origin::new(file, 1, 1)
    }

    pub fn at(&self, line: usize, column: usize) -> Self {
        Origin {
            file: Arc::clone(&self.file),
            line,
            column,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(file: {}, line: {}, column: {})",
            self.file, self.line, self.column
        )
    }
}
