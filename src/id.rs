//! Identifier assignment - stable, content-derived ids
//!
//! Every record id is a hash over the fields that define the record's
//! identity:
//! - files: `path`
//! - entities: `kind` + `qualified_name`
//! - AST nodes: `qualified_name` + `symbol_type` + `ast_type` + location
//!
//! Because ids never depend on insertion order or on a round-trip through the
//! store, a later event can reference an earlier entity before either of them
//! has been persisted.

use crate::location::FileLoc;
use crate::symbol::{AstType, EntityKind, SymbolType};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Value as stored in an SQLite INTEGER column.
            pub fn as_i64(self) -> i64 {
                self.0 as i64
            }

            pub fn from_i64(value: i64) -> Self {
                Self(value as u64)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016x}", self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a source file.
    FileId
);
define_id!(
    /// Identity of a Variable, Function or Class entity.
    EntityId
);
define_id!(
    /// Identity of one located occurrence (declaration or usage).
    AstNodeId
);

/// Incremental builder over blake3.
///
/// Fields are length-prefixed so that `("ab", "c")` and `("a", "bc")` never
/// hash to the same id.
struct IdHasher(blake3::Hasher);

impl IdHasher {
    fn new(domain: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(&[0]);
        Self(hasher)
    }

    fn text(mut self, value: &str) -> Self {
        self.0.update(&(value.len() as u64).to_le_bytes());
        self.0.update(value.as_bytes());
        self
    }

    fn number(mut self, value: u64) -> Self {
        self.0.update(&value.to_le_bytes());
        self
    }

    /// First eight bytes of the digest with the sign bit cleared, so ids stay
    /// positive in an INTEGER column.
    fn finish(&self) -> u64 {
        let digest = self.0.finalize();
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(buf) & (i64::MAX as u64)
    }
}

pub fn file_id(path: &str) -> FileId {
    FileId(IdHasher::new("file").text(path).finish())
}

pub fn entity_id(kind: EntityKind, qualified_name: &str) -> EntityId {
    EntityId(
        IdHasher::new("entity")
            .text(kind.as_str())
            .text(qualified_name)
            .finish(),
    )
}

pub fn ast_node_id(
    qualified_name: &str,
    symbol_type: SymbolType,
    ast_type: AstType,
    location: &FileLoc,
) -> AstNodeId {
    let range = location.range;
    AstNodeId(
        IdHasher::new("ast_node")
            .text(qualified_name)
            .text(symbol_type.as_str())
            .text(ast_type.as_str())
            .number(location.file.0)
            .number(range.start.line as u64)
            .number(range.start.column as u64)
            .number(range.end.line as u64)
            .number(range.end.column as u64)
            .finish(),
    )
}
