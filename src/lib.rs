//! # xref - Symbol resolution and deferred persistence for code indexing
//!
//! Consumes the declaration/usage events a front-end parser emits for one
//! source tree and turns them into a cross-reference model:
//! - Content-hash identifiers, stable within a session
//! - A symbol table from qualified name to entity, with two-phase classes
//! - A usage ledger that keeps one usage per (file, range) per entity
//! - One dependency-ordered SQLite transaction at session end

pub mod id;
pub mod location;
pub mod symbol;
pub mod edge;
pub mod source;
pub mod table;
pub mod ledger;
pub mod graph;
pub mod event;
pub mod session;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use event::{Event, EventReader};
pub use graph::PendingGraph;
pub use session::{FlushReport, IngestStats, Session, SessionContext, SessionOptions};
pub use storage::{SqliteStore, Store};
pub use symbol::{AstNode, EntityKind, SymbolType};
pub use table::{ClassState, SymbolTable};

/// Result type alias for xref operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for xref operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed event: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Invalid class transition for {qualified_name}: {from} -> {to}")]
    InvalidTransition {
        qualified_name: String,
        from: ClassState,
        to: ClassState,
    },

    #[error("Duplicate declaration of {qualified_name} (already registered as {existing})")]
    DuplicateDeclaration {
        qualified_name: String,
        existing: EntityKind,
    },

    #[error("Fatal: {0}")]
    Fatal(String),
}
