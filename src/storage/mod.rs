//! Storage Layer - transactional persistence of an indexing session
//!
//! The engine touches the store through [`Store`] only:
//! - `persist_file`: one small transaction per File event
//! - `persist_batch`: one large transaction at session end
//!
//! The SQLite implementation keeps files, build actions/sources, AST nodes,
//! entities and relations in separate tables (see [`schema`]).

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore};

use crate::Result;
use crate::graph::PendingGraph;
use crate::source::{BuildAction, File};

/// Outcome of a batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Rows written
    pub written: usize,
    /// Rows rejected by the store (identifier collisions, uniqueness) and
    /// skipped
    pub conflicts: usize,
}

/// Transactional bulk-persist primitive.
pub trait Store {
    /// Commit a file record together with its build action/source pair.
    fn persist_file(&mut self, file: &File, action: &BuildAction) -> Result<()>;

    /// Write every buffered record in one transaction, in dependency order.
    ///
    /// Individual record conflicts are skipped and counted; any other failure
    /// rolls the whole batch back.
    fn persist_batch(&mut self, files: &[File], graph: &PendingGraph) -> Result<BatchReport>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn persist_file(&mut self, file: &File, action: &BuildAction) -> Result<()> {
        (**self).persist_file(file, action)
    }

    fn persist_batch(&mut self, files: &[File], graph: &PendingGraph) -> Result<BatchReport> {
        (**self).persist_batch(files, graph)
    }
}
