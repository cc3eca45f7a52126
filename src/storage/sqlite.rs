//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use crate::{Error, Result};
use crate::edge::{ClassMember, Documentation, DocumentationKind, Import, Inheritance, TypeAssociation};
use crate::graph::PendingGraph;
use crate::id::{AstNodeId, EntityId, FileId};
use crate::location::{FileLoc, Position, Range};
use crate::source::{BuildAction, File, ParseStatus};
use crate::symbol::{AstNode, AstType, Entity, EntityKind, SymbolType};
use super::{BatchReport, Store, schema};

/// SQLite-backed store for indexing sessions
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Read-back ==========

    /// Get a file by path
    pub fn get_file(&self, path: &str) -> Result<Option<File>> {
        self.conn
            .query_row(
                "SELECT id, path, parse_status FROM files WHERE path = ?1",
                [path],
                |row| {
                    let status: String = row.get(2)?;
                    let parse_status: ParseStatus = status.parse().map_err(|e: Error| {
                        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
                    })?;
                    Ok(File {
                        id: FileId::from_i64(row.get(0)?),
                        path: row.get(1)?,
                        parse_status,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Number of build actions recorded for a file
    pub fn count_build_sources(&self, file: FileId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM build_sources WHERE file_id = ?1",
            [file.as_i64()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All AST nodes for a qualified name, declarations first
    pub fn find_ast_nodes(&self, qualified_name: &str) -> Result<Vec<AstNode>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, qualified_name, symbol_type, ast_type, file_id, start_line, start_column, end_line, end_column
             FROM ast_nodes WHERE qualified_name = ?1 ORDER BY ast_type, start_line, start_column",
        )?;

        let nodes = stmt
            .query_map([qualified_name], |row| self.row_to_ast_node(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(nodes)
    }

    /// Helper to convert a row to an AstNode
    fn row_to_ast_node(&self, row: &rusqlite::Row) -> rusqlite::Result<AstNode> {
        let symbol_type: SymbolType = row.get::<_, String>(2)?.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let ast_type: AstType = row.get::<_, String>(3)?.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let range = Range::new(
            Position::new(row.get(5)?, row.get(6)?),
            Position::new(row.get(7)?, row.get(8)?),
        );

        Ok(AstNode {
            id: AstNodeId::from_i64(row.get(0)?),
            location: FileLoc::new(FileId::from_i64(row.get(4)?), range),
            qualified_name: row.get(1)?,
            symbol_type,
            ast_type,
        })
    }

    /// Check whether an entity row exists
    pub fn entity_exists(&self, kind: EntityKind, id: EntityId) -> Result<bool> {
        let sql = match kind {
            EntityKind::Variable => "SELECT 1 FROM variables WHERE id = ?1",
            EntityKind::Function => "SELECT 1 FROM functions WHERE id = ?1",
            EntityKind::Class => "SELECT 1 FROM classes WHERE id = ?1",
        };
        let found: Option<i64> = self
            .conn
            .query_row(sql, [id.as_i64()], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Parameter (`role = "parameter"`) or local (`role = "local"`) variables
    /// of a function, in order
    pub fn function_variables(&self, function: EntityId, role: &str) -> Result<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT variable_id FROM function_variables WHERE function_id = ?1 AND role = ?2 ORDER BY position",
        )?;
        let ids = stmt
            .query_map(params![function.as_i64(), role], |row| row.get::<_, i64>(0))?
            .filter_map(|r| r.ok())
            .map(EntityId::from_i64)
            .collect();
        Ok(ids)
    }

    pub fn inheritance_edges(&self) -> Result<Vec<Inheritance>> {
        let mut stmt = self.conn.prepare("SELECT derived, base FROM inheritance")?;
        let edges = stmt
            .query_map([], |row| {
                Ok(Inheritance {
                    derived: EntityId::from_i64(row.get(0)?),
                    base: EntityId::from_i64(row.get(1)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(edges)
    }

    pub fn class_members(&self, class: EntityId) -> Result<Vec<ClassMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT class_id, member_id, ast_node_id, kind, static_member FROM class_members WHERE class_id = ?1 ORDER BY id",
        )?;
        let members = stmt
            .query_map([class.as_i64()], |row| {
                let kind: String = row.get(3)?;
                let kind = kind.parse().map_err(|e: Error| {
                    rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
                })?;
                Ok(ClassMember {
                    class_id: EntityId::from_i64(row.get(0)?),
                    member_id: EntityId::from_i64(row.get(1)?),
                    ast_node_id: AstNodeId::from_i64(row.get(2)?),
                    kind,
                    static_member: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(members)
    }

    pub fn imports(&self, importer: FileId) -> Result<Vec<Import>> {
        let mut stmt = self.conn.prepare(
            "SELECT ast_node_id, importer, imported, imported_symbol FROM imports WHERE importer = ?1 ORDER BY id",
        )?;
        let imports = stmt
            .query_map([importer.as_i64()], |row| {
                Ok(Import {
                    ast_node_id: AstNodeId::from_i64(row.get(0)?),
                    importer: FileId::from_i64(row.get(1)?),
                    imported: FileId::from_i64(row.get(2)?),
                    imported_symbol: row.get::<_, Option<i64>>(3)?.map(EntityId::from_i64),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(imports)
    }

    pub fn documentation(&self, documented: EntityId) -> Result<Option<Documentation>> {
        self.conn
            .query_row(
                "SELECT text, kind FROM documentation WHERE documented = ?1",
                [documented.as_i64()],
                |row| {
                    let kind: String = row.get(1)?;
                    let kind: DocumentationKind = kind.parse().map_err(|e: Error| {
                        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                    })?;
                    Ok(Documentation {
                        text: row.get(0)?,
                        documented,
                        kind,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn types_of(&self, symbol: EntityId) -> Result<Vec<EntityId>> {
        let mut stmt = self.conn.prepare("SELECT type_id FROM types WHERE symbol = ?1")?;
        let ids = stmt
            .query_map([symbol.as_i64()], |row| row.get::<_, i64>(0))?
            .filter_map(|r| r.ok())
            .map(EntityId::from_i64)
            .collect();
        Ok(ids)
    }

    /// Count rows of one table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        if !schema::TABLES.contains(&table) {
            return Err(Error::Parse(format!("Unknown table: {}", table)));
        }
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::with_capacity(schema::TABLES.len());
        for table in schema::TABLES {
            tables.push((*table, self.count_rows(table)?));
        }
        Ok(DbStats { tables })
    }
}

impl Store for SqliteStore {
    fn persist_file(&mut self, file: &File, action: &BuildAction) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO files (id, path, parse_status) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET parse_status = excluded.parse_status
            "#,
            params![file.id.as_i64(), file.path, file.parse_status.as_str()],
        )?;
        tx.execute(
            "INSERT INTO build_actions (command) VALUES (?1)",
            params![action.command],
        )?;
        let action_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO build_sources (file_id, action_id) VALUES (?1, ?2)",
            params![file.id.as_i64(), action_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn persist_batch(&mut self, files: &[File], graph: &PendingGraph) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let tx = self.conn.transaction()?;

        write_files(&tx, files, &mut report)?;
        write_ast_nodes(&tx, graph, &mut report)?;
        write_entities(&tx, graph, &mut report)?;
        write_relations(&tx, graph, &mut report)?;

        tx.commit()?;
        Ok(report)
    }
}

/// Count a row as written, or as a skipped conflict if the store rejected it
/// on a constraint. Any other error aborts the batch.
fn record(table: &str, result: rusqlite::Result<usize>, report: &mut BatchReport) -> Result<()> {
    match result {
        Ok(rows) => {
            report.written += rows;
            Ok(())
        }
        Err(rusqlite::Error::SqliteFailure(err, msg)) if err.code == ErrorCode::ConstraintViolation => {
            tracing::warn!(
                "Skipping conflicting {} record: {}",
                table,
                msg.unwrap_or_else(|| err.to_string())
            );
            report.conflicts += 1;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Files only referenced through locations. Files committed by a File event
/// are left untouched.
fn write_files(tx: &Transaction, files: &[File], report: &mut BatchReport) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO files (id, path, parse_status) VALUES (?1, ?2, ?3)",
    )?;
    for file in files {
        let result = stmt.execute(params![file.id.as_i64(), file.path, file.parse_status.as_str()]);
        record("files", result, report)?;
    }
    Ok(())
}

fn write_ast_nodes(tx: &Transaction, graph: &PendingGraph, report: &mut BatchReport) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO ast_nodes (id, qualified_name, symbol_type, ast_type, file_id, start_line, start_column, end_line, end_column)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )?;
    for node in graph.all_nodes() {
        let range = node.location.range;
        let result = stmt.execute(params![
            node.id.as_i64(),
            node.qualified_name,
            node.symbol_type.as_str(),
            node.ast_type.as_str(),
            node.location.file.as_i64(),
            range.start.line,
            range.start.column,
            range.end.line,
            range.end.column,
        ]);
        record("ast_nodes", result, report)?;
    }
    Ok(())
}

fn write_entity(tx: &Transaction, table: &'static str, entity: &Entity, report: &mut BatchReport) -> Result<bool> {
    let sql = format!(
        "INSERT INTO {} (id, ast_node_id, name, qualified_name, visibility) VALUES (?1, ?2, ?3, ?4, ?5)",
        table
    );
    let mut stmt = tx.prepare_cached(&sql)?;
    let before = report.written;
    let result = stmt.execute(params![
        entity.id.as_i64(),
        entity.ast_node_id.as_i64(),
        entity.name,
        entity.qualified_name,
        entity.visibility,
    ]);
    record(table, result, report)?;
    Ok(report.written > before)
}

fn write_entities(tx: &Transaction, graph: &PendingGraph, report: &mut BatchReport) -> Result<()> {
    for variable in &graph.variables {
        write_entity(tx, "variables", &variable.entity, report)?;
    }

    let mut stmt = tx.prepare_cached(
        "INSERT INTO function_variables (function_id, role, position, variable_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for function in &graph.functions {
        if !write_entity(tx, "functions", &function.entity, report)? {
            continue;
        }
        let roles = [("parameter", &function.parameters), ("local", &function.locals)];
        for (role, variables) in roles {
            for (position, variable) in variables.iter().enumerate() {
                let result = stmt.execute(params![
                    function.entity.id.as_i64(),
                    role,
                    position as i64,
                    variable.as_i64(),
                ]);
                record("function_variables", result, report)?;
            }
        }
    }

    for class in &graph.classes {
        write_entity(tx, "classes", &class.entity, report)?;
    }
    Ok(())
}

fn write_relations(tx: &Transaction, graph: &PendingGraph, report: &mut BatchReport) -> Result<()> {
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO class_members (class_id, member_id, ast_node_id, kind, static_member) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for member in &graph.class_members {
            let result = stmt.execute(params![
                member.class_id.as_i64(),
                member.member_id.as_i64(),
                member.ast_node_id.as_i64(),
                member.kind.as_str(),
                member.static_member,
            ]);
            record("class_members", result, report)?;
        }
    }

    {
        let mut stmt = tx.prepare_cached("INSERT INTO inheritance (derived, base) VALUES (?1, ?2)")?;
        for edge in &graph.inheritance {
            let result = stmt.execute(params![edge.derived.as_i64(), edge.base.as_i64()]);
            record("inheritance", result, report)?;
        }
    }

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO imports (ast_node_id, importer, imported, imported_symbol) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for import in &graph.imports {
            let result = stmt.execute(params![
                import.ast_node_id.as_i64(),
                import.importer.as_i64(),
                import.imported.as_i64(),
                import.imported_symbol.map(EntityId::as_i64),
            ]);
            record("imports", result, report)?;
        }
    }

    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO documentation (documented, kind, text) VALUES (?1, ?2, ?3)",
        )?;
        for doc in &graph.documentation {
            let result = stmt.execute(params![doc.documented.as_i64(), doc.kind.as_str(), doc.text]);
            record("documentation", result, report)?;
        }
    }

    let mut stmt = tx.prepare_cached("INSERT INTO types (symbol, type_id) VALUES (?1, ?2)")?;
    for TypeAssociation { symbol, type_id } in &graph.types {
        let result = stmt.execute(params![symbol.as_i64(), type_id.as_i64()]);
        record("types", result, report)?;
    }
    Ok(())
}

/// Database statistics: row count per table, in write order
#[derive(Debug, Clone)]
pub struct DbStats {
    pub tables: Vec<(&'static str, usize)>,
}

impl DbStats {
    pub fn get(&self, table: &str) -> usize {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, count) in &self.tables {
            writeln!(f, "  {}: {}", table, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::MemberKind;
    use crate::id::file_id;
    use crate::symbol::{Class, Function, Variable};

    fn loc(path: &str, line: u32) -> FileLoc {
        FileLoc::new(file_id(path), Range::new(Position::new(line, 0), Position::new(line, 4)))
    }

    fn entity(kind: EntityKind, qualified_name: &str, line: u32) -> (AstNode, Entity) {
        let node = AstNode::declaration(qualified_name, kind.symbol_type(), loc("/a.py", line));
        let entity = Entity::new(kind, qualified_name, qualified_name, "", node.id);
        (node, entity)
    }

    #[test]
    fn test_persist_file_records_build_pair() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut file = File::new("/a.py");
        file.parse_status = ParseStatus::FullyParsed;

        store.persist_file(&file, &BuildAction::default()).unwrap();

        let stored = store.get_file("/a.py").unwrap().unwrap();
        assert_eq!(stored.parse_status, ParseStatus::FullyParsed);
        assert_eq!(stored.id, file.id);
        assert_eq!(store.count_build_sources(file.id).unwrap(), 1);
        assert_eq!(store.count_rows("build_actions").unwrap(), 1);
    }

    #[test]
    fn test_persist_file_twice_updates_status() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut file = File::new("/a.py");
        store.persist_file(&file, &BuildAction::default()).unwrap();
        file.parse_status = ParseStatus::PartiallyParsed;
        store.persist_file(&file, &BuildAction::default()).unwrap();

        let stored = store.get_file("/a.py").unwrap().unwrap();
        assert_eq!(stored.parse_status, ParseStatus::PartiallyParsed);
        assert_eq!(store.count_rows("files").unwrap(), 1);
        assert_eq!(store.count_build_sources(file.id).unwrap(), 2);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let report = store.persist_batch(&[], &PendingGraph::new()).unwrap();
        assert_eq!(report, BatchReport::default());
        assert!(store.stats().unwrap().tables.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_batch_writes_nodes_entities_and_relations() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut graph = PendingGraph::new();

        let (x_node, x) = entity(EntityKind::Variable, "pkg.x", 1);
        let (f_node, f) = entity(EntityKind::Function, "pkg.f", 2);
        let (c_node, c) = entity(EntityKind::Class, "pkg.C", 3);
        graph.add_node(x_node);
        graph.add_node(f_node);
        graph.add_node(c_node);
        graph.variables.push(Variable { entity: x.clone() });
        graph.functions.push(Function { entity: f.clone(), parameters: vec![x.id], locals: vec![] });
        graph.classes.push(Class { entity: c.clone() });
        graph.class_members.push(ClassMember {
            class_id: c.id,
            member_id: f.id,
            ast_node_id: f.ast_node_id,
            kind: MemberKind::Method,
            static_member: false,
        });
        graph.types.push(TypeAssociation { symbol: x.id, type_id: c.id });

        let files = vec![File::new("/a.py")];
        let report = store.persist_batch(&files, &graph).unwrap();

        assert_eq!(report.conflicts, 0);
        assert_eq!(report.written, 1 + 3 + 3 + 1 + 1 + 1);
        assert!(store.entity_exists(EntityKind::Function, f.id).unwrap());
        assert_eq!(store.function_variables(f.id, "parameter").unwrap(), vec![x.id]);
        assert_eq!(store.class_members(c.id).unwrap().len(), 1);
        assert_eq!(store.types_of(x.id).unwrap(), vec![c.id]);
        assert_eq!(store.find_ast_nodes("pkg.x").unwrap().len(), 1);
    }

    #[test]
    fn test_conflicting_record_is_skipped() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let (node, x) = entity(EntityKind::Variable, "pkg.x", 1);

        let mut first = PendingGraph::new();
        first.add_node(node.clone());
        first.variables.push(Variable { entity: x.clone() });
        store.persist_batch(&[], &first).unwrap();

        let mut second = PendingGraph::new();
        second.add_node(node);
        second.variables.push(Variable { entity: x });
        let (y_node, _) = entity(EntityKind::Variable, "pkg.y", 2);
        second.add_node(y_node);
        let report = store.persist_batch(&[], &second).unwrap();

        assert_eq!(report.conflicts, 2);
        assert_eq!(report.written, 1);
        assert_eq!(store.count_rows("ast_nodes").unwrap(), 2);
    }

    #[test]
    fn test_location_files_do_not_override_committed_status() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut file = File::new("/a.py");
        file.parse_status = ParseStatus::FullyParsed;
        store.persist_file(&file, &BuildAction::default()).unwrap();

        store.persist_batch(&[File::new("/a.py")], &PendingGraph::new()).unwrap();

        let stored = store.get_file("/a.py").unwrap().unwrap();
        assert_eq!(stored.parse_status, ParseStatus::FullyParsed);
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.count_rows("sqlite_master; DROP TABLE files").is_err());
    }
}
