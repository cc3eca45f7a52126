//! Indexing session - event ingestion and the end-of-session flush
//!
//! A session owns the store, the shared file table, the symbol table, the
//! usage ledger and the pending buffers. The front-end drives it one event at
//! a time; every `ingest_*` operation is fire-and-forget and never fails the
//! session for a single bad record. `finalize_session` writes the buffers in
//! one transaction and reports what happened.

use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use crate::edge::{ClassMember, Documentation, DocumentationKind, Import, Inheritance, MemberKind, TypeAssociation};
use crate::event::{
    ClassPreprocessedEvent, ClassResolvedEvent, Event, FileEvent, FilePosition, FunctionEvent,
    ImportEvent, MemberRecord, UsageRecord, VariableEvent,
};
use crate::graph::{GraphStats, PendingGraph};
use crate::id::{self, EntityId, FileId};
use crate::ledger::UsageLedger;
use crate::location::{FileLoc, Range};
use crate::source::{BuildAction, File, ParseStatus, SourceManager};
use crate::storage::{BatchReport, SqliteStore, Store};
use crate::symbol::{AstNode, Class, Entity, EntityKind, Function, SymbolType, Variable};
use crate::table::{EntityRef, SymbolTable};
use crate::{Error, Result};

/// State shared with the outside world: the store handle and the file table.
pub struct SessionContext<S> {
    pub store: S,
    pub sources: SourceManager,
}

impl<S: Store> SessionContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            sources: SourceManager::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Do not record Documentation for functions and classes
    pub skip_doccomment: bool,
}

/// Diagnostics collected while ingesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub variables: usize,
    pub functions: usize,
    pub classes_preprocessed: usize,
    pub classes_resolved: usize,
    pub imports: usize,
    /// Records dropped whole (missing field, bad transition, duplicate, store
    /// rejection of a file)
    pub skipped_records: usize,
    /// Stream lines that did not decode as an event
    pub malformed_events: usize,
    /// Edges dropped because a name did not resolve
    pub unresolved_references: usize,
    /// Usages absorbed by the ledger
    pub duplicate_usages: usize,
}

impl IngestStats {
    pub fn events(&self) -> usize {
        self.files
            + self.variables
            + self.functions
            + self.classes_preprocessed
            + self.classes_resolved
            + self.imports
    }

    /// Label/value pairs for display.
    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("Files", self.files),
            ("Variables", self.variables),
            ("Functions", self.functions),
            ("Classes (preprocessed)", self.classes_preprocessed),
            ("Classes (resolved)", self.classes_resolved),
            ("Imports", self.imports),
            ("Skipped records", self.skipped_records),
            ("Malformed events", self.malformed_events),
            ("Unresolved references", self.unresolved_references),
            ("Duplicate usages", self.duplicate_usages),
        ]
    }
}

/// Result of `finalize_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub ingest: IngestStats,
    /// What was buffered when the flush started
    pub pending: GraphStats,
    pub batch: BatchReport,
}

pub struct Session<S: Store = SqliteStore> {
    ctx: SessionContext<S>,
    options: SessionOptions,
    table: SymbolTable,
    ledger: UsageLedger,
    graph: PendingGraph,
    stats: IngestStats,
}

/// A complete front-end position: the file path and its location.
///
/// Any missing piece means no location. The file is not registered here.
fn locate(position: Option<&FilePosition>) -> Option<(&str, FileLoc)> {
    let position = position?;
    let path = position.file.as_deref().filter(|p| !p.is_empty())?;
    let range = position.range.as_ref()?;
    let start = range.start_position?;
    let end = range.end_position?;
    Some((path, FileLoc::new(id::file_id(path), Range::new(start, end))))
}

/// A present, non-empty string field.
fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingField(field))
}

impl<S: Store> Session<S> {
    pub fn new(ctx: SessionContext<S>, options: SessionOptions) -> Self {
        info!("Starting indexing session (skip_doccomment={})", options.skip_doccomment);
        Self {
            ctx,
            options,
            table: SymbolTable::new(),
            ledger: UsageLedger::new(),
            graph: PendingGraph::new(),
            stats: IngestStats::default(),
        }
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn graph(&self) -> &PendingGraph {
        &self.graph
    }

    pub fn sources(&self) -> &SourceManager {
        &self.ctx.sources
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Feed a decoded event stream, skipping lines that failed to decode.
    pub fn ingest_all<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = (usize, Result<Event>)>,
    {
        for (line, event) in events {
            match event {
                Ok(event) => self.ingest(event),
                Err(e) => {
                    self.stats.malformed_events += 1;
                    warn!("Skipping event on line {}: {}", line, e);
                }
            }
        }
    }

    pub fn ingest(&mut self, event: Event) {
        match event {
            Event::File(e) => self.ingest_file(e),
            Event::Variable(e) => self.ingest_variable(e),
            Event::Function(e) => self.ingest_function(e),
            Event::ClassPreprocessed(e) => self.ingest_class_preprocessed(e),
            Event::ClassResolved(e) => self.ingest_class_resolved(e),
            Event::Import(e) => self.ingest_import(e),
        }
    }

    pub fn ingest_file(&mut self, event: FileEvent) {
        self.stats.files += 1;
        let result = self.try_ingest_file(event);
        self.settle("file", result);
    }

    pub fn ingest_variable(&mut self, event: VariableEvent) {
        self.stats.variables += 1;
        let result = self.try_ingest_variable(event);
        self.settle("variable", result);
    }

    pub fn ingest_function(&mut self, event: FunctionEvent) {
        self.stats.functions += 1;
        let result = self.try_ingest_function(event);
        self.settle("function", result);
    }

    pub fn ingest_class_preprocessed(&mut self, event: ClassPreprocessedEvent) {
        self.stats.classes_preprocessed += 1;
        let result = self.try_ingest_class_preprocessed(event);
        self.settle("class_preprocessed", result);
    }

    pub fn ingest_class_resolved(&mut self, event: ClassResolvedEvent) {
        self.stats.classes_resolved += 1;
        let result = self.try_ingest_class_resolved(event);
        self.settle("class_resolved", result);
    }

    pub fn ingest_import(&mut self, event: ImportEvent) {
        self.stats.imports += 1;
        let result = self.try_ingest_import(event);
        self.settle("import", result);
    }

    /// Write every buffered record in one transaction and end the session.
    ///
    /// On error nothing from the buffers reached the store; files committed by
    /// File events stay committed.
    pub fn finalize_session(self) -> Result<FlushReport> {
        let Session {
            mut ctx,
            ledger,
            mut graph,
            stats,
            ..
        } = self;

        graph.usage_nodes = ledger.into_nodes();
        let files = ctx.sources.unpersisted();
        let pending = graph.stats();
        info!(
            "Flushing session: {} AST nodes, {} entities, {} relations",
            pending.ast_nodes, pending.entities, pending.relations
        );

        let batch = ctx
            .store
            .persist_batch(&files, &graph)
            .inspect_err(|e| error!("Session flush failed, nothing was written: {}", e))?;

        info!(
            "Session flushed: {} rows written, {} conflicts skipped",
            batch.written, batch.conflicts
        );
        Ok(FlushReport {
            ingest: stats,
            pending,
            batch,
        })
    }

    // ========== Handlers ==========

    fn settle(&mut self, kind: &str, result: Result<()>) {
        if let Err(e) = result {
            self.stats.skipped_records += 1;
            warn!("Skipping {} record: {}", kind, e);
        }
    }

    fn try_ingest_file(&mut self, event: FileEvent) -> Result<()> {
        let path = required(event.path, "path")?;
        let code = event.parse_status.ok_or(Error::MissingField("parse_status"))?;
        let status = ParseStatus::from_code(code).unwrap_or_else(|| {
            warn!("Unknown parse status {} for {}", code, path);
            ParseStatus::None
        });

        let file = File {
            parse_status: status,
            ..File::new(path)
        };
        self.ctx.store.persist_file(&file, &BuildAction::default())?;
        self.ctx.sources.update_status(&file.path, status);
        self.ctx.sources.mark_persisted(file.id);
        debug!("Committed file {} ({})", file.path, file.parse_status);
        Ok(())
    }

    fn try_ingest_variable(&mut self, event: VariableEvent) -> Result<()> {
        let name = required(event.name, "name")?;
        let qualified_name = required(event.qualified_name, "qualified_name")?;
        let types = event.types.ok_or(Error::MissingField("type"))?;
        let usages = event.usages.ok_or(Error::MissingField("usages"))?;
        let (file, location) =
            locate(event.file_position.as_ref()).ok_or(Error::MissingField("file_position"))?;

        let entity = self.declare(EntityKind::Variable, name, qualified_name, event.visibility, file, location)?;
        self.bind_types(entity.id, &types);
        self.record_usages(EntityRef::from(&entity), &entity.qualified_name, &usages);
        self.graph.variables.push(Variable { entity });
        Ok(())
    }

    fn try_ingest_function(&mut self, event: FunctionEvent) -> Result<()> {
        let name = required(event.name, "name")?;
        let qualified_name = required(event.qualified_name, "qualified_name")?;
        let types = event.types.ok_or(Error::MissingField("type"))?;
        let usages = event.usages.ok_or(Error::MissingField("usages"))?;
        let documentation = event.documentation.ok_or(Error::MissingField("documentation"))?;
        let (file, location) =
            locate(event.file_position.as_ref()).ok_or(Error::MissingField("file_position"))?;

        let entity = self.declare(EntityKind::Function, name, qualified_name, event.visibility, file, location)?;
        let parameters = self.resolve_variables(&event.parameters, "parameter");
        let locals = self.resolve_variables(&event.locals, "local variable");
        self.bind_types(entity.id, &types);
        self.document(entity.id, DocumentationKind::Function, documentation);
        self.record_usages(EntityRef::from(&entity), &entity.qualified_name, &usages);
        self.graph.functions.push(Function {
            entity,
            parameters,
            locals,
        });
        Ok(())
    }

    fn try_ingest_class_preprocessed(&mut self, event: ClassPreprocessedEvent) -> Result<()> {
        let name = required(event.name, "name")?;
        let qualified_name = required(event.qualified_name, "qualified_name")?;
        let (file, location) =
            locate(event.file_position.as_ref()).ok_or(Error::MissingField("file_position"))?;

        let entity = self.declare(EntityKind::Class, name, qualified_name, event.visibility, file, location)?;
        self.graph.classes.push(Class { entity });
        Ok(())
    }

    fn try_ingest_class_resolved(&mut self, event: ClassResolvedEvent) -> Result<()> {
        let qualified_name = required(event.qualified_name, "qualified_name")?;
        let documentation = event.documentation.ok_or(Error::MissingField("documentation"))?;
        let bases = event.base_classes.ok_or(Error::MissingField("base_classes"))?;
        let members = event.members.ok_or(Error::MissingField("members"))?;
        let usages = event.usages.ok_or(Error::MissingField("usages"))?;

        let class = self.table.resolve_class(&qualified_name)?;
        self.document(class.id, DocumentationKind::Class, documentation);
        self.record_usages(class, &qualified_name, &usages);

        let mut seen_bases = HashSet::new();
        for base in &bases {
            match self.table.lookup_class(base) {
                Some(resolved) => {
                    if seen_bases.insert(resolved.id) {
                        self.graph.inheritance.push(Inheritance {
                            derived: class.id,
                            base: resolved.id,
                        });
                    }
                }
                None => self.unresolved("base class", base),
            }
        }

        let groups = [
            (&members.methods, MemberKind::Method, false),
            (&members.static_methods, MemberKind::Method, true),
            (&members.attributes, MemberKind::Attribute, false),
            (&members.static_attributes, MemberKind::Attribute, true),
            (&members.classes, MemberKind::Class, false),
        ];
        for (records, kind, static_member) in groups {
            for record in records {
                self.attach_member(class, &qualified_name, record, kind, static_member);
            }
        }
        Ok(())
    }

    fn try_ingest_import(&mut self, event: ImportEvent) -> Result<()> {
        let importer_path = required(event.importer, "importer")?;
        let modules = event.imported_modules.ok_or(Error::MissingField("imported_modules"))?;
        let symbols = event.imported_symbols.ok_or(Error::MissingField("imported_symbols"))?;
        let importer = self
            .ctx
            .sources
            .get_announced(&importer_path)
            .map(|f| f.id)
            .ok_or(Error::UnresolvedReference(importer_path))?;

        for module in &modules {
            self.add_import(importer, module.path.as_deref(), None, module.file_position.as_ref());
        }
        for pair in &symbols {
            self.add_import(
                importer,
                pair.path.as_deref(),
                pair.symbol.as_deref(),
                pair.file_position.as_ref(),
            );
        }
        Ok(())
    }

    // ========== Building blocks ==========

    /// Build the declaration node and entity and register them.
    ///
    /// The location's file joins the file table only once the name is taken.
    fn declare(
        &mut self,
        kind: EntityKind,
        name: String,
        qualified_name: String,
        visibility: Option<String>,
        file: &str,
        location: FileLoc,
    ) -> Result<Entity> {
        let node = AstNode::declaration(&qualified_name, kind.symbol_type(), location);
        let entity = Entity::new(kind, name, qualified_name, visibility.unwrap_or_default(), node.id);
        self.table.register(&entity)?;
        self.ctx.sources.get_or_create(file);
        self.graph.add_node(node);
        self.ledger.register(entity.id);
        Ok(entity)
    }

    fn record_usages(&mut self, owner: EntityRef, qualified_name: &str, usages: &[UsageRecord]) {
        for usage in usages {
            let Some((file, location)) = locate(usage.file_position.as_ref()) else {
                debug!("Dropping usage of {} without a location", qualified_name);
                continue;
            };
            self.ctx.sources.get_or_create(file);
            let node = AstNode::usage(qualified_name, owner.kind.symbol_type(), location);
            if !self.ledger.insert(owner.id, node) {
                self.stats.duplicate_usages += 1;
                debug!("Usage of {} at {} already recorded", qualified_name, location);
            }
        }
    }

    fn bind_types(&mut self, symbol: EntityId, types: &[String]) {
        let mut seen = HashSet::new();
        for type_name in types {
            match self.table.lookup_entity(type_name) {
                Some(ty) => {
                    if seen.insert(ty.id) {
                        self.graph.types.push(TypeAssociation {
                            symbol,
                            type_id: ty.id,
                        });
                    }
                }
                None => self.unresolved("type", type_name),
            }
        }
    }

    fn resolve_variables(&mut self, names: &[String], role: &str) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            match self.table.lookup_variable(name) {
                Some(var) => ids.push(var.id),
                None => self.unresolved(role, name),
            }
        }
        ids
    }

    fn document(&mut self, documented: EntityId, kind: DocumentationKind, text: String) {
        if self.options.skip_doccomment {
            return;
        }
        self.graph.documentation.push(Documentation {
            text,
            documented,
            kind,
        });
    }

    fn attach_member(
        &mut self,
        class: EntityRef,
        class_name: &str,
        record: &MemberRecord,
        kind: MemberKind,
        static_member: bool,
    ) {
        if kind == MemberKind::Attribute && record.qualified_name.is_empty() {
            debug!("Skipping attribute of {} introduced by an import", class_name);
            return;
        }

        let member = match kind {
            MemberKind::Method => self.table.lookup_function(&record.qualified_name),
            MemberKind::Attribute => self.table.lookup_variable(&record.qualified_name),
            MemberKind::Class => self.table.lookup_class(&record.qualified_name),
        };
        let Some(member) = member else {
            self.unresolved(kind.as_str(), &record.qualified_name);
            return;
        };

        self.graph.class_members.push(ClassMember {
            class_id: class.id,
            member_id: member.id,
            ast_node_id: member.ast_node_id,
            kind,
            static_member,
        });
        self.record_usages(member, &record.qualified_name, &record.usages);
    }

    fn add_import(
        &mut self,
        importer: FileId,
        path: Option<&str>,
        symbol: Option<&str>,
        position: Option<&FilePosition>,
    ) {
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            debug!("Skipping import entry without a module path");
            return;
        };
        let Some(imported) = self.ctx.sources.get_announced(path).map(|f| f.id) else {
            self.unresolved("module", path);
            return;
        };
        let Some((file, location)) = locate(position) else {
            debug!("Skipping import of {} without a location", path);
            return;
        };

        let symbol = symbol.filter(|s| !s.is_empty());
        let imported_symbol = symbol.and_then(|name| match self.table.lookup_entity(name) {
            Some(entity) => Some(entity.id),
            None => {
                self.unresolved("imported symbol", name);
                None
            }
        });

        let node = AstNode::declaration(symbol.unwrap_or(path), SymbolType::Module, location);
        let ast_node_id = node.id;
        if !self.graph.add_node(node) {
            debug!("Import of {} at {} already recorded", path, location);
            return;
        }
        self.ctx.sources.get_or_create(file);
        self.graph.imports.push(Import {
            ast_node_id,
            importer,
            imported,
            imported_symbol,
        });
    }

    fn unresolved(&mut self, what: &str, name: &str) {
        self.stats.unresolved_references += 1;
        debug!("Dropping unresolved {} reference: {}", what, name);
    }
}
