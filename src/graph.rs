//! Pending Graph - in-memory buffers for one indexing session
//!
//! Everything the ingestion handlers produce lands here (except File records,
//! which are committed immediately). At session end the buffers are written in
//! dependency order: AST nodes, then entities, then relations.

use std::collections::HashSet;
use crate::edge::{ClassMember, Documentation, Import, Inheritance, TypeAssociation};
use crate::id::AstNodeId;
use crate::symbol::{AstNode, Class, Function, Variable};

#[derive(Debug, Default)]
pub struct PendingGraph {
    /// Declaration nodes (usage nodes live in the ledger until flush)
    pub ast_nodes: Vec<AstNode>,
    /// Usage nodes moved out of the ledger at flush
    pub usage_nodes: Vec<AstNode>,
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
    pub classes: Vec<Class>,
    pub class_members: Vec<ClassMember>,
    pub inheritance: Vec<Inheritance>,
    pub imports: Vec<Import>,
    pub documentation: Vec<Documentation>,
    pub types: Vec<TypeAssociation>,
    node_ids: HashSet<AstNodeId>,
}

impl PendingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a declaration node. Returns `false` if an identical node (same
    /// id, hence same content) is already buffered.
    pub fn add_node(&mut self, node: AstNode) -> bool {
        if !self.node_ids.insert(node.id) {
            return false;
        }
        self.ast_nodes.push(node);
        true
    }

    /// Every AST node in write order: declarations first, then usages.
    pub fn all_nodes(&self) -> impl Iterator<Item = &AstNode> {
        self.ast_nodes.iter().chain(self.usage_nodes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.stats().total() == 0
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            ast_nodes: self.ast_nodes.len() + self.usage_nodes.len(),
            entities: self.variables.len() + self.functions.len() + self.classes.len(),
            relations: self.class_members.len()
                + self.inheritance.len()
                + self.imports.len()
                + self.documentation.len()
                + self.types.len(),
        }
    }
}

/// Record counts of a pending graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub ast_nodes: usize,
    pub entities: usize,
    pub relations: usize,
}

impl GraphStats {
    pub fn total(&self) -> usize {
        self.ast_nodes + self.entities + self.relations
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pending Graph:")?;
        writeln!(f, "  AST nodes: {}", self.ast_nodes)?;
        writeln!(f, "  Entities: {}", self.entities)?;
        writeln!(f, "  Relations: {}", self.relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{file_id, EntityId};
    use crate::location::{FileLoc, Position, Range};
    use crate::symbol::SymbolType;

    fn decl(name: &str, line: u32) -> AstNode {
        let loc = FileLoc::new(
            file_id("/a.py"),
            Range::new(Position::new(line, 0), Position::new(line, 4)),
        );
        AstNode::declaration(name, SymbolType::Variable, loc)
    }

    #[test]
    fn test_new_graph_is_empty() {
        let graph = PendingGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.stats(), GraphStats::default());
    }

    #[test]
    fn test_identical_nodes_are_buffered_once() {
        let mut graph = PendingGraph::new();
        assert!(graph.add_node(decl("pkg.x", 1)));
        assert!(!graph.add_node(decl("pkg.x", 1)));
        assert!(graph.add_node(decl("pkg.x", 2)));
        assert_eq!(graph.ast_nodes.len(), 2);
    }

    #[test]
    fn test_all_nodes_puts_declarations_first() {
        let mut graph = PendingGraph::new();
        graph.usage_nodes.push(decl("pkg.u", 9));
        graph.add_node(decl("pkg.d", 1));

        let names: Vec<&str> = graph.all_nodes().map(|n| n.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["pkg.d", "pkg.u"]);
        assert_eq!(graph.stats().ast_nodes, 2);
    }

    #[test]
    fn test_stats_count_relations() {
        let mut graph = PendingGraph::new();
        graph.inheritance.push(Inheritance { derived: EntityId(1), base: EntityId(2) });
        graph.types.push(TypeAssociation { symbol: EntityId(1), type_id: EntityId(3) });
        assert_eq!(graph.stats().relations, 2);
        assert!(!graph.is_empty());
    }
}
