//! Usage Ledger - per-entity, deduplicated usage occurrences
//!
//! Usages reach the ledger from two directions: an entity's own event, and
//! the member list of the class that owns it. Both paths funnel through
//! [`UsageLedger::insert`], which keeps at most one node per (file, range).

use crate::id::EntityId;
use crate::location::FileLoc;
use crate::symbol::AstNode;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct Usages {
    nodes: Vec<AstNode>,
    seen: HashSet<FileLoc>,
}

#[derive(Debug, Default)]
pub struct UsageLedger {
    entries: HashMap<EntityId, Usages>,
    /// Registration order, so flushes are reproducible
    order: Vec<EntityId>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an (empty) entry for an entity. Idempotent.
    pub fn register(&mut self, entity: EntityId) {
        if !self.entries.contains_key(&entity) {
            self.entries.insert(entity, Usages::default());
            self.order.push(entity);
        }
    }

    /// Append a usage node unless one at the same location is already
    /// recorded for this entity. Returns `true` if the node was added.
    pub fn insert(&mut self, entity: EntityId, node: AstNode) -> bool {
        self.register(entity);
        let Some(usages) = self.entries.get_mut(&entity) else {
            return false;
        };
        if !usages.seen.insert(node.location) {
            return false;
        }
        usages.nodes.push(node);
        true
    }

    pub fn usages(&self, entity: EntityId) -> &[AstNode] {
        self.entries
            .get(&entity)
            .map(|u| u.nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entries.contains_key(&entity)
    }

    /// Total usage nodes across all entities.
    pub fn total_usages(&self) -> usize {
        self.entries.values().map(|u| u.nodes.len()).sum()
    }

    /// Consume the ledger, yielding every usage node in registration order.
    pub fn into_nodes(mut self) -> Vec<AstNode> {
        let mut nodes = Vec::with_capacity(self.total_usages());
        for entity in &self.order {
            if let Some(usages) = self.entries.remove(entity) {
                nodes.extend(usages.nodes);
            }
        }
        nodes
    }
}
