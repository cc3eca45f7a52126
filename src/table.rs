//! Symbol Table - session-scoped index from qualified name to entity
//!
//! One map from qualified name to a tagged handle covers variables, functions
//! and classes alike. The first declaration registered under a name owns it;
//! later declarations with the same name are rejected.
//!
//! Classes additionally move through an explicit lifecycle:
//! `Unseen -> Preprocessed -> Resolved`. Members, bases and usages may only be
//! attached on the `Preprocessed -> Resolved` transition.

use crate::id::{AstNodeId, EntityId};
use crate::symbol::{Entity, EntityKind};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Tagged handle to a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
    pub ast_node_id: AstNodeId,
}

impl From<&Entity> for EntityRef {
    fn from(entity: &Entity) -> Self {
        Self {
            kind: entity.kind,
            id: entity.id,
            ast_node_id: entity.ast_node_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassState {
    Unseen,
    Preprocessed,
    Resolved,
}

impl fmt::Display for ClassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClassState::Unseen => "unseen",
            ClassState::Preprocessed => "preprocessed",
            ClassState::Resolved => "resolved",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, EntityRef>,
    classes: HashMap<EntityId, ClassState>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declared entity under its qualified name.
    ///
    /// Classes enter the `Preprocessed` state.
    pub fn register(&mut self, entity: &Entity) -> Result<EntityRef> {
        if entity.qualified_name.is_empty() {
            return Err(Error::MissingField("qualified_name"));
        }
        if let Some(existing) = self.entries.get(&entity.qualified_name) {
            return Err(Error::DuplicateDeclaration {
                qualified_name: entity.qualified_name.clone(),
                existing: existing.kind,
            });
        }

        let handle = EntityRef::from(entity);
        self.entries.insert(entity.qualified_name.clone(), handle);
        if entity.kind == EntityKind::Class {
            self.classes.insert(entity.id, ClassState::Preprocessed);
        }
        Ok(handle)
    }

    /// Any entity by qualified name. An empty name is never found.
    pub fn lookup_entity(&self, qualified_name: &str) -> Option<EntityRef> {
        if qualified_name.is_empty() {
            return None;
        }
        self.entries.get(qualified_name).copied()
    }

    pub fn lookup_variable(&self, qualified_name: &str) -> Option<EntityRef> {
        self.lookup_kind(qualified_name, EntityKind::Variable)
    }

    pub fn lookup_function(&self, qualified_name: &str) -> Option<EntityRef> {
        self.lookup_kind(qualified_name, EntityKind::Function)
    }

    pub fn lookup_class(&self, qualified_name: &str) -> Option<EntityRef> {
        self.lookup_kind(qualified_name, EntityKind::Class)
    }

    fn lookup_kind(&self, qualified_name: &str, kind: EntityKind) -> Option<EntityRef> {
        self.lookup_entity(qualified_name).filter(|e| e.kind == kind)
    }

    pub fn class_state(&self, qualified_name: &str) -> ClassState {
        self.lookup_class(qualified_name)
            .and_then(|class| self.classes.get(&class.id).copied())
            .unwrap_or(ClassState::Unseen)
    }

    /// Move a class from `Preprocessed` to `Resolved`.
    ///
    /// Any other starting state is an invalid transition and leaves the table
    /// untouched.
    pub fn resolve_class(&mut self, qualified_name: &str) -> Result<EntityRef> {
        let state = self.class_state(qualified_name);
        let class = match (state, self.lookup_class(qualified_name)) {
            (ClassState::Preprocessed, Some(class)) => class,
            _ => {
                return Err(Error::InvalidTransition {
                    qualified_name: qualified_name.to_string(),
                    from: state,
                    to: ClassState::Resolved,
                });
            }
        };
        self.classes.insert(class.id, ClassState::Resolved);
        Ok(class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::AstNodeId;

    fn entity(kind: EntityKind, qualified_name: &str) -> Entity {
        let name = qualified_name.rsplit('.').next().unwrap_or(qualified_name);
        Entity::new(kind, name, qualified_name, "", AstNodeId(1))
    }

    #[test]
    fn test_lookup_entity_is_polymorphic() {
        let mut table = SymbolTable::new();
        table.register(&entity(EntityKind::Variable, "pkg.x")).unwrap();
        table.register(&entity(EntityKind::Function, "pkg.f")).unwrap();
        table.register(&entity(EntityKind::Class, "pkg.C")).unwrap();

        assert_eq!(table.lookup_entity("pkg.x").unwrap().kind, EntityKind::Variable);
        assert_eq!(table.lookup_entity("pkg.f").unwrap().kind, EntityKind::Function);
        assert_eq!(table.lookup_entity("pkg.C").unwrap().kind, EntityKind::Class);
        assert!(table.lookup_entity("pkg.missing").is_none());
    }

    #[test]
    fn test_empty_name_is_not_found() {
        let table = SymbolTable::new();
        assert!(table.lookup_entity("").is_none());
    }

    #[test]
    fn test_narrowed_lookups_filter_by_kind() {
        let mut table = SymbolTable::new();
        table.register(&entity(EntityKind::Function, "pkg.f")).unwrap();

        assert!(table.lookup_function("pkg.f").is_some());
        assert!(table.lookup_variable("pkg.f").is_none());
        assert!(table.lookup_class("pkg.f").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut table = SymbolTable::new();
        let first = table.register(&entity(EntityKind::Variable, "pkg.x")).unwrap();
        let err = table.register(&entity(EntityKind::Function, "pkg.x")).unwrap_err();

        assert!(matches!(err, Error::DuplicateDeclaration { .. }));
        assert_eq!(table.lookup_entity("pkg.x"), Some(first));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_class_lifecycle() {
        let mut table = SymbolTable::new();
        assert_eq!(table.class_state("pkg.Foo"), ClassState::Unseen);

        table.register(&entity(EntityKind::Class, "pkg.Foo")).unwrap();
        assert_eq!(table.class_state("pkg.Foo"), ClassState::Preprocessed);

        table.resolve_class("pkg.Foo").unwrap();
        assert_eq!(table.class_state("pkg.Foo"), ClassState::Resolved);
    }

    #[test]
    fn test_resolve_unseen_class_is_rejected() {
        let mut table = SymbolTable::new();
        let err = table.resolve_class("pkg.Ghost").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { from: ClassState::Unseen, .. }
        ));
    }

    #[test]
    fn test_resolve_twice_is_rejected() {
        let mut table = SymbolTable::new();
        table.register(&entity(EntityKind::Class, "pkg.Foo")).unwrap();
        table.resolve_class("pkg.Foo").unwrap();

        let err = table.resolve_class("pkg.Foo").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition { from: ClassState::Resolved, .. }
        ));
    }
}
