//! Relations between entities
//!
//! Relations are buffered during a session and written after every AST node
//! and entity, so each one only ever points at records that already exist:
//! - `ClassMember`: class → method / attribute / nested class
//! - `Inheritance`: derived class → base class
//! - `Import`: importer file → imported file (optionally a symbol in it)
//! - `Documentation`: docstring attached to a function or class
//! - `TypeAssociation`: symbol → the entity naming its type

use crate::id::{AstNodeId, EntityId, FileId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Attribute,
    Class,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Attribute => "attribute",
            MemberKind::Class => "class",
        }
    }
}

impl FromStr for MemberKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "method" => Ok(MemberKind::Method),
            "attribute" => Ok(MemberKind::Attribute),
            "class" => Ok(MemberKind::Class),
            _ => Err(Error::Parse(format!("Unknown member kind: {}", s))),
        }
    }
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership of an entity in a class body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassMember {
    pub class_id: EntityId,
    pub member_id: EntityId,
    /// Declaration node of the member
    pub ast_node_id: AstNodeId,
    pub kind: MemberKind,
    pub static_member: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inheritance {
    pub derived: EntityId,
    pub base: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Import {
    /// Module declaration node at the import site
    pub ast_node_id: AstNodeId,
    pub importer: FileId,
    pub imported: FileId,
    pub imported_symbol: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentationKind {
    Function,
    Class,
}

impl DocumentationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentationKind::Function => "function",
            DocumentationKind::Class => "class",
        }
    }
}

impl FromStr for DocumentationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "function" => Ok(DocumentationKind::Function),
            "class" => Ok(DocumentationKind::Class),
            _ => Err(Error::Parse(format!("Unknown documentation kind: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documentation {
    pub text: String,
    pub documented: EntityId,
    pub kind: DocumentationKind,
}

/// One declared or inferred type of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeAssociation {
    pub symbol: EntityId,
    pub type_id: EntityId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_kind_roundtrip() {
        for kind in [MemberKind::Method, MemberKind::Attribute, MemberKind::Class] {
            let parsed: MemberKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_documentation_kind_parse() {
        assert_eq!(
            DocumentationKind::from_str("class").unwrap(),
            DocumentationKind::Class
        );
        assert!(DocumentationKind::from_str("module").is_err());
    }
}
