//! Symbol model - located occurrences and the entities they declare
//!
//! Every occurrence of a symbol in source is an [`AstNode`] carrying exactly
//! one (`SymbolType`, `AstType`) pair. Declared symbols additionally become
//! entities:
//! - `Variable`: a plain [`Entity`]
//! - `Function`: an entity plus ordered parameter and local variable refs
//! - `Class`: a plain [`Entity`]; members and bases are edges

use crate::id::{self, AstNodeId, EntityId};
use crate::location::FileLoc;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What kind of symbol an AST node refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
    Variable,
    Function,
    Class,
    Module,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Variable => "variable",
            SymbolType::Function => "function",
            SymbolType::Class => "class",
            SymbolType::Module => "module",
        }
    }
}

impl FromStr for SymbolType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "variable" => Ok(SymbolType::Variable),
            "function" => Ok(SymbolType::Function),
            "class" => Ok(SymbolType::Class),
            "module" => Ok(SymbolType::Module),
            _ => Err(Error::Parse(format!("Unknown symbol type: {}", s))),
        }
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an AST node is the declaration of a symbol or a use of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AstType {
    Declaration,
    Usage,
}

impl AstType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AstType::Declaration => "declaration",
            AstType::Usage => "usage",
        }
    }
}

impl FromStr for AstType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "declaration" => Ok(AstType::Declaration),
            "usage" => Ok(AstType::Usage),
            _ => Err(Error::Parse(format!("Unknown AST type: {}", s))),
        }
    }
}

impl std::fmt::Display for AstType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A located occurrence of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub id: AstNodeId,
    pub location: FileLoc,
    pub qualified_name: String,
    pub symbol_type: SymbolType,
    pub ast_type: AstType,
}

impl AstNode {
    pub fn new(
        qualified_name: impl Into<String>,
        symbol_type: SymbolType,
        ast_type: AstType,
        location: FileLoc,
    ) -> Self {
        let qualified_name = qualified_name.into();
        let id = id::ast_node_id(&qualified_name, symbol_type, ast_type, &location);
        Self {
            id,
            location,
            qualified_name,
            symbol_type,
            ast_type,
        }
    }

    pub fn declaration(qualified_name: impl Into<String>, symbol_type: SymbolType, location: FileLoc) -> Self {
        Self::new(qualified_name, symbol_type, AstType::Declaration, location)
    }

    pub fn usage(qualified_name: impl Into<String>, symbol_type: SymbolType, location: FileLoc) -> Self {
        Self::new(qualified_name, symbol_type, AstType::Usage, location)
    }
}

/// The three declarable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Variable,
    Function,
    Class,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Variable => "variable",
            EntityKind::Function => "function",
            EntityKind::Class => "class",
        }
    }

    /// Symbol type used for this entity's declaration and usage nodes.
    pub fn symbol_type(&self) -> SymbolType {
        match self {
            EntityKind::Variable => SymbolType::Variable,
            EntityKind::Function => SymbolType::Function,
            EntityKind::Class => SymbolType::Class,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields shared by every declared entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Declaration node of this entity
    pub ast_node_id: AstNodeId,
    /// Short name (`f`)
    pub name: String,
    /// Dotted path (`pkg.mod.f`)
    pub qualified_name: String,
    pub visibility: String,
}

impl Entity {
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        visibility: impl Into<String>,
        ast_node_id: AstNodeId,
    ) -> Self {
        let qualified_name = qualified_name.into();
        Self {
            id: id::entity_id(kind, &qualified_name),
            kind,
            ast_node_id,
            name: name.into(),
            qualified_name,
            visibility: visibility.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub entity: Entity,
    /// Parameter variables in declaration order
    pub parameters: Vec<EntityId>,
    /// Local variables in declaration order
    pub locals: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub entity: Entity,
}
