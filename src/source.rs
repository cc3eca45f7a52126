//! Source manager - the session's shared file table
//!
//! Files are identified by the hash of their path. A file becomes known to the
//! session either through a File event or because a location points into it.

use crate::id::{self, FileId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// How far the front-end got with a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    #[default]
    None,
    PartiallyParsed,
    FullyParsed,
}

impl ParseStatus {
    /// Decode the front-end's integer status (0, 1, 2).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ParseStatus::None),
            1 => Some(ParseStatus::PartiallyParsed),
            2 => Some(ParseStatus::FullyParsed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::None => "none",
            ParseStatus::PartiallyParsed => "partially_parsed",
            ParseStatus::FullyParsed => "fully_parsed",
        }
    }
}

impl FromStr for ParseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ParseStatus::None),
            "partially_parsed" => Ok(ParseStatus::PartiallyParsed),
            "fully_parsed" => Ok(ParseStatus::FullyParsed),
            _ => Err(Error::Parse(format!("Unknown parse status: {}", s))),
        }
    }
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub path: String,
    pub parse_status: ParseStatus,
}

impl File {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: id::file_id(&path),
            path,
            parse_status: ParseStatus::None,
        }
    }
}

/// The build step that produced a file's parse. Indexing records one action
/// with an empty command per committed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAction {
    pub command: String,
}

#[derive(Debug, Default)]
pub struct SourceManager {
    files: HashMap<String, File>,
    /// Files already committed by a File event
    persisted: HashSet<FileId>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a known file without registering it.
    pub fn get(&self, path: &str) -> Option<&File> {
        self.files.get(path)
    }

    /// Look up a file announced by a File event. Files only seen through
    /// locations are not found.
    pub fn get_announced(&self, path: &str) -> Option<&File> {
        self.get(path).filter(|f| self.persisted.contains(&f.id))
    }

    /// Look up a file, registering it with `ParseStatus::None` if unseen.
    pub fn get_or_create(&mut self, path: &str) -> FileId {
        self.files
            .entry(path.to_string())
            .or_insert_with(|| File::new(path))
            .id
    }

    /// Replace the stored parse status and return the updated record.
    pub fn update_status(&mut self, path: &str, status: ParseStatus) -> File {
        let file = self
            .files
            .entry(path.to_string())
            .or_insert_with(|| File::new(path));
        file.parse_status = status;
        file.clone()
    }

    pub fn mark_persisted(&mut self, id: FileId) {
        self.persisted.insert(id);
    }

    pub fn is_persisted(&self, id: FileId) -> bool {
        self.persisted.contains(&id)
    }

    /// Files that only exist because a location referenced them.
    pub fn unpersisted(&self) -> Vec<File> {
        let mut files: Vec<File> = self
            .files
            .values()
            .filter(|f| !self.persisted.contains(&f.id))
            .cloned()
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
