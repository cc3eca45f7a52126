//! Ingestion events - the structured records emitted by the front-end parser
//!
//! Events arrive one JSON object per line, tagged by `"event"`:
//!
//! ```json
//! {"event":"file","path":"/a.py","parse_status":2}
//! {"event":"function","name":"f","qualified_name":"pkg.f","file_position":{...},"type":[],"usages":[],"documentation":""}
//! ```
//!
//! Fields the engine requires are `Option`s here. Decoding never rejects a
//! record for a missing field; the session validates and skips it instead.

use crate::location::Position;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    File(FileEvent),
    Variable(VariableEvent),
    Function(FunctionEvent),
    ClassPreprocessed(ClassPreprocessedEvent),
    ClassResolved(ClassResolvedEvent),
    Import(ImportEvent),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub start_position: Option<Position>,
    pub end_position: Option<Position>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePosition {
    pub file: Option<String>,
    pub range: Option<RangeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub file_position: Option<FilePosition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    pub path: Option<String>,
    /// 0 = none, 1 = partially parsed, 2 = fully parsed
    pub parse_status: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableEvent {
    pub name: Option<String>,
    pub qualified_name: Option<String>,
    pub file_position: Option<FilePosition>,
    pub visibility: Option<String>,
    /// Qualified names of the variable's declared or inferred types
    #[serde(rename = "type")]
    pub types: Option<Vec<String>>,
    pub usages: Option<Vec<UsageRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionEvent {
    pub name: Option<String>,
    pub qualified_name: Option<String>,
    pub file_position: Option<FilePosition>,
    pub visibility: Option<String>,
    #[serde(rename = "type")]
    pub types: Option<Vec<String>>,
    pub usages: Option<Vec<UsageRecord>>,
    pub documentation: Option<String>,
    /// Qualified names of parameter variables, in order
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Qualified names of local variables, in order
    #[serde(default)]
    pub locals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassPreprocessedEvent {
    pub name: Option<String>,
    pub qualified_name: Option<String>,
    pub file_position: Option<FilePosition>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default)]
    pub usages: Vec<UsageRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMembersRecord {
    #[serde(default)]
    pub methods: Vec<MemberRecord>,
    #[serde(default)]
    pub static_methods: Vec<MemberRecord>,
    #[serde(default)]
    pub attributes: Vec<MemberRecord>,
    #[serde(default)]
    pub static_attributes: Vec<MemberRecord>,
    #[serde(default)]
    pub classes: Vec<MemberRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassResolvedEvent {
    pub qualified_name: Option<String>,
    pub documentation: Option<String>,
    /// Qualified names of base classes
    pub base_classes: Option<Vec<String>>,
    pub members: Option<ClassMembersRecord>,
    pub usages: Option<Vec<UsageRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleImportRecord {
    /// Path of the imported module's file
    pub path: Option<String>,
    pub file_position: Option<FilePosition>,
}

/// One (module, symbol) pair of a `from module import symbol` statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolImportRecord {
    pub path: Option<String>,
    /// Qualified name of the imported symbol
    pub symbol: Option<String>,
    pub file_position: Option<FilePosition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportEvent {
    /// Path of the importing file
    pub importer: Option<String>,
    pub imported_modules: Option<Vec<ModuleImportRecord>>,
    pub imported_symbols: Option<Vec<SymbolImportRecord>>,
}

/// Reads a JSON-lines event stream.
///
/// Each item is either a decoded event or the decoding error of that line,
/// tagged with its 1-based line number. Blank lines are skipped. A read
/// error is yielded once and ends the stream.
pub struct EventReader<R> {
    lines: Lines<R>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            done: false,
        }
    }
}

impl EventReader<BufReader<fs::File>> {
    /// Open an event stream file. Failure here is fatal to the session.
    pub fn open(path: &Path) -> Result<Self> {
        let fatal = |e: std::io::Error| {
            Error::Fatal(format!("cannot open event stream {}: {}", path.display(), e))
        };
        if !fs::metadata(path).map_err(fatal)?.is_file() {
            return Err(Error::Fatal(format!(
                "event stream {} is not a regular file",
                path.display()
            )));
        }
        let file = fs::File::open(path).map_err(fatal)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = (usize, Result<Event>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some((self.line_no, Err(e.into())));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line).map_err(Error::from);
            return Some((self.line_no, event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_file_event() {
        let event: Event =
            serde_json::from_str(r#"{"event":"file","path":"/a.py","parse_status":2}"#).unwrap();
        assert_eq!(
            event,
            Event::File(FileEvent {
                path: Some("/a.py".to_string()),
                parse_status: Some(2),
            })
        );
    }

    #[test]
    fn test_missing_required_fields_still_decode() {
        let event: Event = serde_json::from_str(r#"{"event":"variable","name":"x"}"#).unwrap();
        let Event::Variable(var) = event else {
            panic!("expected variable event");
        };
        assert_eq!(var.name.as_deref(), Some("x"));
        assert!(var.qualified_name.is_none());
        assert!(var.usages.is_none());
    }

    #[test]
    fn test_decode_class_resolved_with_members() {
        let json = r#"{
            "event":"class_resolved",
            "qualified_name":"pkg.Foo",
            "documentation":"A foo.",
            "base_classes":["pkg.Bar"],
            "members":{"methods":[{"qualified_name":"pkg.Foo.run","usages":[]}]},
            "usages":[]
        }"#;
        let Event::ClassResolved(class) = serde_json::from_str::<Event>(json).unwrap() else {
            panic!("expected class_resolved event");
        };
        let members = class.members.unwrap();
        assert_eq!(members.methods.len(), 1);
        assert!(members.attributes.is_empty());
        assert_eq!(class.base_classes.unwrap(), vec!["pkg.Bar".to_string()]);
    }

    #[test]
    fn test_reader_skips_blank_lines_and_reports_bad_ones() {
        let input = concat!(
            r#"{"event":"file","path":"/a.py","parse_status":0}"#,
            "\n\n",
            "not json\n",
            r#"{"event":"import","importer":"/a.py"}"#,
            "\n"
        );
        let items: Vec<_> = EventReader::new(Cursor::new(input)).collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].0, 1);
        assert!(items[0].1.is_ok());
        assert_eq!(items[1].0, 3);
        assert!(matches!(items[1].1, Err(Error::Json(_))));
        assert!(matches!(items[2].1, Ok(Event::Import(_))));
    }

    #[test]
    fn test_open_missing_stream_is_fatal() {
        let result = EventReader::open(Path::new("/definitely/not/here.jsonl"));
        assert!(matches!(result, Err(Error::Fatal(_))));
    }

    #[test]
    fn test_open_directory_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = EventReader::open(dir.path());
        assert!(matches!(result, Err(Error::Fatal(_))));
    }

    #[test]
    fn test_read_error_ends_the_stream() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(br#"{"event":"file","path":"/a.py","parse_status":0}"#);
        input.push(b'\n');
        let items: Vec<_> = EventReader::new(Cursor::new(input)).collect();

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0].1, Err(Error::Io(_))));
    }
}
