//! Loading set and parameter data from plain text tables.
//!
//! A template such as `<1n,2s> 3n` picks the columns forming the index tuple
//! and, for parameters, the column holding the value. `n` columns must be
//! numbers, `s` columns are taken as strings.

use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::ErrorKind;
use super::numeric::parse_decimal;
use super::value::{Elem, Tuple};
use crate::parser::tokenizer::WHOLE_NUMBER;

static TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<([^>]*)>\s*(\S*)\s*$").expect("Error compiling regex."));
static TEMPLATE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*([ns])\s*$").expect("Error compiling regex."));
static DATA_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|[^\s,;:"]+"#).expect("Error compiling regex."));

/// Where `read` gets its text from.
pub trait TableSource {
    fn open(&self, name: &str) -> Result<String, ErrorKind>;
}

/// Reads files relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    base: PathBuf,
}

impl FileSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl TableSource for FileSource {
    fn open(&self, name: &str) -> Result<String, ErrorKind> {
        let path = self.base.join(name);
        std::fs::read_to_string(&path).map_err(|source| ErrorKind::Io { path, source })
    }
}

/// Tables kept in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, contents: &str) -> Self {
        self.files.insert(name.to_string(), contents.to_string());
        self
    }
}

impl TableSource for MemorySource {
    fn open(&self, name: &str) -> Result<String, ErrorKind> {
        self.files.get(name).cloned().ok_or_else(|| ErrorKind::Io {
            path: PathBuf::from(name),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such table"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// One-based column.
    pub column: usize,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub key: Vec<Field>,
    pub value: Option<Field>,
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, ErrorKind> {
        let caps = TEMPLATE
            .captures(text)
            .ok_or_else(|| ErrorKind::Read(format!("malformed template \"{text}\"")))?;
        let key = caps[1]
            .split(',')
            .filter(|f| !f.trim().is_empty())
            .map(parse_field)
            .collect::<Result<Vec<_>, _>>()?;
        if key.is_empty() {
            return Err(ErrorKind::Read(format!("template \"{text}\" selects no columns")));
        }
        let value = match caps.get(2).map(|m| m.as_str()) {
            None | Some("") => None,
            Some(field) => Some(parse_field(field)?),
        };
        Ok(Self { key, value })
    }
}

fn parse_field(text: &str) -> Result<Field, ErrorKind> {
    let caps = TEMPLATE_FIELD
        .captures(text)
        .ok_or_else(|| ErrorKind::Read(format!("malformed template field \"{}\"", text.trim())))?;
    let column: usize = caps[1]
        .parse()
        .map_err(|_| ErrorKind::Read(format!("bad column in \"{}\"", text.trim())))?;
    if column == 0 {
        return Err(ErrorKind::Read("columns are counted from 1".to_string()));
    }
    let kind = if &caps[2] == "n" {
        FieldKind::Number
    } else {
        FieldKind::String
    };
    Ok(Field { column, kind })
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub skip: usize,
    pub use_lines: Option<usize>,
    pub comment: String,
    pub pattern: Option<Regex>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            use_lines: None,
            comment: "#".to_string(),
            pattern: None,
        }
    }
}

/// One data line: the index tuple and, if the template names one, the value.
pub type Row = (Tuple, Option<Elem>);

pub fn read_table(name: &str, text: &str, template: &Template, options: &ReadOptions) -> Result<Vec<Row>, ErrorKind> {
    let mut rows = vec![];
    for (lineno, raw) in text.lines().enumerate().skip(options.skip) {
        if options.use_lines.is_some_and(|n| rows.len() >= n) {
            break;
        }
        let line = match raw.find(|c| options.comment.contains(c)) {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Some(pattern) = &options.pattern {
            if !pattern.is_match(line) {
                continue;
            }
        }
        let fields: Vec<&str> = DATA_FIELD
            .captures_iter(line)
            .filter_map(|c| c.get(1).or_else(|| c.get(0)))
            .map(|m| m.as_str())
            .collect();
        let location = |msg: String| ErrorKind::Read(format!("{name}, line {}: {msg}", lineno + 1));
        let pick = |field: &Field| -> Result<Elem, ErrorKind> {
            let text = fields.get(field.column - 1).ok_or_else(|| {
                location(format!("has {} fields, column {} requested", fields.len(), field.column))
            })?;
            convert(text, field.kind).ok_or_else(|| location(format!("\"{text}\" is not a number")))
        };
        let key = template.key.iter().map(&pick).collect::<Result<Vec<_>, _>>()?;
        let value = template.value.as_ref().map(&pick).transpose()?;
        rows.push((Tuple(key), value));
    }
    Ok(rows)
}

fn convert(text: &str, kind: FieldKind) -> Option<Elem> {
    match kind {
        FieldKind::String => Some(Elem::Str(text.to_string())),
        FieldKind::Number => {
            let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
            if !WHOLE_NUMBER.is_match(unsigned) {
                return None;
            }
            parse_decimal(text).map(Elem::Numb)
        }
    }
}
