//! History file parsing.
//!
//! The format is line oriented: an optional first line `# <datatype>`
//! names the datatype (`set`, `stack`, `queue` or `priorityqueue`),
//! later lines are blank, comments starting with `#`, or records of
//! whitespace-separated fields `method value startTime endTime`.
//! Operation ids are assigned sequentially starting at 1.

use std::fs;
use std::path::Path;

use thiserror::Error;

use linmon_core::{DataKind, History, Method, Operation, Time, Value};

/// Input-side failures. These are fatal diagnostics, never a verdict.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing datatype tag: expected a first line like `# queue`")]
    MissingKind,

    #[error("unknown datatype `{0}`")]
    UnknownKind(String),

    #[error("line {line}: expected `method value startTime endTime`")]
    Malformed { line: usize },

    #[error("line {line}: unknown method `{method}`")]
    UnknownMethod { line: usize, method: String },

    #[error("line {line}: operation must start before it ends")]
    EmptyInterval { line: usize },
}

/// A parsed history file: the datatype tag and the operations.
#[derive(Debug)]
pub struct HistoryFile {
    pub kind: DataKind,
    pub history: History,
}

pub fn read_history(path: &Path) -> Result<HistoryFile, ReadError> {
    let content = fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_history(&content)
}

pub fn parse_history(content: &str) -> Result<HistoryFile, ReadError> {
    let mut kind = None;
    let mut ops = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if i == 0 {
            if let Some(tag) = line.strip_prefix('#') {
                let tag = tag.trim();
                kind = Some(
                    tag.parse::<DataKind>()
                        .map_err(|_| ReadError::UnknownKind(tag.to_string()))?,
                );
                continue;
            }
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        ops.push(parse_record(line, i + 1, ops.len() as u32 + 1)?);
    }

    let kind = kind.ok_or(ReadError::MissingKind)?;
    Ok(HistoryFile {
        kind,
        history: History::new(ops),
    })
}

fn parse_record(line: &str, line_no: usize, id: u32) -> Result<Operation, ReadError> {
    let mut fields = line.split_whitespace();
    let mut next = || fields.next().ok_or(ReadError::Malformed { line: line_no });

    let method_str = next()?;
    let method: Method = method_str.parse().map_err(|_| ReadError::UnknownMethod {
        line: line_no,
        method: method_str.to_string(),
    })?;
    let value: Value = next()?
        .parse()
        .map_err(|_| ReadError::Malformed { line: line_no })?;
    let start: Time = next()?
        .parse()
        .map_err(|_| ReadError::Malformed { line: line_no })?;
    let end: Time = next()?
        .parse()
        .map_err(|_| ReadError::Malformed { line: line_no })?;
    if start >= end {
        return Err(ReadError::EmptyInterval { line: line_no });
    }

    Ok(Operation {
        id,
        method,
        value,
        start,
        end,
    })
}
