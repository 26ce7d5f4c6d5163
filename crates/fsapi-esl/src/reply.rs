//! Reply interpretation
//!
//! The switch answers with one of a few payload shapes: pipe-delimited
//! tables (`callcenter_config ... list`), bare counters (`... count`),
//! `show ... as json` row sets, or free text. [`ParsedReply::parse`] turns a
//! raw payload into a tagged value so callers match on the shape instead of
//! re-parsing strings.
//!
//! The parsers are total: malformed rows degrade to partial data rather than
//! failing the whole reply.

use crate::constants::ACK_PREFIX;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// One entity row: field name to value
pub type Row = BTreeMap<String, String>;

/// Column separator of callcenter tables
pub const TABLE_SEPARATOR: char = '|';

/// Characters that end an embedded `key=value` token
const TOKEN_DELIMITERS: &[char] = &['{', ',', ' ', '}', '\'', '"'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("could not parse count from: {0}")]
    Counter(String),

    #[error("invalid row set: {0}")]
    Rows(String),
}

/// Payload shape a command is expected to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// Pipe-delimited table with a header row
    Table,
    /// `{"row_count":N,"rows":[...]}`
    JsonRows,
    /// Plain integer, possibly surrounded by `+OK` lines
    Counter,
    /// Anything else, kept verbatim
    Raw,
}

/// A reply interpreted according to its expected shape
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    TableRows(Vec<Row>),
    Counter(i64),
    RawText(String),
    ParseFailure(ParseError),
}

impl ParsedReply {
    pub fn parse(raw: &str, shape: ReplyShape) -> Self {
        match shape {
            ReplyShape::Table => ParsedReply::TableRows(parse_table(raw)),
            ReplyShape::JsonRows => match parse_json_rows(raw) {
                Ok(rows) => ParsedReply::TableRows(rows),
                Err(e) => ParsedReply::ParseFailure(e),
            },
            ReplyShape::Counter => match parse_counter(raw) {
                Ok(n) => ParsedReply::Counter(n),
                Err(e) => ParsedReply::ParseFailure(e),
            },
            ReplyShape::Raw => ParsedReply::RawText(raw.to_string()),
        }
    }
}

/// Skip blank lines and `+OK` terminators
fn content_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(ACK_PREFIX))
}

/// Parse pipe-delimited output into rows keyed by the header fields
///
/// Short rows are padded with empty strings, extra fields are dropped.
pub fn parse_table(raw: &str) -> Vec<Row> {
    let mut lines = content_lines(raw);

    let headers: Vec<&str> = match lines.next() {
        Some(header) => header.split(TABLE_SEPARATOR).map(str::trim).collect(),
        None => return Vec::new(),
    };

    lines
        .map(|line| {
            let mut fields = line.split(TABLE_SEPARATOR).map(str::trim);
            headers
                .iter()
                .map(|h| (h.to_string(), fields.next().unwrap_or("").to_string()))
                .collect()
        })
        .collect()
}

/// First line of the reply that parses as an integer
pub fn parse_counter(raw: &str) -> Result<i64, ParseError> {
    content_lines(raw)
        .find_map(|line| line.parse::<i64>().ok())
        .ok_or_else(|| ParseError::Counter(raw.trim().to_string()))
}

#[derive(Deserialize)]
struct JsonRowSet {
    #[serde(default)]
    rows: Vec<serde_json::Map<String, Value>>,
}

/// Parse a `show ... as json` payload into string rows
///
/// The switch omits `rows` entirely when there are none.
pub fn parse_json_rows(raw: &str) -> Result<Vec<Row>, ParseError> {
    let set: JsonRowSet =
        serde_json::from_str(raw.trim()).map_err(|e| ParseError::Rows(e.to_string()))?;

    Ok(set
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k, v)
                })
                .collect()
        })
        .collect())
}

/// Value of an embedded `key=value` token inside a flat string
///
/// The first occurrence of `key=` wins, wherever it sits. Returns an empty
/// string when the key does not occur.
pub fn extract_token(haystack: &str, key: &str) -> String {
    let needle = format!("{}=", key);

    match haystack.find(&needle) {
        Some(idx) => {
            let rest = &haystack[idx + needle.len()..];
            let end = rest.find(TOKEN_DELIMITERS).unwrap_or(rest.len());
            rest[..end].to_string()
        }
        None => String::new(),
    }
}
