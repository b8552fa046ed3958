//! Format-aware reading of dataset bodies.
//!
//! A body is an opaque byte stream whose decoded form is either an ordered
//! sequence of rows or a mapping of key to row, governed by the dataset's
//! structure. This crate turns a `Read` of body bytes into a stream of
//! [`Entry`] values for whichever format the structure declares, and
//! computes the nesting depth of decoded values.

mod character_separated;
mod json;
mod ndjson;

pub use character_separated::CsvReader;
pub use json::JsonReader;
pub use ndjson::NdjsonReader;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;

/// Body serialization formats a structure may declare. Only csv, json and
/// ndjson bodies can currently be decoded into entries; the remaining
/// formats round-trip through structures but reject entry reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Json,
    Ndjson,
    Cbor,
    Xlsx,
}

impl std::str::FromStr for Format {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "ndjson" => Ok(Format::Ndjson),
            "cbor" => Ok(Format::Cbor),
            "xlsx" => Ok(Format::Xlsx),
            other => Err(ReadError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Ndjson => "ndjson",
            Format::Cbor => "cbor",
            Format::Xlsx => "xlsx",
        };
        f.write_str(name)
    }
}

/// One decoded row of a body. Rows of sequence-shaped bodies carry their
/// position; rows of mapping-shaped bodies additionally carry their key.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub index: u64,
    pub key: Option<String>,
    pub value: Value,
}

/// Error type returned by all entry-reading operations.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("unsupported body format: '{0}'")]
    UnsupportedFormat(String),

    #[error("failed to read body: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse row: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body must decode to an array or object, got {0}")]
    MalformedBody(&'static str),
}

/// A pull-based stream of body entries.
pub trait EntryRead {
    /// The next entry, or `None` at end of body. After an error, further
    /// calls return that error's kind again or `None`.
    fn next_entry(&mut self) -> Result<Option<Entry>, ReadError>;
}

/// Construct the entry reader for `format` over `body` bytes.
pub fn reader_for(
    format: Format,
    format_config: &BTreeMap<String, Value>,
    body: Box<dyn Read + Send>,
) -> Result<Box<dyn EntryRead + Send>, ReadError> {
    tracing::debug!(%format, "reading body entries");
    match format {
        Format::Csv => Ok(Box::new(CsvReader::new(body, format_config))),
        Format::Json => Ok(Box::new(JsonReader::new(body)?)),
        Format::Ndjson => Ok(Box::new(NdjsonReader::new(body))),
        other => Err(ReadError::UnsupportedFormat(other.to_string())),
    }
}

/// Nesting depth of a decoded value: scalars are depth zero, containers are
/// one deeper than their deepest element.
pub fn value_depth(value: &Value) -> u32 {
    match value {
        Value::Array(items) => 1 + items.iter().map(value_depth).max().unwrap_or(0),
        Value::Object(fields) => 1 + fields.values().map(value_depth).max().unwrap_or(0),
        _ => 0,
    }
}
