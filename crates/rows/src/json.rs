//! Reader for whole-document json bodies.

use super::{Entry, EntryRead, ReadError};
use serde_json::Value;
use std::io::Read;

/// Reads a body that is a single JSON document: an array of rows or an
/// object mapping key to row. The document is decoded up front; entries
/// then drain from the decoded form.
pub struct JsonReader {
    entries: std::vec::IntoIter<Entry>,
}

impl JsonReader {
    pub fn new(body: Box<dyn Read + Send>) -> Result<Self, ReadError> {
        let document: Value = serde_json::from_reader(std::io::BufReader::new(body))?;
        let entries: Vec<Entry> = match document {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, value)| Entry {
                    index: i as u64,
                    key: None,
                    value,
                })
                .collect(),
            Value::Object(fields) => fields
                .into_iter()
                .enumerate()
                .map(|(i, (key, value))| Entry {
                    index: i as u64,
                    key: Some(key),
                    value,
                })
                .collect(),
            Value::Null => Vec::new(),
            Value::Bool(_) => return Err(ReadError::MalformedBody("bool")),
            Value::Number(_) => return Err(ReadError::MalformedBody("number")),
            Value::String(_) => return Err(ReadError::MalformedBody("string")),
        };
        Ok(Self {
            entries: entries.into_iter(),
        })
    }
}

impl EntryRead for JsonReader {
    fn next_entry(&mut self) -> Result<Option<Entry>, ReadError> {
        Ok(self.entries.next())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_bodies_are_sequences() {
        let body: Box<dyn Read + Send> =
            Box::new(&br#"[{"fruit":"apple"},{"fruit":"banana"}]"#[..]);
        let mut reader = JsonReader::new(body).unwrap();

        let first = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.key, None);
        assert_eq!(first.value, json!({"fruit": "apple"}));

        let second = reader.next_entry().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn object_bodies_are_mappings() {
        let body: Box<dyn Read + Send> = Box::new(&br#"{"a": 1, "b": 2}"#[..]);
        let mut reader = JsonReader::new(body).unwrap();

        let first = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.key.as_deref(), Some("a"));
        assert_eq!(first.value, json!(1));
    }

    #[test]
    fn scalar_bodies_are_rejected() {
        let body: Box<dyn Read + Send> = Box::new(&b"42"[..]);
        assert!(matches!(
            JsonReader::new(body),
            Err(ReadError::MalformedBody("number"))
        ));
    }
}
