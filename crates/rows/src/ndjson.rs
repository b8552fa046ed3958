//! Reader for newline-delimited json bodies.
//!
//! Accepts any stream of JSON values separated by whitespace, which makes
//! ndjson a special case.

use super::{Entry, EntryRead, ReadError};
use serde_json::Value;
use std::io::{BufReader, Read};

pub struct NdjsonReader {
    values: serde_json::StreamDeserializer<
        'static,
        serde_json::de::IoRead<BufReader<Box<dyn Read + Send>>>,
        Value,
    >,
    index: u64,
    failed: bool,
}

impl NdjsonReader {
    pub fn new(body: Box<dyn Read + Send>) -> Self {
        let deser = serde_json::Deserializer::from_reader(BufReader::new(body));
        Self {
            values: deser.into_iter(),
            index: 0,
            failed: false,
        }
    }
}

impl EntryRead for NdjsonReader {
    fn next_entry(&mut self) -> Result<Option<Entry>, ReadError> {
        if self.failed {
            return Ok(None);
        }
        match self.values.next() {
            None => Ok(None),
            Some(Err(err)) => {
                self.failed = true;
                Err(err.into())
            }
            Some(Ok(value)) => {
                let entry = Entry {
                    index: self.index,
                    key: None,
                    value,
                };
                self.index += 1;
                Ok(Some(entry))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_stream_one_per_line() {
        let body: Box<dyn Read + Send> = Box::new(&b"{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n"[..]);
        let mut reader = NdjsonReader::new(body);

        let mut values = Vec::new();
        while let Some(entry) = reader.next_entry().unwrap() {
            values.push(entry.value);
        }
        assert_eq!(values, vec![json!({"a":1}), json!({"a":2}), json!({"a":3})]);
    }

    #[test]
    fn malformed_rows_error_once_then_stop() {
        let body: Box<dyn Read + Send> = Box::new(&b"{\"a\":1}\n{oops\n"[..]);
        let mut reader = NdjsonReader::new(body);

        assert!(reader.next_entry().unwrap().is_some());
        assert!(reader.next_entry().is_err());
        assert!(reader.next_entry().unwrap().is_none());
    }
}
