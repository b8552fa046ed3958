//! Reader for character-separated bodies like csv.

use super::{Entry, EntryRead, ReadError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Read;

/// Reads csv bodies row by row. With a header row (the default), each row
/// becomes an object keyed by column name; without one, each row is an
/// array. Cell text is inferred into JSON scalars: integers, floats, bools,
/// null for the empty cell, and strings otherwise.
pub struct CsvReader {
    records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
    headers: Option<Vec<String>>,
    index: u64,
    failed: bool,
}

impl CsvReader {
    pub fn new(body: Box<dyn Read + Send>, config: &BTreeMap<String, Value>) -> Self {
        let header_row = config
            .get("headerRow")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let delimiter = config
            .get("delimiter")
            .and_then(Value::as_str)
            .and_then(|s| s.bytes().next())
            .unwrap_or(b',');

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(header_row)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(body);

        // An unreadable header surfaces as an error on the first record.
        let headers = if header_row {
            reader
                .headers()
                .ok()
                .map(|h| h.iter().map(str::to_string).collect())
        } else {
            None
        };

        Self {
            records: reader.into_records(),
            headers,
            index: 0,
            failed: false,
        }
    }

    fn row_value(&self, record: &csv::StringRecord) -> Value {
        match &self.headers {
            Some(headers) => {
                let mut row = Map::new();
                for (i, cell) in record.iter().enumerate() {
                    let column = headers
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("field_{i}"));
                    row.insert(column, infer_cell(cell));
                }
                Value::Object(row)
            }
            None => Value::Array(record.iter().map(infer_cell).collect()),
        }
    }
}

impl EntryRead for CsvReader {
    fn next_entry(&mut self) -> Result<Option<Entry>, ReadError> {
        if self.failed {
            return Ok(None);
        }
        match self.records.next() {
            None => Ok(None),
            Some(Err(err)) => {
                self.failed = true;
                Err(err.into())
            }
            Some(Ok(record)) => {
                let entry = Entry {
                    index: self.index,
                    key: None,
                    value: self.row_value(&record),
                };
                self.index += 1;
                Ok(Some(entry))
            }
        }
    }
}

/// Infer a JSON scalar from csv cell text.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn read_all(reader: &mut dyn EntryRead) -> Vec<Entry> {
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().unwrap() {
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn header_row_projects_objects() {
        let body: Box<dyn Read + Send> = Box::new(&b"city,pop\ntoronto,40000000\nnew york,8500000"[..]);
        let mut reader = CsvReader::new(body, &BTreeMap::new());
        let entries = read_all(&mut reader);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].key, None);
        assert_eq!(
            entries[0].value,
            json!({"city": "toronto", "pop": 40000000})
        );
        assert_eq!(
            entries[1].value,
            json!({"city": "new york", "pop": 8500000})
        );
    }

    #[test]
    fn no_header_row_yields_arrays() {
        let config: BTreeMap<String, Value> =
            [("headerRow".to_string(), json!(false))].into_iter().collect();
        let body: Box<dyn Read + Send> = Box::new(&b"a,1\nb,2\n"[..]);
        let entries = read_all(&mut CsvReader::new(body, &config));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, json!(["a", 1]));
        assert_eq!(entries[1].value, json!(["b", 2]));
    }

    #[test]
    fn cells_infer_scalars() {
        assert_eq!(infer_cell(""), json!(null));
        assert_eq!(infer_cell("12"), json!(12));
        assert_eq!(infer_cell("1.5"), json!(1.5));
        assert_eq!(infer_cell("true"), json!(true));
        assert_eq!(infer_cell("kathmandu"), json!("kathmandu"));
    }

    #[test]
    fn alternate_delimiter() {
        let config: BTreeMap<String, Value> =
            [("delimiter".to_string(), json!(";"))].into_iter().collect();
        let body: Box<dyn Read + Send> = Box::new(&b"k;v\nx;1\n"[..]);
        let entries = read_all(&mut CsvReader::new(body, &config));
        assert_eq!(entries[0].value, json!({"k": "x", "v": 1}));
    }
}
