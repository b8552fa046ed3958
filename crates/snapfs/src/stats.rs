//! Column-level statistics accumulated while a body streams through a save.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

fn is_zero(n: &u64) -> bool {
    *n == 0
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ColumnStats {
    count: u64,
    /// Observed value types and how often each occurred.
    types: BTreeMap<&'static str, u64>,
    #[serde(skip_serializing_if = "is_zero")]
    null_count: u64,
    #[serde(skip_serializing_if = "is_zero")]
    true_count: u64,
    #[serde(skip_serializing_if = "is_zero")]
    false_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_length: Option<u64>,
}

impl ColumnStats {
    fn observe(&mut self, value: &Value) {
        self.count += 1;
        *self.types.entry(type_name(value)).or_default() += 1;
        match value {
            Value::Null => self.null_count += 1,
            Value::Bool(true) => self.true_count += 1,
            Value::Bool(false) => self.false_count += 1,
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    self.min = Some(self.min.map_or(f, |m| m.min(f)));
                    self.max = Some(self.max.map_or(f, |m| m.max(f)));
                }
            }
            Value::String(s) => {
                let len = s.chars().count() as u64;
                self.min_length = Some(self.min_length.map_or(len, |m| m.min(len)));
                self.max_length = Some(self.max_length.map_or(len, |m| m.max(len)));
            }
            Value::Array(_) | Value::Object(_) => {}
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accumulates per-column summaries across every row of a body. Rows that
/// are objects contribute one column per key, rows that are arrays one
/// column per position, and scalar rows a single "value" column.
#[derive(Default)]
pub(crate) struct StatsAccumulator {
    rows: u64,
    columns: BTreeMap<String, ColumnStats>,
}

impl StatsAccumulator {
    pub fn observe(&mut self, row: &Value) {
        self.rows += 1;
        match row {
            Value::Object(fields) => {
                for (key, value) in fields {
                    self.columns.entry(key.clone()).or_default().observe(value);
                }
            }
            Value::Array(items) => {
                for (i, value) in items.iter().enumerate() {
                    self.columns.entry(i.to_string()).or_default().observe(value);
                }
            }
            scalar => self
                .columns
                .entry("value".to_string())
                .or_default()
                .observe(scalar),
        }
    }

    /// The stats component document.
    pub fn into_value(self) -> Value {
        #[derive(Serialize)]
        struct Summary {
            rows: u64,
            columns: BTreeMap<String, ColumnStats>,
        }
        serde_json::to_value(Summary {
            rows: self.rows,
            columns: self.columns,
        })
        .expect("summaries always encode")
    }
}
