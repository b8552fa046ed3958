use super::StoredComponent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use store::Address;

/// Structure describes the body: its serialization format, the schema its
/// entries must satisfy, and statistics derived while the body streamed
/// through the save pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    /// Body serialization format ("csv", "json", "ndjson", ...). Doubles as
    /// the suffix of the stored body filename.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Format-specific read configuration, e.g. `{"headerRow": true}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub format_config: BTreeMap<String, Value>,
    /// JSON Schema the decoded body must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// When set, schema violations fail the save instead of being counted.
    #[serde(default, skip_serializing_if = "super::is_false")]
    pub strict: bool,

    // Derived fields, populated while the body streams through a save.
    /// Content address of the body blob, prefixed by the store kind.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub checksum: Address,
    /// Body length in bytes.
    #[serde(default, skip_serializing_if = "super::is_zero_u64")]
    pub length: u64,
    /// Number of top-level entries.
    #[serde(default, skip_serializing_if = "super::is_zero_u64")]
    pub entries: u64,
    /// Maximum nesting depth of entry values, plus one for the enclosing
    /// container.
    #[serde(default, skip_serializing_if = "super::is_zero_u32")]
    pub depth: u32,
    /// Count of schema violations observed across the whole body.
    #[serde(default, skip_serializing_if = "super::is_zero_u64")]
    pub err_count: u64,
}

impl Structure {
    /// Clear every field the save pipeline derives, keeping only the
    /// author-provided description.
    pub fn strip_derived(&mut self) {
        self.checksum = Address::default();
        self.length = 0;
        self.entries = 0;
        self.depth = 0;
        self.err_count = 0;
    }
}

impl StoredComponent for Structure {
    fn path(&self) -> &Address {
        &self.path
    }
    fn path_mut(&mut self) -> &mut Address {
        &mut self.path
    }
}
