use super::StoredComponent;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use store::Address;

/// Transform describes the script which produced a dataset's body. The
/// script itself is stored as a separate blob; `script_path` points at it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    /// Language of the script source.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub syntax: String,
    /// Configuration values the script reads at run time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    /// Address of the stored script blob.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub script_path: Address,

    /// In-memory script source, staged for write or loaded for diffing.
    /// Never serialized; the stored form is always `script_path`.
    #[serde(skip)]
    pub script: Option<Bytes>,
}

impl StoredComponent for Transform {
    fn path(&self) -> &Address {
        &self.path
    }
    fn path_mut(&mut self) -> &mut Address {
        &mut self.path
    }
}
