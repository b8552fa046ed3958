use super::StoredComponent;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use store::Address;

/// Readme is prose documentation for a dataset. Unlike meta or structure,
/// the readme object is inlined into the stored root snapshot; only its
/// script (the prose source itself) is stored as a separate blob.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Readme {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    /// Markup format of the prose source.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Address of the stored prose blob.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub script_path: Address,

    /// In-memory prose, staged for write or loaded for diffing.
    /// Never serialized.
    #[serde(skip)]
    pub script: Option<Bytes>,
}

impl StoredComponent for Readme {
    fn path(&self) -> &Address {
        &self.path
    }
    fn path_mut(&mut self) -> &mut Address {
        &mut self.path
    }
}
