use super::StoredComponent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::Address;

/// Stats holds column-level summaries computed while the body streamed
/// through a save. Entirely derived: never diffed, never signed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    /// The summary document itself, keyed by column or entry key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

impl StoredComponent for Stats {
    fn path(&self) -> &Address {
        &self.path
    }
    fn path_mut(&mut self) -> &mut Address {
        &mut self.path
    }
}
