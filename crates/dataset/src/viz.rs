use super::StoredComponent;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use store::Address;

/// Viz names a template which renders a dataset body into a human-viewable
/// document. The template script and its rendered output are stored as
/// separate blobs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Viz {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    /// Output format of the rendered document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Address of the stored template script.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub script_path: Address,
    /// Address of the rendered output, when rendering was requested.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub rendered_path: Address,

    /// In-memory template source, staged for write. Never serialized.
    #[serde(skip)]
    pub script: Option<Bytes>,
}

impl StoredComponent for Viz {
    fn path(&self) -> &Address {
        &self.path
    }
    fn path_mut(&mut self) -> &mut Address {
        &mut self.path
    }
}
