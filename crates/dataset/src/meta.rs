use super::StoredComponent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use store::Address;

/// Descriptive, human-authored metadata about a dataset. Every field is
/// optional, and unrecognized fields are preserved verbatim so authors can
/// carry their own vocabulary.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub home_url: String,

    /// Author-defined fields beyond the standard vocabulary.
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

impl StoredComponent for Meta {
    fn path(&self) -> &Address {
        &self.path
    }
    fn path_mut(&mut self) -> &mut Address {
        &mut self.path
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_roundtrip() {
        let raw = json!({
            "title": "city populations",
            "accrualPeriodicity": "weekly"
        });
        let meta: Meta = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(meta.title, "city populations");
        assert_eq!(
            meta.additional.get("accrualPeriodicity"),
            Some(&json!("weekly"))
        );
        assert_eq!(serde_json::to_value(&meta).unwrap(), raw);
    }
}
