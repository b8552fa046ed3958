//! The dataset snapshot data model.
//!
//! A [`Dataset`] is the root entity of a stored snapshot: a bundle of named
//! components (meta, structure, commit, transform, viz, readme, stats) plus
//! the address of its body. Any component may be *inlined* (full object
//! present), in *reference form* (only its store address set), or absent.
//! Snapshots persisted to the object store always hold their stored
//! components in reference form; in memory they're progressively inlined as
//! references are dereferenced.

mod commit;
mod component;
mod meta;
mod readme;
pub mod sign;
mod stats;
mod structure;
mod transform;
mod viz;

pub use commit::Commit;
pub use component::Component;
pub use meta::Meta;
pub use readme::Readme;
pub use stats::Stats;
pub use structure::Structure;
pub use transform::Transform;
pub use viz::Viz;

use serde::{Deserialize, Serialize};
use store::Address;

/// Behaviors shared by every stored component of a dataset.
pub trait StoredComponent: Clone + Default + PartialEq {
    /// The component's address within the object store, empty if unset.
    fn path(&self) -> &Address;
    fn path_mut(&mut self) -> &mut Address;

    /// A copy holding only the store address.
    fn to_reference(&self) -> Self {
        let mut reference = Self::default();
        *reference.path_mut() = self.path().clone();
        reference
    }

    /// True when this component carries an address and nothing else:
    /// the form a component takes inside a stored snapshot.
    fn is_reference(&self) -> bool {
        !self.path().is_empty() && *self == self.to_reference()
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The root entity of a snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viz: Option<Viz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<Readme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,

    /// Address of the body blob as written to the store.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub body_path: Address,
    /// Address of the snapshot this one descends from.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub previous_path: Address,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub peername: String,

    /// The snapshot's own root address, assigned after write.
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The body filename for this snapshot, `body.<format>`.
    pub fn body_filename(&self) -> String {
        let format = self
            .structure
            .as_ref()
            .map(|st| st.format.as_str())
            .unwrap_or("json");
        Component::Body.filename(format)
    }
}

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

pub(crate) fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

pub(crate) fn is_zero_u32(n: &u32) -> bool {
    *n == 0
}

/// Serialize `value` as canonical JSON: UTF-8, sorted keys, no extra
/// whitespace. Components are stored in exactly this form, so identical
/// content always lands at an identical address.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    // Round-tripping through Value sorts object keys (BTreeMap-backed).
    let value = serde_json::to_value(value)?;
    serde_json::to_vec(&value)
}

/// Remove store addresses and body-derived fields from a snapshot's
/// document-tree view, leaving only author-provided content. This is the
/// shared normalization behind both commit signing and change detection:
/// addresses and derived statistics change on every write and must never
/// count as edits in their own right.
pub fn strip_derived(doc: &mut serde_json::Value) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    for key in ["path", "bodyPath", "previousPath", "body", "stats"] {
        root.remove(key);
    }
    for (component, fields) in [
        ("meta", &["path"][..]),
        (
            "structure",
            &["path", "checksum", "entries", "length", "depth", "errCount"][..],
        ),
        ("commit", &["path", "signature"][..]),
        ("transform", &["path", "scriptPath"][..]),
        ("readme", &["path", "scriptPath"][..]),
        ("viz", &["path", "renderedPath"][..]),
    ] {
        if let Some(obj) = root.get_mut(component).and_then(|v| v.as_object_mut()) {
            for field in fields {
                obj.remove(*field);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys() {
        #[derive(Serialize)]
        struct Unsorted {
            zebra: u32,
            apple: u32,
        }
        let encoded = to_canonical_json(&Unsorted { zebra: 1, apple: 2 }).unwrap();
        assert_eq!(encoded, br#"{"apple":2,"zebra":1}"#.to_vec());
    }

    #[test]
    fn empty_components_are_omitted_from_serialization() {
        let ds = Dataset {
            name: "population".to_string(),
            ..Default::default()
        };
        let value = serde_json::to_value(&ds).unwrap();
        assert_eq!(value, json!({"name": "population"}));
    }

    #[test]
    fn strip_derived_removes_addresses_and_statistics() {
        let mut doc = json!({
            "path": "/mem/root",
            "bodyPath": "/mem/body",
            "previousPath": "/mem/prev",
            "stats": {"path": "/mem/stats"},
            "meta": {"path": "/mem/meta", "title": "kept"},
            "structure": {
                "path": "/mem/st",
                "format": "csv",
                "checksum": "/mem/body",
                "entries": 10,
                "length": 100,
                "depth": 2,
                "errCount": 0
            },
            "commit": {"title": "kept", "signature": "c2ln"},
            "transform": {"scriptPath": "/mem/ts", "syntax": "kept"},
            "readme": {"scriptPath": "/mem/rs", "format": "md"},
            "viz": {"scriptPath": "/mem/vs", "renderedPath": "/mem/rendered", "format": "html"}
        });
        strip_derived(&mut doc);
        assert_eq!(
            doc,
            json!({
                "meta": {"title": "kept"},
                "structure": {"format": "csv"},
                "commit": {"title": "kept"},
                "transform": {"syntax": "kept"},
                "readme": {"format": "md"},
                "viz": {"scriptPath": "/mem/vs", "format": "html"}
            })
        );
    }

    #[test]
    fn reference_form_roundtrip() {
        let meta = Meta {
            path: Address::from("/mem/abc"),
            title: "a title".to_string(),
            ..Default::default()
        };
        assert!(!meta.is_reference());

        let reference = meta.to_reference();
        assert!(reference.is_reference());
        assert_eq!(reference.path, Address::from("/mem/abc"));
        assert_eq!(reference.title, "");
    }
}
