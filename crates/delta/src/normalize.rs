//! Normalization of snapshots into diffable document trees.

use dataset::Dataset;
use serde_json::Value;

/// Convert a snapshot into the document tree that change detection runs
/// over. Store addresses and body-derived statistics are stripped (they
/// change on every write), the commit is dropped (it describes the change,
/// it isn't one), and staged script bytes are inlined as text so edits to a
/// transform or readme script diff like any other field.
pub fn normalized_view(ds: &Dataset) -> Value {
    let mut doc = serde_json::to_value(ds).expect("datasets always encode");
    dataset::strip_derived(&mut doc);

    let Some(root) = doc.as_object_mut() else {
        return doc;
    };
    root.remove("commit");

    if let Some(script) = ds.transform.as_ref().and_then(|tf| tf.script.as_ref()) {
        if let Some(tf) = root.get_mut("transform").and_then(|v| v.as_object_mut()) {
            tf.insert(
                "script".to_string(),
                Value::String(String::from_utf8_lossy(script).into_owned()),
            );
        }
    }
    if let Some(script) = ds.readme.as_ref().and_then(|rm| rm.script.as_ref()) {
        if let Some(rm) = root.get_mut("readme").and_then(|v| v.as_object_mut()) {
            rm.insert(
                "script".to_string(),
                Value::String(String::from_utf8_lossy(script).into_owned()),
            );
        }
    }
    doc
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use dataset::{Commit, Meta, Readme, Structure, Transform};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use store::Address;

    #[test]
    fn view_keeps_content_and_drops_derivations() {
        let ds = Dataset {
            meta: Some(Meta {
                path: Address::from("/mem/meta"),
                title: "a title".to_string(),
                ..Default::default()
            }),
            structure: Some(Structure {
                format: "csv".to_string(),
                checksum: Address::from("/mem/body"),
                entries: 2,
                length: 16,
                depth: 2,
                ..Default::default()
            }),
            commit: Some(Commit {
                title: "not content".to_string(),
                ..Default::default()
            }),
            body_path: Address::from("/mem/body"),
            name: "example".to_string(),
            ..Default::default()
        };

        assert_eq!(
            normalized_view(&ds),
            json!({
                "meta": {"title": "a title"},
                "structure": {"format": "csv"},
                "name": "example"
            })
        );
    }

    #[test]
    fn staged_scripts_inline_as_text() {
        let ds = Dataset {
            transform: Some(Transform {
                syntax: "lua".to_string(),
                script_path: Address::from("/mem/tf_script"),
                script: Some(Bytes::from_static(b"return rows")),
                ..Default::default()
            }),
            readme: Some(Readme {
                format: "md".to_string(),
                script: Some(Bytes::from_static(b"# About")),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            normalized_view(&ds),
            json!({
                "transform": {"syntax": "lua", "script": "return rows"},
                "readme": {"format": "md", "script": "# About"}
            })
        );
    }
}
