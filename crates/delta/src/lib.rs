//! Change detection between dataset snapshots.
//!
//! Two halves: a structural [`diff`] over document trees, and a
//! [`describe`] summarizer which turns diffs of consecutive snapshots into
//! the short/long commit messages a save records. Bodies are diffed
//! separately from the rest of the snapshot, steered by [`BodyAction`].

mod diff;
mod normalize;
mod summary;

pub use diff::{changed_leaves, diff, diff_with_stats, leaf_count, Delta, DeltaKind, DiffStats};
pub use normalize::normalized_view;
pub use summary::{describe, DescribeParams};

/// How the save pipeline handled the body, which in turn steers how change
/// detection treats it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyAction {
    /// A new body streamed through the save and was small enough to buffer
    /// for diffing.
    #[default]
    Default,
    /// No body was supplied; the previous snapshot's body was carried
    /// forward byte for byte.
    Same,
    /// The body exceeded the diff threshold; compare checksums instead.
    TooBig,
}

#[cfg(test)]
mod test {
    use super::*;
    use dataset::{Commit, Dataset, Meta, Structure};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use store::Address;

    fn with_meta_title(title: &str) -> Dataset {
        Dataset {
            meta: Some(Meta {
                title: title.to_string(),
                ..Default::default()
            }),
            structure: Some(Structure {
                format: "json".to_string(),
                ..Default::default()
            }),
            name: "example".to_string(),
            ..Default::default()
        }
    }

    fn describe_simple(
        prev: &Dataset,
        next: &Dataset,
        prev_body: Option<&Value>,
        next_body: Option<&Value>,
        action: BodyAction,
    ) -> Option<(String, String)> {
        describe(&DescribeParams {
            prev: Some(prev),
            next,
            prev_body,
            next_body,
            action,
            force: false,
            file_hint: None,
        })
    }

    #[test]
    fn initial_commit_is_created_dataset() {
        let next = with_meta_title("new dataset");
        let (short, long) = describe(&DescribeParams {
            prev: None,
            next: &next,
            prev_body: None,
            next_body: Some(&json!([{"a": 1}])),
            action: BodyAction::Default,
            force: false,
            file_hint: None,
        })
        .unwrap();
        assert_eq!(short, "created dataset");
        assert_eq!(long, "created dataset");
    }

    #[test]
    fn file_hint_decorates_initial_commit() {
        let next = with_meta_title("new dataset");
        let (short, long) = describe(&DescribeParams {
            prev: None,
            next: &next,
            prev_body: None,
            next_body: None,
            action: BodyAction::Default,
            force: false,
            file_hint: Some("/home/data/cities.csv"),
        })
        .unwrap();
        assert_eq!(short, "created dataset from cities.csv");
        assert_eq!(long, "created dataset from cities.csv");
    }

    #[test]
    fn meta_title_change() {
        let prev = with_meta_title("new dataset");
        let next = with_meta_title("changes to dataset");
        let body = json!([{"a": 1}]);

        let (short, long) =
            describe_simple(&prev, &next, Some(&body), Some(&body), BodyAction::Default).unwrap();
        assert_eq!(short, "meta updated title");
        assert_eq!(long, "meta:\n\tupdated title");
    }

    #[test]
    fn small_body_diff_lists_rows() {
        let prev = with_meta_title("fruit");
        let next = prev.clone();
        let left = json!([
            {"fruit": "apple", "color": "red"},
            {"fruit": "banana", "color": "yellow"},
            {"fruit": "cherry", "color": "red"}
        ]);
        let right = json!([
            {"fruit": "apple", "color": "red"},
            {"fruit": "blueberry", "color": "blue"},
            {"fruit": "cherry", "color": "red"},
            {"fruit": "durian", "color": "green"}
        ]);

        let (short, long) =
            describe_simple(&prev, &next, Some(&left), Some(&right), BodyAction::Default).unwrap();
        assert_eq!(short, "body updated row 1 and added row 3");
        assert_eq!(long, "body:\n\tupdated row 1\n\tadded row 3");
    }

    #[test]
    fn large_body_diff_reports_percentage() {
        let prev = with_meta_title("grid");
        let next = prev.clone();

        // Ten rows of ten cells; nineteen cells changed, spread across
        // every row so more than three rows report changes.
        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for row in 0..10 {
            let mut l = serde_json::Map::new();
            let mut r = serde_json::Map::new();
            for col in 0..10 {
                let key = format!("c{col}");
                l.insert(key.clone(), json!(row * 10 + col));
                let changed = col == 0 || (col == 1 && row < 9);
                r.insert(
                    key,
                    if changed { json!(-1) } else { json!(row * 10 + col) },
                );
            }
            left_rows.push(Value::Object(l));
            right_rows.push(Value::Object(r));
        }
        let left = Value::Array(left_rows);
        let right = Value::Array(right_rows);

        let (short, long) =
            describe_simple(&prev, &next, Some(&left), Some(&right), BodyAction::Default).unwrap();
        assert_eq!(short, "body changed by 19%");
        assert_eq!(long, "body:\n\tchanged by 19%");
    }

    #[test]
    fn oversize_body_with_differing_checksum_is_assumed_changed() {
        let mut prev = with_meta_title("big");
        prev.structure.as_mut().unwrap().checksum = Address::from("/mem/old-body");
        let mut next = with_meta_title("big");
        next.structure.as_mut().unwrap().checksum = Address::from("/mem/new-body");

        let (short, long) =
            describe_simple(&prev, &next, None, None, BodyAction::TooBig).unwrap();
        assert_eq!(short, "body changed");
        assert_eq!(long, "body changed");
    }

    #[test]
    fn oversize_body_with_equal_checksum_is_no_change() {
        let mut prev = with_meta_title("big");
        prev.structure.as_mut().unwrap().checksum = Address::from("/mem/body");
        let next = prev.clone();

        assert_eq!(
            describe_simple(&prev, &next, None, None, BodyAction::TooBig),
            None
        );
    }

    #[test]
    fn identical_snapshots_are_no_changes() {
        let prev = with_meta_title("same");
        let next = prev.clone();
        let body = json!([{"a": 1}]);
        assert_eq!(
            describe_simple(&prev, &next, Some(&body), Some(&body), BodyAction::Default),
            None
        );
    }

    #[test]
    fn force_overrides_no_changes() {
        let prev = with_meta_title("same");
        let next = prev.clone();
        let (short, long) = describe(&DescribeParams {
            prev: Some(&prev),
            next: &next,
            prev_body: None,
            next_body: None,
            action: BodyAction::Same,
            force: true,
            file_hint: None,
        })
        .unwrap();
        assert_eq!(short, "forced update");
        assert_eq!(long, "forced update");
    }

    #[test]
    fn user_authored_description_wins() {
        let prev = with_meta_title("old");
        let mut next = with_meta_title("new");
        next.commit = Some(Commit {
            title: "my title".to_string(),
            message: "my message".to_string(),
            ..Default::default()
        });

        let (short, long) =
            describe_simple(&prev, &next, None, None, BodyAction::Same).unwrap();
        assert_eq!(short, "my title");
        assert_eq!(long, "my message");
    }

    #[test]
    fn two_components_combine() {
        let mut prev = with_meta_title("old");
        prev.structure.as_mut().unwrap().format = "json".to_string();
        let mut next = with_meta_title("new");
        next.structure.as_mut().unwrap().format = "ndjson".to_string();

        let (short, long) =
            describe_simple(&prev, &next, None, None, BodyAction::Same).unwrap();
        assert_eq!(short, "updated meta and structure");
        assert_eq!(
            long,
            "meta:\n\tupdated title\nstructure:\n\tupdated format"
        );
    }

    #[test]
    fn many_fields_count_in_title() {
        let mut prev = with_meta_title("old");
        prev.meta.as_mut().unwrap().description = "before".to_string();
        let mut next = with_meta_title("new");
        next.meta.as_mut().unwrap().description = "after".to_string();

        let (short, long) =
            describe_simple(&prev, &next, None, None, BodyAction::Same).unwrap();
        assert_eq!(short, "meta updated 2 fields");
        assert_eq!(long, "meta:\n\tupdated description\n\tupdated title");
    }
}
