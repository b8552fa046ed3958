//! Structural diff of document trees.
//!
//! Objects diff by key, arrays diff by position. A container whose children
//! changed yields a `Context` delta holding the child deltas, so a diff is
//! itself a tree mirroring the documents' shape.

use itertools::{
    EitherOrBoth::{Both, Left, Right},
    Itertools,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaKind {
    Insert,
    Delete,
    Update,
    Replace,
    Context,
    Move,
}

impl DeltaKind {
    /// Past-tense verb for human-readable change descriptions. `Replace`
    /// intentionally reads as "updated".
    pub fn verb(&self) -> &'static str {
        match self {
            DeltaKind::Insert => "added",
            DeltaKind::Delete => "removed",
            DeltaKind::Update | DeltaKind::Replace => "updated",
            DeltaKind::Move => "moved",
            DeltaKind::Context => "",
        }
    }
}

/// One detected difference. `path` is the key or index at this level of the
/// document; nested differences hang off `children`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Delta {
    #[serde(rename = "type")]
    pub kind: DeltaKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Delta>,
}

impl Delta {
    fn leaf(kind: DeltaKind, path: impl ToString, value: Option<&Value>) -> Self {
        Self {
            kind,
            path: path.to_string(),
            value: value.cloned(),
            children: Vec::new(),
        }
    }

    /// Whether this delta carries any change at all.
    pub fn is_change(&self) -> bool {
        self.kind != DeltaKind::Context || !self.children.is_empty()
    }
}

/// Element counts of the two diffed documents: scalar leaves on the left
/// and right side. The denominators of percentage summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DiffStats {
    pub left: u64,
    pub right: u64,
}

/// Diff `left` against `right`, returning the differences between them.
/// Equal values produce an empty list.
pub fn diff(left: &Value, right: &Value) -> Vec<Delta> {
    let mut out = diff_inner(left, right);
    collapse_replaces(&mut out);
    out
}

/// Diff plus leaf counts of both sides, for percentage summaries.
pub fn diff_with_stats(left: &Value, right: &Value) -> (Vec<Delta>, DiffStats) {
    let stats = DiffStats {
        left: leaf_count(left),
        right: leaf_count(right),
    };
    (diff(left, right), stats)
}

fn diff_inner(left: &Value, right: &Value) -> Vec<Delta> {
    let mut out = Vec::new();
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            for eob in l
                .iter()
                .merge_join_by(r.iter(), |(lk, _), (rk, _)| lk.cmp(rk))
            {
                match eob {
                    Left((key, value)) => {
                        out.push(Delta::leaf(DeltaKind::Delete, key, Some(value)))
                    }
                    Right((key, value)) => {
                        out.push(Delta::leaf(DeltaKind::Insert, key, Some(value)))
                    }
                    Both((key, lv), (_, rv)) => push_child(&mut out, key, lv, rv),
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            for (index, eob) in l.iter().zip_longest(r.iter()).enumerate() {
                match eob {
                    Left(value) => out.push(Delta::leaf(DeltaKind::Delete, index, Some(value))),
                    Right(value) => out.push(Delta::leaf(DeltaKind::Insert, index, Some(value))),
                    Both(lv, rv) => push_child(&mut out, index, lv, rv),
                }
            }
        }
        _ => unreachable!("diff_inner is only called on matching container kinds"),
    }
    out
}

/// Push the delta for one shared key or index, if the values differ.
fn push_child(out: &mut Vec<Delta>, path: impl ToString, left: &Value, right: &Value) {
    if left == right {
        return;
    }
    if same_container_kind(left, right) {
        out.push(Delta {
            kind: DeltaKind::Context,
            path: path.to_string(),
            value: None,
            children: diff_inner(left, right),
        });
    } else if std::mem::discriminant(left) == std::mem::discriminant(right) {
        // A scalar edit within one JSON type.
        out.push(Delta::leaf(DeltaKind::Update, path, Some(right)));
    } else {
        // A kind change reads as removal of the old value plus insertion of
        // the new one; collapse_replaces folds the adjacent pair into a
        // single Replace.
        let path = path.to_string();
        out.push(Delta::leaf(DeltaKind::Delete, &path, Some(left)));
        out.push(Delta::leaf(DeltaKind::Insert, &path, Some(right)));
    }
}

fn same_container_kind(left: &Value, right: &Value) -> bool {
    matches!(
        (left, right),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

/// Collapse an adjacent delete+insert at the same path into a single
/// replace carrying the inserted value.
fn collapse_replaces(deltas: &mut Vec<Delta>) {
    let mut i = 0;
    while i + 1 < deltas.len() {
        if deltas[i].kind == DeltaKind::Delete
            && deltas[i + 1].kind == DeltaKind::Insert
            && deltas[i].path == deltas[i + 1].path
        {
            let insert = deltas.remove(i + 1);
            deltas[i] = Delta {
                kind: DeltaKind::Replace,
                path: insert.path,
                value: insert.value,
                children: Vec::new(),
            };
        }
        i += 1;
    }
    for delta in deltas.iter_mut() {
        collapse_replaces(&mut delta.children);
    }
}

/// Count of scalar leaves in a document.
pub fn leaf_count(value: &Value) -> u64 {
    match value {
        Value::Array(items) => items.iter().map(leaf_count).sum(),
        Value::Object(fields) => fields.values().map(leaf_count).sum(),
        _ => 1,
    }
}

/// Count of changed leaves across a diff. Inserted or deleted containers
/// count each of their leaves; an updated scalar counts one.
pub fn changed_leaves(deltas: &[Delta]) -> u64 {
    deltas
        .iter()
        .map(|delta| match delta.kind {
            DeltaKind::Context => changed_leaves(&delta.children),
            DeltaKind::Insert | DeltaKind::Delete | DeltaKind::Update | DeltaKind::Replace => {
                delta.value.as_ref().map(leaf_count).unwrap_or(1).max(1)
            }
            DeltaKind::Move => 0,
        })
        .sum()
}
