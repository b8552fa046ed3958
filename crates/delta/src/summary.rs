//! Human-readable commit messages derived from structural diffs.

use super::diff::{changed_leaves, diff, diff_with_stats, Delta, DeltaKind};
use super::normalize::normalized_view;
use super::BodyAction;
use dataset::Dataset;
use serde_json::Value;

/// Components in the order they're reported, body always last.
const COMPONENTS: [&str; 5] = ["meta", "structure", "readme", "viz", "transform"];

/// How many row-level changes are listed individually before the summary
/// falls back to a percentage.
const MAX_LISTED_ROWS: usize = 3;

/// Inputs to commit message generation. `prev` and `next` must be inlined
/// for every field examined; staged script bytes should already be loaded
/// so script edits surface as text changes.
pub struct DescribeParams<'a> {
    pub prev: Option<&'a Dataset>,
    pub next: &'a Dataset,
    /// Buffered previous body, when small enough to diff.
    pub prev_body: Option<&'a Value>,
    /// Buffered candidate body, when small enough to diff.
    pub next_body: Option<&'a Value>,
    pub action: BodyAction,
    pub force: bool,
    /// Filename the body came from, decorating "created dataset" messages.
    pub file_hint: Option<&'a str>,
}

/// Produce a `(short title, long message)` pair describing how `next`
/// differs from `prev`, or `None` when the two are semantically identical
/// and `force` is unset.
pub fn describe(params: &DescribeParams<'_>) -> Option<(String, String)> {
    let user_title = non_empty(params.next.commit.as_ref().map(|c| c.title.as_str()));
    let user_message = non_empty(params.next.commit.as_ref().map(|c| c.message.as_str()));

    // An initial commit has nothing to diff against.
    if params.prev.map_or(true, Dataset::is_empty) {
        let mut text = "created dataset".to_string();
        if let Some(hint) = params.file_hint {
            if let Some(basename) = std::path::Path::new(hint).file_name() {
                text = format!("{text} from {}", basename.to_string_lossy());
            }
        }
        return Some((
            user_title.map(str::to_string).unwrap_or_else(|| text.clone()),
            user_message.map(str::to_string).unwrap_or(text),
        ));
    }

    // A fully user-authored description skips generation.
    if let (Some(title), Some(message)) = (user_title, user_message) {
        return Some((title.to_string(), message.to_string()));
    }

    if params.force {
        return Some((
            user_title.unwrap_or("forced update").to_string(),
            user_message.unwrap_or("forced update").to_string(),
        ));
    }

    let prev = params.prev.expect("checked above");
    let head_deltas = diff(&normalized_view(prev), &normalized_view(params.next));
    tracing::debug!(deltas = head_deltas.len(), "diffed snapshot heads");

    let mut sections: Vec<Section> = COMPONENTS
        .into_iter()
        .filter_map(|name| {
            head_deltas
                .iter()
                .find(|delta| delta.path == name)
                .and_then(|delta| component_section(name, delta))
        })
        .collect();
    if let Some(section) = body_section(params, prev) {
        sections.push(section);
    }

    if sections.is_empty() {
        return None;
    }

    let short = match sections.as_slice() {
        [only] => only.short.clone(),
        many => {
            let names: Vec<&str> = many.iter().map(|s| s.component).collect();
            format!("updated {}", join_natural(&names))
        }
    };
    let long = sections
        .iter()
        .map(|s| s.long.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Some((
        user_title.map(str::to_string).unwrap_or(short),
        user_message.map(str::to_string).unwrap_or(long),
    ))
}

/// One reported component change.
struct Section {
    component: &'static str,
    short: String,
    long: String,
}

/// Section for one non-body component's delta, or `None` if it carries no
/// change.
fn component_section(name: &'static str, delta: &Delta) -> Option<Section> {
    match delta.kind {
        DeltaKind::Insert
        | DeltaKind::Delete
        | DeltaKind::Replace
        | DeltaKind::Update
        | DeltaKind::Move => {
            let text = format!("{name} {}", delta.kind.verb());
            Some(Section {
                component: name,
                short: text.clone(),
                long: text,
            })
        }
        DeltaKind::Context => {
            let changes: Vec<&Delta> = delta.children.iter().filter(|c| c.is_change()).collect();
            match changes.len() {
                0 => None,
                1 => {
                    let (verb, field) = (field_verb(changes[0]), changes[0].path.as_str());
                    Some(Section {
                        component: name,
                        short: format!("{name} {verb} {field}"),
                        long: format!("{name}:\n\t{verb} {field}"),
                    })
                }
                n => {
                    let lines = changes
                        .iter()
                        .map(|c| format!("\t{} {}", field_verb(c), c.path))
                        .collect::<Vec<_>>()
                        .join("\n");
                    Some(Section {
                        component: name,
                        short: format!("{name} updated {n} fields"),
                        long: format!("{name}:\n{lines}"),
                    })
                }
            }
        }
    }
}

/// Section describing the body change, if any.
fn body_section(params: &DescribeParams<'_>, prev: &Dataset) -> Option<Section> {
    let section = |short: String, long: String| {
        Some(Section {
            component: "body",
            short,
            long,
        })
    };

    match params.action {
        // The previous body was carried forward untouched.
        BodyAction::Same => None,

        // Too big to diff: a checksum mismatch is assumed to mean change.
        BodyAction::TooBig => {
            let prev_sum = prev.structure.as_ref().map(|st| &st.checksum);
            let next_sum = params.next.structure.as_ref().map(|st| &st.checksum);
            if prev_sum == next_sum {
                None
            } else {
                section("body changed".to_string(), "body changed".to_string())
            }
        }

        BodyAction::Default => match (params.prev_body, params.next_body) {
            (Some(left), Some(right)) => {
                let (deltas, stats) = diff_with_stats(left, right);
                let rows: Vec<(&'static str, &str)> = deltas
                    .iter()
                    .filter(|delta| delta.is_change())
                    .map(|delta| (row_verb(delta), delta.path.as_str()))
                    .collect();

                match rows.len() {
                    0 => None,
                    n if n <= MAX_LISTED_ROWS => {
                        let phrases: Vec<String> = rows
                            .iter()
                            .map(|(verb, row)| format!("{verb} row {row}"))
                            .collect();
                        let refs: Vec<&str> = phrases.iter().map(String::as_str).collect();
                        let lines = phrases
                            .iter()
                            .map(|p| format!("\t{p}"))
                            .collect::<Vec<_>>()
                            .join("\n");
                        section(format!("body {}", join_natural(&refs)), format!("body:\n{lines}"))
                    }
                    _ => {
                        let divisor = stats.left.max(stats.right).max(1);
                        let pct =
                            (100.0 * changed_leaves(&deltas) as f64 / divisor as f64).round();
                        section(
                            format!("body changed by {pct}%"),
                            format!("body:\n\tchanged by {pct}%"),
                        )
                    }
                }
            }
            // No previous body to compare against: the body is new.
            (None, Some(_)) => section("body added".to_string(), "body added".to_string()),
            _ => None,
        },
    }
}

fn row_verb(delta: &Delta) -> &'static str {
    match delta.kind {
        DeltaKind::Context => "updated",
        kind => kind.verb(),
    }
}

fn field_verb(delta: &Delta) -> &'static str {
    row_verb(delta)
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Join items as prose: "a", "a and b", "a, b and c".
fn join_natural(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}
