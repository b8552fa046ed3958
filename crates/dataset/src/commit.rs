use super::StoredComponent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Address;

/// Commit records a single write event: when it happened, a human-readable
/// description of what changed, and a signature binding the snapshot to its
/// author's key.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(default, skip_serializing_if = "Address::is_empty")]
    pub path: Address,

    /// Moment of user intent, pinned at the start of body processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// One-line description of the change.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Multi-line description of the change.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Base64 signature over the snapshot's signing bytes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

impl StoredComponent for Commit {
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
    use chrono::TimeZone;

    #[test]
    fn timestamp_roundtrips_at_nanosecond_precision() {
        let ts = Utc.with_ymd_and_hms(2001, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::nanoseconds(678_901_234);
        let commit = Commit {
            timestamp: Some(ts),
            title: "initial".to_string(),
            ..Default::default()
        };
        let encoded = serde_json::to_string(&commit).unwrap();
        let decoded: Commit = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.timestamp, Some(ts));
    }
}
