use chrono::{DateTime, Utc};
use dataset::Component;

/// Source of commit timestamps. Injectable so tests can pin time.
pub type Clock = fn() -> DateTime<Utc>;

/// Per-save configuration, immutable for the duration of a save.
#[derive(Clone, Debug, Default)]
pub struct SaveSwitches {
    /// Override the commit timestamp outright.
    pub time: Option<DateTime<Utc>>,
    /// When set, missing components are *not* refilled from the previous
    /// snapshot.
    pub replace: bool,
    /// Hint to the store that the written root should be retained.
    pub pin: bool,
    /// Render the viz script against the body and store the output.
    pub should_render: bool,
    /// Skip the no-change check; an empty description becomes
    /// "forced update".
    pub force_if_no_changes: bool,
    /// Filename the body came from, decorating "created dataset" messages.
    pub file_hint: Option<String>,
    /// Components removed from the candidate before write.
    pub drop: Vec<Component>,
    /// Assert the dataset is new: saving over a previous snapshot fails.
    pub new_name: bool,
    /// Ambient clock, consulted when `time` is unset.
    pub now: Option<Clock>,
}

impl SaveSwitches {
    /// The commit timestamp for this save: the explicit override, the
    /// injected clock, or the system clock, in that order.
    pub(crate) fn timestamp(&self) -> DateTime<Utc> {
        self.time
            .unwrap_or_else(|| self.now.map(|now| now()).unwrap_or_else(Utc::now))
    }

    pub(crate) fn drops(&self, component: Component) -> bool {
        self.drop.contains(&component)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn explicit_time_beats_injected_clock() {
        fn frozen() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
        }
        let pinned = Utc.with_ymd_and_hms(2001, 6, 1, 12, 0, 0).unwrap();

        let sw = SaveSwitches {
            time: Some(pinned),
            now: Some(frozen),
            ..Default::default()
        };
        assert_eq!(sw.timestamp(), pinned);

        let sw = SaveSwitches {
            now: Some(frozen),
            ..Default::default()
        };
        assert_eq!(sw.timestamp(), frozen());
    }
}
