use std::time::Duration;

/// Default number of rows validated per batch.
pub const BATCH_SIZE: usize = 5000;
/// Default ceiling, in bytes, under which a body is buffered for diffing.
pub const BODY_SIZE_SMALL_ENOUGH_TO_DIFF: u64 = 20_000_000;
/// Default bound on each component fetch during load.
pub const OPEN_FILE_TIMEOUT: Duration = Duration::from_millis(700);

/// Engine tunables, fixed at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Rows validated per schema-validation batch.
    pub batch_size: usize,
    /// Bodies at or under this many bytes are buffered for diffing;
    /// anything larger is summarized by checksum comparison instead.
    pub body_size_small_enough_to_diff: u64,
    /// Bound on each component fetch during load. Stores that fall back to
    /// network fetches otherwise stall loads indefinitely.
    pub open_file_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            body_size_small_enough_to_diff: BODY_SIZE_SMALL_ENOUGH_TO_DIFF,
            open_file_timeout: OPEN_FILE_TIMEOUT,
        }
    }
}
