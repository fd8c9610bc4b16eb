use strum::{AsRefStr, Display};

/// Term key of the "Deleted" sequence status.
pub const DELETED_STATUS_KEY: i64 = 316343;

/// Term key of the "Active" sequence status.
pub const ACTIVE_STATUS_KEY: i64 = 316342;

/// Division the preload is restricted to.
pub const GSS_DIVISION: &str = "GSS";

/// Number of update statements executed per round-trip.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Input records between progress messages.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10_000;

/// Sequence statuses this job reads or writes.
#[derive(AsRefStr, Display, Debug, PartialEq, Eq, Copy, Clone)]
pub enum SequenceStatus {
    #[strum(serialize = "ACTIVE")]
    Active,
    #[strum(serialize = "DELETED")]
    Deleted,
}

impl SequenceStatus {
    pub fn term_key(&self) -> i64 {
        match self {
            SequenceStatus::Active => ACTIVE_STATUS_KEY,
            SequenceStatus::Deleted => DELETED_STATUS_KEY,
        }
    }

    pub fn from_term_key(key: i64) -> Option<SequenceStatus> {
        match key {
            ACTIVE_STATUS_KEY => Some(SequenceStatus::Active),
            DELETED_STATUS_KEY => Some(SequenceStatus::Deleted),
            _ => None,
        }
    }

    /// Display name for a term key, or `unknown` for keys this job doesn't know.
    pub fn describe_term_key(key: i64) -> String {
        match Self::from_term_key(key) {
            Some(status) => format!("{} ({})", key, status),
            None => format!("{} (unknown)", key),
        }
    }
}
