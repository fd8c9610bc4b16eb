use std::collections::HashSet;

use log::info;

use crate::config::JobSettings;
use crate::database::Database;
use crate::error::SeqStatusError;

/// Keys of sequences currently in the deleted status. Built once per run, read-only afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeletedKeys(HashSet<i64>);

impl DeletedKeys {
    pub fn contains(&self, seq_key: i64) -> bool {
        self.0.contains(&seq_key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<i64> for DeletedKeys {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        DeletedKeys(iter.into_iter().collect())
    }
}

pub fn preload(db: &Database, job: &JobSettings) -> Result<DeletedKeys, SeqStatusError> {
    let keys = db.load_deleted_keys(&job.division, job.deleted_status_key)?;
    info!(
        "Loaded {} deleted {} sequences from {}",
        keys.len(),
        job.division,
        db.path().display()
    );

    Ok(DeletedKeys(keys))
}
