use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, Level};
use logging_timer::timer;

use crate::config::JobSettings;
use crate::curation_log::CurationLog;
use crate::error::SeqStatusError;
use crate::preload::DeletedKeys;
use crate::progress::ProgressReporter;
use crate::update::UpdateCommand;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterOutcome {
    pub commands: Vec<UpdateCommand>,
    pub records_read: usize,
}

/// Scans the file of processed sequence keys and builds an update for each deleted one.
///
/// Matches are recorded in `curation_log` when one is given (dry runs pass `None`).
pub fn filter_sequence_file(
    path: &Path,
    deleted: &DeletedKeys,
    curation_log: Option<&mut CurationLog>,
    job: &JobSettings,
    progress: &mut dyn ProgressReporter,
) -> Result<FilterOutcome, SeqStatusError> {
    let _tmr = timer!(Level::Trace; "filter_sequence_file", "{}", path.display());

    if !path.exists() {
        return Err(SeqStatusError::MissingSequenceFile(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    filter_lines(reader, deleted, curation_log, job, progress)
}

/// Keys must be one integer per line. Any other line, blank ones included, aborts the scan.
pub fn filter_lines<R: BufRead>(
    reader: R,
    deleted: &DeletedKeys,
    mut curation_log: Option<&mut CurationLog>,
    job: &JobSettings,
    progress: &mut dyn ProgressReporter,
) -> Result<FilterOutcome, SeqStatusError> {
    let mut outcome = FilterOutcome::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        outcome.records_read = index + 1;

        if job.progress_interval > 0 && outcome.records_read % job.progress_interval == 0 {
            progress.message(&format!("Processed {} input records", outcome.records_read));
        }

        let text = line.trim();
        let seq_key: i64 = text
            .parse()
            .map_err(|_| SeqStatusError::InvalidSequenceKey {
                line: outcome.records_read,
                text: text.to_owned(),
            })?;

        if deleted.contains(seq_key) {
            outcome
                .commands
                .push(UpdateCommand::new(seq_key, job.active_status_key));
            if let Some(log) = curation_log.as_mut() {
                log.record_updated(seq_key)?;
            }
        }
    }

    debug!(
        "Read {} input records, {} updates",
        outcome.records_read,
        outcome.commands.len()
    );

    Ok(outcome)
}
