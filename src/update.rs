use std::time::Instant;

use log::debug;

use crate::database::BatchExecutor;
use crate::error::SeqStatusError;
use crate::progress::ProgressReporter;

/// One pending status change for a single sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateCommand {
    pub seq_key: i64,
    pub target_status_key: i64,
}

impl UpdateCommand {
    pub fn new(seq_key: i64, target_status_key: i64) -> Self {
        Self {
            seq_key,
            target_status_key,
        }
    }

    pub fn sql(&self) -> String {
        format!(
            "UPDATE SEQ_Sequence SET _SequenceStatus_key = {} WHERE _Sequence_key = {}",
            self.target_status_key, self.seq_key
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub updates: usize,
    pub batches: usize,
}

/// Executes `commands` in order, at most `batch_size` per batch.
///
/// Stops at the first failing batch. Whether earlier batches stay applied is up to the executor.
pub fn update_database<E: BatchExecutor>(
    executor: &mut E,
    commands: Vec<UpdateCommand>,
    batch_size: usize,
    started: Instant,
    progress: &mut dyn ProgressReporter,
) -> Result<UpdateOutcome, SeqStatusError> {
    let mut outcome = UpdateOutcome::default();

    for (index, chunk) in commands.chunks(batch_size.max(1)).enumerate() {
        progress.message(&format!(
            "Current running time (secs): {:.3}",
            started.elapsed().as_secs_f64()
        ));

        let statements: Vec<String> = chunk.iter().map(UpdateCommand::sql).collect();
        let batch_no = index + 1;
        executor.execute_batch(batch_no, &statements)?;
        debug!("Batch {} applied {} updates", batch_no, statements.len());

        outcome.updates += chunk.len();
        outcome.batches = batch_no;
    }

    Ok(outcome)
}
