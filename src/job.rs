use std::time::Instant;

use log::{info, Level};
use logging_timer::timer;

use crate::config::{DbLogin, JobEnv, Settings};
use crate::curation_log::CurationLog;
use crate::database::Database;
use crate::error::SeqStatusError;
use crate::filter::{filter_sequence_file, FilterOutcome};
use crate::preload::preload;
use crate::progress::ProgressReporter;
use crate::status::SequenceStatus;
use crate::update::{update_database, UpdateOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct JobOptions {
    /// Build the updates without applying them or writing the curation log
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub deleted_keys: usize,
    pub records_read: usize,
    pub updates_generated: usize,
    pub updates_applied: usize,
    pub batches: usize,
}

/// Runs preload, filter and update in sequence.
///
/// The curation log is opened first and owned here, so it is flushed and closed on
/// every return path. Dry runs leave it untouched. A failure in any phase ends the run.
pub fn run(
    job_env: &JobEnv,
    settings: &Settings,
    options: JobOptions,
    progress: &mut dyn ProgressReporter,
) -> Result<JobSummary, SeqStatusError> {
    let started = Instant::now();
    let job = &settings.job;

    let mut curation_log = if options.dry_run {
        None
    } else {
        Some(CurationLog::open(&job_env.log_cur)?)
    };
    let login = DbLogin::from_env(job_env)?;
    info!(
        "Running with {:?}, target status {}",
        login,
        SequenceStatus::describe_term_key(job.active_status_key)
    );

    progress.message(&format!("Loading {} sequence lookup", job.division));
    let deleted = {
        let db = Database::connect(&login)?;
        let deleted = preload(&db, job)?;
        db.close()?;
        deleted
    };

    progress.message("Creating update commands");
    let filtered = filter_sequence_file(
        &job_env.sequences_processed,
        &deleted,
        curation_log.as_mut(),
        job,
        progress,
    )?;

    let mut summary = JobSummary {
        deleted_keys: deleted.len(),
        records_read: filtered.records_read,
        updates_generated: filtered.commands.len(),
        ..JobSummary::default()
    };

    progress.message("Updating database");
    progress.message(&format!("Total updates: {}", summary.updates_generated));

    let outcome = if options.dry_run {
        info!("Dry run - skipping {} updates", summary.updates_generated);
        UpdateOutcome::default()
    } else if filtered.commands.is_empty() {
        info!("Nothing to update");
        UpdateOutcome::default()
    } else {
        apply_updates(&login, settings, filtered, started, progress)?
    };

    summary.updates_applied = outcome.updates;
    summary.batches = outcome.batches;

    progress.message(&format!(
        "Processed {} updates to SEQ_Sequence._SequenceStatus_key",
        summary.updates_applied
    ));
    progress.message(&format!(
        "Total running time (secs): {:.3}",
        started.elapsed().as_secs_f64()
    ));

    if let Some(log) = curation_log {
        log.close()?;
    }

    Ok(summary)
}

/// Holds one connection for the whole update phase and releases it afterwards.
fn apply_updates(
    login: &DbLogin,
    settings: &Settings,
    filtered: FilterOutcome,
    started: Instant,
    progress: &mut dyn ProgressReporter,
) -> Result<UpdateOutcome, SeqStatusError> {
    let pending = filtered.commands.len();
    let _tmr = timer!(Level::Debug; "apply_updates", "{}", pending);

    let db = Database::connect(login)?;
    let outcome = {
        let mut session = db.update_session(settings.job.atomic)?;
        let outcome = update_database(
            &mut session,
            filtered.commands,
            settings.job.batch_size,
            started,
            progress,
        )?;
        session.finish()?;
        outcome
    };
    db.close()?;

    Ok(outcome)
}
