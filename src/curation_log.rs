use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::SeqStatusError;
use crate::status::SequenceStatus;

/// Append-mode curator log (`LOG_CUR`) recording every sequence scheduled for reactivation.
///
/// Owned by the job runner for the whole run. The buffered writer is flushed on drop,
/// so lines written before a fatal error still reach the file.
pub struct CurationLog {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: usize,
}

impl CurationLog {
    pub fn open(path: &Path) -> Result<Self, SeqStatusError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("Opened curation log at: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn record_updated(&mut self, seq_key: i64) -> Result<(), SeqStatusError> {
        writeln!(
            self.writer,
            "SeqKey updated to {}: {}",
            SequenceStatus::Active,
            seq_key
        )?;
        self.lines += 1;
        Ok(())
    }

    /// Flushes and closes the log, returning the number of lines written this run.
    pub fn close(mut self) -> Result<usize, SeqStatusError> {
        self.writer.flush()?;
        debug!(
            "Closed curation log at {} after {} lines",
            self.path.display(),
            self.lines
        );
        Ok(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_curation_log_appends() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("curator.log");
        std::fs::write(&path, "earlier run\n").expect("Failed to seed log");

        let mut log = CurationLog::open(&path).expect("Failed to open log");
        log.record_updated(10).unwrap();
        log.record_updated(30).unwrap();
        assert_eq!(log.close().unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "earlier run\nSeqKey updated to ACTIVE: 10\nSeqKey updated to ACTIVE: 30\n"
        );
    }

    #[test]
    fn test_curation_log_flushes_on_drop() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("curator.log");

        {
            let mut log = CurationLog::open(&path).expect("Failed to open log");
            log.record_updated(42).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "SeqKey updated to ACTIVE: 42\n");
    }

    #[test]
    fn test_curation_log_bad_path() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("no_such_dir").join("curator.log");

        assert!(matches!(
            CurationLog::open(&path),
            Err(SeqStatusError::IoError(_))
        ));
    }
}
