use rusqlite::Error as RusqliteError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeqStatusError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error), // Converts io::Error into SeqStatusError automatically

    #[error("Configuration error: {0}")]
    ConfigError(#[from] Box<figment::Error>),

    #[error("Logger error: {0}")]
    LoggerError(#[from] flexi_logger::FlexiLoggerError),

    #[error("Cannot find sequence file: {}", .0.display())]
    MissingSequenceFile(PathBuf),

    #[error("Invalid sequence key on line {line}: '{text}'")]
    InvalidSequenceKey { line: usize, text: String },

    #[error("Cannot read password file {}: {source}", path.display())]
    PasswordFile { path: PathBuf, source: io::Error },

    #[error("Failed to connect to database {}: {source}", path.display())]
    ConnectionError { path: PathBuf, source: RusqliteError },

    #[error("Failed loading deleted sequences: {0}")]
    PreloadError(#[source] RusqliteError),

    #[error("Failed during database updates (batch {batch}): {source}")]
    StatementError { batch: usize, source: RusqliteError },

    #[error("Failed managing update transaction: {0}")]
    TransactionError(#[source] RusqliteError),

    #[error("Error: {0}")]
    Error(String), // Allows custom application errors
}

impl From<figment::Error> for SeqStatusError {
    fn from(err: figment::Error) -> Self {
        SeqStatusError::ConfigError(Box::new(err))
    }
}
