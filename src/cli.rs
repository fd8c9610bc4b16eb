use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flexi_logger::{Logger, LoggerHandle};
use log::info;

use crate::config::{JobEnv, LoggingConfig, Settings};
use crate::error::SeqStatusError;
use crate::job::{self, JobOptions};
use crate::progress::StdoutProgress;

#[derive(Parser)]
#[command(
    name = "seqstatus",
    version,
    about = "Reactivates deleted GSS sequences that were processed by the gene trap load"
)]
pub struct Cli {
    /// Settings file (default: config.toml in the platform config directory, if present)
    #[arg(long = "config", short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reactivate deleted sequences listed in $SEQUENCES_PROCESSED (default if no command specified)
    Run {
        /// Build and log the updates without applying them
        #[arg(long = "dry-run", default_value_t = false)]
        dry_run: bool,
    },

    /// Print the effective settings as TOML
    #[command(name = "show-config")]
    ShowConfig,
}

impl Cli {
    pub fn handle_command_line() -> Result<(), SeqStatusError> {
        let args = Cli::parse();
        let settings = Settings::load(args.config.as_deref())?;

        // Default to Run if no command specified
        match args.command.unwrap_or(Command::Run { dry_run: false }) {
            Command::Run { dry_run } => Self::run_job(&settings, JobOptions { dry_run }),
            Command::ShowConfig => Self::show_config(&settings),
        }
    }

    fn run_job(settings: &Settings, options: JobOptions) -> Result<(), SeqStatusError> {
        let _logger = start_logger(&settings.logging)?;

        let job_env = JobEnv::from_env()?;
        let summary = job::run(&job_env, settings, options, &mut StdoutProgress)?;
        info!("Job complete: {:?}", summary);

        Ok(())
    }

    fn show_config(settings: &Settings) -> Result<(), SeqStatusError> {
        let toml_string = toml::to_string_pretty(settings)
            .map_err(|e| SeqStatusError::Error(format!("Failed to serialize settings: {}", e)))?;
        print!("{}", toml_string);
        Ok(())
    }
}

/// Diagnostics go to stderr at the configured level; RUST_LOG takes precedence when set.
/// The returned handle must be held for the logger to keep running.
fn start_logger(logging: &LoggingConfig) -> Result<LoggerHandle, SeqStatusError> {
    let spec = format!("warn, seqstatus={}", logging.seqstatus);
    let handle = Logger::try_with_env_or_str(spec)?
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()?;
    Ok(handle)
}
