use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::SeqStatusError;
use crate::status::{
    SequenceStatus, DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_INTERVAL, GSS_DIVISION,
};

const CONFIG_FILENAME: &str = "config.toml";
const ENV_PREFIX: &str = "SEQSTATUS_";
const DB_EXTENSION: &str = "db";

/// Environment variables every run must provide.
const REQUIRED_ENV: [&str; 6] = [
    "SEQUENCES_PROCESSED",
    "LOG_CUR",
    "MGD_DBSERVER",
    "MGD_DBNAME",
    "MGD_DBUSER",
    "MGD_DBPASSWORDFILE",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub seqstatus: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const SEQSTATUS_LEVEL: &str = "info";

    fn ensure_valid(&mut self) {
        let str_original = self.seqstatus.clone();
        self.seqstatus = self.seqstatus.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.seqstatus.as_str()) {
            eprintln!(
                "Config error: seqstatus log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::SEQSTATUS_LEVEL
            );
            self.seqstatus = Self::SEQSTATUS_LEVEL.to_owned();
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            seqstatus: Self::SEQSTATUS_LEVEL.to_string(),
        }
    }
}

/// Tunables for the reactivation job itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobSettings {
    pub batch_size: usize,
    pub progress_interval: usize,
    pub division: String,
    pub deleted_status_key: i64,
    pub active_status_key: i64,
    /// Run every batch inside one transaction and roll back all of them on failure.
    pub atomic: bool,
}

impl JobSettings {
    fn ensure_valid(&mut self) {
        if self.batch_size == 0 {
            eprintln!(
                "Config error: batch_size of 0 is invalid - using default of '{}'",
                DEFAULT_BATCH_SIZE
            );
            self.batch_size = DEFAULT_BATCH_SIZE;
        }

        if self.progress_interval == 0 {
            eprintln!(
                "Config error: progress_interval of 0 is invalid - using default of '{}'",
                DEFAULT_PROGRESS_INTERVAL
            );
            self.progress_interval = DEFAULT_PROGRESS_INTERVAL;
        }

        let division = self.division.trim();
        if division.is_empty() {
            eprintln!(
                "Config error: division is empty - using default of '{}'",
                GSS_DIVISION
            );
            self.division = GSS_DIVISION.to_owned();
        } else {
            self.division = division.to_owned();
        }

        if self.deleted_status_key == self.active_status_key {
            eprintln!(
                "Config error: deleted and active status keys are both '{}' - using defaults",
                SequenceStatus::describe_term_key(self.deleted_status_key)
            );
            self.deleted_status_key = SequenceStatus::Deleted.term_key();
            self.active_status_key = SequenceStatus::Active.term_key();
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            division: GSS_DIVISION.to_owned(),
            deleted_status_key: SequenceStatus::Deleted.term_key(),
            active_status_key: SequenceStatus::Active.term_key(),
            atomic: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub job: JobSettings,
}

impl Settings {
    /// Loads settings from defaults, then the TOML file, then `SEQSTATUS_` environment overrides.
    ///
    /// An explicit `config_path` must exist. Without one, `config.toml` in the platform
    /// config directory is used when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self, SeqStatusError> {
        let config_path = match config_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Config file '{}' does not exist", path.display()),
                    )
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => Self::default_config_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = &config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut settings: Settings = figment.extract()?;
        settings.ensure_valid();

        Ok(settings)
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "jax", "seqstatus")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
            .filter(|path| path.is_file())
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.job.ensure_valid();
    }
}

/// The environment handed to the job by the load's wrapper script.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct JobEnv {
    /// File of sequence keys processed by the gene trap load
    pub sequences_processed: PathBuf,
    /// Curation log, appended to
    pub log_cur: PathBuf,
    pub mgd_dbserver: String,
    pub mgd_dbname: String,
    pub mgd_dbuser: String,
    pub mgd_dbpasswordfile: PathBuf,
}

impl JobEnv {
    /// Reads the required variables. Any missing variable is an error.
    pub fn from_env() -> Result<Self, SeqStatusError> {
        let job_env = Figment::from(Env::raw().only(&REQUIRED_ENV)).extract()?;
        Ok(job_env)
    }
}

/// Database login, with the password already read from its file.
#[derive(Clone, PartialEq)]
pub struct DbLogin {
    pub server: String,
    pub database: String,
    pub user: String,
    password: String,
}

impl DbLogin {
    pub fn new(server: &str, database: &str, user: &str, password: &str) -> Self {
        DbLogin {
            server: server.to_owned(),
            database: database.to_owned(),
            user: user.to_owned(),
            password: password.to_owned(),
        }
    }

    pub fn from_env(job_env: &JobEnv) -> Result<Self, SeqStatusError> {
        let password = Self::read_password(&job_env.mgd_dbpasswordfile)?;

        Ok(DbLogin::new(
            &job_env.mgd_dbserver,
            &job_env.mgd_dbname,
            &job_env.mgd_dbuser,
            &password,
        ))
    }

    /// First line of the password file, whitespace trimmed.
    fn read_password(path: &Path) -> Result<String, SeqStatusError> {
        let to_err = |source| SeqStatusError::PasswordFile {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = BufReader::new(File::open(path).map_err(to_err)?);
        let mut line = String::new();
        reader.read_line(&mut line).map_err(to_err)?;

        Ok(line.trim().to_owned())
    }

    /// The database file: `<server>/<database>`, with `.db` added when the name has no extension.
    pub fn database_path(&self) -> PathBuf {
        let mut path = Path::new(&self.server).join(&self.database);
        if path.extension().is_none() {
            path.set_extension(DB_EXTENSION);
        }
        path
    }
}

impl fmt::Debug for DbLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbLogin")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "********" },
            )
            .finish()
    }
}
