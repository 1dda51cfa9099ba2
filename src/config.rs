//! Runtime configuration.
//!
//! Resolved once at process startup from `KIDNEY_MATCH_*` environment
//! variables and passed down explicitly; nothing below `main` reads the
//! environment for these settings.

use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::BlankLocusPolicy;
use crate::KidneyMatchError;

pub const DB_PATH_ENV: &str = "KIDNEY_MATCH_DB_PATH";
pub const LOG_MODE_ENV: &str = "KIDNEY_MATCH_LOG_MODE";
pub const LOG_FILE_ENV: &str = "KIDNEY_MATCH_LOG_FILE";
pub const BLANK_HLA_ENV: &str = "KIDNEY_MATCH_BLANK_HLA";
pub const EXPORT_DIR_ENV: &str = "KIDNEY_MATCH_EXPORT_DIR";

const DEFAULT_DB_PATH: &str = "kidney_matching.db";
const DEFAULT_LOG_FILE: &str = "kidney_match.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise
    #[default]
    Auto,
    File,
    Stdout,
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stdout" => Ok(Self::Stdout),
            other => Err(format!(
                "unknown log mode {other:?} (expected auto, file or stdout)"
            )),
        }
    }
}

impl LogMode {
    /// Whether to log to a file given the terminal state.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub blank_locus_policy: BlankLocusPolicy,
    pub export_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_mode: LogMode::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            blank_locus_policy: BlankLocusPolicy::default(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`KidneyMatchError::Config`] for unrecognised enumerated values.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Returns [`KidneyMatchError::Config`] for unrecognised enumerated values.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let log_mode = match get(LOG_MODE_ENV) {
            Some(v) => v
                .parse()
                .map_err(|e| KidneyMatchError::Config(format!("{LOG_MODE_ENV}: {e}")))?,
            None => defaults.log_mode,
        };

        let blank_locus_policy = match get(BLANK_HLA_ENV) {
            Some(v) => v
                .parse()
                .map_err(|e| KidneyMatchError::Config(format!("{BLANK_HLA_ENV}: {e}")))?,
            None => defaults.blank_locus_policy,
        };

        Ok(Self {
            db_path: get(DB_PATH_ENV).map_or(defaults.db_path, PathBuf::from),
            log_mode,
            log_file: get(LOG_FILE_ENV).map_or(defaults.log_file, PathBuf::from),
            blank_locus_policy,
            export_dir: get(EXPORT_DIR_ENV).map_or(defaults.export_dir, PathBuf::from),
        })
    }
}
