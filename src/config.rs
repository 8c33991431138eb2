//! Runtime configuration resolved from environment variables, falling back to
//! a data directory under the user's home.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".movie-list-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "movies.sqlite";
/// How long the list subscription survives without consumers.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(5_000);

pub const DB_PATH_VAR: &str = "MOVIE_LIST_DB_PATH";
pub const IDLE_TIMEOUT_VAR: &str = "MOVIE_LIST_IDLE_TIMEOUT_MS";
pub const THEME_VAR: &str = "MOVIE_LIST_THEME";

/// Color scheme the TUI starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }
}

impl FromStr for ThemeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(ThemeMode::Dark),
            "light" => Ok(ThemeMode::Light),
            other => Err(anyhow!("unknown theme {other:?}, expected dark or light")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub idle_timeout: Duration,
    pub theme: ThemeMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which returns the raw value of
    /// an environment variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = match lookup(DB_PATH_VAR).filter(|value| !value.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let idle_timeout = match lookup(IDLE_TIMEOUT_VAR) {
            Some(raw) => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{IDLE_TIMEOUT_VAR} must be milliseconds, got {raw:?}"))?;
                Duration::from_millis(millis)
            }
            None => DEFAULT_IDLE_TIMEOUT,
        };

        let theme = match lookup(THEME_VAR) {
            Some(raw) => raw.parse::<ThemeMode>().with_context(|| format!("invalid {THEME_VAR}"))?,
            None => ThemeMode::default(),
        };

        Ok(Self {
            db_path,
            idle_timeout,
            theme,
        })
    }

    /// Log file kept next to the database; the terminal itself is taken over
    /// by the TUI.
    pub fn log_path(&self) -> PathBuf {
        self.db_path.with_extension("log")
    }
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}
