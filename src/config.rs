use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::db::Database;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime settings, read from `SPRINT_PLANNER_*` variables and then
/// overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = lookup("SPRINT_PLANNER_DB") {
            config.db_path = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("SPRINT_PLANNER_HOST") {
            config.host = val;
        }
        if let Some(val) = lookup("SPRINT_PLANNER_PORT") {
            config.port = val
                .parse()
                .with_context(|| format!("SPRINT_PLANNER_PORT is not a valid port: {val}"))?;
        }

        Ok(config)
    }

    pub fn with_overrides(
        mut self,
        db_path: Option<PathBuf>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Self {
        if let Some(path) = db_path {
            self.db_path = Some(path);
        }
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Open the configured database and bring its schema up to date.
    pub fn open_database(&self) -> Result<Database> {
        let db = match &self.db_path {
            Some(path) => Database::open(path.clone()),
            None => Database::open_default(),
        }
        .context("Failed to open database")?;
        db.migrate()?;
        Ok(db)
    }
}
