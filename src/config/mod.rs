mod file_config;

pub use file_config::FileConfig;

use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that participate in config resolution. Mirrors the
/// subset of flags a TOML file can override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub library_db: Option<PathBuf>,
    pub user_db: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub read_pool_size: usize,
    pub token_retention_days: u64,
    pub prune_interval_hours: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub library_db: PathBuf,
    pub user_db: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub read_pool_size: usize,
    pub token_retention_days: u64,
    pub prune_interval_hours: u64,
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

fn check_parent_exists(path: &PathBuf, what: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            bail!("Directory for {} does not exist: {:?}", what, parent);
        }
    }
    Ok(())
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let library_db = file
            .library_db
            .map(PathBuf::from)
            .or_else(|| cli.library_db.clone())
            .ok_or_else(|| anyhow!("library_db must be specified via CLI or in the config file"))?;
        check_parent_exists(&library_db, "library_db")?;

        let user_db = file
            .user_db
            .map(PathBuf::from)
            .or_else(|| cli.user_db.clone())
            .ok_or_else(|| anyhow!("user_db must be specified via CLI or in the config file"))?;
        check_parent_exists(&user_db, "user_db")?;

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size).max(1);
        let token_retention_days = file
            .token_retention_days
            .unwrap_or(cli.token_retention_days);
        let prune_interval_hours = file
            .prune_interval_hours
            .unwrap_or(cli.prune_interval_hours)
            .max(1);

        Ok(AppConfig {
            library_db,
            user_db,
            port,
            logging_level,
            frontend_dir_path,
            read_pool_size,
            token_retention_days,
            prune_interval_hours,
        })
    }
}
