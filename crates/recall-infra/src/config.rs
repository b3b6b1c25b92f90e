//! Configuration loader for Recall.
//!
//! Reads `config.toml` from the data directory (`./recall_data/` unless
//! `RECALL_DATA_DIR` says otherwise) and deserializes it into
//! [`MemoryConfig`]. A missing or malformed default file falls back to
//! defaults; an explicitly requested file must exist and parse.

use std::path::{Path, PathBuf};

use recall_types::config::MemoryConfig;
use recall_types::error::{ConfigError, InitError};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DATA_DIR_ENV: &str = "RECALL_DATA_DIR";
pub const USER_ID_ENV: &str = "RECALL_USER_ID";

/// Data directory from `RECALL_DATA_DIR`, falling back to the config default.
pub fn default_data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| MemoryConfig::default().data_directory)
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`MemoryConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> MemoryConfig {
    let config_path = data_dir.join(CONFIG_FILE_NAME);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return MemoryConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return MemoryConfig::default();
        }
    };

    match toml::from_str::<MemoryConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            MemoryConfig::default()
        }
    }
}

/// Load configuration from an explicitly named file. Errors are returned.
pub async fn load_config_file(path: &Path) -> Result<MemoryConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
}

/// Apply overrides on top of file values. `None` leaves a field untouched.
pub fn apply_overrides(
    mut config: MemoryConfig,
    data_dir: Option<PathBuf>,
    user_id: Option<String>,
) -> MemoryConfig {
    if let Some(dir) = data_dir {
        config.data_directory = dir;
    }
    if let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) {
        config.user_id = user_id;
    }
    config
}

/// Apply `RECALL_DATA_DIR` / `RECALL_USER_ID` from the environment.
pub fn apply_env_overrides(config: MemoryConfig) -> MemoryConfig {
    apply_overrides(
        config,
        std::env::var(DATA_DIR_ENV).ok().map(PathBuf::from),
        std::env::var(USER_ID_ENV).ok(),
    )
}

/// Resolve the effective configuration.
///
/// Reads `explicit` if given, otherwise `{data_dir}/config.toml`, then
/// applies environment overrides and validates the result.
pub async fn resolve_config(explicit: Option<&Path>) -> Result<MemoryConfig, InitError> {
    let config = match explicit {
        Some(path) => load_config_file(path).await?,
        None => load_config(&default_data_dir()).await,
    };
    let config = apply_env_overrides(config);
    config.validate()?;
    Ok(config)
}

/// Create the data directory (and parents) if it does not exist.
pub async fn ensure_data_dir(path: &Path) -> Result<(), InitError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| InitError::DataDir {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
