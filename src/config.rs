//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "cantus.db";

/// Environment variable overriding the data folder location
pub const DATA_DIR_ENV: &str = "CANTUS_DATA_DIR";

/// Data folder resolution priority order:
/// 1. Explicit override from the embedding application (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_dir` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: explicit override
    if let Some(path) = override_dir {
        return Ok(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(data_dir));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_dir())
}

/// Resolved path of the database file inside the data folder
///
/// Pure path computation; `open_database` creates missing directories.
pub fn database_path(override_dir: Option<&Path>) -> Result<PathBuf> {
    Ok(resolve_data_dir(override_dir)?.join(DATABASE_FILE))
}

/// Get default configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/cantus/config.toml first, then /etc/cantus/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("cantus").join("config.toml"));
        let system_config = PathBuf::from("/etc/cantus/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::config_dir()
            .map(|d| d.join("cantus").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {:?}",
            config_path
        )))
    }
}

/// Get OS-dependent default data folder path
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/cantus
        dirs::data_local_dir()
            .map(|d| d.join("cantus"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/cantus"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/cantus
        dirs::data_dir()
            .map(|d| d.join("cantus"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/cantus"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\cantus
        dirs::data_local_dir()
            .map(|d| d.join("cantus"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\cantus"))
    } else {
        PathBuf::from("./cantus_data")
    }
}
