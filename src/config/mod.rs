//! Configuration management module.
//!
//! This module handles loading and saving the replay driver's configuration:
//! whether states embed their own session token, the log level and how guard
//! confirmation prompts are answered.

mod error;

pub use error::ConfigError;

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

const FILE_NAME: &str = "config.yml";
const DEFAULT_DIRECTORY_PATH: &str = ".config/hash-history";

/// Oversees management of configuration file.
///
#[derive(Clone, Debug)]
pub struct Config {
    pub fcl_enabled: bool,
    pub log_level: String,
    pub confirm_guard_crossing: bool,
    file_path: Option<PathBuf>,
}

/// Define specification for configuration file.
///
#[derive(Serialize, Deserialize)]
struct FileSpec {
    #[serde(default)]
    pub fcl_enabled: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_confirm_guard_crossing")]
    pub confirm_guard_crossing: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_confirm_guard_crossing() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// Return a new instance holding the default values.
    ///
    pub fn new() -> Config {
        Config {
            fcl_enabled: false,
            log_level: default_log_level(),
            confirm_guard_crossing: default_confirm_guard_crossing(),
            file_path: None,
        }
    }

    /// Path of the configuration file once `load` has run.
    ///
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Try to load an existing configuration from the disk using the custom
    /// directory if provided. A missing file leaves the defaults in place.
    ///
    pub fn load(&mut self, custom_path: Option<&str>) -> Result<(), AppError> {
        // Use default path unless custom path provided
        let dir_path = match custom_path {
            Some(path) => Path::new(&path).to_path_buf(),
            None => Config::default_path()?,
        };

        self.file_path = Some(dir_path.join(Path::new(FILE_NAME)));
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;

        if file_path.exists() {
            let contents = fs::read_to_string(file_path).map_err(|e| ConfigError::LoadFailed {
                path: file_path.clone(),
                message: format!("IO error: {}", e),
            })?;
            let data: FileSpec = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::DeserializationFailed(e.to_string()))?;
            self.fcl_enabled = data.fcl_enabled;
            self.log_level = data.log_level;
            self.confirm_guard_crossing = data.confirm_guard_crossing;
        }

        Ok(())
    }

    /// Serialize the configuration and write it to the disk, creating the
    /// directory if needed.
    ///
    pub fn save(&self) -> Result<(), AppError> {
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;
        let data = FileSpec {
            fcl_enabled: self.fcl_enabled,
            log_level: self.log_level.clone(),
            confirm_guard_crossing: self.confirm_guard_crossing,
        };
        let content = serde_yaml::to_string(&data)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = file_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut file = fs::File::create(file_path).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        write!(file, "{}", content).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        file.flush().map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        Ok(())
    }

    /// Returns the path buffer for the default path to the configuration file
    /// or an error if the home directory could not be found.
    ///
    fn default_path() -> Result<PathBuf, AppError> {
        match dirs::home_dir() {
            Some(home) => {
                let home_path = Path::new(&home);
                let default_config_path = Path::new(DEFAULT_DIRECTORY_PATH);
                Ok(home_path.join(default_config_path))
            }
            None => Err(ConfigError::HomeDirectoryNotFound.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hash-history-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_load_missing_file_keeps_defaults() {
        let dir = scratch_dir("missing");
        let mut config = Config::new();
        config.load(dir.to_str()).unwrap();
        assert!(!config.fcl_enabled);
        assert_eq!(config.log_level, "info");
        assert!(config.confirm_guard_crossing);
        assert_eq!(config.file_path(), Some(dir.join(FILE_NAME).as_path()));
    }

    #[test]
    fn test_save_then_load() {
        let dir = scratch_dir("roundtrip");
        let mut config = Config::new();
        config.load(dir.to_str()).unwrap();
        config.fcl_enabled = true;
        config.log_level = "debug".to_string();
        config.confirm_guard_crossing = false;
        config.save().unwrap();

        let mut loaded = Config::new();
        loaded.load(dir.to_str()).unwrap();
        assert!(loaded.fcl_enabled);
        assert_eq!(loaded.log_level, "debug");
        assert!(!loaded.confirm_guard_crossing);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_partial_file_uses_field_defaults() {
        let dir = scratch_dir("partial");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(FILE_NAME), "fcl_enabled: true\n").unwrap();

        let mut config = Config::new();
        config.load(dir.to_str()).unwrap();
        assert!(config.fcl_enabled);
        assert_eq!(config.log_level, "info");
        assert!(config.confirm_guard_crossing);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let dir = scratch_dir("invalid");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(FILE_NAME), "fcl_enabled: [nope\n").unwrap();

        let mut config = Config::new();
        let error = config.load(dir.to_str()).unwrap_err();
        assert!(matches!(
            error,
            AppError::Config(ConfigError::DeserializationFailed(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_without_path_fails() {
        let config = Config::new();
        assert!(matches!(
            config.save(),
            Err(AppError::Config(ConfigError::FilePathNotSet))
        ));
    }
}
