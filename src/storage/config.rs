//! JSON Configuration Management
//!
//! Reads and writes the configuration file. The effective configuration is
//! the file contents overlaid with `AGENTIC_RAG_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load `~/.agentic-rag/config.json`, creating it with defaults if missing
    pub fn new() -> AppResult<Self> {
        Self::from_path(config_path()?)
    }

    /// Load from an explicit path, creating it with defaults if missing
    pub fn from_path(path: impl Into<PathBuf>) -> AppResult<Self> {
        Self::from_path_with_env(path, std::env::vars())
    }

    /// Like [`ConfigService::from_path`] with an explicit override source.
    pub fn from_path_with_env<I>(path: impl Into<PathBuf>, vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_path = path.into();
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            let default_config = AppConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            tracing::info!(path = %config_path.display(), "wrote default configuration");
            default_config
        };

        config.apply_env_overrides(vars).map_err(AppError::config)?;
        config.validate().map_err(AppError::config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            AppError::config(format!("{} is not a valid configuration: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = AppConfig::default();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_missing_file_written_with_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let service = ConfigService::from_path_with_env(&path, no_env()).unwrap();

        assert!(path.exists());
        assert_eq!(service.get_config().rag.chunk_size, 600);
        let on_disk = ConfigService::load_from_file(&path).unwrap();
        assert_eq!(on_disk.rag.chunk_overlap, 120);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"rag": {"chunk_size": 256, "chunk_overlap": 32}}"#)
            .unwrap();

        let service = ConfigService::from_path_with_env(file.path(), no_env()).unwrap();
        assert_eq!(service.get_config().rag.chunk_size, 256);
        assert_eq!(service.get_config().rag.overfetch_factor, 3);
    }

    #[test]
    fn test_env_overrides_applied_after_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"rag": {"chunk_size": 256, "chunk_overlap": 32}}"#)
            .unwrap();

        let vars = vec![("AGENTIC_RAG_CHUNK_SIZE".to_string(), "128".to_string())];
        let service = ConfigService::from_path_with_env(file.path(), vars).unwrap();
        assert_eq!(service.get_config().rag.chunk_size, 128);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = ConfigService::from_path_with_env(file.path(), no_env()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"rag": {"chunk_size": 100, "chunk_overlap": 100}}"#)
            .unwrap();
        let err = ConfigService::from_path_with_env(file.path(), no_env()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let vars = vec![("AGENTIC_RAG_CHUNK_SIZE".to_string(), "300".to_string())];
        let mut service = ConfigService::from_path_with_env(&path, vars).unwrap();
        assert_eq!(service.get_config().rag.chunk_size, 300);

        service.reset().unwrap();
        assert_eq!(service.get_config().rag.chunk_size, 600);
    }
}
