//! Path Utilities
//!
//! Resolves the per-user application directory (~/.agentic-rag/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the application directory (~/.agentic-rag/)
pub fn app_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".agentic-rag"))
}

/// Get the config file path (~/.agentic-rag/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lives_under_app_dir() {
        if let (Ok(dir), Ok(path)) = (app_dir(), config_path()) {
            assert!(path.starts_with(&dir));
            assert_eq!(path.file_name().unwrap(), "config.json");
        }
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
