//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the matcher service.
//! Request handling never reads process-wide environment variables.

use crate::constants::DEFAULT_DATA_DIR;
use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The data directory does not need to exist yet; the file store creates it on open.
    /// An existing path that is not a directory is rejected.
    pub fn new(data_dir: PathBuf) -> CoreResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "data directory cannot be empty".into(),
            ));
        }

        if data_dir.exists() && !data_dir.is_dir() {
            return Err(CoreError::InvalidInput(format!(
                "data directory path is not a directory: {}",
                data_dir.display()
            )));
        }

        Ok(Self { data_dir })
    }

    /// Directory holding one JSON file per storage key.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Resolve the data directory from an optional value (typically `CTM_DATA_DIR`).
///
/// `None` or a blank value falls back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_dir_defaults_when_unset_or_blank() {
        assert_eq!(data_dir_from_env_value(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            data_dir_from_env_value(Some("   ".into())),
            PathBuf::from(DEFAULT_DATA_DIR)
        );
    }

    #[test]
    fn test_data_dir_uses_trimmed_value() {
        assert_eq!(
            data_dir_from_env_value(Some(" /var/lib/ctm ".into())),
            PathBuf::from("/var/lib/ctm")
        );
    }

    #[test]
    fn test_new_accepts_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(temp_dir.path().join("not-yet-created"))
            .expect("missing directory should be accepted");
        assert!(cfg.data_dir().ends_with("not-yet-created"));
    }

    #[test]
    fn test_new_rejects_file_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("data.txt");
        std::fs::write(&file, "x").expect("should write file");

        let err = CoreConfig::new(file).expect_err("file path should be rejected");
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
