use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Mode, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Host-side show configuration.
///
/// Graph shape is assembled in code; this only carries the knobs a host wants to change without
/// recompiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShowConfig {
    /// Default canvas width for nodes with no upstream input.
    pub width: u32,
    pub height: u32,
    /// Seed for every random selection in the graph. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub initial_mode: Mode,
    /// `tracing-subscriber` filter directive, e.g. `"info,vj_nodes=debug"`.
    pub log_filter: String,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: None,
            initial_mode: Mode::Gentle,
            log_filter: "info".to_string(),
        }
    }
}

impl ShowConfig {
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: ShowConfig = serde_json::from_slice(&bytes).map_err(|source| EngineError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate(path)?;
        Ok(cfg)
    }

    fn validate(&self, path: &Path) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidConfig {
                path: PathBuf::from(path),
                msg: format!("canvas size must be non-zero, got {}x{}", self.width, self.height),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: ShowConfig = serde_json::from_str(r#"{ "seed": 42 }"#).unwrap();
        assert_eq!(cfg.seed, Some(42));
        assert_eq!((cfg.width, cfg.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert_eq!(cfg.initial_mode, Mode::Gentle);
    }

    #[test]
    fn modes_deserialize_from_snake_case() {
        let cfg: ShowConfig = serde_json::from_str(r#"{ "initial_mode": "rave" }"#).unwrap();
        assert_eq!(cfg.initial_mode, Mode::Rave);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ShowConfig::from_json_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
