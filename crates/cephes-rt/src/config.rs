use std::path::{Path, PathBuf};

use cephes_memory::MemoryLayout;
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

pub const DEFAULT_ARTIFACT: &str = "cephes.wasm";
pub const DEFAULT_EXPORT_PREFIX: &str = "_cephes_";

/// Runtime configuration, usually loaded from a small TOML file:
///
/// ```toml
/// artifact = "lib/cephes.wasm"
///
/// [memory]
/// total_memory = 4194304
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Location of the compiled library.
    pub artifact: PathBuf,

    /// Exports starting with this prefix are the library's entry points.
    pub export_prefix: String,

    /// Linear memory partitioning.
    pub memory: MemoryLayout,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from(DEFAULT_ARTIFACT),
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            memory: MemoryLayout::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, RuntimeError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.memory.validate()?;
        Ok(config)
    }

    /// Loads a config file. A relative `artifact` path is resolved against
    /// the directory containing the file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_toml_str(&content)?;
        if config.artifact.is_relative() {
            if let Some(dir) = path.parent() {
                config.artifact = dir.join(&config.artifact);
            }
        }
        log::debug!("loaded runtime config from {}", path.display());
        Ok(config)
    }
}
