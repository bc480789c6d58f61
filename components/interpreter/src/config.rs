//! Runtime configuration

use std::path::{Path, PathBuf};

use memory_manager::HeapConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables of a [`Runtime`](crate::Runtime)
///
/// Every field has a default, so a config file only lists what it changes.
///
/// # Examples
///
/// ```
/// use interpreter::RuntimeConfig;
///
/// let config = RuntimeConfig::default()
///     .with_gc_threshold(128)
///     .with_jit_enabled(false);
/// assert_eq!(config.gc_threshold, 128);
///
/// let parsed = RuntimeConfig::from_json_str(r#"{ "max_call_depth": 64 }"#).unwrap();
/// assert_eq!(parsed.max_call_depth, 64);
/// assert_eq!(parsed.gc_threshold, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Allocations between automatic collections
    pub gc_threshold: usize,
    /// Hard limit on live heap objects; `None` is unlimited
    pub max_objects: Option<usize>,
    /// Collect at top-level evaluation boundaries when the threshold is met
    pub collect_between_evaluations: bool,
    /// Nested call limit before OutOfMemory is raised
    pub max_call_depth: usize,
    /// Whether hot functions are handed to the native backend
    pub jit_enabled: bool,
    /// Calls before a function is compiled
    pub jit_threshold: u64,
    /// Directories searched for native module libraries
    pub module_paths: Vec<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gc_threshold: 4096,
            max_objects: None,
            collect_between_evaluations: true,
            max_call_depth: 10_000,
            jit_enabled: true,
            jit_threshold: 100,
            module_paths: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Set the collection threshold
    pub fn with_gc_threshold(mut self, threshold: usize) -> Self {
        self.gc_threshold = threshold;
        self
    }

    /// Set the heap object limit
    pub fn with_max_objects(mut self, limit: Option<usize>) -> Self {
        self.max_objects = limit;
        self
    }

    /// Enable or disable collection between top-level evaluations
    pub fn with_collect_between_evaluations(mut self, enabled: bool) -> Self {
        self.collect_between_evaluations = enabled;
        self
    }

    /// Set the call depth limit
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Enable or disable native compilation
    pub fn with_jit_enabled(mut self, enabled: bool) -> Self {
        self.jit_enabled = enabled;
        self
    }

    /// Set the compilation threshold
    pub fn with_jit_threshold(mut self, calls: u64) -> Self {
        self.jit_threshold = calls;
        self
    }

    /// Append a module search directory
    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_paths.push(path.into());
        self
    }

    /// The heap part of the configuration
    pub fn heap_config(&self) -> HeapConfig {
        HeapConfig {
            gc_threshold: self.gc_threshold,
            max_objects: self.max_objects,
        }
    }
}
