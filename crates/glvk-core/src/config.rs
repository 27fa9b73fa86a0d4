use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Top-level glvk configuration, loaded from glvk.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlvkConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// What to do when a shader resource has no layout binding
    #[serde(default)]
    pub missing_bindings: MissingBindingPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Log every replayed record at TRACE level
    #[serde(default)]
    pub trace_records: bool,
    /// Unbind program / vertex array / framebuffer after each submission
    #[serde(default = "default_true")]
    pub restore_defaults: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Geometry buffers kept in the cache; further ones are transient
    #[serde(default = "default_max_geometry_entries")]
    pub max_geometry_entries: usize,
}

/// Policy for shader resources the pipeline layout does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingBindingPolicy {
    /// Report through diagnostics and keep the compiler's binding (default)
    #[default]
    Report,
    /// Report and fail pipeline creation
    Error,
    /// Say nothing
    Ignore,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            missing_bindings: MissingBindingPolicy::default(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            trace_records: false,
            restore_defaults: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_geometry_entries: default_max_geometry_entries(),
        }
    }
}

impl GlvkConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::ConfigError(e.to_string()))
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn to_toml(&self) -> Result<String, CoreError> {
        toml::to_string_pretty(self).map_err(|e| CoreError::ConfigError(e.to_string()))
    }
}

/// Returns the default config file path.
/// Search order:
/// 1. `GLVK_CONFIG` environment variable
/// 2. System-wide config: `/etc/glvk/glvk.toml` (not on Windows)
/// 3. Local fallback: `./glvk.toml`
pub fn default_config_path() -> String {
    if let Ok(path) = std::env::var("GLVK_CONFIG") {
        return path;
    }
    #[cfg(not(windows))]
    {
        let system_path = "/etc/glvk/glvk.toml";
        if std::path::Path::new(system_path).exists() {
            return system_path.to_string();
        }
    }
    "glvk.toml".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_geometry_entries() -> usize {
    1024
}
