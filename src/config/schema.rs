use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings of the wrapper itself. None of these are seen by the wrapped
/// plugin, which receives the environment untouched.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Suffix appended to the wrapper's own file name to locate the plugin.
    #[serde(default = "default_plugin_suffix")]
    pub plugin_suffix: String,
    /// Explicit plugin location, bypassing sibling discovery.
    #[serde(default)]
    pub plugin_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Write diagnostics to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_plugin_suffix() -> String {
    "-impl".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_suffix: default_plugin_suffix(),
            plugin_path: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            log_file: None,
        }
    }
}
