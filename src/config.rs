use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "NADA_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    /// `tracing` filter directive, e.g. `nada_schedule=debug`.
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_database() -> String {
    "nada.db".to_string()
}

fn default_export_dir() -> String {
    "exports".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            export_dir: default_export_dir(),
            log_filter: None,
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, `$NADA_CONFIG`, or defaults.
    ///
    /// An explicit path must exist; the environment path may be missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match std::env::var_os(CONFIG_ENV).map(PathBuf::from) {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write settings file {}", path.display()))
    }

    pub fn export_dir(&self) -> PathBuf {
        PathBuf::from(&self.export_dir)
    }
}
