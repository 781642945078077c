use std::path::PathBuf;

use anyhow::Context;
use octavia_core::{EventTiming, NoteLength};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogConfig {
    /// EnvFilter directive added on top of RUST_LOG
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: default_filter() }
    }
}

fn default_filter() -> String {
    "octavia=info".to_string()
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_ppq")]
    pub ppq: u32,
    /// Musical length of one pattern step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<NoteLength>,
    #[serde(default = "default_velocity_scale")]
    pub velocity_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ppq: default_ppq(),
            step: None,
            velocity_scale: default_velocity_scale(),
        }
    }
}

impl RenderConfig {
    pub fn timing(&self) -> EventTiming {
        let defaults = EventTiming::default();
        EventTiming {
            ppq: self.ppq.max(1),
            step: self.step.unwrap_or(defaults.step),
        }
    }
}

fn default_ppq() -> u32 {
    480
}

fn default_velocity_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("octavia")
        .join("config.toml")
}

/// Missing or unreadable config falls back to defaults
pub fn load_config() -> CliConfig {
    std::fs::read_to_string(config_path())
        .ok()
        .and_then(|s| toml::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_config(config: &CliConfig) -> anyhow::Result<PathBuf> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let s = toml::to_string_pretty(config).context("serializing config")?;
    std::fs::write(&path, s).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
