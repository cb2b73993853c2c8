//! Process-level engine configuration (TOML), distinct from the per-rule
//! XML-shaped configuration document handled by `rules_config`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: RulesConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist or fails to parse,
    /// return defaults with env overrides applied.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RULES_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("RULES_FILE") {
            self.rules.document_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RULES_TICK_MS") {
            if let Ok(n) = v.parse() {
                self.scheduler.tick_interval_ms = n;
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Path to the XML-shaped rule document imported at startup.
    pub document_path: PathBuf,
    /// Whether to persist exported config back to `document_path` on exit.
    /// Runtime state (last_fired timestamps, counters) is never persisted,
    /// only the rule definitions themselves.
    pub export_on_shutdown: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from("rules.xml"),
            export_on_shutdown: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Granularity at which the periodic-task driver checks for due timers.
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
