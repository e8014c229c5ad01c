//! Configuration for the outreach tracker.
//!
//! Settings are read from `.outreach/outreach.toml` in the project directory
//! and layered as file → environment → CLI. Every field has a default, so a
//! missing file or a partial file is always valid.
//!
//! # Configuration File Format
//!
//! ```toml
//! [progress]
//! seconds_per_item = 40.0
//! tick_interval_ms = 16
//!
//! [enrollment]
//! webhook_url = "https://workflows.example.com/webhook/enroll"
//!
//! [logging]
//! level = "warn"
//! format = "text"
//!
//! [[phases]]
//! name = "Qualifying"
//! color = "#3B82F6"
//!
//! [[phases]]
//! name = "Enrichment"
//! color = "#A78BFA"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::logging::LogFormat;
use crate::phase::{Phase, PhaseTable, default_phases};
use crate::progress::LoopSettings;

/// Environment variable overriding `progress.seconds_per_item`.
pub const ENV_SECONDS_PER_ITEM: &str = "OUTREACH_SECONDS_PER_ITEM";
/// Environment variable overriding `progress.tick_interval_ms`.
pub const ENV_TICK_INTERVAL_MS: &str = "OUTREACH_TICK_INTERVAL_MS";
/// Environment variable overriding `enrollment.webhook_url`.
pub const ENV_WEBHOOK_URL: &str = "OUTREACH_WEBHOOK_URL";

const MAX_TICK_INTERVAL_MS: u64 = 1000;

/// Progress estimate tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSection {
    /// Synthetic processing time per enrolled lead, in seconds
    #[serde(default = "default_seconds_per_item")]
    pub seconds_per_item: f64,
    /// Recomputation cadence of each progress loop, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_seconds_per_item() -> f64 {
    40.0
}

fn default_tick_interval_ms() -> u64 {
    16
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            seconds_per_item: default_seconds_per_item(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Enrollment workflow settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentSection {
    /// Webhook that accepts lead batches for a campaign
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// Logging settings. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// The complete outreach.toml configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachToml {
    #[serde(default)]
    pub progress: ProgressSection,
    #[serde(default)]
    pub enrollment: EnrollmentSection,
    #[serde(default)]
    pub logging: LoggingSection,
    /// Ordered phase catalog; empty falls back to the default catalog
    #[serde(default = "default_phases")]
    pub phases: Vec<Phase>,
}

impl Default for OutreachToml {
    fn default() -> Self {
        Self {
            progress: ProgressSection::default(),
            enrollment: EnrollmentSection::default(),
            logging: LoggingSection::default(),
            phases: default_phases(),
        }
    }
}

impl OutreachToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `outreach.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("outreach.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn phase_table(&self) -> PhaseTable {
        PhaseTable::from_phases(self.phases.clone())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let secs = self.progress.seconds_per_item;
        if secs.is_nan() || secs <= 0.0 {
            warnings.push(format!(
                "seconds_per_item = {} is not positive: every session completes immediately",
                secs
            ));
        }

        if !is_valid_tick_interval(self.progress.tick_interval_ms) {
            warnings.push(format!(
                "tick_interval_ms = {} is outside 1..={}",
                self.progress.tick_interval_ms, MAX_TICK_INTERVAL_MS
            ));
        }

        if self.phases.is_empty() {
            warnings.push("No phases configured; using the default catalog".to_string());
        }

        let mut seen = HashSet::new();
        for (index, phase) in self.phases.iter().enumerate() {
            if phase.name.trim().is_empty() {
                warnings.push(format!("Phase {} has an empty name", index + 1));
            } else if !seen.insert(phase.name.to_lowercase()) {
                warnings.push(format!("Duplicate phase name '{}'", phase.name));
            }
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            warnings.push(format!(
                "Invalid logging level '{}': expected trace, debug, info, warn or error",
                self.logging.level
            ));
        }

        if let Some(url) = &self.enrollment.webhook_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!("webhook_url '{}' is not an http(s) URL", url));
        }

        warnings
    }
}

fn is_valid_tick_interval(ms: u64) -> bool {
    (1..=MAX_TICK_INTERVAL_MS).contains(&ms)
}

/// Resolved configuration: outreach.toml with environment and CLI overrides
/// applied.
#[derive(Debug, Clone)]
pub struct OutreachConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .outreach directory
    pub config_dir: PathBuf,
    /// Parsed outreach.toml
    pub toml: OutreachToml,
    seconds_per_item: f64,
    tick_interval_ms: u64,
    webhook_url: Option<String>,
}

impl OutreachConfig {
    /// Load configuration for a project directory and apply environment overrides.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = get_config_dir(&project_dir);
        let toml = OutreachToml::load_or_default(&config_dir)?;
        Self::from_toml(project_dir, config_dir, toml)
    }

    fn from_toml(project_dir: PathBuf, config_dir: PathBuf, toml: OutreachToml) -> Result<Self> {
        let seconds_per_item = env_override(ENV_SECONDS_PER_ITEM)?
            .unwrap_or(toml.progress.seconds_per_item);
        let tick_interval_ms =
            env_override(ENV_TICK_INTERVAL_MS)?.unwrap_or(toml.progress.tick_interval_ms);
        let webhook_url = std::env::var(ENV_WEBHOOK_URL)
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| toml.enrollment.webhook_url.clone());

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            seconds_per_item,
            tick_interval_ms,
            webhook_url,
        })
    }

    /// Apply CLI overrides on top of file and environment values.
    pub fn with_cli_overrides(
        mut self,
        seconds_per_item: Option<f64>,
        webhook_url: Option<String>,
    ) -> Self {
        if let Some(secs) = seconds_per_item {
            self.seconds_per_item = secs;
        }
        if webhook_url.is_some() {
            self.webhook_url = webhook_url;
        }
        self
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("outreach.toml")
    }

    /// Seconds per item (CLI → env → file → default).
    pub fn seconds_per_item(&self) -> f64 {
        self.seconds_per_item
    }

    /// Tick interval (env → file → default), clamped to 1..=1000 ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.clamp(1, MAX_TICK_INTERVAL_MS))
    }

    /// Webhook URL (CLI → env → file).
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    pub fn phase_table(&self) -> PhaseTable {
        self.toml.phase_table()
    }

    /// Settings for every progress loop mounted in this process.
    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            tick_interval: self.tick_interval(),
            seconds_per_item: self.seconds_per_item,
            phases: Arc::new(self.phase_table()),
        }
    }
}

/// The `.outreach` directory of a project.
pub fn get_config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(".outreach")
}

fn env_override<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        _ => Ok(None),
    }
}
