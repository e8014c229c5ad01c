//! Typed error hierarchy for the outreach tracker.
//!
//! The progress core (`phase`, `progress::*`) has no fallible operations.
//! Errors only come from the collaborators around it:
//! - `ConfigError`: reading, parsing and writing `outreach.toml`
//! - `EnrollmentError`: submitting a lead batch to the campaign workflow

use thiserror::Error;

/// Errors from the configuration layer.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse outreach.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize outreach.toml: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid color '{value}': expected #RRGGBB")]
    InvalidColor { value: String },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Errors from submitting a batch of leads to a campaign.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Invalid enrollment request: {0}")]
    InvalidRequest(String),

    #[error("Enrollment webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Enrollment webhook responded with {status}: {body}")]
    Rejected { status: u16, body: String },
}
