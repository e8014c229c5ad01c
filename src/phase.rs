//! Phase catalog for the campaign progress visualization.
//!
//! This module provides:
//! - `Color`: a 24-bit display color parsed from `#RRGGBB`
//! - `Phase`: one named stage of the synthetic progress estimate
//! - `PhaseTable`: the ordered, non-empty catalog of phases
//!
//! Phases carry no state. A phase is identified by its position in the table.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// A 24-bit RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Nearest entry of the xterm 256-color cube, for terminals without truecolor.
    pub fn to_ansi256(self) -> u8 {
        fn level(v: u8) -> u8 {
            match v {
                0..48 => 0,
                48..115 => 1,
                _ => (v - 35) / 40,
            }
        }
        16 + 36 * level(self.r) + 6 * level(self.g) + level(self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor {
            value: s.to_string(),
        };
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// One named stage of the progress visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Display name (e.g. "Qualifying")
    pub name: String,
    /// Color used when the phase has been reached
    pub color: Color,
}

impl Phase {
    pub fn new(name: &str, color: Color) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }
}

/// The ordered phase catalog. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhaseTable {
    phases: Vec<Phase>,
}

impl PhaseTable {
    /// Build a table from configured phases, falling back to the default
    /// catalog when none are configured.
    pub fn from_phases(phases: Vec<Phase>) -> Self {
        if phases.is_empty() {
            Self::default()
        } else {
            Self { phases }
        }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase at `index`, clamped to the last phase.
    pub fn get(&self, index: usize) -> &Phase {
        let last = self.phases.len() - 1;
        &self.phases[index.min(last)]
    }

    pub fn name_at(&self, index: usize) -> &str {
        &self.get(index).name
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self {
            phases: default_phases(),
        }
    }
}

/// The catalog used when `outreach.toml` configures no phases.
pub fn default_phases() -> Vec<Phase> {
    vec![
        Phase::new("Qualifying", Color::rgb(0x3B, 0x82, 0xF6)),
        Phase::new("Enrichment", Color::rgb(0xA7, 0x8B, 0xFA)),
        Phase::new("Personalization", Color::rgb(0xF4, 0x72, 0xB6)),
        Phase::new("Completed", Color::rgb(0x22, 0xC5, 0x5E)),
    ]
}
