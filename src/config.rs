//! Configuration handling for gantt-deps
//!
//! Configuration is stored as TOML, e.g. `gantt.toml`:
//!
//! ```toml
//! [dependencies]
//! default_constraint = "FS"
//! default_hardness = "Strong"
//!
//! [scheduler]
//! enabled = true
//!
//! [calendar]
//! weekends = ["Sat", "Sun"]
//! holidays = ["2024-12-25"]
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::{ConstraintType, Hardness};
use crate::domain::WeekendCalendar;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Defaults for newly created dependencies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DependencyConfig {
    /// Constraint type used when none is given
    pub default_constraint: ConstraintType,

    /// Hardness used when none is given
    pub default_hardness: Hardness,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            default_constraint: ConstraintType::FinishStart,
            default_hardness: Hardness::Strong,
        }
    }
}

/// Automatic rescheduling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Recompute task dates after dependency changes
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Working calendar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalendarConfig {
    /// Weekly non-working days, as three-letter names
    pub weekends: Vec<String>,

    /// Individual non-working days
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            weekends: vec!["Sat".to_string(), "Sun".to_string()],
            holidays: vec![],
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub dependencies: DependencyConfig,
    pub scheduler: SchedulerConfig,
    pub calendar: CalendarConfig,
}

impl Config {
    /// Parses configuration from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Saves the configuration
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content).with_context(|| format!("Failed to write config: {}", path.display()))
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.weekdays().map(|_| ())
    }

    fn weekdays(&self) -> std::result::Result<Vec<Weekday>, ConfigError> {
        self.calendar
            .weekends
            .iter()
            .map(|name| {
                name.parse::<Weekday>()
                    .map_err(|_| ConfigError::Invalid(format!("unknown weekday '{}'", name)))
            })
            .collect()
    }

    /// Builds the working calendar
    pub fn calendar(&self) -> std::result::Result<WeekendCalendar, ConfigError> {
        let mut calendar = WeekendCalendar::with_weekends(self.weekdays()?);
        for holiday in &self.calendar.holidays {
            calendar.add_holiday(*holiday);
        }
        Ok(calendar)
    }
}
