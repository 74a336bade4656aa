//! Configuration for the govsim engine.
//!
//! Maps directly to `govsim.toml`. Every default reproduces the tuning the
//! simulation was authored against, so an empty file yields the reference
//! behaviour.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Assumption-bank decay tuning.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Regional propagation tuning.
    #[serde(default)]
    pub propagation: PropagationConfig,
    /// Irreversibility relaxation tuning.
    #[serde(default)]
    pub irreversibility: IrreversibilityConfig,
    /// Save store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Telemetry & observability.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl SimConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `SimError::Config` if the TOML is invalid or a value is out of
    /// range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check that every rate and weight lies in its meaningful range.
    ///
    /// # Errors
    /// Returns `SimError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("memory.decay_rate", self.memory.decay_rate),
            ("memory.reaffirm_boost", self.memory.reaffirm_boost),
            ("memory.degraded_threshold", self.memory.degraded_threshold),
            ("memory.initial_strength", self.memory.initial_strength),
            ("propagation.spill_factor", self.propagation.spill_factor),
            ("irreversibility.debt_weight", self.irreversibility.debt_weight),
            ("irreversibility.enforcement_weight", self.irreversibility.enforcement_weight),
            ("irreversibility.relaxation_rate", self.irreversibility.relaxation_rate),
        ];
        for (key, value) in unit {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SimError::Config(format!("{key} must lie in [0, 1], got {value}")));
            }
        }
        if self.persistence.max_saves == 0 {
            return Err(SimError::Config("persistence.max_saves must be at least 1".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Node id that marks the end of the scenario.
    #[serde(default = "default_completion_node")]
    pub completion_node: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            completion_node: "N16_COMPLETE".to_string(),
        }
    }
}

/// Assumption-bank decay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Strength lost per turn without reaffirmation.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Strength gained when reaffirmed.
    #[serde(default = "default_reaffirm_boost")]
    pub reaffirm_boost: f64,
    /// Below this strength an assumption reads as degraded.
    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: f64,
    /// Strength of a freshly recorded assumption.
    #[serde(default = "default_1_0")]
    pub initial_strength: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.05,
            reaffirm_boost: 0.2,
            degraded_threshold: 0.3,
            initial_strength: 1.0,
        }
    }
}

/// Regional propagation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Share of a positive regional adjustment that spills to neighbours.
    #[serde(default = "default_spill_factor")]
    pub spill_factor: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { spill_factor: 0.3 }
    }
}

/// Irreversibility relaxation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrreversibilityConfig {
    /// Weight of welfare debt in the irreversibility target.
    #[serde(default = "default_debt_weight")]
    pub debt_weight: f64,
    /// Weight of the enforcement gap in the irreversibility target.
    #[serde(default = "default_enforcement_weight")]
    pub enforcement_weight: f64,
    /// Fraction of the remaining distance covered per delta.
    #[serde(default = "default_relaxation_rate")]
    pub relaxation_rate: f64,
}

impl Default for IrreversibilityConfig {
    fn default() -> Self {
        Self {
            debt_weight: 0.7,
            enforcement_weight: 0.5,
            relaxation_rate: 0.25,
        }
    }
}

/// Save store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Maximum number of saves kept; the oldest is evicted beyond this.
    #[serde(default = "default_max_saves")]
    pub max_saves: usize,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Version string stamped on every save.
    #[serde(default = "default_format_version")]
    pub format_version: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            max_saves: 10,
            wal_mode: true,
            checksum_enabled: true,
            format_version: "1.0.0".to_string(),
        }
    }
}

/// Telemetry and observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log any transition slower than this threshold (ms).
    #[serde(default = "default_slow_ms")]
    pub log_slow_transitions_ms: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_slow_transitions_ms: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_completion_node() -> String { "N16_COMPLETE".to_string() }
fn default_format_version() -> String { "1.0.0".to_string() }
fn default_decay_rate() -> f64 { 0.05 }
fn default_reaffirm_boost() -> f64 { 0.2 }
fn default_degraded_threshold() -> f64 { 0.3 }
fn default_spill_factor() -> f64 { 0.3 }
fn default_debt_weight() -> f64 { 0.7 }
fn default_enforcement_weight() -> f64 { 0.5 }
fn default_relaxation_rate() -> f64 { 0.25 }
fn default_slow_ms() -> f64 { 5.0 }
fn default_1_0() -> f64 { 1.0 }
fn default_max_saves() -> usize { 10 }
