#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the scale monitor.
//!
//! All sections are optional in the TOML and fall back to the reference
//! defaults, so an empty file is a valid configuration. `validate()` checks
//! range constraints and reports the offending `section.field` by name.
use serde::Deserialize;

/// Stability classification settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StabilizerCfg {
    /// Sliding window duration in milliseconds.
    pub window_ms: u64,
    /// Dispersion threshold in kilograms, applied to the window range
    /// (max - min).
    pub max_delta_kg: f64,
    /// Samples required in the window before it can classify stable.
    pub min_samples: usize,
    /// Minimum interval between re-publishing an unchanged stable value.
    pub min_publish_interval_ms: u64,
    /// How stability is decided: "computed" from the window, or "tagged"
    /// by trusting the producer's out-of-band status.
    pub mode: StabilizerMode,
}

impl Default for StabilizerCfg {
    fn default() -> Self {
        Self {
            window_ms: 2500,
            max_delta_kg: 0.02,
            min_samples: 3,
            min_publish_interval_ms: 500,
            mode: StabilizerMode::Computed,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StabilizerMode {
    #[default]
    Computed,
    Tagged,
}

/// Process-wide default counting parameters; devices without their own
/// configuration use these.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InventoryCfg {
    /// Mass of a single item in kilograms. Must be > 0.
    pub mass_per_item_kg: f64,
    /// Container/board weight subtracted before counting. Must be >= 0.
    pub tare_mass_kg: f64,
    pub initial_item_count: u32,
    /// Tolerance around a zero weight delta; may be asymmetric.
    pub error_band_min_kg: f64,
    pub error_band_max_kg: f64,
    pub allow_increase: bool,
    pub allow_decrease: bool,
}

impl Default for InventoryCfg {
    fn default() -> Self {
        Self {
            mass_per_item_kg: 0.5,
            tare_mass_kg: 0.0,
            initial_item_count: 0,
            error_band_min_kg: -0.02,
            error_band_max_kg: 0.02,
            allow_increase: true,
            allow_decrease: true,
        }
    }
}

/// Bounds on the in-memory history of accepted readings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryCfg {
    /// Entries older than this are evicted (ms).
    pub retention_ms: u64,
    /// Hard cap on stored entries; oldest evicted first.
    pub max_entries: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            retention_ms: 5 * 60 * 1000,
            max_entries: 300,
        }
    }
}

/// Service loop housekeeping.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorCfg {
    /// Device id assumed for readings that do not carry one.
    pub default_device_id: Option<String>,
    /// Period of the background prune tick (history age sweep and
    /// idle-window discard).
    pub prune_interval_ms: u64,
    /// Discard a device's sample window after this much inactivity.
    pub idle_device_ms: u64,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            default_device_id: None,
            prune_interval_ms: 10_000,
            idle_device_ms: 5 * 60 * 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub stabilizer: StabilizerCfg,
    pub inventory: InventoryCfg,
    pub history: HistoryCfg,
    pub monitor: MonitorCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stabilizer
        if self.stabilizer.window_ms == 0 {
            eyre::bail!("stabilizer.window_ms must be >= 1");
        }
        if !self.stabilizer.max_delta_kg.is_finite() || self.stabilizer.max_delta_kg < 0.0 {
            eyre::bail!("stabilizer.max_delta_kg must be a finite value >= 0");
        }
        if self.stabilizer.min_samples == 0 {
            eyre::bail!("stabilizer.min_samples must be >= 1");
        }

        // Inventory
        if !self.inventory.mass_per_item_kg.is_finite() || self.inventory.mass_per_item_kg <= 0.0 {
            eyre::bail!("inventory.mass_per_item_kg must be > 0");
        }
        if !self.inventory.tare_mass_kg.is_finite() || self.inventory.tare_mass_kg < 0.0 {
            eyre::bail!("inventory.tare_mass_kg must be >= 0");
        }
        if !self.inventory.error_band_min_kg.is_finite() {
            eyre::bail!("inventory.error_band_min_kg must be finite");
        }
        if !self.inventory.error_band_max_kg.is_finite() {
            eyre::bail!("inventory.error_band_max_kg must be finite");
        }

        // History
        if self.history.retention_ms == 0 {
            eyre::bail!("history.retention_ms must be >= 1");
        }
        if self.history.max_entries == 0 {
            eyre::bail!("history.max_entries must be >= 1");
        }

        // Monitor
        if self.monitor.prune_interval_ms == 0 {
            eyre::bail!("monitor.prune_interval_ms must be >= 1");
        }
        if self.monitor.idle_device_ms == 0 {
            eyre::bail!("monitor.idle_device_ms must be >= 1");
        }
        if let Some(id) = &self.monitor.default_device_id
            && id.is_empty()
        {
            eyre::bail!("monitor.default_device_id must not be empty");
        }

        Ok(())
    }
}
