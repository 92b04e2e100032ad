//! `From` implementations bridging `tally_config` types to `tally_core` types.
//!
//! These keep the CLI free of field-by-field mapping.

use crate::history::HistoryCfg;
use crate::inventory::InventoryCfg;
use crate::stabilizer::{StabilizerCfg, StabilizerMode};

// ── StabilizerCfg ────────────────────────────────────────────────────────────

impl From<&tally_config::StabilizerCfg> for StabilizerCfg {
    fn from(c: &tally_config::StabilizerCfg) -> Self {
        Self {
            window_ms: c.window_ms,
            max_delta_kg: c.max_delta_kg,
            min_samples: c.min_samples,
            min_publish_interval_ms: c.min_publish_interval_ms,
        }
    }
}

impl From<tally_config::StabilizerMode> for StabilizerMode {
    fn from(m: tally_config::StabilizerMode) -> Self {
        match m {
            tally_config::StabilizerMode::Computed => Self::Computed,
            tally_config::StabilizerMode::Tagged => Self::Tagged,
        }
    }
}

// ── InventoryCfg ─────────────────────────────────────────────────────────────

impl From<&tally_config::InventoryCfg> for InventoryCfg {
    fn from(c: &tally_config::InventoryCfg) -> Self {
        Self {
            mass_per_item_kg: c.mass_per_item_kg,
            tare_mass_kg: c.tare_mass_kg,
            initial_item_count: c.initial_item_count,
            error_band_min_kg: c.error_band_min_kg,
            error_band_max_kg: c.error_band_max_kg,
            allow_increase: c.allow_increase,
            allow_decrease: c.allow_decrease,
        }
    }
}

// ── HistoryCfg ───────────────────────────────────────────────────────────────

impl From<&tally_config::HistoryCfg> for HistoryCfg {
    fn from(c: &tally_config::HistoryCfg) -> Self {
        Self {
            retention_ms: c.retention_ms,
            max_entries: c.max_entries,
        }
    }
}
