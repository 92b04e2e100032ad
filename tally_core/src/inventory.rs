//! Tare-and-divide item counting with directional policy gates.
//!
//! Invoked only on stabilized representative weights. The count moves only
//! through accepted deltas and is clamped at zero; the stable-weight anchor
//! always follows the latest observation.

use crate::error::ValidationError;

/// Per-device counting parameters. Replaced atomically; replacing a device's
/// config resets its state to the new baseline.
#[derive(Debug, Clone)]
pub struct InventoryCfg {
    /// Mass of a single item in kilograms. Must be > 0.
    pub mass_per_item_kg: f64,
    /// Container/board weight subtracted before counting. Must be >= 0.
    pub tare_mass_kg: f64,
    pub initial_item_count: u32,
    /// Tolerance around a zero weight delta; may be asymmetric. The engine
    /// treats any delta within the widest absolute bound as noise.
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

impl InventoryCfg {
    /// Check field constraints; the error names the offending field.
    /// `initial_item_count >= 0` is guaranteed by its type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.mass_per_item_kg.is_finite() || self.mass_per_item_kg <= 0.0 {
            return Err(ValidationError::new(
                "mass_per_item_kg",
                "must be a finite value > 0",
            ));
        }
        if !self.tare_mass_kg.is_finite() || self.tare_mass_kg < 0.0 {
            return Err(ValidationError::new(
                "tare_mass_kg",
                "must be a finite value >= 0",
            ));
        }
        if !self.error_band_min_kg.is_finite() {
            return Err(ValidationError::new("error_band_min_kg", "must be finite"));
        }
        if !self.error_band_max_kg.is_finite() {
            return Err(ValidationError::new("error_band_max_kg", "must be finite"));
        }
        Ok(())
    }

    /// Widest absolute tolerance of the (possibly asymmetric) error band.
    pub fn noise_band_kg(&self) -> f64 {
        self.error_band_min_kg.abs().max(self.error_band_max_kg.abs())
    }
}

/// Mutable counting state for one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryState {
    /// Unset until the first stable observation.
    pub last_stable_kg: Option<f64>,
    pub item_count: u32,
}

impl InventoryState {
    /// Fresh state for a just-applied configuration.
    pub fn seeded(cfg: &InventoryCfg) -> Self {
        Self {
            last_stable_kg: None,
            item_count: cfg.initial_item_count,
        }
    }
}

/// How a stable observation affected the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountChange {
    /// First observation anchored the count; not a change event.
    Initialized,
    /// Weight delta within the error band; count untouched.
    Noise,
    /// Delta accepted and applied.
    Accepted,
    /// Delta direction disallowed by policy, or too small to move the
    /// count; not an error, the count is simply untouched.
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct DeltaOutcome {
    pub item_count: u32,
    /// Signed item delta as reported downstream; zero unless accepted.
    pub delta: i64,
    pub change: CountChange,
}

/// Apply one stabilized weight to a device's state.
///
/// `last_stable_kg` re-anchors to the observation in every branch, including
/// noise and policy rejection.
pub fn apply_stable_weight(
    state: &mut InventoryState,
    cfg: &InventoryCfg,
    weight_kg: f64,
) -> DeltaOutcome {
    let Some(prev_kg) = state.last_stable_kg else {
        let raw = (weight_kg - cfg.tare_mass_kg) / cfg.mass_per_item_kg;
        let count = clamp_count(raw.round());
        state.item_count = count;
        state.last_stable_kg = Some(weight_kg);
        return DeltaOutcome {
            item_count: count,
            delta: 0,
            change: CountChange::Initialized,
        };
    };

    state.last_stable_kg = Some(weight_kg);
    let delta_kg = weight_kg - prev_kg;
    if delta_kg.abs() <= cfg.noise_band_kg() {
        return DeltaOutcome {
            item_count: state.item_count,
            delta: 0,
            change: CountChange::Noise,
        };
    }

    let expected = (delta_kg / cfg.mass_per_item_kg).round() as i64;
    let allowed =
        (expected > 0 && cfg.allow_increase) || (expected < 0 && cfg.allow_decrease);
    if !allowed {
        return DeltaOutcome {
            item_count: state.item_count,
            delta: 0,
            change: CountChange::Rejected,
        };
    }

    let next = (i64::from(state.item_count) + expected).max(0);
    state.item_count = u32::try_from(next).unwrap_or(u32::MAX);
    DeltaOutcome {
        item_count: state.item_count,
        delta: expected,
        change: CountChange::Accepted,
    }
}

fn clamp_count(rounded: f64) -> u32 {
    if !rounded.is_finite() || rounded <= 0.0 {
        0
    } else if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

#[cfg(test)]
mod clamp_tests {
    use super::clamp_count;

    #[test]
    fn negatives_and_non_finite_go_to_zero() {
        assert_eq!(clamp_count(-3.0), 0);
        assert_eq!(clamp_count(f64::NAN), 0);
        assert_eq!(clamp_count(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn in_range_values_pass_through() {
        assert_eq!(clamp_count(0.0), 0);
        assert_eq!(clamp_count(10.0), 10);
    }

    #[test]
    fn huge_values_saturate() {
        assert_eq!(clamp_count(f64::INFINITY), u32::MAX);
        assert_eq!(clamp_count(1e18), u32::MAX);
    }
}
