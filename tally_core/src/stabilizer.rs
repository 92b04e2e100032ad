//! Per-device stabilization: sliding window, dispersion test, gated emission.
//!
//! The window-and-dispersion test rejects single-sample noise and momentary
//! touches; the mean of a stable window damps residual jitter; the emission
//! gate keeps a scale parked at one value from flooding downstream.

use std::collections::VecDeque;

use crate::reading::StatusTag;

/// Stabilization parameters.
#[derive(Debug, Clone)]
pub struct StabilizerCfg {
    /// Sliding window duration in milliseconds.
    pub window_ms: u64,
    /// Dispersion threshold in kilograms. The window is stable when its
    /// range (max - min) is <= this, boundary inclusive.
    pub max_delta_kg: f64,
    /// Samples required in the window before it can classify stable.
    pub min_samples: usize,
    /// Minimum interval between re-publishing an unchanged stable value.
    pub min_publish_interval_ms: u64,
}

impl Default for StabilizerCfg {
    fn default() -> Self {
        Self {
            window_ms: 2500,
            max_delta_kg: 0.02,
            min_samples: 3,
            min_publish_interval_ms: 500,
        }
    }
}

/// How stability is decided: computed from the window, or trusted from the
/// producer's out-of-band tag. Two producer designs, one consumer contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StabilizerMode {
    #[default]
    Computed,
    Tagged,
}

/// Transient classification of the current moment; re-evaluated on every
/// sample, never sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    Unstable,
}

/// Outcome of observing one sample.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub stability: Stability,
    /// Representative stabilized weight; present only when the emission
    /// gate passed.
    pub emitted_kg: Option<f64>,
}

impl Classification {
    pub fn unstable() -> Self {
        Self {
            stability: Stability::Unstable,
            emitted_kg: None,
        }
    }
}

/// Sliding-window state for one device. Owned exclusively by whoever runs
/// that device's pipeline; samples are time-ordered and trimmed on insert.
#[derive(Debug, Default)]
pub struct DeviceWindow {
    samples: VecDeque<(u64, f64)>,
    last_emitted_at: u64,
    last_emitted_kg: Option<f64>,
    last_seen_ms: u64,
}

impl DeviceWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Milliseconds since this device was last observed.
    pub fn idle_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_seen_ms)
    }

    /// Observe one sample in computed mode.
    ///
    /// Appends, trims by age, then classifies the window. A long gap empties
    /// the window by trimming alone; there is no separate reset transition.
    pub fn observe(&mut self, cfg: &StabilizerCfg, at_ms: u64, weight_kg: f64) -> Classification {
        self.last_seen_ms = self.last_seen_ms.max(at_ms);
        self.samples.push_back((at_ms, weight_kg));
        let cutoff = at_ms.saturating_sub(cfg.window_ms);
        while let Some(&(t, _)) = self.samples.front() {
            if t < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        if self.samples.len() < cfg.min_samples.max(1) {
            return Classification::unstable();
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &(_, v) in &self.samples {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        if max - min > cfg.max_delta_kg {
            return Classification::unstable();
        }

        let mean = sum / self.samples.len() as f64;
        let emitted = if should_emit(mean, self.last_emitted_kg, self.last_emitted_at, at_ms, cfg) {
            self.last_emitted_at = at_ms;
            self.last_emitted_kg = Some(mean);
            Some(mean)
        } else {
            tracing::trace!(mean_kg = mean, "stable value suppressed by emission gate");
            None
        };
        Classification {
            stability: Stability::Stable,
            emitted_kg: emitted,
        }
    }

    /// Observe one sample in tagged mode: the producer's tag is trusted and
    /// the latest raw value is the representative. No window math, no gate;
    /// Boot/Tare and missing tags classify unstable.
    pub fn observe_tagged(
        &mut self,
        at_ms: u64,
        weight_kg: f64,
        tag: Option<StatusTag>,
    ) -> Classification {
        self.last_seen_ms = self.last_seen_ms.max(at_ms);
        match tag {
            Some(StatusTag::Stable) => Classification {
                stability: Stability::Stable,
                emitted_kg: Some(weight_kg),
            },
            _ => Classification::unstable(),
        }
    }
}

/// Emission gate: a pure decision over (candidate, last emitted value, last
/// emitted time, now). Emits on the first stable value, on a move larger
/// than the dispersion threshold, or once the re-publish interval elapses.
pub fn should_emit(
    candidate_kg: f64,
    last_kg: Option<f64>,
    last_at_ms: u64,
    now_ms: u64,
    cfg: &StabilizerCfg,
) -> bool {
    match last_kg {
        None => true,
        Some(prev) => {
            (candidate_kg - prev).abs() > cfg.max_delta_kg
                || now_ms.saturating_sub(last_at_ms) >= cfg.min_publish_interval_ms
        }
    }
}

#[cfg(test)]
mod gate_tests {
    use super::{StabilizerCfg, should_emit};

    #[test]
    fn first_value_always_emits() {
        let cfg = StabilizerCfg::default();
        assert!(should_emit(10.0, None, 0, 0, &cfg));
    }

    #[test]
    fn small_move_within_interval_is_suppressed() {
        let cfg = StabilizerCfg::default();
        assert!(!should_emit(10.01, Some(10.0), 1000, 1200, &cfg));
    }

    #[test]
    fn large_move_emits_regardless_of_interval() {
        let cfg = StabilizerCfg::default();
        assert!(should_emit(10.5, Some(10.0), 1000, 1001, &cfg));
    }

    #[test]
    fn elapsed_interval_emits_unchanged_value() {
        let cfg = StabilizerCfg::default();
        assert!(should_emit(10.0, Some(10.0), 1000, 1500, &cfg));
        assert!(!should_emit(10.0, Some(10.0), 1000, 1499, &cfg));
    }
}
