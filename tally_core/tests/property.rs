use proptest::prelude::*;
use tally_core::inventory::{
    CountChange, InventoryCfg, InventoryState, apply_stable_weight,
};

fn weights_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..50.0, 1..60)
}

proptest! {
    /// With increases disallowed, no input sequence can push the count above
    /// its value at the time the flag was in force.
    #[test]
    fn increase_gate_caps_the_count(weights in weights_strategy()) {
        let cfg = InventoryCfg {
            mass_per_item_kg: 0.5,
            allow_increase: false,
            ..InventoryCfg::default()
        };
        let mut state = InventoryState::seeded(&cfg);

        let mut ceiling: Option<u32> = None;
        for w in weights {
            let out = apply_stable_weight(&mut state, &cfg, w);
            match ceiling {
                None => ceiling = Some(out.item_count),
                Some(cap) => {
                    prop_assert!(
                        out.item_count <= cap,
                        "count {} climbed above {}",
                        out.item_count,
                        cap
                    );
                    // Accepted decreases lower the ceiling further.
                    ceiling = Some(cap.min(out.item_count));
                }
            }
        }
    }

    /// The count moves only through accepted deltas: replaying the accepted
    /// deltas with the zero clamp reproduces the final count exactly.
    #[test]
    fn count_is_consistent_with_the_accepted_delta_ledger(weights in weights_strategy()) {
        let cfg = InventoryCfg {
            mass_per_item_kg: 0.5,
            ..InventoryCfg::default()
        };
        let mut state = InventoryState::seeded(&cfg);

        let mut replayed: i64 = 0;
        let mut initialized = false;
        for w in weights {
            let out = apply_stable_weight(&mut state, &cfg, w);
            match out.change {
                CountChange::Initialized => {
                    replayed = i64::from(out.item_count);
                    initialized = true;
                }
                CountChange::Accepted => {
                    replayed = (replayed + out.delta).max(0);
                }
                CountChange::Noise | CountChange::Rejected => {
                    prop_assert_eq!(out.delta, 0);
                }
            }
            prop_assert!(initialized);
            prop_assert_eq!(i64::from(state.item_count), replayed);
        }
    }

    /// The anchor always tracks the latest stable observation, whatever the
    /// policy outcome was.
    #[test]
    fn anchor_follows_every_stable_observation(
        weights in weights_strategy(),
        allow_increase in any::<bool>(),
        allow_decrease in any::<bool>(),
    ) {
        let cfg = InventoryCfg {
            mass_per_item_kg: 0.5,
            allow_increase,
            allow_decrease,
            ..InventoryCfg::default()
        };
        let mut state = InventoryState::seeded(&cfg);
        for w in weights {
            apply_stable_weight(&mut state, &cfg, w);
            prop_assert_eq!(state.last_stable_kg, Some(w));
        }
    }
}

proptest! {
    /// A window never classifies stable with fewer than `min_samples`
    /// samples, regardless of values or spacing.
    #[test]
    fn never_stable_below_min_samples(
        values in prop::collection::vec(0.0f64..100.0, 1..3),
        spacing_ms in 1u64..400,
    ) {
        use tally_core::stabilizer::{DeviceWindow, Stability, StabilizerCfg};

        let cfg = StabilizerCfg::default();
        let mut window = DeviceWindow::new();
        for (i, v) in values.iter().enumerate() {
            let out = window.observe(&cfg, i as u64 * spacing_ms, *v);
            prop_assert_eq!(out.stability, Stability::Unstable);
        }
    }
}
