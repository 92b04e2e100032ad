use tally_core::inventory::{
    CountChange, InventoryCfg, InventoryState, apply_stable_weight,
};

fn cfg() -> InventoryCfg {
    InventoryCfg {
        mass_per_item_kg: 0.5,
        tare_mass_kg: 2.0,
        initial_item_count: 0,
        error_band_min_kg: -0.02,
        error_band_max_kg: 0.02,
        allow_increase: true,
        allow_decrease: true,
    }
}

#[test]
fn first_stable_weight_anchors_the_count() {
    let cfg = cfg();
    let mut state = InventoryState::seeded(&cfg);

    let out = apply_stable_weight(&mut state, &cfg, 7.0);
    assert_eq!(out.change, CountChange::Initialized);
    assert_eq!(out.item_count, 10); // (7.0 - 2.0) / 0.5
    assert_eq!(out.delta, 0);
    assert_eq!(state.last_stable_kg, Some(7.0));
}

#[test]
fn added_items_produce_an_accepted_delta() {
    let cfg = cfg();
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 7.0);

    let out = apply_stable_weight(&mut state, &cfg, 8.5);
    assert_eq!(out.change, CountChange::Accepted);
    assert_eq!(out.delta, 3); // round(1.5 / 0.5)
    assert_eq!(out.item_count, 13);
    assert_eq!(state.last_stable_kg, Some(8.5));
}

#[test]
fn disallowed_increase_is_rejected_but_still_re_anchors() {
    let mut cfg = cfg();
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 7.0);

    cfg.allow_increase = false;
    let out = apply_stable_weight(&mut state, &cfg, 8.5);
    assert_eq!(out.change, CountChange::Rejected);
    assert_eq!(out.delta, 0);
    assert_eq!(out.item_count, 10);
    // The anchor still follows the observation.
    assert_eq!(state.last_stable_kg, Some(8.5));
}

#[test]
fn disallowed_decrease_is_rejected() {
    let mut cfg = cfg();
    cfg.allow_decrease = false;
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 7.0);

    let out = apply_stable_weight(&mut state, &cfg, 5.5);
    assert_eq!(out.change, CountChange::Rejected);
    assert_eq!(out.item_count, 10);
    assert_eq!(state.last_stable_kg, Some(5.5));
}

#[test]
fn deltas_within_the_error_band_are_noise() {
    let cfg = cfg();
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 7.0);

    let out = apply_stable_weight(&mut state, &cfg, 7.015);
    assert_eq!(out.change, CountChange::Noise);
    assert_eq!(out.delta, 0);
    assert_eq!(out.item_count, 10);
    assert_eq!(state.last_stable_kg, Some(7.015));
}

#[test]
fn asymmetric_band_uses_the_widest_bound() {
    let mut cfg = cfg();
    cfg.error_band_min_kg = -0.10;
    cfg.error_band_max_kg = 0.02;
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 7.0);

    // +0.08 is outside the max bound but inside the widest (0.10): noise.
    let out = apply_stable_weight(&mut state, &cfg, 7.08);
    assert_eq!(out.change, CountChange::Noise);
}

#[test]
fn count_clamps_at_zero() {
    let cfg = cfg();
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 3.0); // 2 items

    // Removing far more weight than the count covers clamps to zero.
    let out = apply_stable_weight(&mut state, &cfg, 0.0);
    assert_eq!(out.change, CountChange::Accepted);
    assert_eq!(out.delta, -6);
    assert_eq!(out.item_count, 0);
}

#[test]
fn empty_scale_anchors_at_zero_items() {
    let cfg = cfg();
    let mut state = InventoryState::seeded(&cfg);

    // Only the board on the scale; net weight 0.
    let out = apply_stable_weight(&mut state, &cfg, 2.0);
    assert_eq!(out.item_count, 0);

    // Below the tare weight still clamps to zero rather than going negative.
    let mut state = InventoryState::seeded(&cfg);
    let out = apply_stable_weight(&mut state, &cfg, 0.5);
    assert_eq!(out.item_count, 0);
}

#[test]
fn band_crossing_delta_too_small_for_an_item_is_rejected() {
    let mut cfg = cfg();
    cfg.mass_per_item_kg = 1.0;
    let mut state = InventoryState::seeded(&cfg);
    apply_stable_weight(&mut state, &cfg, 7.0);

    // 0.3 kg is beyond the band but rounds to zero items.
    let out = apply_stable_weight(&mut state, &cfg, 7.3);
    assert_eq!(out.change, CountChange::Rejected);
    assert_eq!(out.delta, 0);
    assert_eq!(out.item_count, 5);
}

#[test]
fn heavier_item_configuration_counts_correctly() {
    let cfg = InventoryCfg {
        mass_per_item_kg: 2.5,
        tare_mass_kg: 1.0,
        ..InventoryCfg::default()
    };
    let mut state = InventoryState::seeded(&cfg);

    let out = apply_stable_weight(&mut state, &cfg, 51.0);
    assert_eq!(out.item_count, 20);

    let out = apply_stable_weight(&mut state, &cfg, 63.5);
    assert_eq!(out.delta, 5);
    assert_eq!(out.item_count, 25);
}

#[test]
fn validation_names_the_offending_field() {
    let bad = InventoryCfg {
        mass_per_item_kg: 0.0,
        ..InventoryCfg::default()
    };
    let err = bad.validate().expect_err("zero mass must be rejected");
    assert_eq!(err.field, "mass_per_item_kg");

    let bad = InventoryCfg {
        tare_mass_kg: -1.0,
        ..InventoryCfg::default()
    };
    let err = bad.validate().expect_err("negative tare must be rejected");
    assert_eq!(err.field, "tare_mass_kg");

    let bad = InventoryCfg {
        error_band_max_kg: f64::NAN,
        ..InventoryCfg::default()
    };
    let err = bad.validate().expect_err("NaN band must be rejected");
    assert_eq!(err.field, "error_band_max_kg");

    cfg().validate().expect("reference config is valid");
}
