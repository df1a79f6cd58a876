//! Content/schema validation tests for the authored JSON game data.
//!
//! These tests load the actual `content/*.json` files and validate:
//! 1. Schema validity: all files deserialize without error
//! 2. Range constraints: no zero durations, no empty IDs, sane probabilities
//! 3. Cross-reference integrity: stress events point at real stations
//! 4. Content invariants: every puzzle kind is reachable and winnable

use sim_core::{
    should_shoot, Category, GameContent, PuzzleKind, StationTier, WIRE_COUNT,
};
use sim_world::load_content;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Helper: resolve the content directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn content_dir() -> String {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    format!("{manifest}/../../content")
}

/// Shared content loaded once across all tests in this module.
fn load_test_content() -> &'static GameContent {
    static CONTENT: OnceLock<GameContent> = OnceLock::new();
    CONTENT.get_or_init(|| {
        load_content(&content_dir()).expect("load_content should succeed for production content")
    })
}

// =========================================================================
// 1. Schema validation
// =========================================================================

#[test]
fn content_loads_successfully() {
    let content = load_test_content();
    assert!(!content.content_version.is_empty());
}

#[test]
fn missing_directory_reports_file() {
    let err = load_content("./no_such_content_dir").unwrap_err();
    assert!(format!("{err:#}").contains("constants.json"));
}

// =========================================================================
// 2. Range constraints
// =========================================================================

#[test]
fn constants_durations_are_positive() {
    let c = &load_test_content().constants;
    for (name, value) in [
        ("tick_seconds", c.tick_seconds),
        ("round_duration_s", c.round_duration_s),
        ("stress_passive_interval_s", c.stress_passive_interval_s),
        ("stress_roll_interval_s", c.stress_roll_interval_s),
        ("stress_cooldown_s", c.stress_cooldown_s),
        ("thermal_round_s", c.thermal_round_s),
        ("radar_selection_cooldown_s", c.radar_selection_cooldown_s),
        ("radar_symbol_display_s", c.radar_symbol_display_s),
    ] {
        assert!(value > 0.0, "{name} must be positive, got {value}");
    }
}

#[test]
fn round_is_many_ticks_long() {
    let c = &load_test_content().constants;
    assert!(c.round_duration_s / c.tick_seconds >= 100.0);
}

#[test]
fn initial_heat_is_within_thermal_range() {
    let c = &load_test_content().constants;
    assert!(c.thermal_initial_heat > c.thermal_min_heat);
    assert!(c.thermal_initial_heat < c.thermal_max_heat);
}

#[test]
fn pressure_band_probabilities_are_valid() {
    for band in &load_test_content().thermal.pressure_bands {
        assert!(
            (0.0..=1.0).contains(&band.bottleneck_chance),
            "band upto {} has chance {}",
            band.upto,
            band.bottleneck_chance
        );
        assert!(band.cooling > 0.0, "band upto {} never cools", band.upto);
    }
}

#[test]
fn last_pressure_band_covers_pressure_max() {
    let content = load_test_content();
    let last = content.thermal.pressure_bands.last().unwrap();
    assert!(last.upto >= content.constants.pressure_max);
}

#[test]
fn rhythm_weights_are_positive() {
    for rhythm in &load_test_content().thermal.rhythm_profiles {
        assert!(rhythm.weight > 0.0, "rhythm '{}' can never be drawn", rhythm.id);
        assert!(rhythm.pump_multiplier > 0.0);
    }
}

#[test]
fn station_ids_are_non_empty() {
    for station in &load_test_content().stations {
        assert!(!station.id.0.is_empty(), "station has empty id");
        assert!(!station.name.is_empty(), "station '{}' has empty name", station.id);
    }
}

// =========================================================================
// 3. Cross-reference integrity
// =========================================================================

#[test]
fn every_station_can_break() {
    let content = load_test_content();
    let targeted: HashSet<_> = content.stress_events.iter().map(|e| &e.station).collect();
    for station in &content.stations {
        assert!(
            targeted.contains(&station.id),
            "no stress event can break station '{}'",
            station.id
        );
    }
}

#[test]
fn no_duplicate_stress_event_ids() {
    let content = load_test_content();
    let mut seen = HashSet::new();
    for event in &content.stress_events {
        assert!(seen.insert(&event.id), "duplicate stress event '{}'", event.id);
    }
}

#[test]
fn call_signs_are_unique() {
    let content = load_test_content();
    let mut seen = HashSet::new();
    for sign in &content.radar.call_signs {
        assert!(seen.insert(sign), "duplicate call sign '{sign}'");
    }
    assert!(content.radar.call_signs.len() >= content.constants.threat_count_max);
}

// =========================================================================
// 4. Content invariants
// =========================================================================

#[test]
fn every_puzzle_kind_is_present() {
    let kinds: HashSet<_> = load_test_content()
        .stations
        .iter()
        .map(|s| s.puzzle)
        .collect();
    for kind in [PuzzleKind::Wiring, PuzzleKind::Thermal, PuzzleKind::Radar] {
        assert!(kinds.contains(&kind), "no station uses {kind:?}");
    }
}

#[test]
fn at_least_one_vital_station() {
    assert!(load_test_content()
        .stations
        .iter()
        .any(|s| s.tier == StationTier::Vital));
}

#[test]
fn every_rule_splits_the_catalogue() {
    // A rule that shoots everything or nothing makes the board pointless.
    let content = load_test_content();
    for rule in &content.radar.rules {
        let shots = content
            .radar
            .objects
            .iter()
            .filter(|o| should_shoot(&rule.predicate, &o.categories))
            .count();
        assert!(shots > 0, "rule '{}' never shoots", rule.id);
        assert!(
            shots < content.radar.objects.len(),
            "rule '{}' always shoots",
            rule.id
        );
    }
}

#[test]
fn symbol_space_fits_the_board() {
    let c = &load_test_content().constants;
    let n = usize::from(c.radar_symbol_count);
    // Number of distinct 3-symbol sets must comfortably exceed the board.
    let combinations = n * (n - 1) * (n - 2) / 6;
    assert!(combinations >= c.radar_board_size * 4);
}

#[test]
fn bottleneck_sequence_uses_wire_palette() {
    let c = &load_test_content().constants;
    assert!(c.bottleneck_min_steps >= 1);
    assert!(c.bottleneck_max_steps <= WIRE_COUNT * 2);
}

#[test]
fn categories_cover_every_trait() {
    let used: HashSet<Category> = load_test_content()
        .radar
        .objects
        .iter()
        .flat_map(|o| o.categories.iter().copied())
        .collect();
    for category in [
        Category::Mechanical,
        Category::Biological,
        Category::Glowing,
        Category::Armored,
        Category::Swarm,
    ] {
        assert!(used.contains(&category), "{category:?} never appears");
    }
}
