//! Thermal/pressure balancing. The engineer pumps cooling valves in rhythm
//! with a pressure needle while both sides of the station heat up; bad pressure
//! zones can open a color bottleneck the technician has to read out.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    Bottleneck, Constants, Event, EventEnvelope, GameContent, GameState, MistakeKind,
    PressureBandDef, PumpRejection, RejectReason, RhythmProfileDef, StatType, StationId,
    ThermalPuzzle, Valve, WireColor,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PumpOutcome {
    Rejected(PumpRejection),
    Cooled { cooling: f32 },
    BottleneckOpened { steps: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BottleneckStep {
    Advanced,
    Cleared,
    Wrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThermalProgress {
    Running,
    Overheated,
    Held,
}

fn fallback_rhythm() -> RhythmProfileDef {
    RhythmProfileDef {
        id: "steady".to_string(),
        weight: 1.0,
        min_interval_s: 0.5,
        max_interval_s: 2.0,
        pump_multiplier: 1.0,
    }
}

fn sample_range(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

pub(crate) fn generate(content: &GameContent, rng: &mut impl Rng) -> ThermalPuzzle {
    let c = &content.constants;
    let heat_rate = sample_range(rng, c.thermal_heat_rate_min, c.thermal_heat_rate_max);
    let rhythm = content
        .thermal
        .rhythm_profiles
        .choose_weighted(rng, |profile| profile.weight)
        .ok()
        .cloned()
        .unwrap_or_else(fallback_rhythm);

    ThermalPuzzle {
        front_heat: c.thermal_initial_heat,
        back_heat: c.thermal_initial_heat,
        heat_rate,
        rhythm,
        pressure: 0.0,
        active_valve: Valve::Front,
        since_last_pump_s: 0.0,
        armed: false,
        remaining_s: c.thermal_round_s,
        bottleneck: None,
        immunity_s: 0.0,
    }
}

/// Pressure band covering `pressure`. Bands are sorted by `upto`; readings
/// above the last bound fall into the last band.
pub fn pressure_band(bands: &[PressureBandDef], pressure: f32) -> Option<&PressureBandDef> {
    bands
        .iter()
        .find(|band| pressure <= band.upto)
        .or_else(|| bands.last())
}

/// Returns `true` if the puzzle was not already armed.
pub(crate) fn arm(puzzle: &mut ThermalPuzzle) -> bool {
    let newly = !puzzle.armed;
    puzzle.armed = true;
    newly
}

pub(crate) fn pump(
    puzzle: &mut ThermalPuzzle,
    valve: Valve,
    content: &GameContent,
    rng: &mut impl Rng,
) -> Result<PumpOutcome, RejectReason> {
    if !puzzle.armed {
        return Err(RejectReason::NotArmed);
    }
    if valve != puzzle.active_valve {
        return Ok(PumpOutcome::Rejected(PumpRejection::WrongValve));
    }
    if puzzle.bottleneck.is_some() {
        return Ok(PumpOutcome::Rejected(PumpRejection::BottleneckOpen));
    }

    let c = &content.constants;
    let since = puzzle.since_last_pump_s;
    puzzle.since_last_pump_s = 0.0;

    let rejection = if since < puzzle.rhythm.min_interval_s {
        Some(PumpRejection::TooFast)
    } else if puzzle.pressure > c.pressure_max {
        Some(PumpRejection::OverPressure)
    } else {
        None
    };
    if let Some(reason) = rejection {
        puzzle.pressure += c.pressure_penalty;
        return Ok(PumpOutcome::Rejected(reason));
    }

    let (cooling, chance) = pressure_band(&content.thermal.pressure_bands, puzzle.pressure)
        .map_or((0.0, 0.0), |band| (band.cooling, band.bottleneck_chance));

    if puzzle.immunity_s <= 0.0 && rng.gen::<f32>() < chance {
        let lo = c.bottleneck_min_steps;
        let hi = c.bottleneck_max_steps.max(lo);
        let steps = rng.gen_range(lo..=hi);
        let sequence = (0..steps)
            .map(|_| WireColor::ALL[rng.gen_range(0..WireColor::ALL.len())])
            .collect();
        puzzle.bottleneck = Some(Bottleneck { sequence, index: 0 });
        return Ok(PumpOutcome::BottleneckOpened { steps });
    }

    let cooling = cooling * puzzle.rhythm.pump_multiplier;
    let floor = c.thermal_min_heat;
    if matches!(valve, Valve::Front | Valve::Common) {
        puzzle.front_heat = (puzzle.front_heat - cooling).max(floor);
    }
    if matches!(valve, Valve::Back | Valve::Common) {
        puzzle.back_heat = (puzzle.back_heat - cooling).max(floor);
    }
    Ok(PumpOutcome::Cooled { cooling })
}

pub(crate) fn enter_bottleneck_color(
    puzzle: &mut ThermalPuzzle,
    color: WireColor,
    immunity_s: f32,
) -> Result<BottleneckStep, RejectReason> {
    let Some(bottleneck) = puzzle.bottleneck.as_mut() else {
        return Err(RejectReason::NoActivePuzzle);
    };
    if bottleneck.sequence.get(bottleneck.index) != Some(&color) {
        bottleneck.index = 0;
        return Ok(BottleneckStep::Wrong);
    }
    bottleneck.index += 1;
    if bottleneck.index < bottleneck.sequence.len() {
        return Ok(BottleneckStep::Advanced);
    }
    puzzle.bottleneck = None;
    puzzle.immunity_s = immunity_s;
    Ok(BottleneckStep::Cleared)
}

fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    if current < target {
        (current + max_step).min(target)
    } else {
        (current - max_step).max(target)
    }
}

/// One fixed step of heating and needle movement. Does nothing until armed.
pub(crate) fn advance(puzzle: &mut ThermalPuzzle, c: &Constants, dt: f32) -> ThermalProgress {
    if !puzzle.armed {
        return ThermalProgress::Running;
    }

    puzzle.since_last_pump_s += dt;
    puzzle.immunity_s = (puzzle.immunity_s - dt).max(0.0);

    let heat = puzzle.heat_rate * dt;
    let (front_factor, back_factor) = match puzzle.active_valve {
        Valve::Front => (c.thermal_active_heat_factor, c.thermal_inactive_heat_factor),
        Valve::Back => (c.thermal_inactive_heat_factor, c.thermal_active_heat_factor),
        Valve::Common => (1.0, 1.0),
    };
    puzzle.front_heat += heat * front_factor;
    puzzle.back_heat += heat * back_factor;

    let t = puzzle.since_last_pump_s;
    let max_interval = puzzle.rhythm.max_interval_s.max(f32::EPSILON);
    if t <= max_interval {
        let target = c.pressure_max * t / max_interval;
        puzzle.pressure = approach(puzzle.pressure, target, c.pressure_rise_rate * dt);
    } else {
        let fall = c.pressure_fall_rate * (1.0 + (t - max_interval)) * dt;
        puzzle.pressure = (puzzle.pressure - fall).max(0.0);
    }

    if puzzle.front_heat >= c.thermal_max_heat || puzzle.back_heat >= c.thermal_max_heat {
        puzzle.front_heat = puzzle.front_heat.min(c.thermal_max_heat);
        puzzle.back_heat = puzzle.back_heat.min(c.thermal_max_heat);
        return ThermalProgress::Overheated;
    }

    puzzle.remaining_s -= dt;
    if puzzle.remaining_s <= 0.0 {
        puzzle.remaining_s = 0.0;
        return ThermalProgress::Held;
    }
    ThermalProgress::Running
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

pub(crate) fn handle_arm(
    state: &mut GameState,
    station_id: &StationId,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::thermal_mut(&mut state.stations, station_id)?;
    if arm(puzzle) {
        events.push(crate::emit(
            &mut state.counters,
            tick,
            Event::ThermalArmed {
                station_id: station_id.clone(),
            },
        ));
    }
    Ok(())
}

pub(crate) fn handle_select_valve(
    state: &mut GameState,
    station_id: &StationId,
    valve: Valve,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::thermal_mut(&mut state.stations, station_id)?;
    if puzzle.active_valve == valve {
        return Ok(());
    }
    puzzle.active_valve = valve;
    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::ValveSelected {
            station_id: station_id.clone(),
            valve,
        },
    ));
    Ok(())
}

pub(crate) fn handle_pump(
    state: &mut GameState,
    content: &GameContent,
    station_id: &StationId,
    valve: Valve,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::thermal_mut(&mut state.stations, station_id)?;
    let event = match pump(puzzle, valve, content, rng)? {
        PumpOutcome::Rejected(reason) => Event::PumpRejected {
            station_id: station_id.clone(),
            reason,
        },
        PumpOutcome::Cooled { cooling } => Event::PumpAccepted {
            station_id: station_id.clone(),
            valve,
            cooling,
        },
        PumpOutcome::BottleneckOpened { steps } => {
            super::bump_stat(&mut state.stats, StatType::Bottlenecks);
            Event::BottleneckOpened {
                station_id: station_id.clone(),
                steps,
            }
        }
    };
    events.push(crate::emit(&mut state.counters, tick, event));
    Ok(())
}

pub(crate) fn handle_bottleneck_color(
    state: &mut GameState,
    content: &GameContent,
    station_id: &StationId,
    color: WireColor,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::thermal_mut(&mut state.stations, station_id)?;
    match enter_bottleneck_color(puzzle, color, content.constants.bottleneck_immunity_s)? {
        BottleneckStep::Advanced => {}
        BottleneckStep::Cleared => events.push(crate::emit(
            &mut state.counters,
            tick,
            Event::BottleneckCleared {
                station_id: station_id.clone(),
            },
        )),
        BottleneckStep::Wrong => {
            super::record_mistake(state, station_id, MistakeKind::WrongBottleneckColor, events);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, make_rng};

    fn armed_puzzle(content: &GameContent) -> ThermalPuzzle {
        let mut rng = make_rng();
        let mut puzzle = generate(content, &mut rng);
        arm(&mut puzzle);
        puzzle
    }

    fn no_bottleneck_content() -> GameContent {
        let mut content = base_content();
        for band in &mut content.thermal.pressure_bands {
            band.bottleneck_chance = 0.0;
        }
        content
    }

    #[test]
    fn generate_uses_configured_ranges() {
        let content = base_content();
        let mut rng = make_rng();
        for _ in 0..20 {
            let puzzle = generate(&content, &mut rng);
            let c = &content.constants;
            assert!(puzzle.heat_rate >= c.thermal_heat_rate_min);
            assert!(puzzle.heat_rate <= c.thermal_heat_rate_max);
            assert!(content
                .thermal
                .rhythm_profiles
                .iter()
                .any(|p| p.id == puzzle.rhythm.id));
            assert!(!puzzle.armed);
            assert!(puzzle.bottleneck.is_none());
        }
    }

    #[test]
    fn unarmed_puzzle_does_not_heat() {
        let content = base_content();
        let mut rng = make_rng();
        let mut puzzle = generate(&content, &mut rng);
        let before = puzzle.front_heat;
        for _ in 0..100 {
            advance(&mut puzzle, &content.constants, 0.1);
        }
        assert!((puzzle.front_heat - before).abs() < f32::EPSILON);
    }

    #[test]
    fn active_side_heats_slower() {
        let content = base_content();
        let mut puzzle = armed_puzzle(&content);
        puzzle.active_valve = Valve::Front;
        advance(&mut puzzle, &content.constants, 1.0);
        assert!(puzzle.front_heat < puzzle.back_heat);
    }

    #[test]
    fn pump_on_inactive_valve_does_nothing() {
        let content = no_bottleneck_content();
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.active_valve = Valve::Back;
        puzzle.since_last_pump_s = 1.0;
        puzzle.front_heat = 50.0;
        let outcome = pump(&mut puzzle, Valve::Front, &content, &mut rng).unwrap();
        assert_eq!(outcome, PumpOutcome::Rejected(PumpRejection::WrongValve));
        assert!((puzzle.front_heat - 50.0).abs() < f32::EPSILON);
        assert!((puzzle.since_last_pump_s - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pump_before_arming_is_rejected() {
        let content = base_content();
        let mut rng = make_rng();
        let mut puzzle = generate(&content, &mut rng);
        assert_eq!(
            pump(&mut puzzle, Valve::Front, &content, &mut rng),
            Err(RejectReason::NotArmed)
        );
    }

    #[test]
    fn too_fast_pump_adds_pressure_penalty() {
        let content = no_bottleneck_content();
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.front_heat = 60.0;
        puzzle.since_last_pump_s = puzzle.rhythm.min_interval_s / 2.0;
        let pressure = puzzle.pressure;
        let outcome = pump(&mut puzzle, Valve::Front, &content, &mut rng).unwrap();
        assert_eq!(outcome, PumpOutcome::Rejected(PumpRejection::TooFast));
        assert!(puzzle.pressure > pressure);
        assert!((puzzle.front_heat - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn over_range_pump_is_rejected() {
        let content = no_bottleneck_content();
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.since_last_pump_s = puzzle.rhythm.max_interval_s;
        puzzle.pressure = content.constants.pressure_max + 1.0;
        let outcome = pump(&mut puzzle, Valve::Front, &content, &mut rng).unwrap();
        assert_eq!(outcome, PumpOutcome::Rejected(PumpRejection::OverPressure));
    }

    #[test]
    fn cooling_never_drops_below_floor() {
        let mut content = no_bottleneck_content();
        for band in &mut content.thermal.pressure_bands {
            band.cooling = 500.0;
        }
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.active_valve = Valve::Common;
        puzzle.front_heat = 40.0;
        puzzle.back_heat = 90.0;
        puzzle.since_last_pump_s = puzzle.rhythm.max_interval_s;
        puzzle.pressure = content.constants.pressure_max / 2.0;
        let outcome = pump(&mut puzzle, Valve::Common, &content, &mut rng).unwrap();
        assert!(matches!(outcome, PumpOutcome::Cooled { .. }));
        let floor = content.constants.thermal_min_heat;
        assert!((puzzle.front_heat - floor).abs() < f32::EPSILON);
        assert!((puzzle.back_heat - floor).abs() < f32::EPSILON);
    }

    #[test]
    fn cooling_applies_only_to_pumped_side() {
        let content = no_bottleneck_content();
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.active_valve = Valve::Back;
        puzzle.front_heat = 70.0;
        puzzle.back_heat = 70.0;
        puzzle.since_last_pump_s = puzzle.rhythm.max_interval_s;
        puzzle.pressure = content.constants.pressure_max / 2.0;
        pump(&mut puzzle, Valve::Back, &content, &mut rng).unwrap();
        assert!((puzzle.front_heat - 70.0).abs() < f32::EPSILON);
        assert!(puzzle.back_heat < 70.0);
    }

    #[test]
    fn certain_bottleneck_opens_and_blocks_pumps() {
        let mut content = base_content();
        for band in &mut content.thermal.pressure_bands {
            band.bottleneck_chance = 1.0;
        }
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.since_last_pump_s = puzzle.rhythm.max_interval_s;
        let outcome = pump(&mut puzzle, Valve::Front, &content, &mut rng).unwrap();
        let PumpOutcome::BottleneckOpened { steps } = outcome else {
            panic!("expected bottleneck, got {outcome:?}");
        };
        assert!((3..=6).contains(&steps));

        puzzle.since_last_pump_s = puzzle.rhythm.max_interval_s;
        let again = pump(&mut puzzle, Valve::Front, &content, &mut rng).unwrap();
        assert_eq!(again, PumpOutcome::Rejected(PumpRejection::BottleneckOpen));
    }

    #[test]
    fn wrong_bottleneck_color_resets_index() {
        let content = base_content();
        let mut puzzle = armed_puzzle(&content);
        puzzle.bottleneck = Some(Bottleneck {
            sequence: vec![WireColor::Red, WireColor::Blue, WireColor::Red],
            index: 0,
        });
        assert_eq!(
            enter_bottleneck_color(&mut puzzle, WireColor::Red, 2.0),
            Ok(BottleneckStep::Advanced)
        );
        assert_eq!(
            enter_bottleneck_color(&mut puzzle, WireColor::Green, 2.0),
            Ok(BottleneckStep::Wrong)
        );
        assert_eq!(puzzle.bottleneck.as_ref().unwrap().index, 0);
    }

    #[test]
    fn completed_bottleneck_grants_immunity() {
        let mut content = base_content();
        for band in &mut content.thermal.pressure_bands {
            band.bottleneck_chance = 1.0;
        }
        let mut rng = make_rng();
        let mut puzzle = armed_puzzle(&content);
        puzzle.bottleneck = Some(Bottleneck {
            sequence: vec![WireColor::Yellow, WireColor::Green, WireColor::Blue],
            index: 0,
        });
        for color in [WireColor::Yellow, WireColor::Green] {
            enter_bottleneck_color(&mut puzzle, color, 2.0).unwrap();
        }
        assert_eq!(
            enter_bottleneck_color(&mut puzzle, WireColor::Blue, 2.0),
            Ok(BottleneckStep::Cleared)
        );
        assert!(puzzle.bottleneck.is_none());

        // Immune: a guaranteed bottleneck band still cools.
        puzzle.since_last_pump_s = puzzle.rhythm.max_interval_s;
        let outcome = pump(&mut puzzle, Valve::Front, &content, &mut rng).unwrap();
        assert!(matches!(outcome, PumpOutcome::Cooled { .. }));
    }

    #[test]
    fn overheating_fails_before_timer() {
        let content = base_content();
        let mut puzzle = armed_puzzle(&content);
        puzzle.back_heat = content.constants.thermal_max_heat - 0.01;
        puzzle.remaining_s = 0.05;
        let progress = advance(&mut puzzle, &content.constants, 0.1);
        assert_eq!(progress, ThermalProgress::Overheated);
    }

    #[test]
    fn timer_expiry_below_threshold_holds() {
        let content = base_content();
        let mut puzzle = armed_puzzle(&content);
        puzzle.remaining_s = 0.1;
        let progress = advance(&mut puzzle, &content.constants, 0.1);
        assert_eq!(progress, ThermalProgress::Held);
    }

    #[test]
    fn needle_rises_then_falls_after_max_interval() {
        let content = base_content();
        let mut puzzle = armed_puzzle(&content);
        let max_interval = puzzle.rhythm.max_interval_s;
        let dt = 0.1;
        let mut t = 0.0;
        let mut peak = 0.0_f32;
        while t < max_interval {
            advance(&mut puzzle, &content.constants, dt);
            peak = peak.max(puzzle.pressure);
            t += dt;
        }
        assert!(peak > 0.0);
        for _ in 0..30 {
            advance(&mut puzzle, &content.constants, dt);
        }
        assert!(puzzle.pressure < peak);
        assert!(puzzle.pressure >= 0.0);
    }

    #[test]
    fn band_lookup_clamps_to_last_band() {
        let content = base_content();
        let bands = &content.thermal.pressure_bands;
        assert_eq!(
            pressure_band(bands, 0.0).map(|b| b.upto),
            bands.first().map(|b| b.upto)
        );
        assert_eq!(
            pressure_band(bands, 10_000.0).map(|b| b.upto),
            bands.last().map(|b| b.upto)
        );
        assert!(pressure_band(&[], 1.0).is_none());
    }
}
