pub(crate) mod radar;
pub(crate) mod thermal;
pub(crate) mod wiring;

use std::collections::{BTreeMap, HashMap};

use crate::{
    CallSign, Event, EventEnvelope, GameContent, GameState, MistakeKind, PuzzleKind, PuzzleState,
    RadarPuzzle, RejectReason, StatType, StationId, StationState, StationStatus, ThermalPuzzle,
    WiringPuzzle,
};

pub(crate) fn bump_stat(stats: &mut HashMap<StatType, u32>, stat: StatType) {
    *stats.entry(stat).or_insert(0) += 1;
}

pub(crate) fn record_mistake(
    state: &mut GameState,
    station_id: &StationId,
    kind: MistakeKind,
    events: &mut Vec<EventEnvelope>,
) {
    bump_stat(&mut state.stats, StatType::RepairMistakes);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::RepairMistake {
            station_id: station_id.clone(),
            kind,
        },
    ));
}

fn generate_puzzle(
    kind: PuzzleKind,
    content: &GameContent,
    rng: &mut impl rand::Rng,
) -> PuzzleState {
    match kind {
        PuzzleKind::Wiring => PuzzleState::Wiring(wiring::generate(rng)),
        PuzzleKind::Thermal => PuzzleState::Thermal(thermal::generate(content, rng)),
        PuzzleKind::Radar => PuzzleState::Radar(radar::generate(content, rng)),
    }
}

/// Move a station to `to`. The only place station status changes during a
/// round.
///
/// Entering Broken creates the station's puzzle; leaving Broken drops it.
/// Wiring stations take room power down with them while Broken or Destroyed.
/// Destroyed is terminal. Returns `false` if nothing changed.
pub(crate) fn transition(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl rand::Rng,
    station_id: &StationId,
    to: StationStatus,
    events: &mut Vec<EventEnvelope>,
) -> bool {
    let tick = state.meta.tick;
    let Some(station) = state.stations.get_mut(station_id) else {
        return false;
    };
    let from = station.status;
    if from == to || from == StationStatus::Destroyed {
        return false;
    }

    let cuts_power = station.puzzle_kind == PuzzleKind::Wiring;
    let was_powered = station.powered;
    station.puzzle = match to {
        StationStatus::Broken => Some(generate_puzzle(station.puzzle_kind, content, rng)),
        StationStatus::Default | StationStatus::Operational | StationStatus::Destroyed => None,
    };
    station.status = to;
    if cuts_power {
        station.powered = matches!(to, StationStatus::Default | StationStatus::Operational);
    }
    let power_restored = cuts_power && !was_powered && station.powered;

    match to {
        StationStatus::Broken => bump_stat(&mut state.stats, StatType::Breakdowns),
        StationStatus::Operational if from == StationStatus::Broken => {
            bump_stat(&mut state.stats, StatType::Repairs);
        }
        StationStatus::Destroyed => bump_stat(&mut state.stats, StatType::Destructions),
        StationStatus::Default | StationStatus::Operational => {}
    }

    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::StationStatusChanged {
            station_id: station_id.clone(),
            from,
            to,
        },
    ));
    if power_restored {
        events.push(crate::emit(
            &mut state.counters,
            tick,
            Event::RoomPowerRestored {
                station_id: station_id.clone(),
            },
        ));
    }
    true
}

fn active_puzzle<'a>(
    stations: &'a mut BTreeMap<StationId, StationState>,
    station_id: &StationId,
) -> Result<&'a mut PuzzleState, RejectReason> {
    let station = stations
        .get_mut(station_id)
        .ok_or(RejectReason::UnknownStation)?;
    station.puzzle.as_mut().ok_or(RejectReason::NoActivePuzzle)
}

pub(crate) fn wiring_mut<'a>(
    stations: &'a mut BTreeMap<StationId, StationState>,
    station_id: &StationId,
) -> Result<&'a mut WiringPuzzle, RejectReason> {
    match active_puzzle(stations, station_id)? {
        PuzzleState::Wiring(puzzle) => Ok(puzzle),
        PuzzleState::Thermal(_) | PuzzleState::Radar(_) => Err(RejectReason::NoActivePuzzle),
    }
}

pub(crate) fn thermal_mut<'a>(
    stations: &'a mut BTreeMap<StationId, StationState>,
    station_id: &StationId,
) -> Result<&'a mut ThermalPuzzle, RejectReason> {
    match active_puzzle(stations, station_id)? {
        PuzzleState::Thermal(puzzle) => Ok(puzzle),
        PuzzleState::Wiring(_) | PuzzleState::Radar(_) => Err(RejectReason::NoActivePuzzle),
    }
}

pub(crate) fn radar_mut<'a>(
    stations: &'a mut BTreeMap<StationId, StationState>,
    station_id: &StationId,
) -> Result<&'a mut RadarPuzzle, RejectReason> {
    match active_puzzle(stations, station_id)? {
        PuzzleState::Radar(puzzle) => Ok(puzzle),
        PuzzleState::Wiring(_) | PuzzleState::Thermal(_) => Err(RejectReason::NoActivePuzzle),
    }
}

/// Result of advancing one puzzle by a fixed step.
#[derive(Default)]
struct PuzzleProgress {
    timed_out: Vec<CallSign>,
    resolve_to: Option<StationStatus>,
}

fn advance_puzzle(
    puzzle: &mut PuzzleState,
    content: &GameContent,
    dt: f32,
) -> PuzzleProgress {
    let c = &content.constants;
    match puzzle {
        PuzzleState::Wiring(_) => PuzzleProgress::default(),
        PuzzleState::Thermal(thermal) => PuzzleProgress {
            timed_out: Vec::new(),
            resolve_to: match thermal::advance(thermal, c, dt) {
                thermal::ThermalProgress::Running => None,
                thermal::ThermalProgress::Overheated => Some(StationStatus::Destroyed),
                thermal::ThermalProgress::Held => Some(StationStatus::Operational),
            },
        },
        PuzzleState::Radar(radar) => {
            let timed_out = radar::advance(radar, c, dt);
            let resolve_to = radar.threats.is_empty().then_some(StationStatus::Operational);
            PuzzleProgress {
                timed_out,
                resolve_to,
            }
        }
    }
}

/// Advance every active puzzle by one tick, in station id order.
pub(crate) fn tick_stations(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl rand::Rng,
    events: &mut Vec<EventEnvelope>,
) {
    let dt = content.constants.tick_seconds;
    let tick = state.meta.tick;
    let broken: Vec<StationId> = state
        .stations
        .values()
        .filter(|s| s.status == StationStatus::Broken)
        .map(|s| s.id.clone())
        .collect();

    for station_id in &broken {
        let Some(puzzle) = state
            .stations
            .get_mut(station_id)
            .and_then(|s| s.puzzle.as_mut())
        else {
            continue;
        };
        let progress = advance_puzzle(puzzle, content, dt);

        for call_sign in progress.timed_out {
            bump_stat(&mut state.stats, StatType::ThreatTimeouts);
            events.push(crate::emit(
                &mut state.counters,
                tick,
                Event::ThreatTimedOut {
                    station_id: station_id.clone(),
                    call_sign,
                },
            ));
            record_mistake(state, station_id, MistakeKind::ThreatTimeout, events);
        }
        if let Some(to) = progress.resolve_to {
            transition(state, content, rng, station_id, to, events);
        }
    }
}

/// Put every station back to its pre-round state. Bypasses `transition`
/// because Destroyed stations are restored here.
pub(crate) fn reset_stations(state: &mut GameState, status: StationStatus) {
    for station in state.stations.values_mut() {
        station.status = status;
        station.puzzle = None;
        station.powered = true;
    }
}
