use super::*;
use crate::test_fixtures::{
    base_content, base_state, command, make_rng, running_state, ENGINEER, TECHNICIAN,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod wiring;

// --- Shared test helpers ------------------------------------------------

fn test_content() -> GameContent {
    base_content()
}

/// Content with the stress selector and flood switched off, so only commands
/// change station state.
fn quiet_content() -> GameContent {
    let mut content = base_content();
    content.constants.stress_grace_s = 1.0e9;
    content.constants.flood_base_rate = 0.0;
    content.constants.flood_broken_penalty = 0.0;
    content
}

fn engineer(tick: u64, cmd: Command) -> CommandEnvelope {
    command(ENGINEER, tick, cmd)
}

fn technician(tick: u64, cmd: Command) -> CommandEnvelope {
    command(TECHNICIAN, tick, cmd)
}

fn station_of(content: &GameContent, kind: PuzzleKind) -> StationId {
    content
        .stations
        .iter()
        .find(|s| s.puzzle == kind)
        .map(|s| s.id.clone())
        .unwrap()
}

/// Running state with the first station of `kind` broken.
fn broken_station(
    content: &GameContent,
    kind: PuzzleKind,
    rng: &mut ChaCha8Rng,
) -> (GameState, StationId) {
    let mut state = running_state(content);
    let id = station_of(content, kind);
    let mut events = Vec::new();
    crate::station::transition(
        &mut state,
        content,
        rng,
        &id,
        StationStatus::Broken,
        &mut events,
    );
    (state, id)
}

fn wiring(state: &GameState, id: &StationId) -> WiringPuzzle {
    match state.stations[id].puzzle.as_ref() {
        Some(PuzzleState::Wiring(p)) => p.clone(),
        other => panic!("expected wiring puzzle, got {other:?}"),
    }
}

fn thermal(state: &GameState, id: &StationId) -> ThermalPuzzle {
    match state.stations[id].puzzle.as_ref() {
        Some(PuzzleState::Thermal(p)) => p.clone(),
        other => panic!("expected thermal puzzle, got {other:?}"),
    }
}

fn radar(state: &GameState, id: &StationId) -> RadarPuzzle {
    match state.stations[id].puzzle.as_ref() {
        Some(PuzzleState::Radar(p)) => p.clone(),
        other => panic!("expected radar puzzle, got {other:?}"),
    }
}

fn has_event(events: &[EventEnvelope], pred: impl Fn(&Event) -> bool) -> bool {
    events.iter().any(|e| pred(&e.event))
}

/// Tick with `commands` scheduled for the current tick.
fn step(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    rng: &mut ChaCha8Rng,
) -> Vec<EventEnvelope> {
    tick(state, commands, content, rng, EventLevel::Debug)
}
