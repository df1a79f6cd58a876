use rand::Rng;

use crate::commands::apply_commands;
use crate::{
    flood, session, station, stress, CommandEnvelope, EventEnvelope, EventLevel, GameContent,
    GameState, RoundOutcome, SessionPhase,
};

/// Advance the simulation by one tick.
///
/// Order of operations:
/// 1. Apply commands scheduled for this tick.
/// 2. If a round is running: advance the round clock, puzzles, stress and
///    flood, then end the round (flooding is checked before survival).
/// 3. Increment tick counter.
///
/// Returns all events produced this tick.
pub fn tick(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    rng: &mut impl Rng,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();

    apply_commands(state, commands, content, rng, event_level, &mut events);

    if state.phase == SessionPhase::Running {
        let out_of_time = session::tick_round(state, content);
        station::tick_stations(state, content, rng, &mut events);
        stress::tick_stress(state, content, rng, event_level, &mut events);
        let flooded = flood::tick_flood(state, content, rng, &mut events);

        if flooded {
            session::end_round(state, RoundOutcome::Flooded, &mut events);
        } else if out_of_time {
            session::end_round(state, RoundOutcome::Survived, &mut events);
        }
    }

    state.meta.tick += 1;
    events
}
