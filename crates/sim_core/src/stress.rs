//! Stress selector. After the grace period stress builds up passively and a
//! periodic roll against it breaks an operational station.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    Event, EventEnvelope, EventLevel, GameContent, GameState, StationStatus, StationTier,
    StressEventDef, StressPhase,
};

fn set_phase(state: &mut GameState, to: StressPhase, timer_s: f32, events: &mut Vec<EventEnvelope>) {
    let from = state.stress.phase;
    state.stress.phase = to;
    state.stress.phase_timer_s = timer_s;
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::StressPhaseChanged { from, to },
    ));
}

/// Selection weight of one stress event against current stats and tiers.
pub(crate) fn event_weight(state: &GameState, content: &GameContent, def: &StressEventDef) -> f32 {
    let mut weight = def.base_weight;
    if def.condition.holds(state.stat(def.stat), def.threshold) {
        weight *= def.multiplier;
    }
    let vital = state
        .stations
        .get(&def.station)
        .is_some_and(|s| s.tier == StationTier::Vital);
    if vital {
        weight *= content.constants.stress_vital_weight_multiplier;
    }
    weight.max(0.0)
}

fn pick_event<'a>(
    state: &GameState,
    content: &'a GameContent,
    rng: &mut impl Rng,
) -> Option<&'a StressEventDef> {
    let candidates: Vec<&StressEventDef> = content
        .stress_events
        .iter()
        .filter(|def| {
            state
                .stations
                .get(&def.station)
                .is_some_and(|s| s.status == StationStatus::Operational)
        })
        .collect();
    candidates
        .choose_weighted(rng, |def| event_weight(state, content, def))
        .ok()
        .copied()
}

/// Returns `true` if a station was broken.
fn fire(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> bool {
    let Some(def) = pick_event(state, content, rng) else {
        return false;
    };
    let stress = state.stress.stress;
    crate::station::transition(state, content, rng, &def.station, StationStatus::Broken, events);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::StressEventFired {
            event_id: def.id.clone(),
            station_id: def.station.clone(),
            stress,
        },
    ));
    state.stress.stress = 0.0;
    set_phase(
        state,
        StressPhase::Cooldown,
        content.constants.stress_cooldown_s,
        events,
    );
    true
}

pub(crate) fn tick_stress(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let c = &content.constants;
    let dt = c.tick_seconds;

    match state.stress.phase {
        StressPhase::Inactive | StressPhase::Cooldown => {
            state.stress.phase_timer_s -= dt;
            if state.stress.phase_timer_s <= 0.0 {
                state.stress.passive_timer_s = c.stress_passive_interval_s;
                state.stress.roll_timer_s = c.stress_roll_interval_s;
                set_phase(state, StressPhase::Active, 0.0, events);
            }
        }
        StressPhase::Active => {
            state.stress.passive_timer_s -= dt;
            if state.stress.passive_timer_s <= 0.0 {
                state.stress.passive_timer_s += c.stress_passive_interval_s;
                state.stress.stress =
                    (state.stress.stress + c.stress_passive_amount).min(c.stress_max);
            }

            if state.stress.stress >= c.stress_max {
                fire(state, content, rng, events);
                return;
            }

            state.stress.roll_timer_s -= dt;
            if state.stress.roll_timer_s > 0.0 || c.stress_max <= 0.0 {
                return;
            }
            state.stress.roll_timer_s += c.stress_roll_interval_s;
            let rolled: f32 = rng.gen_range(0.0..c.stress_max);
            let stress = state.stress.stress;
            let fired = rolled < stress && fire(state, content, rng, events);
            if event_level == EventLevel::Debug {
                events.push(crate::emit(
                    &mut state.counters,
                    state.meta.tick,
                    Event::StressRoll {
                        stress,
                        rolled,
                        fired,
                    },
                ));
            }
        }
    }
}
