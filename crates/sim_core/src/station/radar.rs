//! Radar / rules-of-engagement board.
//!
//! The technician sees threats by call sign, distance and speed. Selecting one
//! streams its three symbols to the engineer console, where they identify the
//! object on the board and check it against the day's rule.

use std::collections::BTreeSet;

use rand::seq::{index, SliceRandom};
use rand::Rng;
use smallvec::SmallVec;

use crate::{
    BoardEntry, CallSign, Category, Constants, EngagementRule, Event, EventEnvelope, GameContent,
    GameState, MistakeKind, RadarObjectDef, RadarPuzzle, RejectReason, RuleDef, StationId,
    StationStatus, Symbol, SymbolLoop, Threat, ThreatAction, SYMBOLS_PER_OBJECT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub correct: bool,
    pub mistake: Option<MistakeKind>,
}

fn hold_fire_rule() -> RuleDef {
    RuleDef {
        id: "hold_fire".to_string(),
        text: "Hold fire on all contacts".to_string(),
        predicate: EngagementRule::AllOf { categories: vec![] },
    }
}

fn sample_range(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Three distinct symbols whose set is not already on the board.
/// `None` once `attempts` draws all collided.
fn unique_signature(
    rng: &mut impl Rng,
    symbol_count: u8,
    attempts: u32,
    taken: &mut BTreeSet<[Symbol; SYMBOLS_PER_OBJECT]>,
) -> Option<[Symbol; SYMBOLS_PER_OBJECT]> {
    if usize::from(symbol_count) < SYMBOLS_PER_OBJECT {
        return None;
    }
    for _ in 0..attempts.max(1) {
        let picks = index::sample(rng, usize::from(symbol_count), SYMBOLS_PER_OBJECT);
        let mut symbols = [Symbol(0); SYMBOLS_PER_OBJECT];
        for (slot, pick) in symbols.iter_mut().zip(picks.iter()) {
            // pick < symbol_count <= u8::MAX
            *slot = Symbol(u8::try_from(pick).unwrap_or(u8::MAX));
        }
        let mut key = symbols;
        key.sort_unstable();
        if taken.insert(key) {
            return Some(symbols);
        }
    }
    None
}

fn build_board(
    objects: &[RadarObjectDef],
    c: &Constants,
    rng: &mut impl Rng,
) -> Vec<BoardEntry> {
    let mut taken = BTreeSet::new();
    objects
        .choose_multiple(rng, c.radar_board_size)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .filter_map(|object| {
            let symbols = unique_signature(
                rng,
                c.radar_symbol_count,
                c.radar_signature_attempts,
                &mut taken,
            )?;
            Some(BoardEntry {
                object_id: object.id,
                name: object.name,
                categories: object.categories.into_iter().collect::<SmallVec<[Category; 4]>>(),
                symbols,
            })
        })
        .collect()
}

fn call_sign_for(pool: &[String], index: usize) -> CallSign {
    if pool.is_empty() {
        return CallSign(format!("CONTACT-{}", index + 1));
    }
    let base = &pool[index % pool.len()];
    let lap = index / pool.len();
    if lap == 0 {
        CallSign(base.clone())
    } else {
        CallSign(format!("{base}-{}", lap + 1))
    }
}

pub(crate) fn generate(content: &GameContent, rng: &mut impl Rng) -> RadarPuzzle {
    let c = &content.constants;
    let radar = &content.radar;

    let rule = radar
        .rules
        .choose(rng)
        .cloned()
        .unwrap_or_else(hold_fire_rule);
    let board = build_board(&radar.objects, c, rng);

    let mut pool = radar.call_signs.clone();
    pool.shuffle(rng);

    let mut threats = Vec::new();
    if !board.is_empty() {
        let lo = c.threat_count_min;
        let count = rng.gen_range(lo..=c.threat_count_max.max(lo));
        for i in 0..count {
            let board_index = rng.gen_range(0..board.len());
            let (distance, speed) = match radar
                .threat_profiles
                .choose_weighted(rng, |profile| profile.weight)
            {
                Ok(profile) => (
                    sample_range(rng, profile.distance_min, profile.distance_max),
                    sample_range(rng, profile.speed_min, profile.speed_max),
                ),
                Err(_) => (c.radar_evade_distance * 4.0, 1.0),
            };
            threats.push(Threat {
                call_sign: call_sign_for(&pool, i),
                board_index,
                distance,
                speed,
            });
        }
    }

    RadarPuzzle {
        rule,
        board,
        threats,
        selected: None,
        selection_cooldown_s: 0.0,
        display: None,
    }
}

pub(crate) fn select_threat(
    puzzle: &mut RadarPuzzle,
    call_sign: &CallSign,
    c: &Constants,
) -> Result<(), RejectReason> {
    if puzzle.selection_cooldown_s > 0.0 {
        return Err(RejectReason::SelectionCooldown);
    }
    let threat = puzzle
        .threats
        .iter()
        .find(|t| &t.call_sign == call_sign)
        .ok_or(RejectReason::UnknownThreat)?;
    let symbols = puzzle
        .board
        .get(threat.board_index)
        .ok_or(RejectReason::UnknownThreat)?
        .symbols;

    puzzle.selected = Some(call_sign.clone());
    puzzle.display = Some(SymbolLoop {
        call_sign: call_sign.clone(),
        symbols,
        index: 0,
        remaining_s: c.radar_symbol_display_s,
    });
    puzzle.selection_cooldown_s = c.radar_selection_cooldown_s;
    Ok(())
}

fn forget(puzzle: &mut RadarPuzzle, call_sign: &CallSign) {
    if puzzle.selected.as_ref() == Some(call_sign) {
        puzzle.selected = None;
    }
    if puzzle
        .display
        .as_ref()
        .is_some_and(|display| &display.call_sign == call_sign)
    {
        puzzle.display = None;
    }
}

/// Resolve a threat. Evade is only accepted inside the evade range.
/// Every accepted action removes the threat.
pub(crate) fn submit_action(
    puzzle: &mut RadarPuzzle,
    call_sign: &CallSign,
    action: ThreatAction,
    c: &Constants,
) -> Result<Resolution, RejectReason> {
    let position = puzzle
        .threats
        .iter()
        .position(|t| &t.call_sign == call_sign)
        .ok_or(RejectReason::UnknownThreat)?;
    let threat = &puzzle.threats[position];

    let resolution = match action {
        ThreatAction::Evade => {
            if threat.distance > c.radar_evade_distance {
                return Err(RejectReason::OutOfEvadeRange);
            }
            Resolution {
                correct: true,
                mistake: Some(MistakeKind::Evaded),
            }
        }
        ThreatAction::Shoot | ThreatAction::Pass => {
            let categories = puzzle
                .board
                .get(threat.board_index)
                .map_or(&[][..], |entry| entry.categories.as_slice());
            let shoot = crate::should_shoot(&puzzle.rule.predicate, categories);
            let correct = shoot == (action == ThreatAction::Shoot);
            Resolution {
                correct,
                mistake: (!correct).then_some(MistakeKind::WrongEngagement),
            }
        }
    };

    puzzle.threats.remove(position);
    forget(puzzle, call_sign);
    Ok(resolution)
}

/// Move threats in, expire the ones that arrive, cycle the symbol display.
/// Returns the call signs that timed out this step.
pub(crate) fn advance(puzzle: &mut RadarPuzzle, c: &Constants, dt: f32) -> Vec<CallSign> {
    puzzle.selection_cooldown_s = (puzzle.selection_cooldown_s - dt).max(0.0);

    let mut timed_out = Vec::new();
    puzzle.threats.retain_mut(|threat| {
        threat.distance -= threat.speed * dt;
        if threat.distance <= 0.0 {
            timed_out.push(threat.call_sign.clone());
            false
        } else {
            true
        }
    });
    for call_sign in &timed_out {
        forget(puzzle, call_sign);
    }

    if let Some(display) = puzzle.display.as_mut() {
        display.remaining_s -= dt;
        if display.remaining_s <= 0.0 {
            display.index = (display.index + 1) % SYMBOLS_PER_OBJECT;
            display.remaining_s = c.radar_symbol_display_s;
        }
    }
    timed_out
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

pub(crate) fn handle_select_threat(
    state: &mut GameState,
    content: &GameContent,
    station_id: &StationId,
    call_sign: &CallSign,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::radar_mut(&mut state.stations, station_id)?;
    select_threat(puzzle, call_sign, &content.constants)?;
    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::ThreatSelected {
            station_id: station_id.clone(),
            call_sign: call_sign.clone(),
        },
    ));
    Ok(())
}

pub(crate) fn handle_submit_action(
    state: &mut GameState,
    content: &GameContent,
    station_id: &StationId,
    call_sign: &CallSign,
    action: ThreatAction,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::radar_mut(&mut state.stations, station_id)?;
    let resolution = submit_action(puzzle, call_sign, action, &content.constants)?;
    let cleared = puzzle.threats.is_empty();

    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::ThreatResolved {
            station_id: station_id.clone(),
            call_sign: call_sign.clone(),
            action,
            correct: resolution.correct,
        },
    ));
    if let Some(kind) = resolution.mistake {
        super::record_mistake(state, station_id, kind, events);
    }
    if cleared {
        super::transition(
            state,
            content,
            rng,
            station_id,
            StationStatus::Operational,
            events,
        );
    }
    Ok(())
}
