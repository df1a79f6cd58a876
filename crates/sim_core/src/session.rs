//! Lobby, role assignment and round boundaries.

use crate::{
    Event, EventEnvelope, GameContent, GameState, PlayerId, PlayerState, RejectReason, Role,
    RoundOutcome, RoundState, SessionPhase, StationStatus, StressState,
};

pub(crate) fn select_role(
    state: &mut GameState,
    player_id: &PlayerId,
    role: Role,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    if state.phase != SessionPhase::Lobby {
        return Err(RejectReason::WrongPhase);
    }
    if state
        .player_with_role(role)
        .is_some_and(|holder| &holder.id != player_id)
    {
        return Err(RejectReason::RoleTaken);
    }
    let player = state
        .players
        .entry(player_id.clone())
        .or_insert_with(|| PlayerState {
            id: player_id.clone(),
            role: None,
        });
    if player.role == Some(role) {
        return Ok(());
    }
    player.role = Some(role);
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::RoleSelected {
            player_id: player_id.clone(),
            role,
        },
    ));
    Ok(())
}

pub(crate) fn start_round(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl rand::Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    if state.phase != SessionPhase::Lobby {
        return Err(RejectReason::WrongPhase);
    }
    if state.player_with_role(Role::Engineer).is_none()
        || state.player_with_role(Role::Technician).is_none()
    {
        return Err(RejectReason::RolesIncomplete);
    }

    let c = &content.constants;
    crate::station::reset_stations(state, StationStatus::Operational);
    state.flood = crate::FloodState::default();
    state.stress = StressState::inactive(c.stress_grace_s);
    state.round = RoundState {
        elapsed_s: 0.0,
        remaining_s: c.round_duration_s,
    };
    state.stats.clear();
    state.meta.session_id = crate::generate_uuid(rng);
    state.phase = SessionPhase::Running;

    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::RoundStarted {
            session_id: state.meta.session_id,
        },
    ));
    Ok(())
}

pub(crate) fn return_to_lobby(
    state: &mut GameState,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    if !matches!(state.phase, SessionPhase::Ended { .. }) {
        return Err(RejectReason::WrongPhase);
    }
    crate::station::reset_stations(state, StationStatus::Default);
    state.phase = SessionPhase::Lobby;
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::ReturnedToLobby,
    ));
    Ok(())
}

pub(crate) fn end_round(
    state: &mut GameState,
    outcome: RoundOutcome,
    events: &mut Vec<EventEnvelope>,
) {
    state.phase = SessionPhase::Ended { outcome };
    events.push(crate::emit(
        &mut state.counters,
        state.meta.tick,
        Event::RoundEnded {
            outcome,
            elapsed_s: state.round.elapsed_s,
        },
    ));
}

/// Advance the round clock. Returns `true` once time has run out.
pub(crate) fn tick_round(state: &mut GameState, content: &GameContent) -> bool {
    let dt = content.constants.tick_seconds;
    state.round.elapsed_s += dt;
    state.round.remaining_s = (state.round.remaining_s - dt).max(0.0);
    state.round.remaining_s <= 0.0
}
