use rand::Rng;

use crate::station::{radar, thermal, wiring};
use crate::{
    session, Command, CommandEnvelope, Event, EventEnvelope, EventLevel, GameContent, GameState,
    RejectReason, SessionPhase,
};

/// Apply every command scheduled for the current tick, in submission order.
///
/// Invalid commands change nothing. At `EventLevel::Debug` each one leaves a
/// `CommandRejected` event behind.
pub(crate) fn apply_commands(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    rng: &mut impl Rng,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;

    for envelope in commands {
        if envelope.execute_at_tick != current_tick {
            continue;
        }
        let Err(reason) = apply_one(state, envelope, content, rng, events) else {
            continue;
        };
        if event_level == EventLevel::Debug {
            events.push(crate::emit(
                &mut state.counters,
                current_tick,
                Event::CommandRejected {
                    command_id: envelope.id.clone(),
                    reason,
                },
            ));
        }
    }
}

fn check_issuer(state: &GameState, envelope: &CommandEnvelope) -> Result<(), RejectReason> {
    let Some(required) = envelope.command.required_role() else {
        return Ok(());
    };
    if state.phase != SessionPhase::Running {
        return Err(RejectReason::WrongPhase);
    }
    let player = state
        .players
        .get(&envelope.issued_by)
        .ok_or(RejectReason::UnknownPlayer)?;
    if player.role != Some(required) {
        return Err(RejectReason::WrongRole);
    }
    Ok(())
}

fn apply_one(
    state: &mut GameState,
    envelope: &CommandEnvelope,
    content: &GameContent,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    check_issuer(state, envelope)?;

    match &envelope.command {
        Command::SelectRole { role } => {
            session::select_role(state, &envelope.issued_by, *role, events)
        }
        Command::StartRound => session::start_round(state, content, rng, events),
        Command::ReturnToLobby => session::return_to_lobby(state, events),
        Command::PlugCable {
            station_id,
            cable,
            port,
        } => wiring::handle_plug_cable(state, station_id, *cable, *port, events),
        Command::UnplugCable { station_id, cable } => {
            wiring::handle_unplug_cable(state, station_id, *cable, events)
        }
        Command::PressSwitch { station_id, switch } => {
            wiring::handle_press_switch(state, station_id, *switch, events)
        }
        Command::PullLever { station_id } => {
            wiring::handle_pull_lever(state, content, station_id, rng, events)
        }
        Command::ArmThermal { station_id } => thermal::handle_arm(state, station_id, events),
        Command::SelectValve { station_id, valve } => {
            thermal::handle_select_valve(state, station_id, *valve, events)
        }
        Command::PumpValve { station_id, valve } => {
            thermal::handle_pump(state, content, station_id, *valve, rng, events)
        }
        Command::EnterBottleneckColor { station_id, color } => {
            thermal::handle_bottleneck_color(state, content, station_id, *color, events)
        }
        Command::SelectThreat {
            station_id,
            call_sign,
        } => radar::handle_select_threat(state, content, station_id, call_sign, events),
        Command::SubmitThreatAction {
            station_id,
            call_sign,
            action,
        } => radar::handle_submit_action(
            state, content, station_id, call_sign, *action, rng, events,
        ),
    }
}
