//! Wiring panel: the technician routes four cables into four ports while the
//! engineer reads status lights and keys the output colors into the switches.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    Cable, Event, EventEnvelope, GameState, LightState, MistakeKind, RejectReason, StationId,
    StationStatus, WireColor, WiringPuzzle, WIRE_COUNT,
};

pub(crate) fn generate(rng: &mut impl Rng) -> WiringPuzzle {
    let mut outputs = WireColor::ALL;
    outputs.shuffle(rng);
    let mut ports: [usize; WIRE_COUNT] = std::array::from_fn(|i| i);
    ports.shuffle(rng);
    let mut switch_labels = WireColor::ALL;
    switch_labels.shuffle(rng);

    let cables: [Cable; WIRE_COUNT] = std::array::from_fn(|i| Cable {
        id: i,
        color: WireColor::ALL[i],
        output_color: outputs[i],
        correct_port: ports[i],
        connected_port: None,
    });
    let solution = solution_for(&cables);
    let lights = status_lights(&cables);

    WiringPuzzle {
        cables,
        switch_labels,
        solution,
        input: Vec::new(),
        lights,
        attempts: 0,
    }
}

/// The switch sequence that repairs the panel: for each port in order, the
/// output color of the cable that belongs there.
pub fn solution_for(cables: &[Cable; WIRE_COUNT]) -> [WireColor; WIRE_COUNT] {
    let mut solution = [WireColor::Red; WIRE_COUNT];
    for cable in cables {
        solution[cable.correct_port] = cable.output_color;
    }
    solution
}

/// Engineer-side status lights.
///
/// All pending until every cable is plugged. After that the lights report how
/// many cables sit in their correct port, lit green from port 0 upward; they
/// do not say which cables are right.
pub fn status_lights(cables: &[Cable; WIRE_COUNT]) -> [LightState; WIRE_COUNT] {
    let plugged = cables.iter().filter(|c| c.connected_port.is_some()).count();
    if plugged < WIRE_COUNT {
        return [LightState::Pending; WIRE_COUNT];
    }
    let correct = cables
        .iter()
        .filter(|c| c.connected_port == Some(c.correct_port))
        .count();
    std::array::from_fn(|port| {
        if port < correct {
            LightState::Green
        } else {
            LightState::Red
        }
    })
}

/// Plug `cable` into `port`, evicting whichever cable held the port.
/// Returns the evicted cable id.
pub(crate) fn plug(
    puzzle: &mut WiringPuzzle,
    cable: usize,
    port: usize,
) -> Result<Option<usize>, RejectReason> {
    if cable >= WIRE_COUNT || port >= WIRE_COUNT {
        return Err(RejectReason::InvalidIndex);
    }
    let evicted = puzzle
        .cables
        .iter_mut()
        .find(|c| c.id != cable && c.connected_port == Some(port))
        .map(|c| {
            c.connected_port = None;
            c.id
        });
    puzzle.cables[cable].connected_port = Some(port);
    puzzle.lights = status_lights(&puzzle.cables);
    Ok(evicted)
}

pub(crate) fn unplug(puzzle: &mut WiringPuzzle, cable: usize) -> Result<(), RejectReason> {
    if cable >= WIRE_COUNT {
        return Err(RejectReason::InvalidIndex);
    }
    puzzle.cables[cable].connected_port = None;
    puzzle.lights = status_lights(&puzzle.cables);
    Ok(())
}

pub(crate) fn press_switch(
    puzzle: &mut WiringPuzzle,
    switch: usize,
) -> Result<WireColor, RejectReason> {
    let color = *puzzle
        .switch_labels
        .get(switch)
        .ok_or(RejectReason::InvalidIndex)?;
    puzzle.input.push(color);
    Ok(color)
}

/// Compare the keyed sequence against the solution. On any mismatch the panel
/// is replaced by a freshly generated one and the input is cleared.
pub(crate) fn pull_lever(puzzle: &mut WiringPuzzle, rng: &mut impl Rng) -> bool {
    if puzzle.input.as_slice() == puzzle.solution.as_slice() {
        return true;
    }
    let attempts = puzzle.attempts + 1;
    *puzzle = generate(rng);
    puzzle.attempts = attempts;
    false
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

pub(crate) fn handle_plug_cable(
    state: &mut GameState,
    station_id: &StationId,
    cable: usize,
    port: usize,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::wiring_mut(&mut state.stations, station_id)?;
    let before = puzzle.lights;
    let evicted = plug(puzzle, cable, port)?;
    let lights = puzzle.lights;

    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::CablePlugged {
            station_id: station_id.clone(),
            cable,
            port,
            evicted,
        },
    ));
    if lights != before {
        events.push(crate::emit(
            &mut state.counters,
            tick,
            Event::StatusLightsChanged {
                station_id: station_id.clone(),
                lights,
            },
        ));
    }
    Ok(())
}

pub(crate) fn handle_unplug_cable(
    state: &mut GameState,
    station_id: &StationId,
    cable: usize,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::wiring_mut(&mut state.stations, station_id)?;
    let before = puzzle.lights;
    unplug(puzzle, cable)?;
    let lights = puzzle.lights;

    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::CableUnplugged {
            station_id: station_id.clone(),
            cable,
        },
    ));
    if lights != before {
        events.push(crate::emit(
            &mut state.counters,
            tick,
            Event::StatusLightsChanged {
                station_id: station_id.clone(),
                lights,
            },
        ));
    }
    Ok(())
}

pub(crate) fn handle_press_switch(
    state: &mut GameState,
    station_id: &StationId,
    switch: usize,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::wiring_mut(&mut state.stations, station_id)?;
    let color = press_switch(puzzle, switch)?;
    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::SwitchPressed {
            station_id: station_id.clone(),
            color,
        },
    ));
    Ok(())
}

pub(crate) fn handle_pull_lever(
    state: &mut GameState,
    content: &crate::GameContent,
    station_id: &StationId,
    rng: &mut impl Rng,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), RejectReason> {
    let tick = state.meta.tick;
    let puzzle = super::wiring_mut(&mut state.stations, station_id)?;
    if pull_lever(puzzle, rng) {
        super::transition(
            state,
            content,
            rng,
            station_id,
            StationStatus::Operational,
            events,
        );
        return Ok(());
    }

    super::record_mistake(state, station_id, MistakeKind::WrongSequence, events);
    events.push(crate::emit(
        &mut state.counters,
        tick,
        Event::PuzzleRegenerated {
            station_id: station_id.clone(),
        },
    ));
    Ok(())
}
