use super::*;

fn press(id: &StationId, t: u64, switch: usize) -> CommandEnvelope {
    engineer(
        t,
        Command::PressSwitch {
            station_id: id.clone(),
            switch,
        },
    )
}

fn pull(id: &StationId, t: u64) -> CommandEnvelope {
    engineer(
        t,
        Command::PullLever {
            station_id: id.clone(),
        },
    )
}

#[test]
fn test_wrong_sequence_regenerates_and_counts_mistake() {
    let content = quiet_content();
    let mut rng = make_rng();
    let (mut state, id) = broken_station(&content, PuzzleKind::Wiring, &mut rng);
    let before = wiring(&state, &id);

    // Three presses only: always wrong.
    let t = state.meta.tick;
    let events = step(
        &mut state,
        &[press(&id, t, 0), press(&id, t, 1), press(&id, t, 2), pull(&id, t)],
        &content,
        &mut rng,
    );

    let after = wiring(&state, &id);
    assert_eq!(state.stations[&id].status, StationStatus::Broken);
    assert!(after.input.is_empty());
    assert_eq!(after.attempts, before.attempts + 1);
    assert_eq!(state.stat(StatType::RepairMistakes), 1);
    assert!(has_event(&events, |e| matches!(e, Event::PuzzleRegenerated { .. })));
    assert!(has_event(&events, |e| matches!(
        e,
        Event::RepairMistake {
            kind: MistakeKind::WrongSequence,
            ..
        }
    )));
}

#[test]
fn test_plugging_into_taken_port_evicts() {
    let content = quiet_content();
    let mut rng = make_rng();
    let (mut state, id) = broken_station(&content, PuzzleKind::Wiring, &mut rng);
    let t = state.meta.tick;
    let events = step(
        &mut state,
        &[
            technician(
                t,
                Command::PlugCable {
                    station_id: id.clone(),
                    cable: 0,
                    port: 3,
                },
            ),
            technician(
                t,
                Command::PlugCable {
                    station_id: id.clone(),
                    cable: 2,
                    port: 3,
                },
            ),
        ],
        &content,
        &mut rng,
    );
    assert!(has_event(&events, |e| matches!(
        e,
        Event::CablePlugged {
            cable: 2,
            evicted: Some(0),
            ..
        }
    )));
    let puzzle = wiring(&state, &id);
    assert_eq!(puzzle.cables[0].connected_port, None);
    assert_eq!(puzzle.cables[2].connected_port, Some(3));
}

#[test]
fn test_out_of_range_port_is_rejected() {
    let content = quiet_content();
    let mut rng = make_rng();
    let (mut state, id) = broken_station(&content, PuzzleKind::Wiring, &mut rng);
    let t = state.meta.tick;
    let events = step(
        &mut state,
        &[technician(
            t,
            Command::PlugCable {
                station_id: id.clone(),
                cable: 0,
                port: WIRE_COUNT,
            },
        )],
        &content,
        &mut rng,
    );
    assert!(has_event(&events, |e| matches!(
        e,
        Event::CommandRejected {
            reason: RejectReason::InvalidIndex,
            ..
        }
    )));
}

#[test]
fn test_unplugging_returns_lights_to_pending() {
    let content = quiet_content();
    let mut rng = make_rng();
    let (mut state, id) = broken_station(&content, PuzzleKind::Wiring, &mut rng);
    let puzzle = wiring(&state, &id);
    let t = state.meta.tick;
    let plugs: Vec<_> = puzzle
        .cables
        .iter()
        .map(|c| {
            technician(
                t,
                Command::PlugCable {
                    station_id: id.clone(),
                    cable: c.id,
                    port: c.correct_port,
                },
            )
        })
        .collect();
    step(&mut state, &plugs, &content, &mut rng);
    assert_eq!(wiring(&state, &id).lights, [LightState::Green; WIRE_COUNT]);

    let t = state.meta.tick;
    step(
        &mut state,
        &[technician(
            t,
            Command::UnplugCable {
                station_id: id.clone(),
                cable: 1,
            },
        )],
        &content,
        &mut rng,
    );
    assert_eq!(wiring(&state, &id).lights, [LightState::Pending; WIRE_COUNT]);
}

#[test]
fn test_solution_does_not_depend_on_plugging() {
    // The lever only checks the keyed sequence; cables feed the lights.
    let content = quiet_content();
    let mut rng = make_rng();
    let (mut state, id) = broken_station(&content, PuzzleKind::Wiring, &mut rng);
    let puzzle = wiring(&state, &id);
    let t = state.meta.tick;
    let mut cmds: Vec<_> = puzzle
        .solution
        .iter()
        .map(|color| {
            let switch = puzzle
                .switch_labels
                .iter()
                .position(|l| l == color)
                .unwrap();
            press(&id, t, switch)
        })
        .collect();
    cmds.push(pull(&id, t));
    step(&mut state, &cmds, &content, &mut rng);
    assert_eq!(state.stations[&id].status, StationStatus::Operational);
}
