use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim_core::{
    should_shoot, Command, CommandEnvelope, CommandId, GameContent, GameState, PlayerId,
    PuzzleState, RadarPuzzle, Role, SessionPhase, StationId, ThermalPuzzle, ThreatAction, Valve,
    WireColor, WiringPuzzle,
};

pub trait CommandSource {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

pub const AUTOPILOT_ENGINEER: &str = "player_autopilot_engineer";
pub const AUTOPILOT_TECHNICIAN: &str = "player_autopilot_technician";

/// Heat gap between the two sides before the crew favours one valve.
const VALVE_BIAS_HEAT: f32 = 5.0;

/// Bot crew playing both seats:
/// 1. In the lobby, claim Engineer and Technician and start the round.
/// 2. Wiring: route cables, then key the solution once the lights are green.
/// 3. Thermal: arm, cool the hotter side in rhythm, replay bottlenecks.
/// 4. Radar: select the closest threat, then answer it by the day's rule.
///
/// `mistake_chance` makes each decision go wrong with that probability.
pub struct CrewAutopilot {
    engineer: PlayerId,
    technician: PlayerId,
    rng: ChaCha8Rng,
    mistake_chance: f64,
    auto_restart: bool,
}

impl CrewAutopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            engineer: PlayerId(AUTOPILOT_ENGINEER.to_string()),
            technician: PlayerId(AUTOPILOT_TECHNICIAN.to_string()),
            rng: ChaCha8Rng::seed_from_u64(seed),
            mistake_chance: 0.0,
            auto_restart: false,
        }
    }

    #[must_use]
    pub fn with_mistake_chance(mut self, chance: f64) -> Self {
        self.mistake_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Go back to the lobby and start again whenever a round ends.
    #[must_use]
    pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }

    fn slips(&mut self) -> bool {
        self.mistake_chance > 0.0 && self.rng.gen_bool(self.mistake_chance)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Allocates a command ID and builds a `CommandEnvelope`.
fn make_cmd(
    issued_by: &PlayerId,
    tick: u64,
    next_id: &mut u64,
    command: Command,
) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_by: issued_by.clone(),
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

fn holds(state: &GameState, player: &PlayerId, role: Role) -> bool {
    state
        .players
        .get(player)
        .is_some_and(|p| p.role == Some(role))
}

/// Which valve the engineer wants open for the current heat split.
fn preferred_valve(puzzle: &ThermalPuzzle) -> Valve {
    let gap = puzzle.front_heat - puzzle.back_heat;
    if gap > VALVE_BIAS_HEAT {
        Valve::Front
    } else if gap < -VALVE_BIAS_HEAT {
        Valve::Back
    } else {
        Valve::Common
    }
}

impl CrewAutopilot {
    fn lobby_commands(&self, state: &GameState, next_id: &mut u64) -> Vec<CommandEnvelope> {
        let tick = state.meta.tick;
        let mut commands = Vec::new();
        for (player, role) in [
            (&self.engineer, Role::Engineer),
            (&self.technician, Role::Technician),
        ] {
            if holds(state, player, role) {
                continue;
            }
            if state.player_with_role(role).is_some() {
                // Someone else has the seat; wait for them.
                return commands;
            }
            commands.push(make_cmd(
                player,
                tick,
                next_id,
                Command::SelectRole { role },
            ));
        }
        commands.push(make_cmd(&self.engineer, tick, next_id, Command::StartRound));
        commands
    }

    fn wiring_commands(
        &mut self,
        station_id: &StationId,
        puzzle: &WiringPuzzle,
        tick: u64,
        next_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let mut commands = Vec::new();

        // One cable per tick, like a pair of hands would.
        if let Some(cable) = puzzle
            .cables
            .iter()
            .find(|c| c.connected_port != Some(c.correct_port))
        {
            let port = if self.slips() {
                (cable.correct_port + 1) % puzzle.cables.len()
            } else {
                cable.correct_port
            };
            commands.push(make_cmd(
                &self.technician,
                tick,
                next_id,
                Command::PlugCable {
                    station_id: station_id.clone(),
                    cable: cable.id,
                    port,
                },
            ));
            return commands;
        }

        let mut sequence = puzzle.solution.to_vec();
        if self.slips() {
            sequence.rotate_left(1);
        }
        for color in sequence {
            let Some(switch) = puzzle.switch_labels.iter().position(|l| *l == color) else {
                continue;
            };
            commands.push(make_cmd(
                &self.engineer,
                tick,
                next_id,
                Command::PressSwitch {
                    station_id: station_id.clone(),
                    switch,
                },
            ));
        }
        commands.push(make_cmd(
            &self.engineer,
            tick,
            next_id,
            Command::PullLever {
                station_id: station_id.clone(),
            },
        ));
        commands
    }

    fn thermal_commands(
        &mut self,
        station_id: &StationId,
        puzzle: &ThermalPuzzle,
        content: &GameContent,
        tick: u64,
        next_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let engineer = self.engineer.clone();
        let cmd = |next_id: &mut u64, command| make_cmd(&engineer, tick, next_id, command);

        if !puzzle.armed {
            return vec![cmd(
                next_id,
                Command::ArmThermal {
                    station_id: station_id.clone(),
                },
            )];
        }

        if let Some(bottleneck) = &puzzle.bottleneck {
            let Some(&expected) = bottleneck.sequence.get(bottleneck.index) else {
                return Vec::new();
            };
            let color = if self.slips() {
                WireColor::ALL
                    .into_iter()
                    .find(|c| *c != expected)
                    .unwrap_or(expected)
            } else {
                expected
            };
            return vec![cmd(
                next_id,
                Command::EnterBottleneckColor {
                    station_id: station_id.clone(),
                    color,
                },
            )];
        }

        let mut commands = Vec::new();
        let valve = preferred_valve(puzzle);
        if valve != puzzle.active_valve {
            commands.push(cmd(
                next_id,
                Command::SelectValve {
                    station_id: station_id.clone(),
                    valve,
                },
            ));
        }

        let rhythm = &puzzle.rhythm;
        let sweet_spot = (rhythm.min_interval_s + rhythm.max_interval_s) / 2.0;
        let in_rhythm = puzzle.since_last_pump_s >= sweet_spot
            && puzzle.pressure <= content.constants.pressure_max;
        if in_rhythm || self.slips() {
            commands.push(cmd(
                next_id,
                Command::PumpValve {
                    station_id: station_id.clone(),
                    valve,
                },
            ));
        }
        commands
    }

    fn radar_commands(
        &mut self,
        station_id: &StationId,
        puzzle: &RadarPuzzle,
        content: &GameContent,
        tick: u64,
        next_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let selected = puzzle
            .selected
            .as_ref()
            .and_then(|cs| puzzle.threats.iter().find(|t| &t.call_sign == cs));

        let Some(threat) = selected else {
            if puzzle.selection_cooldown_s > 0.0 {
                return Vec::new();
            }
            let Some(closest) = puzzle
                .threats
                .iter()
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
            else {
                return Vec::new();
            };
            return vec![make_cmd(
                &self.technician,
                tick,
                next_id,
                Command::SelectThreat {
                    station_id: station_id.clone(),
                    call_sign: closest.call_sign.clone(),
                },
            )];
        };

        let categories = puzzle
            .board
            .get(threat.board_index)
            .map_or(&[][..], |entry| entry.categories.as_slice());
        let shoot = should_shoot(&puzzle.rule.predicate, categories);
        let action = if !self.slips() {
            if shoot {
                ThreatAction::Shoot
            } else {
                ThreatAction::Pass
            }
        } else if threat.distance <= content.constants.radar_evade_distance {
            ThreatAction::Evade
        } else if shoot {
            ThreatAction::Pass
        } else {
            ThreatAction::Shoot
        };
        vec![make_cmd(
            &self.technician,
            tick,
            next_id,
            Command::SubmitThreatAction {
                station_id: station_id.clone(),
                call_sign: threat.call_sign.clone(),
                action,
            },
        )]
    }
}

// ---------------------------------------------------------------------------
// CrewAutopilot
// ---------------------------------------------------------------------------

impl CommandSource for CrewAutopilot {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let tick = state.meta.tick;
        match state.phase {
            SessionPhase::Lobby => return self.lobby_commands(state, next_command_id),
            SessionPhase::Ended { .. } => {
                if !self.auto_restart {
                    return Vec::new();
                }
                return vec![make_cmd(
                    &self.engineer,
                    tick,
                    next_command_id,
                    Command::ReturnToLobby,
                )];
            }
            SessionPhase::Running => {}
        }
        if !holds(state, &self.engineer, Role::Engineer)
            || !holds(state, &self.technician, Role::Technician)
        {
            return Vec::new();
        }

        let mut commands = Vec::new();
        for station in state.stations.values() {
            let Some(puzzle) = &station.puzzle else {
                continue;
            };
            let id = &station.id;
            commands.extend(match puzzle {
                PuzzleState::Wiring(p) => self.wiring_commands(id, p, tick, next_command_id),
                PuzzleState::Thermal(p) => {
                    self.thermal_commands(id, p, content, tick, next_command_id)
                }
                PuzzleState::Radar(p) => {
                    self.radar_commands(id, p, content, tick, next_command_id)
                }
            });
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::test_fixtures::{base_content, base_state, make_rng};
    use sim_core::{tick, EventLevel, PuzzleKind, StationStatus};

    fn run_ticks(
        autopilot: &mut CrewAutopilot,
        state: &mut GameState,
        content: &GameContent,
        ticks: u64,
    ) {
        let mut rng = make_rng();
        let mut next_id = 0;
        for _ in 0..ticks {
            let commands = autopilot.generate_commands(state, content, &mut next_id);
            tick(state, &commands, content, &mut rng, EventLevel::Normal);
        }
    }

    fn quiet_content() -> GameContent {
        let mut content = base_content();
        content.constants.stress_grace_s = 1.0e9;
        content.constants.flood_base_rate = 0.0;
        content
    }

    /// Breaks the first station of `kind` through a capped-stress tick.
    fn break_station(state: &mut GameState, content: &GameContent, kind: PuzzleKind) -> StationId {
        let id = content
            .stations
            .iter()
            .find(|s| s.puzzle == kind)
            .map(|s| s.id.clone())
            .unwrap();
        let mut forced = content.clone();
        forced.stress_events.retain(|e| e.station == id);
        state.stress.phase_timer_s = 0.0;
        let mut rng = make_rng();
        tick(state, &[], &forced, &mut rng, EventLevel::Normal);
        state.stress.stress = forced.constants.stress_max;
        tick(state, &[], &forced, &mut rng, EventLevel::Normal);
        assert_eq!(state.stations[&id].status, StationStatus::Broken);
        state.stress.phase_timer_s = 1.0e9;
        id
    }

    #[test]
    fn test_autopilot_joins_and_starts_round() {
        let content = quiet_content();
        let mut state = base_state(&content);
        let mut autopilot = CrewAutopilot::new(1);
        run_ticks(&mut autopilot, &mut state, &content, 1);
        assert_eq!(state.phase, SessionPhase::Running);
        assert!(holds(
            &state,
            &PlayerId(AUTOPILOT_ENGINEER.to_string()),
            Role::Engineer
        ));
    }

    #[test]
    fn test_autopilot_waits_when_seat_taken() {
        let content = quiet_content();
        let mut state = base_state(&content);
        let stranger = PlayerId("player_human".to_string());
        state.players.insert(
            stranger.clone(),
            sim_core::PlayerState {
                id: stranger,
                role: Some(Role::Engineer),
            },
        );
        let mut autopilot = CrewAutopilot::new(1);
        let mut next_id = 0;
        let commands = autopilot.generate_commands(&state, &content, &mut next_id);
        assert!(commands
            .iter()
            .all(|c| !matches!(c.command, Command::StartRound)));
    }

    #[test]
    fn test_autopilot_repairs_wiring() {
        let content = quiet_content();
        let mut state = base_state(&content);
        let mut autopilot = CrewAutopilot::new(1);
        run_ticks(&mut autopilot, &mut state, &content, 1);
        let id = break_station(&mut state, &content, PuzzleKind::Wiring);
        run_ticks(&mut autopilot, &mut state, &content, 10);
        assert_eq!(state.stations[&id].status, StationStatus::Operational);
    }

    #[test]
    fn test_autopilot_clears_radar() {
        let content = quiet_content();
        let mut state = base_state(&content);
        let mut autopilot = CrewAutopilot::new(1);
        run_ticks(&mut autopilot, &mut state, &content, 1);
        let id = break_station(&mut state, &content, PuzzleKind::Radar);
        run_ticks(&mut autopilot, &mut state, &content, 200);
        assert_eq!(state.stations[&id].status, StationStatus::Operational);
        assert_eq!(state.stat(sim_core::StatType::RepairMistakes), 0);
    }

    #[test]
    fn test_autopilot_arms_thermal() {
        let content = quiet_content();
        let mut state = base_state(&content);
        let mut autopilot = CrewAutopilot::new(1);
        run_ticks(&mut autopilot, &mut state, &content, 1);
        let id = break_station(&mut state, &content, PuzzleKind::Thermal);
        run_ticks(&mut autopilot, &mut state, &content, 1);
        match state.stations[&id].puzzle.as_ref() {
            Some(PuzzleState::Thermal(p)) => assert!(p.armed),
            other => panic!("expected armed thermal puzzle, got {other:?}"),
        }
    }

    #[test]
    fn test_preferred_valve_targets_hotter_side() {
        let content = base_content();
        let mut state = sim_core::test_fixtures::running_state(&content);
        let id = break_station(&mut state, &content, PuzzleKind::Thermal);
        let Some(PuzzleState::Thermal(mut puzzle)) = state.stations[&id].puzzle.clone() else {
            panic!("expected thermal puzzle");
        };
        puzzle.front_heat = 80.0;
        puzzle.back_heat = 40.0;
        assert_eq!(preferred_valve(&puzzle), Valve::Front);
        puzzle.back_heat = 78.0;
        assert_eq!(preferred_valve(&puzzle), Valve::Common);
    }

    #[test]
    fn test_sloppy_crew_is_deterministic_per_seed() {
        let content = base_content();
        let run = || {
            let mut state = base_state(&content);
            let mut autopilot = CrewAutopilot::new(3).with_mistake_chance(0.2);
            run_ticks(&mut autopilot, &mut state, &content, 600);
            (state.meta.tick, state.flood.level, state.stat(sim_core::StatType::Repairs))
        };
        assert_eq!(run(), run());
    }
}
