//! Shared test fixtures for sim_core and downstream crates.
//!
//! `base_content()` provides a small but complete `GameContent`: one station per
//! puzzle kind plus a second wiring panel, short timers for fast tests.
//! `running_state()` is a round in progress with both roles taken.

use crate::{
    Category, Command, CommandEnvelope, CommandId, Comparison, Constants, Counters, EngagementRule,
    FloodState, GameContent, GameState, MetaState, PlayerId, PlayerState, PressureBandDef,
    PuzzleKind, RadarContent, RadarObjectDef, RhythmProfileDef, Role, RoundState, RuleDef,
    SessionPhase, StatType, StationDef, StationId, StationState, StationStatus, StationTier,
    StressEventDef, StressState, ThermalContent, ThreatProfileDef,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};

pub const ENGINEER: &str = "player_engineer";
pub const TECHNICIAN: &str = "player_technician";

fn station(id: &str, name: &str, tier: StationTier, puzzle: PuzzleKind) -> StationDef {
    StationDef {
        id: StationId(id.to_string()),
        name: name.to_string(),
        tier,
        puzzle,
    }
}

fn stress_event(id: &str, station: &str, stat: StatType) -> StressEventDef {
    StressEventDef {
        id: id.to_string(),
        station: StationId(station.to_string()),
        base_weight: 1.0,
        stat,
        condition: Comparison::Greater,
        threshold: 2,
        multiplier: 2.0,
    }
}

fn object(id: &str, name: &str, categories: &[Category]) -> RadarObjectDef {
    RadarObjectDef {
        id: id.to_string(),
        name: name.to_string(),
        categories: categories.to_vec(),
    }
}

pub fn test_constants() -> Constants {
    Constants {
        tick_seconds: 0.1,
        round_duration_s: 300.0,
        flood_base_rate: 0.2,
        flood_broken_penalty: 0.1,
        flood_max_level: 100.0,
        flood_critical_fraction: 0.6,
        stress_grace_s: 5.0,
        stress_max: 100.0,
        stress_passive_interval_s: 2.0,
        stress_passive_amount: 5.0,
        stress_roll_interval_s: 3.0,
        stress_cooldown_s: 10.0,
        stress_vital_weight_multiplier: 2.0,
        thermal_round_s: 30.0,
        thermal_initial_heat: 40.0,
        thermal_min_heat: 10.0,
        thermal_max_heat: 100.0,
        thermal_heat_rate_min: 1.0,
        thermal_heat_rate_max: 2.0,
        thermal_active_heat_factor: 0.5,
        thermal_inactive_heat_factor: 1.5,
        pressure_max: 100.0,
        pressure_rise_rate: 60.0,
        pressure_fall_rate: 20.0,
        pressure_penalty: 25.0,
        bottleneck_min_steps: 3,
        bottleneck_max_steps: 6,
        bottleneck_immunity_s: 5.0,
        radar_board_size: 6,
        radar_symbol_count: 12,
        radar_signature_attempts: 20,
        threat_count_min: 2,
        threat_count_max: 4,
        radar_selection_cooldown_s: 1.0,
        radar_symbol_display_s: 0.8,
        radar_evade_distance: 20.0,
    }
}

/// Full content: four stations (two wiring, one thermal, one radar), one
/// stress event per station, two rhythm profiles, three pressure bands and a
/// small radar catalogue.
pub fn base_content() -> GameContent {
    use Category::{Armored, Biological, Glowing, Mechanical, Swarm};

    GameContent {
        content_version: "test".to_string(),
        stations: vec![
            station("station_ballast", "Ballast Wiring", StationTier::Standard, PuzzleKind::Wiring),
            station("station_coolant", "Reactor Coolant", StationTier::Standard, PuzzleKind::Thermal),
            station("station_reactor", "Reactor Wiring", StationTier::Vital, PuzzleKind::Wiring),
            station("station_sonar", "Sonar Console", StationTier::Standard, PuzzleKind::Radar),
        ],
        stress_events: vec![
            stress_event("evt_ballast_short", "station_ballast", StatType::Repairs),
            stress_event("evt_coolant_leak", "station_coolant", StatType::Breakdowns),
            stress_event("evt_reactor_surge", "station_reactor", StatType::RepairMistakes),
            stress_event("evt_sonar_contact", "station_sonar", StatType::ThreatTimeouts),
        ],
        thermal: ThermalContent {
            rhythm_profiles: vec![
                RhythmProfileDef {
                    id: "steady".to_string(),
                    weight: 3.0,
                    min_interval_s: 0.5,
                    max_interval_s: 2.0,
                    pump_multiplier: 1.0,
                },
                RhythmProfileDef {
                    id: "frantic".to_string(),
                    weight: 1.0,
                    min_interval_s: 0.2,
                    max_interval_s: 1.0,
                    pump_multiplier: 1.5,
                },
            ],
            pressure_bands: vec![
                PressureBandDef {
                    upto: 30.0,
                    cooling: 6.0,
                    bottleneck_chance: 0.0,
                },
                PressureBandDef {
                    upto: 70.0,
                    cooling: 12.0,
                    bottleneck_chance: 0.1,
                },
                PressureBandDef {
                    upto: 100.0,
                    cooling: 8.0,
                    bottleneck_chance: 0.3,
                },
            ],
        },
        radar: RadarContent {
            objects: vec![
                object("obj_drone", "Survey Drone", &[Mechanical]),
                object("obj_jelly", "Lantern Jelly", &[Biological, Glowing]),
                object("obj_krill", "Krill Cloud", &[Biological, Swarm]),
                object("obj_mine", "Contact Mine", &[Mechanical, Armored]),
                object("obj_crab", "Plated Crab", &[Biological, Armored]),
                object("obj_beacon", "Lost Beacon", &[Mechanical, Glowing]),
                object("obj_swarmbot", "Nanite Swarm", &[Mechanical, Swarm, Glowing]),
                object("obj_whale", "Old Whale", &[Biological]),
            ],
            rules: vec![
                RuleDef {
                    id: "rule_only_mechanical".to_string(),
                    text: "Engage purely mechanical contacts".to_string(),
                    predicate: EngagementRule::Only {
                        category: Mechanical,
                    },
                },
                RuleDef {
                    id: "rule_glowing_life".to_string(),
                    text: "Engage glowing biologicals".to_string(),
                    predicate: EngagementRule::AllOf {
                        categories: vec![Biological, Glowing],
                    },
                },
                RuleDef {
                    id: "rule_single_trait".to_string(),
                    text: "Engage anything with exactly one trait".to_string(),
                    predicate: EngagementRule::ExactlyOne,
                },
            ],
            threat_profiles: vec![
                ThreatProfileDef {
                    id: "far".to_string(),
                    weight: 2.0,
                    distance_min: 80.0,
                    distance_max: 120.0,
                    speed_min: 2.0,
                    speed_max: 4.0,
                },
                ThreatProfileDef {
                    id: "close".to_string(),
                    weight: 1.0,
                    distance_min: 30.0,
                    distance_max: 50.0,
                    speed_min: 3.0,
                    speed_max: 6.0,
                },
            ],
            call_signs: ["ORCA", "MAKO", "KRAKEN", "NARWHAL", "MARLIN", "BELUGA"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        },
        constants: test_constants(),
    }
}

/// Lobby state: every station in `Default`, nobody joined yet.
pub fn base_state(content: &GameContent) -> GameState {
    let stations: BTreeMap<StationId, StationState> = content
        .stations
        .iter()
        .map(|def| {
            (
                def.id.clone(),
                StationState {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    tier: def.tier,
                    puzzle_kind: def.puzzle,
                    status: StationStatus::Default,
                    puzzle: None,
                    powered: true,
                },
            )
        })
        .collect();

    GameState {
        meta: MetaState {
            tick: 0,
            seed: 42,
            schema_version: 1,
            content_version: content.content_version.clone(),
            session_id: uuid::Uuid::nil(),
        },
        phase: SessionPhase::Lobby,
        players: BTreeMap::new(),
        round: RoundState::default(),
        flood: FloodState::default(),
        stress: StressState::inactive(content.constants.stress_grace_s),
        stations,
        stats: HashMap::new(),
        counters: Counters {
            next_event_id: 0,
            next_command_id: 0,
        },
    }
}

/// A round in progress: both roles taken, every station operational.
pub fn running_state(content: &GameContent) -> GameState {
    let mut state = base_state(content);
    for (name, role) in [(ENGINEER, Role::Engineer), (TECHNICIAN, Role::Technician)] {
        let id = PlayerId(name.to_string());
        state.players.insert(
            id.clone(),
            PlayerState {
                id,
                role: Some(role),
            },
        );
    }
    for station in state.stations.values_mut() {
        station.status = StationStatus::Operational;
    }
    state.round = RoundState {
        elapsed_s: 0.0,
        remaining_s: content.constants.round_duration_s,
    };
    state.phase = SessionPhase::Running;
    state
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Envelope for `command` issued by `player`, executing on `tick`.
pub fn command(player: &str, tick: u64, command: Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{tick:06}_{player}")),
        issued_by: PlayerId(player.to_string()),
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}
