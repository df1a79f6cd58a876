//! Type definitions for `sim_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

/// Number of cables, ports, switches and status lights on a wiring panel.
pub const WIRE_COUNT: usize = 4;

/// Number of decryption symbols bound to each radar object.
pub const SYMBOLS_PER_OBJECT: usize = 3;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(StationId);
string_id!(PlayerId);
string_id!(CallSign);
string_id!(CommandId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Engineer,
    Technician,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    Survived,
    Flooded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Lobby,
    Running,
    Ended { outcome: RoundOutcome },
}

/// Lifecycle of a station. `Default` is the pre-round state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationStatus {
    Default,
    Operational,
    Broken,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationTier {
    Standard,
    Vital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PuzzleKind {
    Wiring,
    Thermal,
    Radar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StressPhase {
    Inactive,
    Active,
    Cooldown,
}

/// Accumulated per-round statistics that stress events can key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatType {
    Breakdowns,
    Repairs,
    Destructions,
    RepairMistakes,
    ThreatTimeouts,
    Bottlenecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Greater,
    Less,
    Equal,
}

impl Comparison {
    pub fn holds(self, value: u32, threshold: u32) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::Less => value < threshold,
            Comparison::Equal => value == threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WireColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl WireColor {
    pub const ALL: [WireColor; WIRE_COUNT] = [
        WireColor::Red,
        WireColor::Blue,
        WireColor::Green,
        WireColor::Yellow,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    Pending,
    Green,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Valve {
    Front,
    Back,
    Common,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Mechanical,
    Biological,
    Glowing,
    Armored,
    Swarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatAction {
    Shoot,
    Pass,
    Evade,
}

/// One glyph index on the radar decryption display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MistakeKind {
    WrongSequence,
    WrongBottleneckColor,
    WrongEngagement,
    Evaded,
    ThreatTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpRejection {
    WrongValve,
    BottleneckOpen,
    TooFast,
    OverPressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    WrongPhase,
    UnknownPlayer,
    WrongRole,
    RoleTaken,
    RolesIncomplete,
    UnknownStation,
    NoActivePuzzle,
    InvalidIndex,
    NotArmed,
    UnknownThreat,
    SelectionCooldown,
    OutOfEvadeRange,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: MetaState,
    pub phase: SessionPhase,
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub round: RoundState,
    pub flood: FloodState,
    pub stress: StressState,
    pub stations: BTreeMap<StationId, StationState>,
    pub stats: HashMap<StatType, u32>,
    pub counters: Counters,
}

impl GameState {
    pub fn stat(&self, stat: StatType) -> u32 {
        self.stats.get(&stat).copied().unwrap_or(0)
    }

    pub fn player_with_role(&self, role: Role) -> Option<&PlayerState> {
        self.players.values().find(|p| p.role == Some(role))
    }

    pub fn count_stations(&self, status: StationStatus) -> usize {
        self.stations.values().filter(|s| s.status == status).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_command_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundState {
    pub elapsed_s: f32,
    pub remaining_s: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodState {
    pub level: f32,
    pub critical_triggered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressState {
    pub phase: StressPhase,
    pub stress: f32,
    /// Grace countdown while Inactive, cooldown countdown while in Cooldown.
    pub phase_timer_s: f32,
    pub passive_timer_s: f32,
    pub roll_timer_s: f32,
}

impl StressState {
    pub fn inactive(grace_s: f32) -> Self {
        Self {
            phase: StressPhase::Inactive,
            stress: 0.0,
            phase_timer_s: grace_s,
            passive_timer_s: 0.0,
            roll_timer_s: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationState {
    pub id: StationId,
    pub name: String,
    pub tier: StationTier,
    pub puzzle_kind: PuzzleKind,
    pub status: StationStatus,
    /// `Some` exactly while `status == Broken`.
    pub puzzle: Option<PuzzleState>,
    /// Room power behind the station. Only wiring stations ever cut it.
    pub powered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PuzzleState {
    Wiring(WiringPuzzle),
    Thermal(ThermalPuzzle),
    Radar(RadarPuzzle),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cable {
    pub id: usize,
    /// Physical insulation color the technician sees.
    pub color: WireColor,
    /// Color shown at the output end once routed.
    pub output_color: WireColor,
    pub correct_port: usize,
    pub connected_port: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WiringPuzzle {
    pub cables: [Cable; WIRE_COUNT],
    pub switch_labels: [WireColor; WIRE_COUNT],
    pub solution: [WireColor; WIRE_COUNT],
    pub input: Vec<WireColor>,
    pub lights: [LightState; WIRE_COUNT],
    /// Number of failed lever pulls on this breakdown.
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub sequence: Vec<WireColor>,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalPuzzle {
    pub front_heat: f32,
    pub back_heat: f32,
    pub heat_rate: f32,
    pub rhythm: RhythmProfileDef,
    pub pressure: f32,
    pub active_valve: Valve,
    pub since_last_pump_s: f32,
    pub armed: bool,
    pub remaining_s: f32,
    pub bottleneck: Option<Bottleneck>,
    pub immunity_s: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEntry {
    pub object_id: String,
    pub name: String,
    pub categories: SmallVec<[Category; 4]>,
    pub symbols: [Symbol; SYMBOLS_PER_OBJECT],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub call_sign: CallSign,
    pub board_index: usize,
    pub distance: f32,
    pub speed: f32,
}

/// Repeating display of one threat's symbols on the engineer console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolLoop {
    pub call_sign: CallSign,
    pub symbols: [Symbol; SYMBOLS_PER_OBJECT],
    pub index: usize,
    pub remaining_s: f32,
}

impl SymbolLoop {
    pub fn current(&self) -> Symbol {
        self.symbols[self.index]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarPuzzle {
    pub rule: RuleDef,
    pub board: Vec<BoardEntry>,
    pub threats: Vec<Threat>,
    pub selected: Option<CallSign>,
    pub selection_cooldown_s: f32,
    pub display: Option<SymbolLoop>,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_by: PlayerId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    SelectRole {
        role: Role,
    },
    StartRound,
    ReturnToLobby,
    PlugCable {
        station_id: StationId,
        cable: usize,
        port: usize,
    },
    UnplugCable {
        station_id: StationId,
        cable: usize,
    },
    PressSwitch {
        station_id: StationId,
        switch: usize,
    },
    PullLever {
        station_id: StationId,
    },
    ArmThermal {
        station_id: StationId,
    },
    SelectValve {
        station_id: StationId,
        valve: Valve,
    },
    PumpValve {
        station_id: StationId,
        valve: Valve,
    },
    EnterBottleneckColor {
        station_id: StationId,
        color: WireColor,
    },
    SelectThreat {
        station_id: StationId,
        call_sign: CallSign,
    },
    SubmitThreatAction {
        station_id: StationId,
        call_sign: CallSign,
        action: ThreatAction,
    },
}

impl Command {
    /// Role a player must hold to issue this command. `None` for lobby commands.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Command::SelectRole { .. } | Command::StartRound | Command::ReturnToLobby => None,
            Command::PlugCable { .. }
            | Command::UnplugCable { .. }
            | Command::SelectThreat { .. }
            | Command::SubmitThreatAction { .. } => Some(Role::Technician),
            Command::PressSwitch { .. }
            | Command::PullLever { .. }
            | Command::ArmThermal { .. }
            | Command::SelectValve { .. }
            | Command::PumpValve { .. }
            | Command::EnterBottleneckColor { .. } => Some(Role::Engineer),
        }
    }
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    RoleSelected {
        player_id: PlayerId,
        role: Role,
    },
    RoundStarted {
        session_id: Uuid,
    },
    RoundEnded {
        outcome: RoundOutcome,
        elapsed_s: f32,
    },
    ReturnedToLobby,
    StationStatusChanged {
        station_id: StationId,
        from: StationStatus,
        to: StationStatus,
    },
    RoomPowerRestored {
        station_id: StationId,
    },
    StressPhaseChanged {
        from: StressPhase,
        to: StressPhase,
    },
    StressEventFired {
        event_id: String,
        station_id: StationId,
        stress: f32,
    },
    FloodCritical {
        level: f32,
        destroyed: Option<StationId>,
    },
    CablePlugged {
        station_id: StationId,
        cable: usize,
        port: usize,
        evicted: Option<usize>,
    },
    CableUnplugged {
        station_id: StationId,
        cable: usize,
    },
    StatusLightsChanged {
        station_id: StationId,
        lights: [LightState; WIRE_COUNT],
    },
    SwitchPressed {
        station_id: StationId,
        color: WireColor,
    },
    PuzzleRegenerated {
        station_id: StationId,
    },
    RepairMistake {
        station_id: StationId,
        kind: MistakeKind,
    },
    ThermalArmed {
        station_id: StationId,
    },
    ValveSelected {
        station_id: StationId,
        valve: Valve,
    },
    PumpAccepted {
        station_id: StationId,
        valve: Valve,
        cooling: f32,
    },
    PumpRejected {
        station_id: StationId,
        reason: PumpRejection,
    },
    BottleneckOpened {
        station_id: StationId,
        steps: usize,
    },
    BottleneckCleared {
        station_id: StationId,
    },
    ThreatSelected {
        station_id: StationId,
        call_sign: CallSign,
    },
    ThreatResolved {
        station_id: StationId,
        call_sign: CallSign,
        action: ThreatAction,
        correct: bool,
    },
    ThreatTimedOut {
        station_id: StationId,
        call_sign: CallSign,
    },
    AlertRaised {
        alert_id: String,
        severity: AlertSeverity,
        message: String,
        suggested_action: String,
    },
    AlertCleared {
        alert_id: String,
    },
    /// Only emitted at `EventLevel::Debug`.
    StressRoll {
        stress: f32,
        rolled: f32,
        fired: bool,
    },
    /// Only emitted at `EventLevel::Debug`.
    CommandRejected {
        command_id: CommandId,
        reason: RejectReason,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub stations: Vec<StationDef>,
    pub stress_events: Vec<StressEventDef>,
    pub thermal: ThermalContent,
    pub radar: RadarContent,
    pub constants: Constants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationDef {
    pub id: StationId,
    pub name: String,
    pub tier: StationTier,
    pub puzzle: PuzzleKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressEventDef {
    pub id: String,
    pub station: StationId,
    pub base_weight: f32,
    pub stat: StatType,
    pub condition: Comparison,
    pub threshold: u32,
    /// Applied to `base_weight` while the stat condition holds.
    pub multiplier: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalContent {
    pub rhythm_profiles: Vec<RhythmProfileDef>,
    /// Sorted by `upto`; the last band also covers anything above it.
    pub pressure_bands: Vec<PressureBandDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmProfileDef {
    pub id: String,
    pub weight: f32,
    pub min_interval_s: f32,
    pub max_interval_s: f32,
    pub pump_multiplier: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureBandDef {
    pub upto: f32,
    pub cooling: f32,
    pub bottleneck_chance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarContent {
    pub objects: Vec<RadarObjectDef>,
    pub rules: Vec<RuleDef>,
    pub threat_profiles: Vec<ThreatProfileDef>,
    pub call_signs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarObjectDef {
    pub id: String,
    pub name: String,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    pub text: String,
    pub predicate: EngagementRule,
}

/// Daily rule of engagement: a predicate over an object's category set.
/// An object matching the predicate must be shot; anything else passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngagementRule {
    /// The object carries this category and nothing else.
    Only { category: Category },
    AllOf { categories: Vec<Category> },
    AnyOf { categories: Vec<Category> },
    NoneOf { categories: Vec<Category> },
    ExactlyOne,
    AtLeast { count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatProfileDef {
    pub id: String,
    pub weight: f32,
    pub distance_min: f32,
    pub distance_max: f32,
    pub speed_min: f32,
    pub speed_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    /// Fixed simulation step in seconds.
    pub tick_seconds: f32,
    pub round_duration_s: f32,

    // Flood clock
    pub flood_base_rate: f32,
    pub flood_broken_penalty: f32,
    pub flood_max_level: f32,
    pub flood_critical_fraction: f32,

    // Stress selector
    pub stress_grace_s: f32,
    pub stress_max: f32,
    pub stress_passive_interval_s: f32,
    pub stress_passive_amount: f32,
    pub stress_roll_interval_s: f32,
    pub stress_cooldown_s: f32,
    pub stress_vital_weight_multiplier: f32,

    // Thermal puzzle
    pub thermal_round_s: f32,
    pub thermal_initial_heat: f32,
    pub thermal_min_heat: f32,
    pub thermal_max_heat: f32,
    pub thermal_heat_rate_min: f32,
    pub thermal_heat_rate_max: f32,
    pub thermal_active_heat_factor: f32,
    pub thermal_inactive_heat_factor: f32,
    pub pressure_max: f32,
    pub pressure_rise_rate: f32,
    pub pressure_fall_rate: f32,
    pub pressure_penalty: f32,
    pub bottleneck_min_steps: usize,
    pub bottleneck_max_steps: usize,
    pub bottleneck_immunity_s: f32,

    // Radar puzzle
    pub radar_board_size: usize,
    pub radar_symbol_count: u8,
    pub radar_signature_attempts: u32,
    pub threat_count_min: usize,
    pub threat_count_max: usize,
    pub radar_selection_cooldown_s: f32,
    pub radar_symbol_display_s: f32,
    pub radar_evade_distance: f32,
}
