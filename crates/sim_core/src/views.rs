//! Role-scoped projections of the authoritative state.
//!
//! Each participant only gets the half of every puzzle their role can see;
//! the other half has to be talked through.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    CallSign, Category, GameContent, GameState, LightState, PlayerId, PuzzleState, Role,
    SessionPhase, StationId, StationStatus, StressPhase, Symbol, Valve, WireColor, WIRE_COUNT,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub role: Option<Role>,
    pub tick: u64,
    pub phase: SessionPhase,
    pub flood_text: String,
    pub remaining_s: f32,
    pub stress_phase: StressPhase,
    pub stations: Vec<StationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationView {
    pub id: StationId,
    pub name: String,
    pub status: StationStatus,
    pub powered: bool,
    pub panel: Option<Panel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableView {
    pub id: usize,
    pub color: WireColor,
    pub output_color: WireColor,
    pub connected_port: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardRow {
    pub name: String,
    pub categories: SmallVec<[Category; 4]>,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatView {
    pub call_sign: CallSign,
    pub distance: f32,
    pub speed: f32,
}

/// What one role sees of a broken station's puzzle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "panel")]
pub enum Panel {
    EngineerWiring {
        lights: [LightState; WIRE_COUNT],
        switch_labels: [WireColor; WIRE_COUNT],
        input_len: usize,
    },
    TechnicianWiring {
        cables: Vec<CableView>,
    },
    EngineerThermal {
        front_heat: f32,
        back_heat: f32,
        pressure: f32,
        active_valve: Valve,
        armed: bool,
        remaining_s: f32,
        bottleneck_open: bool,
    },
    TechnicianThermal {
        bottleneck: Option<Vec<WireColor>>,
    },
    EngineerRadar {
        rule_text: String,
        board: Vec<BoardRow>,
        displayed_symbol: Option<Symbol>,
    },
    TechnicianRadar {
        threats: Vec<ThreatView>,
        selected: Option<CallSign>,
        selection_cooldown_s: f32,
    },
}

fn panel_for(role: Role, puzzle: &PuzzleState) -> Panel {
    match (role, puzzle) {
        (Role::Engineer, PuzzleState::Wiring(p)) => Panel::EngineerWiring {
            lights: p.lights,
            switch_labels: p.switch_labels,
            input_len: p.input.len(),
        },
        (Role::Technician, PuzzleState::Wiring(p)) => Panel::TechnicianWiring {
            cables: p
                .cables
                .iter()
                .map(|c| CableView {
                    id: c.id,
                    color: c.color,
                    output_color: c.output_color,
                    connected_port: c.connected_port,
                })
                .collect(),
        },
        (Role::Engineer, PuzzleState::Thermal(p)) => Panel::EngineerThermal {
            front_heat: p.front_heat,
            back_heat: p.back_heat,
            pressure: p.pressure,
            active_valve: p.active_valve,
            armed: p.armed,
            remaining_s: p.remaining_s,
            bottleneck_open: p.bottleneck.is_some(),
        },
        (Role::Technician, PuzzleState::Thermal(p)) => Panel::TechnicianThermal {
            bottleneck: p.bottleneck.as_ref().map(|b| b.sequence.clone()),
        },
        (Role::Engineer, PuzzleState::Radar(p)) => Panel::EngineerRadar {
            rule_text: p.rule.text.clone(),
            board: p
                .board
                .iter()
                .map(|entry| BoardRow {
                    name: entry.name.clone(),
                    categories: entry.categories.clone(),
                    symbols: entry.symbols.to_vec(),
                })
                .collect(),
            displayed_symbol: p.display.as_ref().map(crate::SymbolLoop::current),
        },
        (Role::Technician, PuzzleState::Radar(p)) => Panel::TechnicianRadar {
            threats: p
                .threats
                .iter()
                .map(|t| ThreatView {
                    call_sign: t.call_sign.clone(),
                    distance: t.distance,
                    speed: t.speed,
                })
                .collect(),
            selected: p.selected.clone(),
            selection_cooldown_s: p.selection_cooldown_s,
        },
    }
}

/// The state as `player_id` is allowed to see it. `None` for unknown players.
pub fn player_view(
    state: &GameState,
    content: &GameContent,
    player_id: &PlayerId,
) -> Option<PlayerView> {
    let player = state.players.get(player_id)?;
    let stations = state
        .stations
        .values()
        .map(|station| StationView {
            id: station.id.clone(),
            name: station.name.clone(),
            status: station.status,
            powered: station.powered,
            panel: player
                .role
                .zip(station.puzzle.as_ref())
                .map(|(role, puzzle)| panel_for(role, puzzle)),
        })
        .collect();

    Some(PlayerView {
        player_id: player.id.clone(),
        role: player.role,
        tick: state.meta.tick,
        phase: state.phase,
        flood_text: crate::flood_display(state, content),
        remaining_s: state.round.remaining_s,
        stress_phase: state.stress.phase,
        stations,
    })
}
