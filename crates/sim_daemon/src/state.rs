use crate::alerts::AlertEngine;
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use sim_control::CrewAutopilot;
use sim_core::{CommandEnvelope, EventEnvelope, GameContent, GameState, MetricsSnapshot};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Samples kept for `/api/v1/metrics` and alert evaluation.
pub const METRICS_HISTORY_CAP: usize = 600;

pub struct SimState {
    pub game_state: GameState,
    pub content: GameContent,
    pub rng: ChaCha8Rng,
    /// Bot crew filling both seats, when the daemon was started with `--autopilot`.
    pub autopilot: Option<CrewAutopilot>,
    pub next_command_id: u64,
    /// Client commands waiting for the next tick, in arrival order.
    pub pending_commands: Vec<CommandEnvelope>,
    pub metrics_every: u64,
    pub metrics_history: VecDeque<MetricsSnapshot>,
    pub alert_engine: Option<AlertEngine>,
}

impl SimState {
    pub fn new(game_state: GameState, content: GameContent, rng: ChaCha8Rng) -> Self {
        let next_command_id = game_state.counters.next_command_id;
        let alert_engine = Some(AlertEngine::new(content.constants.flood_critical_fraction));
        Self {
            game_state,
            content,
            rng,
            autopilot: None,
            next_command_id,
            pending_commands: Vec::new(),
            metrics_every: 10,
            metrics_history: VecDeque::new(),
            alert_engine,
        }
    }

    pub fn push_metrics(&mut self, snapshot: MetricsSnapshot) {
        if self.metrics_history.len() >= METRICS_HISTORY_CAP {
            self.metrics_history.pop_front();
        }
        self.metrics_history.push_back(snapshot);
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub ticks_per_sec: f64,
    pub run_dir: Option<PathBuf>,
    pub paused: Arc<AtomicBool>,
}
