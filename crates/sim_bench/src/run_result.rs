use serde::Serialize;
use sim_core::{MetricsSnapshot, RoundOutcome};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub tick_start: u64,
    pub tick_end: u64,
    pub total_ticks: u64,
    pub wall_time_ms: u64,
    pub sim_ticks_per_second: f64,
    pub outcome: Option<RoundOutcome>,
    pub summary_metrics: Option<SummaryMetrics>,
    pub flooded: bool,
    pub flood_tick: Option<u64>,
    pub metrics_path: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryMetrics {
    pub water_fraction: f64,
    pub stress_fraction: f64,
    pub round_remaining_s: f64,
    pub stations_operational: u32,
    pub stations_broken: u32,
    pub stations_destroyed: u32,
    pub breakdowns: u32,
    pub repairs: u32,
    pub destructions: u32,
    pub repair_mistakes: u32,
    pub threat_timeouts: u32,
    pub bottlenecks: u32,
    pub max_heat: f64,
}

impl SummaryMetrics {
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            water_fraction: f64::from(snapshot.water_fraction),
            stress_fraction: f64::from(snapshot.stress_fraction),
            round_remaining_s: f64::from(snapshot.round_remaining_s),
            stations_operational: snapshot.stations_operational,
            stations_broken: snapshot.stations_broken,
            stations_destroyed: snapshot.stations_destroyed,
            breakdowns: snapshot.breakdowns,
            repairs: snapshot.repairs,
            destructions: snapshot.destructions,
            repair_mistakes: snapshot.repair_mistakes,
            threat_timeouts: snapshot.threat_timeouts,
            bottlenecks: snapshot.bottlenecks,
            max_heat: f64::from(snapshot.max_heat),
        }
    }
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

pub fn is_flooded(outcome: Option<RoundOutcome>) -> bool {
    outcome == Some(RoundOutcome::Flooded)
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}

#[cfg(test)]
pub(crate) fn sample_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        tick: 3000,
        metrics_version: 1,
        round_running: false,
        round_remaining_s: 0.0,
        water_level: 62.5,
        water_fraction: 0.625,
        stress: 40.0,
        stress_fraction: 0.4,
        stations_operational: 5,
        stations_broken: 1,
        stations_destroyed: 0,
        breakdowns: 7,
        repairs: 6,
        destructions: 0,
        repair_mistakes: 2,
        threat_timeouts: 1,
        bottlenecks: 3,
        max_heat: 48.0,
        active_threats: 0,
        open_bottlenecks: 0,
    }
}
