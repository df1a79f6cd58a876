//! Snapshot metrics computed from `GameState`.
//!
//! A single `compute_metrics(&GameState, &GameContent) -> MetricsSnapshot` function
//! samples the current state for time-series analysis. No state mutation, no IO.

use crate::{GameContent, GameState, PuzzleState, SessionPhase, StatType, StationStatus};
use serde::Serialize;
use std::io::Write;

/// Current schema version. Bump when fields are added, removed, or reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub metrics_version: u32,
    pub round_running: bool,

    // Clocks
    pub round_remaining_s: f32,
    pub water_level: f32,
    /// Water level as a fraction of the maximum, 0..=1.
    pub water_fraction: f32,
    pub stress: f32,
    /// Stress as a fraction of `stress_max`, 0..=1.
    pub stress_fraction: f32,

    // Stations
    pub stations_operational: u32,
    pub stations_broken: u32,
    pub stations_destroyed: u32,

    // Round statistics
    pub breakdowns: u32,
    pub repairs: u32,
    pub destructions: u32,
    pub repair_mistakes: u32,
    pub threat_timeouts: u32,
    pub bottlenecks: u32,

    // Active puzzles
    pub max_heat: f32,
    pub active_threats: u32,
    pub open_bottlenecks: u32,
}

fn fraction(value: f32, max: f32) -> f32 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn count(n: usize) -> u32 {
    n as u32
}

pub fn compute_metrics(state: &GameState, content: &GameContent) -> MetricsSnapshot {
    let c = &content.constants;

    let mut max_heat = 0.0_f32;
    let mut active_threats = 0_usize;
    let mut open_bottlenecks = 0_u32;
    for puzzle in state.stations.values().filter_map(|s| s.puzzle.as_ref()) {
        match puzzle {
            PuzzleState::Wiring(_) => {}
            PuzzleState::Thermal(p) => {
                max_heat = max_heat.max(p.front_heat).max(p.back_heat);
                if p.bottleneck.is_some() {
                    open_bottlenecks += 1;
                }
            }
            PuzzleState::Radar(p) => active_threats += p.threats.len(),
        }
    }

    MetricsSnapshot {
        tick: state.meta.tick,
        metrics_version: METRICS_VERSION,
        round_running: state.phase == SessionPhase::Running,
        round_remaining_s: state.round.remaining_s,
        water_level: state.flood.level,
        water_fraction: fraction(state.flood.level, c.flood_max_level),
        stress: state.stress.stress,
        stress_fraction: fraction(state.stress.stress, c.stress_max),
        stations_operational: count(state.count_stations(StationStatus::Operational)),
        stations_broken: count(state.count_stations(StationStatus::Broken)),
        stations_destroyed: count(state.count_stations(StationStatus::Destroyed)),
        breakdowns: state.stat(StatType::Breakdowns),
        repairs: state.stat(StatType::Repairs),
        destructions: state.stat(StatType::Destructions),
        repair_mistakes: state.stat(StatType::RepairMistakes),
        threat_timeouts: state.stat(StatType::ThreatTimeouts),
        bottlenecks: state.stat(StatType::Bottlenecks),
        max_heat,
        active_threats: count(active_threats),
        open_bottlenecks,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "tick,metrics_version,round_running,\
         round_remaining_s,water_level,water_fraction,stress,stress_fraction,\
         stations_operational,stations_broken,stations_destroyed,\
         breakdowns,repairs,destructions,repair_mistakes,threat_timeouts,bottlenecks,\
         max_heat,active_threats,open_bottlenecks"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.tick,
        snapshot.metrics_version,
        u8::from(snapshot.round_running),
        snapshot.round_remaining_s,
        snapshot.water_level,
        snapshot.water_fraction,
        snapshot.stress,
        snapshot.stress_fraction,
        snapshot.stations_operational,
        snapshot.stations_broken,
        snapshot.stations_destroyed,
        snapshot.breakdowns,
        snapshot.repairs,
        snapshot.destructions,
        snapshot.repair_mistakes,
        snapshot.threat_timeouts,
        snapshot.bottlenecks,
        snapshot.max_heat,
        snapshot.active_threats,
        snapshot.open_bottlenecks,
    )
}

/// Write a collection of snapshots to a CSV file.
pub fn write_metrics_csv(path: &str, snapshots: &[MetricsSnapshot]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_metrics_header(&mut file)?;
    for snapshot in snapshots {
        append_metrics_row(&mut file, snapshot)?;
    }
    Ok(())
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state, make_rng, running_state};
    use crate::{PuzzleKind, StationId};

    #[test]
    fn lobby_state_is_quiet() {
        let content = base_content();
        let state = base_state(&content);
        let snapshot = compute_metrics(&state, &content);
        assert!(!snapshot.round_running);
        assert_eq!(snapshot.stations_operational, 0);
        assert_eq!(snapshot.stations_broken, 0);
        assert!(snapshot.max_heat.abs() < f32::EPSILON);
    }

    #[test]
    fn counts_broken_stations_and_threats() {
        let content = base_content();
        let mut state = running_state(&content);
        let mut rng = make_rng();
        let mut events = Vec::new();
        let radar: StationId = content
            .stations
            .iter()
            .find(|s| s.puzzle == PuzzleKind::Radar)
            .map(|s| s.id.clone())
            .unwrap();
        crate::station::transition(
            &mut state,
            &content,
            &mut rng,
            &radar,
            StationStatus::Broken,
            &mut events,
        );

        let snapshot = compute_metrics(&state, &content);
        assert!(snapshot.round_running);
        assert_eq!(snapshot.stations_broken, 1);
        assert_eq!(snapshot.breakdowns, 1);
        assert!(snapshot.active_threats >= 1);
        assert_eq!(
            snapshot.stations_operational as usize,
            content.stations.len() - 1
        );
    }

    #[test]
    fn fractions_are_clamped() {
        let content = base_content();
        let mut state = running_state(&content);
        state.flood.level = content.constants.flood_max_level * 2.0;
        let snapshot = compute_metrics(&state, &content);
        assert!((snapshot.water_fraction - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn csv_header_and_row_have_same_width() {
        let content = base_content();
        let state = running_state(&content);
        let snapshot = compute_metrics(&state, &content);
        let mut buf = Vec::new();
        write_metrics_header(&mut buf).unwrap();
        append_metrics_row(&mut buf, &snapshot).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let widths: Vec<usize> = text.lines().map(|l| l.split(',').count()).collect();
        assert_eq!(widths.len(), 2);
        assert_eq!(widths[0], widths[1]);
    }
}
