//! Content loading and session setup shared between sim_cli, sim_daemon and sim_bench.

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sim_core::{
    Constants, Counters, FloodState, GameContent, GameState, MetaState, RadarContent,
    RoundState, SessionPhase, StationDef, StationId, StationState, StationStatus, StressEventDef,
    StressState, ThermalContent, SYMBOLS_PER_OBJECT,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

#[derive(Deserialize)]
struct StationsFile {
    content_version: String,
    stations: Vec<StationDef>,
}

#[derive(Deserialize)]
struct StressEventsFile {
    events: Vec<StressEventDef>,
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {name}"))
}

/// Validates cross-references and ranges in loaded content.
///
/// Catches authoring mistakes like a stress event pointing at an unknown
/// station, pressure bands out of order, or a radar board that could never
/// be filled.
pub fn validate_content(content: &GameContent) -> Result<()> {
    let c = &content.constants;
    if c.tick_seconds <= 0.0 {
        bail!("tick_seconds must be positive, got {}", c.tick_seconds);
    }
    if c.round_duration_s <= 0.0 {
        bail!("round_duration_s must be positive, got {}", c.round_duration_s);
    }
    if c.flood_max_level <= 0.0 {
        bail!("flood_max_level must be positive, got {}", c.flood_max_level);
    }
    if !(0.0..=1.0).contains(&c.flood_critical_fraction) {
        bail!(
            "flood_critical_fraction must be within [0, 1], got {}",
            c.flood_critical_fraction
        );
    }
    if c.stress_max <= 0.0 {
        bail!("stress_max must be positive, got {}", c.stress_max);
    }
    if c.thermal_min_heat >= c.thermal_max_heat {
        bail!(
            "thermal_min_heat {} must be below thermal_max_heat {}",
            c.thermal_min_heat,
            c.thermal_max_heat
        );
    }
    if c.thermal_heat_rate_min > c.thermal_heat_rate_max {
        bail!("thermal heat rate range is inverted");
    }
    if c.bottleneck_min_steps == 0 || c.bottleneck_min_steps > c.bottleneck_max_steps {
        bail!(
            "bottleneck steps must satisfy 0 < min <= max, got {}..={}",
            c.bottleneck_min_steps,
            c.bottleneck_max_steps
        );
    }
    if c.threat_count_min == 0 || c.threat_count_min > c.threat_count_max {
        bail!(
            "threat counts must satisfy 0 < min <= max, got {}..={}",
            c.threat_count_min,
            c.threat_count_max
        );
    }
    if c.radar_board_size == 0 {
        bail!("radar_board_size must be positive");
    }
    if usize::from(c.radar_symbol_count) < SYMBOLS_PER_OBJECT {
        bail!(
            "radar_symbol_count {} cannot give each object {SYMBOLS_PER_OBJECT} distinct symbols",
            c.radar_symbol_count
        );
    }

    // Stations.
    let mut station_ids: HashSet<&StationId> = HashSet::new();
    for station in &content.stations {
        if station.id.0.is_empty() {
            bail!("station '{}' has an empty id", station.name);
        }
        if !station_ids.insert(&station.id) {
            bail!("duplicate station id '{}'", station.id);
        }
    }

    // Stress events must reference known stations.
    for event in &content.stress_events {
        if !station_ids.contains(&event.station) {
            bail!(
                "stress event '{}' references unknown station '{}'",
                event.id,
                event.station
            );
        }
        if event.base_weight < 0.0 || event.multiplier < 0.0 {
            bail!("stress event '{}' has a negative weight", event.id);
        }
    }

    validate_thermal(&content.thermal)?;
    validate_radar(&content.radar, c)?;
    Ok(())
}

fn validate_thermal(thermal: &ThermalContent) -> Result<()> {
    if thermal.rhythm_profiles.is_empty() {
        bail!("thermal content has no rhythm profiles");
    }
    for rhythm in &thermal.rhythm_profiles {
        if rhythm.min_interval_s <= 0.0 || rhythm.min_interval_s > rhythm.max_interval_s {
            bail!(
                "rhythm '{}' interval must satisfy 0 < min <= max, got {}..{}",
                rhythm.id,
                rhythm.min_interval_s,
                rhythm.max_interval_s
            );
        }
    }
    if thermal.pressure_bands.is_empty() {
        bail!("thermal content has no pressure bands");
    }
    for pair in thermal.pressure_bands.windows(2) {
        if pair[0].upto >= pair[1].upto {
            bail!(
                "pressure bands must be sorted by upto: {} then {}",
                pair[0].upto,
                pair[1].upto
            );
        }
    }
    for band in &thermal.pressure_bands {
        if !(0.0..=1.0).contains(&band.bottleneck_chance) {
            bail!(
                "pressure band upto {} has bottleneck_chance {} outside [0, 1]",
                band.upto,
                band.bottleneck_chance
            );
        }
    }
    Ok(())
}

fn validate_radar(radar: &RadarContent, c: &Constants) -> Result<()> {
    if radar.objects.len() < c.radar_board_size {
        bail!(
            "radar has {} objects but the board needs {}",
            radar.objects.len(),
            c.radar_board_size
        );
    }
    let mut object_ids = HashSet::new();
    for object in &radar.objects {
        if !object_ids.insert(object.id.as_str()) {
            bail!("duplicate radar object id '{}'", object.id);
        }
        if object.categories.is_empty() {
            bail!("radar object '{}' has no categories", object.id);
        }
    }
    if radar.rules.is_empty() {
        bail!("radar content has no rules of engagement");
    }
    if radar.threat_profiles.is_empty() {
        bail!("radar content has no threat profiles");
    }
    for profile in &radar.threat_profiles {
        if profile.distance_min > profile.distance_max || profile.speed_min > profile.speed_max {
            bail!("threat profile '{}' has an inverted range", profile.id);
        }
        if profile.speed_min <= 0.0 {
            bail!("threat profile '{}' never arrives", profile.id);
        }
    }
    Ok(())
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let stations_file: StationsFile = read_json(dir, "stations.json")?;
    let stress_file: StressEventsFile = read_json(dir, "stress_events.json")?;
    let thermal: ThermalContent = read_json(dir, "thermal.json")?;
    let radar: RadarContent = read_json(dir, "radar.json")?;
    let content = GameContent {
        content_version: stations_file.content_version,
        stations: stations_file.stations,
        stress_events: stress_file.events,
        thermal,
        radar,
        constants,
    };
    validate_content(&content).with_context(|| format!("validating content in {content_dir}"))?;
    Ok(content)
}

/// Lobby state for a fresh session: every station `Default`, nobody joined.
pub fn build_initial_state(content: &GameContent, seed: u64, rng: &mut impl Rng) -> GameState {
    let stations: BTreeMap<StationId, StationState> = content
        .stations
        .iter()
        .map(|def| {
            let station = StationState {
                id: def.id.clone(),
                name: def.name.clone(),
                tier: def.tier,
                puzzle_kind: def.puzzle,
                status: StationStatus::Default,
                puzzle: None,
                powered: true,
            };
            (def.id.clone(), station)
        })
        .collect();

    GameState {
        meta: MetaState {
            tick: 0,
            seed,
            schema_version: 1,
            content_version: content.content_version.clone(),
            session_id: sim_core::generate_uuid(rng),
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

/// Run identifier of the form `YYYYMMDD_HHMMSS_seed{seed}` in UTC.
pub fn generate_run_id(seed: u64) -> String {
    let now = chrono::Utc::now();
    format!("{}_seed{seed}", now.format("%Y%m%d_%H%M%S"))
}

/// Writes `run_info.json` describing a headless run into `dir`.
pub fn write_run_info(
    dir: &Path,
    run_id: &str,
    seed: u64,
    content_version: &str,
    runner: &str,
    args: serde_json::Value,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "start_time": chrono::Utc::now().to_rfc3339(),
        "content_version": content_version,
        "runner": runner,
        "args": args,
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
