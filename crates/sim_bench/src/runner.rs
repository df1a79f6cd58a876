use crate::run_result::{self, RunResult, SummaryMetrics};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::{CommandSource, CrewAutopilot};
use sim_core::{EventLevel, GameContent, MetricsSnapshot, RoundOutcome, SessionPhase};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

pub struct SeedResult {
    pub seed: u64,
    pub final_snapshot: MetricsSnapshot,
    /// `None` when the tick budget ran out before the round ended.
    pub outcome: Option<RoundOutcome>,
    #[allow(dead_code)]
    pub wall_time_ms: u64,
    pub run_id: String,
}

pub struct SeedParams<'a> {
    pub ticks: u64,
    pub metrics_every: u64,
    pub mistake_chance: f64,
    pub scenario_name: &'a str,
    pub scenario_params: &'a serde_json::Value,
}

/// Plays one round with the autopilot crew, stopping when it ends or the
/// tick budget runs out.
pub fn run_seed(
    content: &GameContent,
    seed: u64,
    seed_dir: &Path,
    params: &SeedParams<'_>,
) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = sim_world::build_initial_state(content, seed, &mut rng);
    let mut crew = CrewAutopilot::new(seed).with_mistake_chance(params.mistake_chance);
    let mut next_command_id = 0u64;

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;

    sim_world::write_run_info(
        seed_dir,
        &format!("seed_{seed}"),
        seed,
        &content.content_version,
        "sim_bench",
        serde_json::json!({
            "ticks": params.ticks,
            "metrics_every": params.metrics_every,
            "mistake_chance": params.mistake_chance,
        }),
    )?;

    let mut metrics_writer = sim_core::MetricsFileWriter::new(seed_dir.to_path_buf())
        .with_context(|| format!("opening metrics CSV in {}", seed_dir.display()))?;

    let mut outcome = None;
    for _ in 0..params.ticks {
        let commands = crew.generate_commands(&state, content, &mut next_command_id);
        sim_core::tick(&mut state, &commands, content, &mut rng, EventLevel::Normal);

        if state.meta.tick % params.metrics_every == 0 {
            let snapshot = sim_core::compute_metrics(&state, content);
            metrics_writer
                .write_row(&snapshot)
                .context("writing metrics row")?;
        }

        if let SessionPhase::Ended { outcome: ended } = state.phase {
            outcome = Some(ended);
            break;
        }
    }

    // Always capture final snapshot
    let final_snapshot = sim_core::compute_metrics(&state, content);
    if state.meta.tick % params.metrics_every != 0 {
        metrics_writer
            .write_row(&final_snapshot)
            .context("writing final metrics row")?;
    }
    metrics_writer.flush().context("flushing metrics")?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    let sim_ticks_per_second = if wall_time_ms > 0 {
        (state.meta.tick as f64) / (wall_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    let flooded = run_result::is_flooded(outcome);
    let run_result = RunResult {
        run_schema_version: 1,
        run_status: "completed".to_string(),
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: params.scenario_name.to_string(),
        scenario_params: params.scenario_params.clone(),
        tick_start: 0,
        tick_end: final_snapshot.tick,
        total_ticks: params.ticks,
        wall_time_ms,
        sim_ticks_per_second,
        outcome,
        summary_metrics: Some(SummaryMetrics::from_snapshot(&final_snapshot)),
        flooded,
        flood_tick: flooded.then_some(final_snapshot.tick),
        metrics_path: "metrics_000.csv".to_string(),
        error_message: None,
    };

    run_result
        .write_atomic(&seed_dir.join("run_result.json"))
        .context("writing run_result.json")?;

    Ok(SeedResult {
        seed,
        final_snapshot,
        outcome,
        wall_time_ms,
        run_id,
    })
}
