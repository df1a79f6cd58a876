use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::{CommandSource, CrewAutopilot};
use sim_core::{
    flood_display, Event, EventLevel, GameContent, GameState, SessionPhase, StationStatus,
    StatType,
};
use sim_world::{build_initial_state, generate_run_id, load_content, write_run_info};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sim_cli", about = "Flooded submarine crew simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation for a fixed number of ticks with the autopilot crew.
    Run {
        #[arg(long)]
        ticks: u64,
        /// Build a fresh session with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Load initial GameState from a JSON file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 100)]
        print_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
        /// Chance that each crew decision goes wrong.
        #[arg(long, default_value_t = 0.0)]
        mistake_chance: f64,
        /// Start a new round whenever one ends.
        #[arg(long)]
        auto_restart: bool,
        /// Sample metrics every N ticks (default 10, one second of game time).
        #[arg(long, default_value_t = 10)]
        metrics_every: u64,
        /// Disable automatic metrics collection to runs/ directory.
        #[arg(long)]
        no_metrics: bool,
    },
}

struct RunArgs {
    ticks: u64,
    seed: Option<u64>,
    state_file: Option<String>,
    content_dir: String,
    print_every: u64,
    event_level: EventLevel,
    mistake_chance: f64,
    auto_restart: bool,
    metrics_every: u64,
    no_metrics: bool,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn create_run_dir(run_id: &str) -> Result<std::path::PathBuf> {
    let dir = std::path::PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn run(args: RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;

    let (mut state, mut rng) = if let Some(path) = &args.state_file {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file: {path}"))?;
        let loaded: GameState =
            serde_json::from_str(&json).with_context(|| format!("parsing state file: {path}"))?;
        let rng_seed = loaded.meta.seed;
        (loaded, ChaCha8Rng::seed_from_u64(rng_seed))
    } else {
        let resolved_seed = args.seed.unwrap_or_else(rand::random);
        let mut new_rng = ChaCha8Rng::seed_from_u64(resolved_seed);
        let new_state = build_initial_state(&content, resolved_seed, &mut new_rng);
        (new_state, new_rng)
    };

    // Set up per-run metrics directory.
    let mut metrics_writer: Option<sim_core::MetricsFileWriter> = None;
    if !args.no_metrics {
        let run_id = generate_run_id(state.meta.seed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(
            &run_dir,
            &run_id,
            state.meta.seed,
            &content.content_version,
            "sim_cli",
            serde_json::json!({
                "ticks": args.ticks,
                "print_every": args.print_every,
                "metrics_every": args.metrics_every,
                "mistake_chance": args.mistake_chance,
                "auto_restart": args.auto_restart,
            }),
        )?;
        let writer = sim_core::MetricsFileWriter::new(run_dir.clone())
            .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
        metrics_writer = Some(writer);
        println!("Run directory: {}", run_dir.display());
    }

    let mut autopilot = CrewAutopilot::new(state.meta.seed)
        .with_mistake_chance(args.mistake_chance)
        .with_auto_restart(args.auto_restart);
    let mut next_command_id = state.counters.next_command_id;

    println!(
        "Starting simulation: ticks={} seed={} stations={} content_version={}",
        args.ticks,
        state.meta.seed,
        state.stations.len(),
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    for _ in 0..args.ticks {
        let commands = autopilot.generate_commands(&state, &content, &mut next_command_id);

        let events = sim_core::tick(&mut state, &commands, &content, &mut rng, args.event_level);

        // Print notable events regardless of print_every.
        for event in &events {
            print_notable(&state, &event.event);
        }

        if state.meta.tick % args.print_every == 0 {
            print_status(&state, &content);
        }

        if let Some(ref mut writer) = metrics_writer {
            if state.meta.tick % args.metrics_every == 0 {
                let snapshot = sim_core::compute_metrics(&state, &content);
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }
    state.counters.next_command_id = next_command_id;

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", state.meta.tick);
    print_status(&state, &content);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }

    Ok(())
}

fn print_notable(state: &GameState, event: &Event) {
    let tick = state.meta.tick;
    match event {
        Event::RoundStarted { .. } => println!("*** ROUND STARTED at tick={tick:05} ***"),
        Event::RoundEnded { outcome, elapsed_s } => {
            println!("*** ROUND ENDED: {outcome:?} after {elapsed_s:.1}s at tick={tick:05} ***");
        }
        Event::FloodCritical { destroyed, .. } => match destroyed {
            Some(station) => println!("*** FLOOD CRITICAL: {station} lost at tick={tick:05} ***"),
            None => println!("*** FLOOD CRITICAL at tick={tick:05} ***"),
        },
        Event::StationStatusChanged {
            station_id,
            to: StationStatus::Destroyed,
            ..
        } => println!("*** STATION DESTROYED: {station_id} at tick={tick:05} ***"),
        _ => {}
    }
}

fn print_status(state: &GameState, content: &GameContent) {
    let phase = match state.phase {
        SessionPhase::Lobby => "lobby".to_string(),
        SessionPhase::Running => "running".to_string(),
        SessionPhase::Ended { outcome } => format!("ended:{outcome:?}"),
    };
    println!(
        "[tick={tick:05}  {phase:<16}]  {flood}  left={left:5.1}s  stress={stress:5.1}  \
         broken={broken}  destroyed={destroyed}  repairs={repairs}  mistakes={mistakes}",
        tick = state.meta.tick,
        flood = flood_display(state, content),
        left = state.round.remaining_s,
        stress = state.stress.stress,
        broken = state.count_stations(StationStatus::Broken),
        destroyed = state.count_stations(StationStatus::Destroyed),
        repairs = state.stat(StatType::Repairs),
        mistakes = state.stat(StatType::RepairMistakes),
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            ticks,
            seed,
            state_file,
            content_dir,
            print_every,
            event_level,
            mistake_chance,
            auto_restart,
            metrics_every,
            no_metrics,
        } => {
            let event_level = match event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };
            run(RunArgs {
                ticks,
                seed,
                state_file,
                content_dir,
                print_every: print_every.max(1),
                event_level,
                mistake_chance,
                auto_restart,
                metrics_every: metrics_every.max(1),
                no_metrics,
            })?;
        }
    }
    Ok(())
}
