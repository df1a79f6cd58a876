mod alerts;
mod routes;
mod state;
mod tick_loop;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_control::CrewAutopilot;
use sim_core::GameState;
use sim_world::{build_initial_state, generate_run_id, load_content, write_run_info};
use tracing_subscriber::EnvFilter;

use crate::routes::make_router_with_cors;
use crate::state::{AppState, SimState};
use crate::tick_loop::run_tick_loop;

#[derive(Parser)]
#[command(name = "sim_daemon", about = "Authoritative session server for the submarine crew sim")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a session and serve it over HTTP.
    Run {
        /// Build a fresh session with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Load initial GameState from a JSON file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 3001)]
        port: u16,
        /// Ticks per wall-clock second. 0 runs as fast as possible.
        #[arg(long, default_value_t = 10.0)]
        ticks_per_sec: f64,
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Let the bot crew take both seats.
        #[arg(long)]
        autopilot: bool,
        /// Chance that each autopilot decision goes wrong.
        #[arg(long, default_value_t = 0.0)]
        mistake_chance: f64,
        #[arg(long, default_value_t = 10)]
        metrics_every: u64,
        /// Disable the runs/ directory (and with it /api/v1/save).
        #[arg(long)]
        no_metrics: bool,
        #[arg(long, default_value = "http://localhost:5173")]
        cors_origin: String,
    },
}

struct RunArgs {
    seed: Option<u64>,
    state_file: Option<String>,
    content_dir: String,
    port: u16,
    ticks_per_sec: f64,
    max_ticks: Option<u64>,
    autopilot: bool,
    mistake_chance: f64,
    metrics_every: u64,
    no_metrics: bool,
    cors_origin: String,
}

fn load_state(path: &str) -> Result<GameState> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading state file: {path}"))?;
    serde_json::from_str(&json).with_context(|| format!("parsing state file: {path}"))
}

async fn run(args: RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;

    let (game_state, rng) = if let Some(path) = &args.state_file {
        let loaded = load_state(path)?;
        let rng = ChaCha8Rng::seed_from_u64(loaded.meta.seed);
        (loaded, rng)
    } else {
        let seed = args.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = build_initial_state(&content, seed, &mut rng);
        (state, rng)
    };
    let seed = game_state.meta.seed;

    let run_dir = if args.no_metrics {
        None
    } else {
        let run_id = generate_run_id(seed);
        let dir = std::path::PathBuf::from("runs").join(&run_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating run directory: {}", dir.display()))?;
        write_run_info(
            &dir,
            &run_id,
            seed,
            &content.content_version,
            "sim_daemon",
            serde_json::json!({
                "port": args.port,
                "ticks_per_sec": args.ticks_per_sec,
                "autopilot": args.autopilot,
                "mistake_chance": args.mistake_chance,
            }),
        )?;
        Some(dir)
    };

    let mut sim = SimState::new(game_state, content, rng);
    sim.metrics_every = args.metrics_every;
    if args.autopilot {
        let crew = CrewAutopilot::new(seed)
            .with_mistake_chance(args.mistake_chance)
            .with_auto_restart(true);
        sim.autopilot = Some(crew);
    }

    let (event_tx, _) = tokio::sync::broadcast::channel(256);
    let paused = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        sim: Arc::new(Mutex::new(sim)),
        event_tx: event_tx.clone(),
        ticks_per_sec: args.ticks_per_sec,
        run_dir,
        paused: paused.clone(),
    };

    tracing::info!(
        seed,
        port = args.port,
        ticks_per_sec = args.ticks_per_sec,
        autopilot = args.autopilot,
        "starting sim_daemon"
    );

    tokio::spawn(run_tick_loop(
        app_state.sim.clone(),
        event_tx,
        args.ticks_per_sec,
        args.max_ticks,
        paused,
    ));

    let router = make_router_with_cors(app_state, &args.cors_origin);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router).await.context("serving HTTP")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            seed,
            state_file,
            content_dir,
            port,
            ticks_per_sec,
            max_ticks,
            autopilot,
            mistake_chance,
            metrics_every,
            no_metrics,
            cors_origin,
        } => {
            run(RunArgs {
                seed,
                state_file,
                content_dir,
                port,
                ticks_per_sec,
                max_ticks,
                autopilot,
                mistake_chance,
                metrics_every,
                no_metrics,
                cors_origin,
            })
            .await?;
        }
    }
    Ok(())
}
