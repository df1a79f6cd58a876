use crate::state::{EventTx, SharedSim, SimState};
use sim_control::CommandSource;
use sim_core::{EventEnvelope, EventLevel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Runs one tick under the lock: queued client commands first, then the
/// autopilot crew, then metrics sampling and alert evaluation.
pub fn step(sim: &mut SimState) -> Vec<EventEnvelope> {
    let SimState {
        game_state,
        content,
        rng,
        autopilot,
        next_command_id,
        pending_commands,
        ..
    } = sim;

    let mut commands = std::mem::take(pending_commands);
    if let Some(autopilot) = autopilot {
        commands.extend(autopilot.generate_commands(game_state, content, next_command_id));
    }
    let mut events = sim_core::tick(game_state, &commands, content, rng, EventLevel::Normal);
    game_state.counters.next_command_id = *next_command_id;

    let metrics_every = sim.metrics_every;
    if metrics_every > 0 && sim.game_state.meta.tick.is_multiple_of(metrics_every) {
        let snapshot = sim_core::compute_metrics(&sim.game_state, &sim.content);
        sim.push_metrics(snapshot);
        if let Some(engine) = sim.alert_engine.as_mut() {
            let tick = sim.game_state.meta.tick;
            events.extend(engine.evaluate(
                &sim.metrics_history,
                tick,
                &mut sim.game_state.counters,
            ));
        }
    }

    for event in &events {
        if let sim_core::Event::RoundEnded { outcome, elapsed_s } = &event.event {
            tracing::info!(?outcome, elapsed_s, tick = event.tick, "round ended");
        }
    }
    events
}

pub async fn run_tick_loop(
    sim: SharedSim,
    event_tx: EventTx,
    ticks_per_sec: f64,
    max_ticks: Option<u64>,
    paused: Arc<AtomicBool>,
) {
    let mut interval = if ticks_per_sec > 0.0 {
        let mut iv = tokio::time::interval(Duration::from_secs_f64(1.0 / ticks_per_sec));
        iv.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
        Some(iv)
    } else {
        None
    };

    loop {
        if paused.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            continue;
        }

        let (events, done) = {
            let mut guard = sim.lock();
            let events = step(&mut guard);
            let done = max_ticks.is_some_and(|max| guard.game_state.meta.tick >= max);
            (events, done)
        };

        let _ = event_tx.send(events);

        if done {
            tracing::info!("reached max ticks, stopping tick loop");
            break;
        }

        if let Some(ref mut iv) = interval {
            iv.tick().await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}
