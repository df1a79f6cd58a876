//! Deterministic simulation tick for the flooding-submarine crew game.
//!
//! No IO, no network. All randomness via the passed-in Rng.

mod commands;
mod engine;
mod flood;
mod id;
pub mod metrics;
mod rules;
mod session;
mod station;
mod stress;
mod types;
pub mod views;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use engine::tick;
pub use flood::flood_display;
pub use id::generate_uuid;
pub use metrics::{
    append_metrics_row, compute_metrics, write_metrics_csv, write_metrics_header,
    MetricsFileWriter, MetricsSnapshot,
};
pub use rules::should_shoot;
pub use station::thermal::pressure_band;
pub use station::wiring::{solution_for, status_lights};
pub use types::*;
pub use views::{player_view, Panel, PlayerView, StationView};

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
