use sim_core::MetricsSnapshot;
use std::collections::{BTreeSet, VecDeque};

type RuleFn = fn(&VecDeque<MetricsSnapshot>, &AlertEngine) -> bool;

struct AlertRule {
    id: &'static str,
    severity: sim_core::AlertSeverity,
    check: RuleFn,
    message: &'static str,
    suggested_action: &'static str,
}

const RULES: &[AlertRule] = &[
    AlertRule {
        id: "FLOOD_CRITICAL",
        severity: sim_core::AlertSeverity::Critical,
        check: |h, engine| {
            latest(h).is_some_and(|s| s.round_running && s.water_fraction >= engine.critical_fraction)
        },
        message: "Water past the critical mark; the next flood event costs a station",
        suggested_action: "Clear every broken station before the water rises further",
    },
    AlertRule {
        id: "MULTIPLE_BROKEN",
        severity: sim_core::AlertSeverity::Warning,
        check: |h, _| latest(h).is_some_and(|s| s.stations_broken >= 2),
        message: "Two or more stations broken at once",
        suggested_action: "Split the crew: technician on wiring and radar, engineer on thermal",
    },
    AlertRule {
        id: "STRESS_HIGH",
        severity: sim_core::AlertSeverity::Warning,
        check: |h, _| h.len() >= 3 && tail(h, 3).iter().all(|s| s.stress_fraction > 0.8),
        message: "Hull stress above 80% for 3+ samples",
        suggested_action: "Expect a breakdown soon; finish open repairs first",
    },
    AlertRule {
        id: "STATION_LOST",
        severity: sim_core::AlertSeverity::Critical,
        check: |h, _| latest(h).is_some_and(|s| s.stations_destroyed > 0),
        message: "A station has been destroyed and is flooding the hull",
        suggested_action: "Keep the remaining stations operational to slow the water",
    },
    AlertRule {
        id: "MISTAKES_RISING",
        severity: sim_core::AlertSeverity::Warning,
        check: |h, _| {
            let recent = tail(h, 10);
            if recent.len() < 2 {
                return false;
            }
            let delta = max_u(&recent, |s| s.repair_mistakes) - min_u(&recent, |s| s.repair_mistakes);
            delta >= 3
        },
        message: "Repair mistakes piling up",
        suggested_action: "Slow down and read the sequence back before pulling the lever",
    },
];

// --- Helpers for querying recent snapshots ---

fn latest(h: &VecDeque<MetricsSnapshot>) -> Option<&MetricsSnapshot> {
    h.back()
}

fn tail(h: &VecDeque<MetricsSnapshot>, n: usize) -> Vec<&MetricsSnapshot> {
    h.iter().rev().take(n).collect()
}

fn max_u(snapshots: &[&MetricsSnapshot], f: fn(&MetricsSnapshot) -> u32) -> u32 {
    snapshots.iter().map(|s| f(s)).max().unwrap_or(0)
}

fn min_u(snapshots: &[&MetricsSnapshot], f: fn(&MetricsSnapshot) -> u32) -> u32 {
    snapshots.iter().map(|s| f(s)).min().unwrap_or(0)
}

// --- AlertEngine ---

pub struct AlertEngine {
    active: BTreeSet<String>,
    critical_fraction: f32,
}

impl AlertEngine {
    pub fn new(critical_fraction: f32) -> Self {
        Self {
            active: BTreeSet::new(),
            critical_fraction,
        }
    }

    /// Returns current active alert IDs (for the /api/v1/alerts endpoint).
    pub fn active_alert_ids(&self) -> Vec<String> {
        self.active.iter().cloned().collect()
    }

    /// Evaluate all rules against recent metrics history. Returns events for state changes.
    pub fn evaluate(
        &mut self,
        history: &VecDeque<MetricsSnapshot>,
        tick: u64,
        counters: &mut sim_core::Counters,
    ) -> Vec<sim_core::EventEnvelope> {
        let mut events = Vec::new();

        for rule in RULES {
            let fired = (rule.check)(history, self);
            let was_active = self.active.contains(rule.id);

            if fired && !was_active {
                self.active.insert(rule.id.to_string());
                events.push(make_envelope(
                    counters,
                    tick,
                    sim_core::Event::AlertRaised {
                        alert_id: rule.id.to_string(),
                        severity: rule.severity.clone(),
                        message: rule.message.to_string(),
                        suggested_action: rule.suggested_action.to_string(),
                    },
                ));
            } else if !fired && was_active {
                self.active.remove(rule.id);
                events.push(make_envelope(
                    counters,
                    tick,
                    sim_core::Event::AlertCleared {
                        alert_id: rule.id.to_string(),
                    },
                ));
            }
        }

        events
    }
}

fn make_envelope(
    counters: &mut sim_core::Counters,
    tick: u64,
    event: sim_core::Event,
) -> sim_core::EventEnvelope {
    let id = sim_core::EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    sim_core::EventEnvelope { id, tick, event }
}
