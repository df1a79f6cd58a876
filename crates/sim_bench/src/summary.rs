use serde::Serialize;
use sim_core::{MetricsSnapshot, RoundOutcome};

type Extractor = (&'static str, fn(&MetricsSnapshot) -> f64);

const EXTRACTORS: &[Extractor] = &[
    ("water_fraction", |s| f64::from(s.water_fraction)),
    ("stress_fraction", |s| f64::from(s.stress_fraction)),
    ("round_remaining_s", |s| f64::from(s.round_remaining_s)),
    ("stations_operational", |s| f64::from(s.stations_operational)),
    ("stations_broken", |s| f64::from(s.stations_broken)),
    ("stations_destroyed", |s| f64::from(s.stations_destroyed)),
    ("breakdowns", |s| f64::from(s.breakdowns)),
    ("repairs", |s| f64::from(s.repairs)),
    ("destructions", |s| f64::from(s.destructions)),
    ("repair_mistakes", |s| f64::from(s.repair_mistakes)),
    ("threat_timeouts", |s| f64::from(s.threat_timeouts)),
    ("bottlenecks", |s| f64::from(s.bottlenecks)),
    ("max_heat", |s| f64::from(s.max_heat)),
];

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub survived_count: usize,
    pub flooded_count: usize,
    /// Seeds whose tick budget ran out mid-round.
    pub unfinished_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

pub fn compute_summary(results: &[(Option<RoundOutcome>, &MetricsSnapshot)]) -> SummaryStats {
    let count_outcome = |wanted: Option<RoundOutcome>| {
        results
            .iter()
            .filter(|(outcome, _)| *outcome == wanted)
            .count()
    };

    let metrics = EXTRACTORS
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = results.iter().map(|(_, s)| extract(s)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count: results.len(),
        survived_count: count_outcome(Some(RoundOutcome::Survived)),
        flooded_count: count_outcome(Some(RoundOutcome::Flooded)),
        unfinished_count: count_outcome(None),
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let stddev = variance.sqrt();

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev,
    }
}

/// Build aggregated metrics keyed by name:
/// `{ "key": { "mean": ..., "min": ..., "max": ..., "stddev": ... }, ... }`
pub fn build_aggregated_metrics(snapshots: &[&MetricsSnapshot]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, extract) in EXTRACTORS {
        let values: Vec<f64> = snapshots.iter().map(|s| extract(s)).collect();
        let summary = compute_metric_summary(name, &values);
        map.insert(
            (*name).to_string(),
            serde_json::json!({
                "mean": summary.mean,
                "min": summary.min,
                "max": summary.max,
                "stddev": summary.stddev,
            }),
        );
    }
    serde_json::Value::Object(map)
}

pub fn print_summary(scenario_name: &str, ticks: u64, stats: &SummaryStats) {
    let tick_display = if ticks >= 1000 {
        format!("{}k", ticks / 1000)
    } else {
        ticks.to_string()
    };
    println!(
        "\n=== {} ({} seeds, up to {} ticks each) ===\n",
        scenario_name, stats.seed_count, tick_display
    );
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(70));
    for metric in &stats.metrics {
        println!(
            "{:<30} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<30} {}/{}",
        "survival_rate", stats.survived_count, stats.seed_count
    );
    if stats.unfinished_count > 0 {
        println!(
            "{:<30} {}/{}",
            "unfinished", stats.unfinished_count, stats.seed_count
        );
    }
}
