use rand::seq::SliceRandom;

use crate::{Event, EventEnvelope, GameContent, GameState, StationId, StationStatus};

/// Rising water. Returns `true` once the hull is full.
///
/// The critical event fires once per round when the level first crosses
/// `flood_critical_fraction` of the maximum: one uniformly chosen Broken
/// station is destroyed. With nothing broken the event is spent anyway.
pub(crate) fn tick_flood(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl rand::Rng,
    events: &mut Vec<EventEnvelope>,
) -> bool {
    let c = &content.constants;
    let broken = state.count_stations(StationStatus::Broken);
    let destroyed = state.count_stations(StationStatus::Destroyed);
    #[allow(clippy::cast_precision_loss)] // station counts are tiny
    let rate = c.flood_base_rate + c.flood_broken_penalty * (broken + destroyed) as f32;
    state.flood.level += rate * c.tick_seconds;

    let critical_at = c.flood_max_level * c.flood_critical_fraction;
    if !state.flood.critical_triggered && state.flood.level >= critical_at {
        state.flood.critical_triggered = true;
        let candidates: Vec<StationId> = state
            .stations
            .values()
            .filter(|s| s.status == StationStatus::Broken)
            .map(|s| s.id.clone())
            .collect();
        let victim = candidates.choose(rng).cloned();
        if let Some(station_id) = &victim {
            crate::station::transition(
                state,
                content,
                rng,
                station_id,
                StationStatus::Destroyed,
                events,
            );
        }
        events.push(crate::emit(
            &mut state.counters,
            state.meta.tick,
            Event::FloodCritical {
                level: state.flood.level,
                destroyed: victim,
            },
        ));
    }

    state.flood.level >= c.flood_max_level
}

/// Water level as shown on client HUDs.
pub fn flood_display(state: &GameState, content: &GameContent) -> String {
    let max = content.constants.flood_max_level;
    let fraction = if max > 0.0 {
        (state.flood.level / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    format!("Water level: {:.0}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, make_rng, running_state};

    #[test]
    fn level_rises_with_base_rate() {
        let content = base_content();
        let mut state = running_state(&content);
        let mut rng = make_rng();
        let mut events = Vec::new();
        tick_flood(&mut state, &content, &mut rng, &mut events);
        let c = &content.constants;
        let expected = c.flood_base_rate * c.tick_seconds;
        assert!((state.flood.level - expected).abs() < 1e-6);
    }

    #[test]
    fn broken_and_destroyed_add_penalty() {
        let content = base_content();
        let mut calm = running_state(&content);
        let mut damaged = running_state(&content);
        let ids: Vec<_> = damaged.stations.keys().take(2).cloned().collect();
        damaged.stations.get_mut(&ids[0]).unwrap().status = StationStatus::Broken;
        damaged.stations.get_mut(&ids[1]).unwrap().status = StationStatus::Destroyed;

        let mut rng = make_rng();
        let mut events = Vec::new();
        tick_flood(&mut calm, &content, &mut rng, &mut events);
        tick_flood(&mut damaged, &content, &mut rng, &mut events);

        let c = &content.constants;
        let extra = 2.0 * c.flood_broken_penalty * c.tick_seconds;
        assert!((damaged.flood.level - calm.flood.level - extra).abs() < 1e-5);
    }

    #[test]
    fn critical_event_destroys_a_broken_station_once() {
        let content = base_content();
        let mut state = running_state(&content);
        let mut rng = make_rng();
        let mut events = Vec::new();
        let id = state.stations.keys().next().cloned().unwrap();
        crate::station::transition(
            &mut state,
            &content,
            &mut rng,
            &id,
            StationStatus::Broken,
            &mut events,
        );
        let c = &content.constants;
        state.flood.level = c.flood_max_level * c.flood_critical_fraction - 1e-4;

        tick_flood(&mut state, &content, &mut rng, &mut events);
        assert!(state.flood.critical_triggered);
        assert_eq!(state.stations[&id].status, StationStatus::Destroyed);

        let criticals = |events: &[EventEnvelope]| {
            events
                .iter()
                .filter(|e| matches!(e.event, Event::FloodCritical { .. }))
                .count()
        };
        assert_eq!(criticals(&events), 1);
        for _ in 0..20 {
            tick_flood(&mut state, &content, &mut rng, &mut events);
        }
        assert_eq!(criticals(&events), 1);
    }

    #[test]
    fn critical_event_without_broken_station_is_spent() {
        let content = base_content();
        let mut state = running_state(&content);
        let mut rng = make_rng();
        let mut events = Vec::new();
        let c = &content.constants;
        state.flood.level = c.flood_max_level * c.flood_critical_fraction;

        tick_flood(&mut state, &content, &mut rng, &mut events);
        assert!(state.flood.critical_triggered);
        assert_eq!(state.count_stations(StationStatus::Destroyed), 0);
        assert!(events.iter().any(|e| matches!(
            e.event,
            Event::FloodCritical {
                destroyed: None,
                ..
            }
        )));
    }

    #[test]
    fn full_hull_reports_end() {
        let content = base_content();
        let mut state = running_state(&content);
        let mut rng = make_rng();
        let mut events = Vec::new();
        state.flood.level = content.constants.flood_max_level;
        assert!(tick_flood(&mut state, &content, &mut rng, &mut events));
    }

    #[test]
    fn display_renders_percentage() {
        let content = base_content();
        let mut state = running_state(&content);
        state.flood.level = content.constants.flood_max_level * 0.42;
        assert_eq!(flood_display(&state, &content), "Water level: 42%");
        state.flood.level = content.constants.flood_max_level * 3.0;
        assert_eq!(flood_display(&state, &content), "Water level: 100%");
    }
}
