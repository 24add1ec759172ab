use crate::config::DetourConfig;
use crate::error::{DetourError, RoadRef};
use crate::road::RoadTestCase;
use crate::selection::Detour;
use geo_types::Coord;
use std::collections::HashSet;

fn wavy_road(amplitude: f64, frequency: f64) -> Vec<Coord<f64>> {
    let mut heading: f64 = 0.0;
    let (mut x, mut y) = (0.0, 0.0);
    let mut points = vec![Coord { x, y }];
    for i in 0..12 {
        heading += amplitude * (frequency * i as f64).sin();
        x += 5.0 * heading.cos();
        y += 5.0 * heading.sin();
        points.push(Coord { x, y });
    }
    points
}

fn executed(failing: usize, passing: usize) -> Vec<RoadTestCase<usize>> {
    let mut roads = Vec::new();
    for i in 0..failing {
        let k = i as f64;
        roads.push(RoadTestCase::executed(
            100 + i,
            wavy_road(0.3 + 0.05 * k, 0.5 + 0.05 * k),
            true,
        ));
    }
    for i in 0..passing {
        let k = i as f64;
        roads.push(RoadTestCase::executed(
            200 + i,
            wavy_road(0.05 + 0.04 * k, 1.5 + 0.3 * k),
            false,
        ));
    }
    roads
}

fn not_executed(count: usize) -> Vec<RoadTestCase<usize>> {
    (0..count)
        .map(|i| {
            let k = i as f64;
            RoadTestCase::not_executed(i, wavy_road(0.02 + 0.035 * k, 0.4 + 0.13 * k))
        })
        .collect()
}

fn detour(failing: usize, passing: usize, candidates: usize, seed: u64) -> Detour<usize> {
    let config = DetourConfig {
        random_seed: seed,
        ..DetourConfig::default()
    };
    Detour::from_config(
        executed(failing, passing),
        not_executed(candidates),
        &config,
    )
    .unwrap()
}

#[test]
fn test_selection_count_within_bounds() {
    let detour = detour(2, 3, 10, 0);
    let selected = detour.select(0.1, 0.5, 4, 4).unwrap();
    assert!(!selected.is_empty() && selected.len() <= 5, "{selected:?}");

    let unique: HashSet<usize> = selected.iter().map(|&&id| id).collect();
    assert_eq!(unique.len(), selected.len());
    assert!(selected.iter().all(|&&id| id < 10));
}

#[test]
fn test_full_prioritization_orders_every_candidate() {
    let detour = detour(2, 3, 10, 3);
    let ordered = detour.prioritize(1.0).unwrap();
    let mut ids: Vec<usize> = ordered.iter().map(|&&id| id).collect();
    ids.sort();
    assert_eq!(ids, (0..10).collect::<Vec<_>>());
}

#[test]
fn test_prioritization_is_reproducible() {
    let first: Vec<usize> = detour(2, 3, 10, 11)
        .prioritize(1.0)
        .unwrap()
        .into_iter()
        .copied()
        .collect();
    let again = detour(2, 3, 10, 11);
    for _ in 0..2 {
        let ordered: Vec<usize> = again.prioritize(1.0).unwrap().into_iter().copied().collect();
        assert_eq!(ordered, first);
    }
}

#[test]
fn test_partial_prioritization_count() {
    let detour = detour(2, 3, 10, 0);
    assert_eq!(detour.prioritize(0.3).unwrap().len(), 3);
    // floor(0.05 * 10) is 0, raised to 1
    assert_eq!(detour.prioritize(0.05).unwrap().len(), 1);
}

#[test]
fn test_window_stops_early() {
    let detour = detour(2, 3, 10, 0);
    // With m = 0 every selection counts as questionable
    let selected = detour.select(0.0, 1.0, 0, 2).unwrap();
    assert_eq!(selected.len(), 2);
}

#[test]
fn test_window_waits_for_min_count() {
    let detour = detour(2, 3, 10, 0);
    let selected = detour.select(0.6, 1.0, 0, 1).unwrap();
    assert_eq!(selected.len(), 6);
}

#[test]
fn test_session_counts_down() {
    let detour = detour(2, 3, 10, 5);
    let mut session = detour.session().unwrap();
    let initial = session.tree().selectable_count();
    assert_eq!(initial, 10);
    for k in 1..=initial {
        session.select_next().unwrap();
        assert_eq!(session.tree().selectable_count(), initial - k);
    }
}

#[test]
fn test_closest_oracles_are_clamped_and_sorted() {
    let detour = detour(2, 3, 4, 0);
    let session = detour.session().unwrap();
    let oracles = session.oracle_ids();
    assert_eq!(oracles, vec![0, 1, 2, 3, 4]);

    let candidate = 5;
    let closest = session.m_closest_oracles(&oracles, candidate, 10);
    assert_eq!(closest.len(), 5);
    let distances: Vec<f64> = closest
        .iter()
        .map(|&o| session.distances().get(candidate, o))
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_no_failing_oracles_is_undefined() {
    let detour = detour(0, 3, 5, 0);
    let err = detour.prioritize(1.0).unwrap_err();
    assert!(matches!(err, DetourError::UndefinedSelection { .. }));
}

#[test]
fn test_nothing_selectable_returns_empty() {
    let detour = detour(2, 3, 0, 0);
    assert!(detour.select(0.1, 0.5, 4, 4).unwrap().is_empty());
}

#[test]
fn test_short_road_aborts_batch() {
    let mut candidates = not_executed(3);
    candidates.push(RoadTestCase::not_executed(
        99,
        vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }],
    ));
    let detour =
        Detour::from_config(executed(1, 1), candidates, &DetourConfig::default()).unwrap();
    let err = detour.prioritize(1.0).unwrap_err();
    assert!(matches!(
        err,
        DetourError::InvalidGeometry {
            road: Some(RoadRef::NotExecuted(3)),
            ..
        }
    ));
    assert!(err.to_string().contains("not-executed road 3"));
}

#[test]
fn test_bad_ratios_rejected() {
    let detour = detour(2, 3, 10, 0);
    assert!(matches!(
        detour.select(0.5, 0.1, 4, 4),
        Err(DetourError::Configuration(_))
    ));
    assert!(matches!(
        detour.prioritize(1.2),
        Err(DetourError::Configuration(_))
    ));
}

#[test]
fn test_mislabelled_roads_rejected() {
    let result = Detour::from_config(
        not_executed(2),
        not_executed(2),
        &DetourConfig::default(),
    );
    assert!(matches!(result, Err(DetourError::Configuration(_))));
}
