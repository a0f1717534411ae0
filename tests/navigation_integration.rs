//! Live navigation: a simulated drive through the session and tracker

mod common;

use ahash::AHashMap;
use tokio::sync::mpsc;

use common::*;
use zone_nav::core::config::TrackerConfig;
use zone_nav::core::types::{GeoPoint, VehicleClass};
use zone_nav::navigation::simulate::{steps_from_geometry, SimulatedDrive};
use zone_nav::navigation::{
    CameraCatalogue, FixError, NavEvent, NavigationSession, NavigationTracker, PositionFix,
    ProximityKind, TrackedPoint, TrackerPhase, TripPlan,
};
use zone_nav::routing::RouteGeometry;

/// East 1.1 km, then north 1.1 km
fn route() -> RouteGeometry {
    line(&[[0.0, 0.0], [0.01, 0.0], [0.01, 0.01]])
}

fn plan() -> TripPlan {
    let r = route();
    TripPlan::new(r.clone(), steps_from_geometry(&r))
        .with_class(VehicleClass::new("B"))
        .with_tracked_points(vec![
            TrackedPoint::hazard("cam-1", "Speed camera", GeoPoint::new(0.01, 0.005)),
            TrackedPoint::poi("fuel", "Fuel station", GeoPoint::new(0.005, 0.001)),
        ])
}

fn tracker() -> NavigationTracker {
    // ~220 m east of the northbound leg
    let zones = registry(vec![square("NEAR", 0.012, 0.004, 0.002, &["CERO"])]);
    NavigationTracker::new(TrackerConfig::default(), zones, clock())
}

async fn drive(drive: SimulatedDrive) -> Vec<NavEvent> {
    let (tx, rx) = mpsc::channel(16);
    let (session, mut events) = NavigationSession::start(tracker(), plan(), rx);

    drive.feed(&route(), tx, None).await;
    session.join().await;

    let mut out = Vec::new();
    while let Some(event) = events.recv().await {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn test_simulated_drive_announces_everything_once() {
    let events = drive(SimulatedDrive {
        jitter_m: 0.0,
        ..SimulatedDrive::default()
    })
    .await;

    assert!(matches!(events.first(), Some(NavEvent::TripStarted { .. })));
    assert!(matches!(events.last(), Some(NavEvent::Arrived { .. })));
    let arrivals = events
        .iter()
        .filter(|e| matches!(e, NavEvent::Arrived { .. }))
        .count();
    assert_eq!(arrivals, 1);

    let mut subjects: AHashMap<(ProximityKind, String), usize> = AHashMap::new();
    let mut current: AHashMap<usize, usize> = AHashMap::new();
    let mut upcoming: AHashMap<usize, usize> = AHashMap::new();
    for event in &events {
        match event {
            NavEvent::Proximity(p) => *subjects.entry((p.kind, p.subject_id.clone())).or_default() += 1,
            NavEvent::CurrentManeuver { step_index, .. } => *current.entry(*step_index).or_default() += 1,
            NavEvent::UpcomingManeuver { step_index, .. } => *upcoming.entry(*step_index).or_default() += 1,
            NavEvent::RerouteRequested { .. } => panic!("reroute on an exact drive"),
            _ => {}
        }
    }

    assert_eq!(subjects.len(), 3);
    assert!(subjects.values().all(|n| *n == 1));
    assert!(subjects.contains_key(&(ProximityKind::Hazard, "cam-1".to_string())));
    assert!(subjects.contains_key(&(ProximityKind::Zone, "NEAR".to_string())));

    assert_eq!(current.get(&1), Some(&1), "turn becomes current once");
    assert_eq!(upcoming.get(&1), Some(&1), "turn is pre-announced once");
    assert!(current.values().chain(upcoming.values()).all(|n| *n == 1));
}

#[tokio::test]
async fn test_jittered_drive_still_arrives() {
    let events = drive(SimulatedDrive::default()).await;
    assert!(matches!(events.last(), Some(NavEvent::Arrived { .. })));
}

#[tokio::test]
async fn test_fix_errors_keep_progress() {
    let (tx, rx) = mpsc::channel(8);
    let (session, _events) = NavigationSession::start(tracker(), plan(), rx);
    let state = session.state();

    tx.send(Ok(PositionFix::new(GeoPoint::new(0.005, 0.0), 1_000)))
        .await
        .unwrap();
    tx.send(Err(FixError::Unavailable("signal lost".into()))).await.unwrap();
    drop(tx);
    session.join().await;

    let s = state.borrow();
    assert_eq!(s.phase, TrackerPhase::Active);
    assert!((s.progress_fraction - 0.25).abs() < 0.01);
    assert!(matches!(s.last_error, Some(FixError::Unavailable(_))));
}

#[test]
fn test_fix_after_error_resumes_and_clears_it() {
    let mut t = tracker();
    t.start(plan());
    t.on_fix(PositionFix::new(GeoPoint::new(0.005, 0.0), 1_000));

    let events = t.on_fix_error(FixError::PermissionDenied);
    assert!(matches!(events.as_slice(), [NavEvent::FixError { .. }]));
    assert!(t.state().last_error.is_some());

    t.on_fix(PositionFix::new(GeoPoint::new(0.008, 0.0), 2_000));
    assert!(t.state().last_error.is_none());
    assert!(t.state().progress_fraction > 0.35);
}

#[test]
fn test_fix_at_last_vertex_arrives_once() {
    let mut t = tracker();
    t.start(plan());

    let end = PositionFix::new(GeoPoint::new(0.01, 0.01), 1_000);
    let first = t.on_fix(end);
    let second = t.on_fix(PositionFix { timestamp_ms: 2_000, ..end });

    let arrivals = first
        .iter()
        .chain(second.iter())
        .filter(|e| matches!(e, NavEvent::Arrived { .. }))
        .count();
    assert_eq!(arrivals, 1);
    assert_eq!(t.phase(), TrackerPhase::Arrived);
}

#[test]
fn test_divergence_requests_one_reroute_per_excursion() {
    let mut t = tracker();
    t.start(plan());

    let off = |lat: f64, ts: u64| PositionFix::new(GeoPoint::new(0.003, lat), ts);
    let count = |events: Vec<NavEvent>| {
        events
            .iter()
            .filter(|e| matches!(e, NavEvent::RerouteRequested { .. }))
            .count()
    };

    // ~110 m north of the eastbound leg, twice
    assert_eq!(count(t.on_fix(off(0.001, 1_000))), 1);
    assert_eq!(count(t.on_fix(off(0.001, 2_000))), 0);
    // Back on the road, then off again
    assert_eq!(count(t.on_fix(off(0.0, 3_000))), 0);
    assert_eq!(count(t.on_fix(off(0.001, 4_000))), 1);
}

#[test]
fn test_bundled_cameras_along_a1() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/speed_cameras.toml");
    let catalogue = CameraCatalogue::load(&path).unwrap();
    assert_eq!(catalogue.len(), 70);

    let a1 = line(&[[-3.64, 40.53], [-3.63, 40.54]]);
    let ids: Vec<&str> = catalogue
        .along_route(&a1, 300.0)
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["A1-018"]);
}
