//! Navigation tracker
//!
//! Synchronous state machine: one `start()`, then one `on_fix()` per position
//! sample, then `stop()`. Each call returns the events it produced. Serializing
//! calls is the caller's job; `NavigationSession` does it with a single task.
//!
//! Per fix, in order: snap to the route, update progress and ETA, advance
//! steps, announce the current and upcoming maneuvers, check tracked points
//! and restricted zones, check divergence, check arrival.

use ahash::AHashSet;
use std::sync::Arc;

use super::events::{NavEvent, ProximityEvent, ProximityKind};
use super::format;
use super::hazards::TrackedPoint;
use super::state::{FixError, NavigationState, PositionFix, TrackerPhase};
use crate::core::calendar::Clock;
use crate::core::config::TrackerConfig;
use crate::core::error::Result;
use crate::core::types::{GeoPoint, TripId, VehicleClass};
use crate::geometry;
use crate::routing::{RouteCandidate, RouteGeometry, RouteStep};
use crate::zones::ZoneRegistry;

/// What the tracker needs to follow one trip
#[derive(Debug, Clone)]
pub struct TripPlan {
    pub route: RouteGeometry,
    pub steps: Vec<RouteStep>,
    /// Enables zone proximity alerts for zones forbidding this class
    pub vehicle_class: Option<VehicleClass>,
    pub tracked_points: Vec<TrackedPoint>,
}

impl TripPlan {
    pub fn new(route: RouteGeometry, steps: Vec<RouteStep>) -> Self {
        Self {
            route,
            steps,
            vehicle_class: None,
            tracked_points: Vec::new(),
        }
    }

    /// Fails with `InvalidInput` below two vertices
    pub fn from_points(points: Vec<GeoPoint>, steps: Vec<RouteStep>) -> Result<Self> {
        Ok(Self::new(RouteGeometry::new(points)?, steps))
    }

    pub fn from_candidate(candidate: &RouteCandidate) -> Self {
        Self::new(candidate.geometry.clone(), candidate.steps())
    }

    pub fn with_class(mut self, class: VehicleClass) -> Self {
        self.vehicle_class = Some(class);
        self
    }

    pub fn with_tracked_points(mut self, points: Vec<TrackedPoint>) -> Self {
        self.tracked_points = points;
        self
    }
}

pub struct NavigationTracker {
    config: TrackerConfig,
    registry: ZoneRegistry,
    clock: Arc<dyn Clock>,
    state: NavigationState,
    route: Option<RouteGeometry>,
    vehicle_class: Option<VehicleClass>,
    tracked: Vec<TrackedPoint>,
    announced_steps: AHashSet<usize>,
    preannounced_steps: AHashSet<usize>,
    announced_subjects: AHashSet<(ProximityKind, String)>,
    off_route: bool,
}

impl NavigationTracker {
    pub fn new(config: TrackerConfig, registry: ZoneRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            registry,
            clock,
            state: NavigationState::default(),
            route: None,
            vehicle_class: None,
            tracked: Vec::new(),
            announced_steps: AHashSet::new(),
            preannounced_steps: AHashSet::new(),
            announced_subjects: AHashSet::new(),
            off_route: false,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn phase(&self) -> TrackerPhase {
        self.state.phase
    }

    /// Begin a trip, discarding any previous one
    pub fn start(&mut self, plan: TripPlan) -> NavEvent {
        self.stop();

        let trip_id = TripId::new();
        let total = plan.route.total_length_m();
        let first_instruction = plan.steps.first().map(step_text);
        if !plan.steps.is_empty() {
            self.announced_steps.insert(0);
        }

        tracing::info!(
            "Trip {} started: {} over {} step(s)",
            trip_id,
            format::format_distance(total),
            plan.steps.len()
        );

        self.state = NavigationState {
            trip_id: Some(trip_id),
            phase: TrackerPhase::Active,
            distance_remaining_m: Some(total),
            steps: plan.steps,
            ..NavigationState::default()
        };
        self.route = Some(plan.route);
        self.vehicle_class = plan.vehicle_class;
        self.tracked = plan.tracked_points;

        NavEvent::TripStarted {
            trip_id,
            total_distance_m: total,
            first_instruction,
        }
    }

    /// Clear all per-trip state; idempotent
    pub fn stop(&mut self) {
        if let Some(trip_id) = self.state.trip_id {
            tracing::info!("Trip {} stopped", trip_id);
        }
        self.state = NavigationState::default();
        self.route = None;
        self.vehicle_class = None;
        self.tracked.clear();
        self.announced_steps.clear();
        self.preannounced_steps.clear();
        self.announced_subjects.clear();
        self.off_route = false;
    }

    /// Record a position source failure; progress is kept
    pub fn on_fix_error(&mut self, error: FixError) -> Vec<NavEvent> {
        if !self.state.is_active() {
            return Vec::new();
        }
        tracing::warn!("Position fix error: {}", error);
        self.state.last_error = Some(error.clone());
        vec![NavEvent::FixError { error }]
    }

    pub fn on_fix(&mut self, fix: PositionFix) -> Vec<NavEvent> {
        if !self.state.is_active() {
            return Vec::new();
        }
        if let Some(last) = &self.state.last_fix {
            if fix.timestamp_ms < last.timestamp_ms {
                tracing::debug!("Dropping stale fix at {} ms", fix.timestamp_ms);
                return Vec::new();
            }
        }
        let position = fix.position();
        if !position.is_finite() {
            tracing::warn!("Ignoring non-finite fix {:?}", position);
            return Vec::new();
        }
        let Some(route) = self.route.as_ref() else {
            return Vec::new();
        };

        // Progress and ETA
        let snapped = route.snap(position);
        let total = route.total_length_m();
        let remaining = (total - snapped.along_m).max(0.0);
        let progress = if total > 0.0 {
            (snapped.along_m / total).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let speed = fix
            .speed_mps
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(self.config.fallback_speed_mps);

        self.state.last_fix = Some(fix);
        self.state.snapped_position = Some(snapped.point);
        self.state.heading_deg = fix.heading_deg.or(self.state.heading_deg);
        self.state.speed_mps = fix.speed_mps;
        self.state.distance_remaining_m = Some(remaining);
        self.state.eta_s = Some(remaining / speed);
        self.state.progress_fraction = progress;
        self.state.distance_off_route_m = Some(snapped.distance_m);
        self.state.last_error = None;

        let mut events = Vec::new();
        self.track_steps(position, &mut events);
        self.check_tracked_points(position, &mut events);
        self.check_zones(position, &mut events);
        self.check_divergence(position, snapped.distance_m, &mut events);

        if remaining < self.config.arrival_m {
            if let Some(trip_id) = self.state.trip_id {
                tracing::info!("Trip {} arrived", trip_id);
                self.state.phase = TrackerPhase::Arrived;
                events.push(NavEvent::Arrived { trip_id });
            }
        }

        events
    }

    fn track_steps(&mut self, position: GeoPoint, events: &mut Vec<NavEvent>) {
        let steps = &self.state.steps;
        if steps.is_empty() {
            self.state.distance_to_step_end_m = None;
            return;
        }

        let current = self.state.current_step_index;
        let mut next = current;
        for (i, step) in steps.iter().enumerate().skip(current) {
            if geometry::haversine(position, step.end_point) <= self.config.step_advance_m {
                next = i + 1;
            }
        }
        let next = next.min(steps.len() - 1);
        self.state.current_step_index = next;
        self.state.distance_to_step_end_m = Some(geometry::haversine(position, steps[next].end_point));

        if next != current && self.announced_steps.insert(next) {
            events.push(NavEvent::CurrentManeuver {
                step_index: next,
                instruction: step_text(&steps[next]),
            });
        }

        if let Some(upcoming) = steps.get(next + 1) {
            let distance = geometry::haversine(position, upcoming.start_point);
            if distance < self.config.announce_m && self.preannounced_steps.insert(next + 1) {
                events.push(NavEvent::UpcomingManeuver {
                    step_index: next + 1,
                    distance_m: distance,
                    instruction: step_text(upcoming),
                });
            }
        }
    }

    fn check_tracked_points(&mut self, position: GeoPoint, events: &mut Vec<NavEvent>) {
        for point in &self.tracked {
            let key = (point.kind, point.id.clone());
            if self.announced_subjects.contains(&key) {
                continue;
            }
            let radius = point.radius_m.unwrap_or(match point.kind {
                ProximityKind::Hazard => self.config.hazard_radius_m,
                _ => self.config.poi_radius_m,
            });
            let distance = geometry::haversine(position, point.position);
            if distance <= radius {
                self.announced_subjects.insert(key);
                events.push(NavEvent::Proximity(ProximityEvent {
                    kind: point.kind,
                    subject_id: point.id.clone(),
                    label: point.label.clone(),
                    distance_m: distance,
                }));
            }
        }
    }

    fn check_zones(&mut self, position: GeoPoint, events: &mut Vec<NavEvent>) {
        let Some(class) = &self.vehicle_class else {
            return;
        };
        let today = self.clock.today();
        for zone in self.registry.restricting(class, today) {
            let key = (ProximityKind::Zone, zone.id.as_str().to_string());
            if self.announced_subjects.contains(&key) {
                continue;
            }
            let distance = geometry::distance_point_to_polygon(position, zone.boundary());
            if distance <= self.config.zone_alert_radius_m {
                self.announced_subjects.insert(key);
                events.push(NavEvent::Proximity(ProximityEvent {
                    kind: ProximityKind::Zone,
                    subject_id: zone.id.as_str().to_string(),
                    label: zone.name.clone(),
                    distance_m: distance,
                }));
            }
        }
    }

    /// One reroute request per excursion; re-armed once back on the route
    fn check_divergence(&mut self, position: GeoPoint, off_route_m: f64, events: &mut Vec<NavEvent>) {
        if off_route_m > self.config.divergence_m {
            if !self.off_route {
                self.off_route = true;
                tracing::info!("Off route by {:.0} m; requesting reroute", off_route_m);
                events.push(NavEvent::RerouteRequested {
                    position,
                    distance_off_route_m: off_route_m,
                });
            }
        } else {
            self.off_route = false;
        }
    }
}

fn step_text(step: &RouteStep) -> String {
    if step.instruction.trim().is_empty() {
        format::maneuver_text(step.maneuver)
    } else {
        step.instruction.clone()
    }
}
