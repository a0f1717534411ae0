//! Zone-aware route planning loop
//!
//! Asks the routing service for a route, validates it, and while it is
//! blocked feeds avoidance waypoints back to the service. The loop is a plain
//! bounded `for` over attempts; each attempt awaits exactly one routing call.
//!
//! Fallback order once the attempts are spent:
//! 1. any alternative route returned along the way that is valid on its own
//! 2. a route between safe points, when an endpoint lies inside a zone; it
//!    keeps the waypoints of an attempt that was clear apart from that zone
//! 3. `NavError::AllRoutesBlocked` with the fewest-violation candidate's list

use ahash::AHashSet;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::avoidance::{order_along, AvoidancePlanner};
use super::safe_point::{SafePoint, SafePointResolver};
use super::validator::{RouteValidator, ValidationResult, ZoneViolation};
use super::{RouteCandidate, RouteProvider, RouteRequest};
use crate::core::calendar::Clock;
use crate::core::config::NavConfig;
use crate::core::error::{NavError, Result};
use crate::core::types::{GeoPoint, VehicleClass, ZoneId};
use crate::zones::ZoneRegistry;

/// How an accepted route was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteSource {
    /// The first route returned was already valid
    Primary,
    /// Valid after this many avoidance attempts
    Avoidance { attempts: u32 },
    /// An alternative returned by the routing service
    Alternative,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedRoute {
    pub route: RouteCandidate,
    /// Pass-through points the route was requested with
    pub waypoints: Vec<GeoPoint>,
    pub source: RouteSource,
}

#[derive(Debug, Clone, Serialize)]
pub enum PlanOutcome {
    /// A route that enters no forbidden zone
    Accepted(AcceptedRoute),
    /// A route between safe points; the stretch from a safe point to the real
    /// endpoint still lies inside `residual_violations`
    Degraded {
        route: RouteCandidate,
        origin_safe_point: Option<SafePoint>,
        destination_safe_point: Option<SafePoint>,
        residual_violations: Vec<ZoneViolation>,
    },
}

impl PlanOutcome {
    pub fn route(&self) -> &RouteCandidate {
        match self {
            PlanOutcome::Accepted(accepted) => &accepted.route,
            PlanOutcome::Degraded { route, .. } => route,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PlanOutcome::Degraded { .. })
    }
}

pub struct ZoneAwarePlanner<P> {
    provider: P,
    validator: RouteValidator,
    avoidance: AvoidancePlanner,
    safe_points: SafePointResolver,
    clock: Arc<dyn Clock>,
}

impl<P: RouteProvider> ZoneAwarePlanner<P> {
    pub fn new(provider: P, registry: ZoneRegistry, config: &NavConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            validator: RouteValidator::new(registry.clone()),
            avoidance: AvoidancePlanner::new(registry.clone(), config.avoidance.clone()),
            safe_points: SafePointResolver::new(registry, config.safe_point.clone()),
            clock,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn validator(&self) -> &RouteValidator {
        &self.validator
    }

    /// Plan a route from `origin` to `destination` that `class` may drive
    pub async fn plan(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        class: &VehicleClass,
    ) -> Result<PlanOutcome> {
        if !origin.is_finite() || !destination.is_finite() {
            return Err(NavError::InvalidInput("non-finite origin or destination".into()));
        }
        let today = self.clock.today();

        let mut routed = self.request(RouteRequest::direct(origin, destination)).await?;
        let primary = routed.remove(0);
        let mut alternatives = routed;

        let first = self.validator.validate(&primary.geometry, class, &[], today);
        if first.valid {
            tracing::info!("Primary route is clear of restricted zones");
            return Ok(PlanOutcome::Accepted(AcceptedRoute {
                route: primary,
                waypoints: Vec::new(),
                source: RouteSource::Primary,
            }));
        }
        tracing::info!(
            "Primary route enters {} restricted zone(s); planning avoidance",
            first.violation_count()
        );

        // Waypoints cannot steer around a zone that holds an endpoint
        let endpoint_zones: Vec<ZoneId> = [origin, destination]
            .iter()
            .filter_map(|p| self.safe_points.zone_containing(*p, class, today))
            .map(|z| z.id.clone())
            .collect();

        let to_avoid = first.violated_ids();
        let mut best = first;
        let leg = Leg {
            from: origin,
            to: destination,
            class,
            today,
            exclude: &endpoint_zones,
        };
        let avoided = self
            .avoid(&leg, to_avoid, &mut alternatives, &mut best)
            .await?;

        // Only the endpoint zones are left on this route; keep its waypoints
        // for the safe-point leg
        let mut carried = Vec::new();
        if let Some(accepted) = avoided {
            if endpoint_zones.is_empty() {
                return Ok(PlanOutcome::Accepted(accepted));
            }
            tracing::info!(
                "Route clear apart from {} endpoint zone(s); continuing via safe points",
                endpoint_zones.len()
            );
            carried = accepted.waypoints;
        }

        if let Some(route) = self.first_valid_alternative(alternatives, class, today, &mut best) {
            tracing::info!("Using a valid alternative route");
            return Ok(PlanOutcome::Accepted(AcceptedRoute {
                route,
                waypoints: Vec::new(),
                source: RouteSource::Alternative,
            }));
        }

        if let Some(outcome) = self
            .plan_via_safe_points(origin, destination, carried, class, today, &mut best)
            .await?
        {
            return Ok(outcome);
        }

        tracing::warn!(
            "All routes blocked; best candidate enters {} zone(s)",
            best.violation_count()
        );
        Err(NavError::AllRoutesBlocked {
            violations: best.violated_zones,
        })
    }

    /// Bounded avoidance loop over one leg
    ///
    /// Each attempt adds waypoints for the zones the last route entered and
    /// awaits one routing call. Zones in `leg.exclude` are neither avoided nor
    /// held against a route. Stops at the first route that is clean apart from
    /// them, when an attempt adds no new waypoint, or when attempts run out.
    async fn avoid(
        &self,
        leg: &Leg<'_>,
        mut to_avoid: Vec<ZoneId>,
        alternatives: &mut Vec<RouteCandidate>,
        best: &mut ValidationResult,
    ) -> Result<Option<AcceptedRoute>> {
        let config = self.avoidance.config();
        let mut waypoints: Vec<GeoPoint> = Vec::new();
        let mut keys = AHashSet::new();

        for attempt in 1..=config.max_attempts {
            to_avoid.retain(|id| !leg.exclude.contains(id));

            let before = waypoints.len();
            for wp in self.avoidance.plan(&to_avoid, leg.from, leg.to) {
                if keys.insert(wp.rounded_key(config.dedup_decimals)) {
                    waypoints.push(wp);
                }
            }
            if waypoints.len() == before {
                tracing::debug!("Attempt {}: no new waypoints, stopping", attempt);
                break;
            }
            order_along(leg.from, leg.to, &mut waypoints);

            let request = RouteRequest::direct(leg.from, leg.to).with_waypoints(waypoints.clone());
            let mut routed = match self.request(request).await {
                Ok(routed) => routed,
                Err(NavError::NoRouteFound) => {
                    tracing::warn!("Attempt {}: no route through {} waypoint(s)", attempt, waypoints.len());
                    break;
                }
                Err(e) => return Err(e),
            };
            let route = routed.remove(0);
            alternatives.extend(routed);

            let result = self.validator.validate(&route.geometry, leg.class, leg.exclude, leg.today);
            tracing::info!(
                "Attempt {}: {} violation(s) with {} waypoint(s)",
                attempt,
                result.violation_count(),
                waypoints.len()
            );
            if result.valid {
                return Ok(Some(AcceptedRoute {
                    route,
                    waypoints,
                    source: RouteSource::Avoidance { attempts: attempt },
                }));
            }

            to_avoid = result.violated_ids();
            if leg.exclude.is_empty() {
                keep_best(best, result);
            } else {
                keep_best(best, self.validator.validate(&route.geometry, leg.class, &[], leg.today));
            }
        }
        Ok(None)
    }

    fn first_valid_alternative(
        &self,
        alternatives: Vec<RouteCandidate>,
        class: &VehicleClass,
        today: NaiveDate,
        best: &mut ValidationResult,
    ) -> Option<RouteCandidate> {
        if alternatives.is_empty() {
            return None;
        }
        let geometries: Vec<_> = alternatives.iter().map(|c| c.geometry.clone()).collect();
        let results = self.validator.validate_many(&geometries, class, &[], today);

        let mut pairs: Vec<_> = alternatives.into_iter().zip(results).collect();
        if let Some(pos) = pairs.iter().position(|(_, r)| r.valid) {
            return Some(pairs.swap_remove(pos).0);
        }
        for (_, result) in pairs {
            keep_best(best, result);
        }
        None
    }

    /// Route between safe points, accepting the stretch inside the endpoint
    /// zones
    ///
    /// Tries the `carried` waypoints first, then a direct request, then an
    /// avoidance loop of its own for any other zone the direct route enters.
    async fn plan_via_safe_points(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mut carried: Vec<GeoPoint>,
        class: &VehicleClass,
        today: NaiveDate,
        best: &mut ValidationResult,
    ) -> Result<Option<PlanOutcome>> {
        let origin_safe_point = self.safe_points.resolve(origin, class, today);
        let destination_safe_point = self.safe_points.resolve(destination, class, today);
        if origin_safe_point.is_none() && destination_safe_point.is_none() {
            return Ok(None);
        }

        let from = origin_safe_point.as_ref().map_or(origin, |s| s.coordinates);
        let to = destination_safe_point.as_ref().map_or(destination, |s| s.coordinates);
        let mut exclude: Vec<ZoneId> = Vec::new();
        for safe in origin_safe_point.iter().chain(destination_safe_point.iter()) {
            if !exclude.contains(&safe.source_zone_id) {
                exclude.push(safe.source_zone_id.clone());
            }
        }
        let leg = Leg {
            from,
            to,
            class,
            today,
            exclude: &exclude,
        };

        let mut checked = Checked::NoRoute;
        if !carried.is_empty() {
            order_along(from, to, &mut carried);
            let request = RouteRequest::direct(from, to).with_waypoints(carried);
            checked = self.check(request, &leg, best).await?;
        }
        if !matches!(checked, Checked::Clean(_)) {
            checked = self.check(RouteRequest::direct(from, to), &leg, best).await?;
        }
        let route = match checked {
            Checked::Clean(route) => route,
            Checked::Blocked(to_avoid) => {
                tracing::debug!("Safe-point route enters {} other zone(s); planning avoidance", to_avoid.len());
                match self.avoid(&leg, to_avoid, &mut Vec::new(), best).await? {
                    Some(accepted) => accepted.route,
                    None => return Ok(None),
                }
            }
            Checked::NoRoute => return Ok(None),
        };

        let residual_violations: Vec<ZoneViolation> = exclude
            .iter()
            .filter_map(|id| self.validator.registry().get(id))
            .map(ZoneViolation::from)
            .collect();
        tracing::info!(
            "Degraded route via safe points; {} zone(s) unavoidable at endpoints",
            residual_violations.len()
        );
        Ok(Some(PlanOutcome::Degraded {
            route,
            origin_safe_point,
            destination_safe_point,
            residual_violations,
        }))
    }

    /// Route `request` and validate the candidates against `leg`
    async fn check(
        &self,
        request: RouteRequest,
        leg: &Leg<'_>,
        best: &mut ValidationResult,
    ) -> Result<Checked> {
        let routed = match self.request(request).await {
            Ok(routed) => routed,
            Err(NavError::NoRouteFound) => return Ok(Checked::NoRoute),
            Err(e) => return Err(e),
        };
        let mut blocking = None;
        for route in routed {
            let result = self.validator.validate(&route.geometry, leg.class, leg.exclude, leg.today);
            if result.valid {
                return Ok(Checked::Clean(route));
            }
            blocking.get_or_insert_with(|| result.violated_ids());
            keep_best(best, self.validator.validate(&route.geometry, leg.class, &[], leg.today));
        }
        Ok(Checked::Blocked(blocking.unwrap_or_default()))
    }

    /// One routing call; an empty answer is `NoRouteFound`
    async fn request(&self, request: RouteRequest) -> Result<Vec<RouteCandidate>> {
        let routed = self.provider.compute_route(&request).await?;
        if routed.is_empty() {
            return Err(NavError::NoRouteFound);
        }
        Ok(routed)
    }
}

/// One origin->destination stretch and the zones it may pass through
struct Leg<'a> {
    from: GeoPoint,
    to: GeoPoint,
    class: &'a VehicleClass,
    today: NaiveDate,
    exclude: &'a [ZoneId],
}

/// A routing answer judged against one leg
enum Checked {
    Clean(RouteCandidate),
    /// Zones the first candidate enters, outside the leg's exclusions
    Blocked(Vec<ZoneId>),
    NoRoute,
}

fn keep_best(best: &mut ValidationResult, candidate: ValidationResult) {
    if candidate.violation_count() < best.violation_count() {
        *best = candidate;
    }
}

/// Owns at most one in-flight planning task
///
/// Starting a new plan aborts the previous one, so a stale result can never
/// be delivered after the user has moved on.
pub struct PlanningSession<P> {
    planner: Arc<ZoneAwarePlanner<P>>,
    in_flight: Option<JoinHandle<()>>,
}

impl<P: RouteProvider + 'static> PlanningSession<P> {
    pub fn new(planner: Arc<ZoneAwarePlanner<P>>) -> Self {
        Self {
            planner,
            in_flight: None,
        }
    }

    /// Start planning; the receiver errors if this plan is cancelled
    pub fn start(
        &mut self,
        origin: GeoPoint,
        destination: GeoPoint,
        class: VehicleClass,
    ) -> oneshot::Receiver<Result<PlanOutcome>> {
        self.cancel();

        let (tx, rx) = oneshot::channel();
        let planner = Arc::clone(&self.planner);
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = planner.plan(origin, destination, &class).await;
            let _ = tx.send(outcome);
        }));
        rx
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                tracing::debug!("Cancelling in-flight route planning");
            }
            handle.abort();
        }
    }

    pub fn is_planning(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<P> Drop for PlanningSession<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
