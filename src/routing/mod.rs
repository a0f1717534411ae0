//! Zone-aware routing: validation, safe points, avoidance planning
//!
//! Route computation itself belongs to an external service behind
//! [`RouteProvider`]. This module only checks what that service returns,
//! proposes waypoints that steer it around restricted zones, and drives the
//! bounded re-validation loop.

pub mod avoidance;
pub mod cost;
pub mod mapbox;
pub mod planner;
pub mod safe_point;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::core::error::{NavError, Result};
use crate::core::types::GeoPoint;
use crate::geometry::{self, NearestPoint};

pub use avoidance::{AvoidancePlanner, BypassSide, ZoneSize, ZoneWaypoints};
pub use cost::{EnergyUnit, TripCost, VehicleProfile};
pub use mapbox::MapboxDirections;
pub use planner::{AcceptedRoute, PlanOutcome, PlanningSession, RouteSource, ZoneAwarePlanner};
pub use safe_point::{SafePoint, SafePointResolver};
pub use validator::{RouteValidator, ValidationResult, ZoneViolation};

/// A traveled polyline with its cumulative-length table
///
/// Always holds at least two vertices; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    points: Vec<GeoPoint>,
    #[serde(skip)]
    cumulative_m: Vec<f64>,
}

impl RouteGeometry {
    pub fn new(points: Vec<GeoPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(NavError::InvalidInput(format!(
                "route needs at least 2 vertices, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(NavError::InvalidInput(format!(
                "route contains a non-finite vertex {:?}",
                bad
            )));
        }
        let cumulative_m = geometry::cumulative_lengths(&points);
        Ok(Self {
            points,
            cumulative_m,
        })
    }

    /// Build from `[lon, lat]` pairs
    pub fn from_lon_lat(pairs: &[[f64; 2]]) -> Result<Self> {
        Self::new(pairs.iter().copied().map(GeoPoint::from_lon_lat).collect())
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Distance from the first vertex to each vertex (meters)
    pub fn cumulative_m(&self) -> &[f64] {
        &self.cumulative_m
    }

    pub fn total_length_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn end(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    /// Project a position onto the route
    pub fn snap(&self, position: GeoPoint) -> NearestPoint {
        geometry::nearest_point_on_line_with(&self.points, &self.cumulative_m, position)
            .unwrap_or_else(|| NearestPoint {
                point: self.start(),
                segment_index: 0,
                distance_m: geometry::haversine(position, self.start()),
                along_m: 0.0,
            })
    }
}

/// Direction of a turn maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

/// What the driver has to do at the start of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManeuverKind {
    Depart,
    Turn { direction: TurnDirection },
    Continue,
    Merge,
    Ramp { direction: TurnDirection },
    Fork { direction: TurnDirection },
    Roundabout { exit: Option<u32> },
    Arrive,
    Other,
}

/// One instructed segment of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub start_point: GeoPoint,
    pub end_point: GeoPoint,
    pub distance_m: f64,
    pub duration_s: f64,
    pub maneuver: ManeuverKind,
    pub instruction: String,
}

/// The part of a route between two stopping points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLeg {
    pub distance_m: f64,
    pub duration_s: f64,
    pub steps: Vec<RouteStep>,
}

/// A route returned by the routing service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCandidate {
    pub geometry: RouteGeometry,
    pub legs: Vec<RouteLeg>,
}

impl RouteCandidate {
    pub fn new(geometry: RouteGeometry, legs: Vec<RouteLeg>) -> Self {
        Self { geometry, legs }
    }

    /// Steps of all legs, in order
    pub fn steps(&self) -> Vec<RouteStep> {
        self.legs.iter().flat_map(|l| l.steps.iter().cloned()).collect()
    }

    /// Leg total, or the geometry length when the service returned no legs
    pub fn distance_m(&self) -> f64 {
        if self.legs.is_empty() {
            self.geometry.total_length_m()
        } else {
            self.legs.iter().map(|l| l.distance_m).sum()
        }
    }

    pub fn duration_s(&self) -> f64 {
        self.legs.iter().map(|l| l.duration_s).sum()
    }
}

/// Parameters for one call to the routing service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Intermediate pass-through points (not stops)
    pub waypoints: Vec<GeoPoint>,
    pub alternatives: bool,
}

impl RouteRequest {
    pub fn direct(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            origin,
            destination,
            waypoints: Vec::new(),
            alternatives: true,
        }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<GeoPoint>) -> Self {
        self.waypoints = waypoints;
        self
    }
}

/// External route computation
///
/// Returns the main route first, followed by any alternatives. An empty list
/// or `NavError::NoRouteFound` both mean the service found nothing.
pub trait RouteProvider: Send + Sync {
    fn compute_route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<Vec<RouteCandidate>>> + Send;
}
