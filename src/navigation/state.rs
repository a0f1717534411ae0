//! Navigation state and position fixes

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{GeoPoint, TripId};
use crate::routing::RouteStep;

/// One sample from the position source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub lat: f64,
    pub lon: f64,
    pub heading_deg: Option<f64>,
    pub speed_mps: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl PositionFix {
    pub fn new(position: GeoPoint, timestamp_ms: u64) -> Self {
        Self {
            lat: position.lat,
            lon: position.lon,
            heading_deg: None,
            speed_mps: None,
            timestamp_ms,
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// Position source failure; never fatal to the tracker
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum FixError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    Unavailable(String),

    #[error("No position fix for {after_s:.0} s")]
    Timeout { after_s: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackerPhase {
    #[default]
    Idle,
    Active,
    /// Within the arrival threshold; fixes are ignored until `stop()`
    Arrived,
}

/// Everything the tracker knows about the current trip
#[derive(Debug, Clone, Default, Serialize)]
pub struct NavigationState {
    pub trip_id: Option<TripId>,
    pub phase: TrackerPhase,
    pub last_fix: Option<PositionFix>,
    /// Last fix projected onto the route
    pub snapped_position: Option<GeoPoint>,
    pub heading_deg: Option<f64>,
    pub speed_mps: Option<f64>,
    pub distance_remaining_m: Option<f64>,
    pub eta_s: Option<f64>,
    /// 0..=1
    pub progress_fraction: f64,
    pub current_step_index: usize,
    pub steps: Vec<RouteStep>,
    /// Distance from the last fix to the current step's end point
    pub distance_to_step_end_m: Option<f64>,
    /// Distance from the last fix to the route line
    pub distance_off_route_m: Option<f64>,
    pub last_error: Option<FixError>,
}

impl NavigationState {
    pub fn is_active(&self) -> bool {
        self.phase == TrackerPhase::Active
    }

    pub fn current_step(&self) -> Option<&RouteStep> {
        self.steps.get(self.current_step_index)
    }
}
