//! Engine configuration with documented constants
//!
//! All tunable distances and thresholds live here, grouped by the component
//! that reads them. Every field has a default, so a TOML file only needs to
//! name the values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{NavError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub safe_point: SafePointConfig,
    pub avoidance: AvoidanceConfig,
    pub tracker: TrackerConfig,
    pub proximity: ProximityConfig,
}

/// Safe-point resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafePointConfig {
    /// Distance pushed outward from the nearest boundary point (meters)
    ///
    /// Large enough that the routing service snaps the substitute endpoint to a
    /// road outside the zone, small enough to keep the walk/transit leg short.
    pub margin_m: f64,

    /// How many times the push is retried (with a corrected bearing, then a
    /// doubled margin) when the candidate still lands inside the zone
    pub max_escape_attempts: u32,
}

impl Default for SafePointConfig {
    fn default() -> Self {
        Self {
            margin_m: 300.0,
            max_escape_attempts: 4,
        }
    }
}

/// Avoidance waypoint planning and the re-validation loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Zones below this area get a single waypoint (square meters)
    pub small_zone_area_m2: f64,

    /// Zones below this area get two waypoints, larger ones three (square meters)
    pub medium_zone_area_m2: f64,

    /// Outward push for small / medium / large zones (meters)
    ///
    /// Larger zones are usually ringed by larger roads, so the waypoint has to
    /// sit further out to land on one.
    pub small_margin_m: f64,
    pub medium_margin_m: f64,
    pub large_margin_m: f64,

    /// Spacing of origin->destination samples as a fraction of the line
    ///
    /// At 0.05 the line is sampled at 21 points (both ends included).
    pub sample_step: f64,

    /// Samples further than this multiple of the zone's equivalent radius from
    /// its centroid do not contribute candidate boundary points
    pub candidate_radius_factor: f64,

    /// Maximum number of route requests made while trying to clear violations
    pub max_attempts: u32,

    /// Decimal places used to deduplicate waypoints (5 ~ one meter)
    pub dedup_decimals: u32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            small_zone_area_m2: 5_000_000.0,
            medium_zone_area_m2: 25_000_000.0,
            small_margin_m: 300.0,
            medium_margin_m: 500.0,
            large_margin_m: 800.0,
            sample_step: 0.05,
            candidate_radius_factor: 3.0,
            max_attempts: 5,
            dedup_decimals: 5,
        }
    }
}

/// Live navigation tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Speed assumed for ETA when the fix carries none, or zero (m/s)
    ///
    /// 10 m/s is 36 km/h, a reasonable urban average. Using it instead of a
    /// stale zero reading keeps the ETA from jumping to infinity at a red light.
    pub fallback_speed_mps: f64,

    /// Distance to a step's end point at which the step counts as done (meters)
    pub step_advance_m: f64,

    /// Distance to the upcoming maneuver at which it is pre-announced (meters)
    pub announce_m: f64,

    /// Remaining distance below which the trip counts as arrived (meters)
    pub arrival_m: f64,

    /// Distance between the raw fix and the route above which a reroute is
    /// requested (meters)
    pub divergence_m: f64,

    /// Default announce radius for points of interest (meters)
    pub poi_radius_m: f64,

    /// Default announce radius for hazards without their own radius (meters)
    pub hazard_radius_m: f64,

    /// Distance to a zone that forbids the trip's vehicle class at which a
    /// zone proximity event is emitted (meters)
    pub zone_alert_radius_m: f64,

    /// Seconds without a fix before the session reports a timeout
    ///
    /// `None` leaves timeouts entirely to the position source.
    pub fix_timeout_s: Option<f64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            fallback_speed_mps: 10.0,
            step_advance_m: 30.0,
            announce_m: 150.0,
            arrival_m: 50.0,
            divergence_m: 60.0,
            poi_radius_m: 500.0,
            hazard_radius_m: 300.0,
            zone_alert_radius_m: 1_000.0,
            fix_timeout_s: Some(10.0),
        }
    }
}

/// Stand-alone zone proximity monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Zones within this distance are reported (kilometers)
    pub radius_km: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self { radius_km: 20.0 }
    }
}

impl NavConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: NavConfig = toml::from_str(content)?;
        config.validate().map_err(NavError::Config)?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        let a = &self.avoidance;
        if a.small_zone_area_m2 >= a.medium_zone_area_m2 {
            return Err(format!(
                "small_zone_area_m2 ({}) should be < medium_zone_area_m2 ({})",
                a.small_zone_area_m2, a.medium_zone_area_m2
            ));
        }
        if !(a.sample_step > 0.0 && a.sample_step <= 1.0) {
            return Err(format!("sample_step ({}) must be in (0, 1]", a.sample_step));
        }
        if a.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }

        let t = &self.tracker;
        if t.fallback_speed_mps <= 0.0 {
            return Err("fallback_speed_mps must be positive".into());
        }

        // Pre-announcement has to fire before the step is considered passed
        if t.announce_m <= t.step_advance_m {
            return Err(format!(
                "announce_m ({}) should be > step_advance_m ({})",
                t.announce_m, t.step_advance_m
            ));
        }

        if self.safe_point.margin_m <= 0.0 {
            return Err("safe_point.margin_m must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(NavConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NavConfig::from_toml_str(
            r#"
            [tracker]
            arrival_m = 25.0

            [safe_point]
            margin_m = 400.0
            "#,
        )
        .unwrap();

        assert_eq!(config.tracker.arrival_m, 25.0);
        assert_eq!(config.tracker.announce_m, 150.0);
        assert_eq!(config.safe_point.margin_m, 400.0);
        assert_eq!(config.avoidance.max_attempts, 5);
    }

    #[test]
    fn test_inconsistent_thresholds_rejected() {
        let result = NavConfig::from_toml_str(
            r#"
            [tracker]
            announce_m = 20.0
            "#,
        );
        assert!(matches!(result, Err(NavError::Config(_))));
    }
}
