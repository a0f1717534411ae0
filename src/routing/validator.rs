//! Route validation against restricted zones

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use super::RouteGeometry;
use crate::core::error::{NavError, Result};
use crate::core::types::{GeoPoint, VehicleClass, ZoneId};
use crate::geometry;
use crate::zones::{RestrictedZone, ZoneRegistry};

/// A zone the route enters although the vehicle class is not allowed there
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneViolation {
    pub zone_id: ZoneId,
    pub name: String,
    pub allowed_classes: Vec<VehicleClass>,
}

impl From<&RestrictedZone> for ZoneViolation {
    fn from(zone: &RestrictedZone) -> Self {
        Self {
            zone_id: zone.id.clone(),
            name: zone.name.clone(),
            allowed_classes: zone.allowed_classes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Violations in registry order
    pub violated_zones: Vec<ZoneViolation>,
}

impl ValidationResult {
    fn from_violations(violated_zones: Vec<ZoneViolation>) -> Self {
        Self {
            valid: violated_zones.is_empty(),
            violated_zones,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violated_zones.len()
    }

    pub fn violated_ids(&self) -> Vec<ZoneId> {
        self.violated_zones.iter().map(|v| v.zone_id.clone()).collect()
    }
}

/// Checks route geometries against a zone registry
///
/// Stateless apart from the registry it holds; safe to share across threads.
#[derive(Debug, Clone)]
pub struct RouteValidator {
    registry: ZoneRegistry,
}

impl RouteValidator {
    pub fn new(registry: ZoneRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Validate a route for `class` on `today`, ignoring zones in `exclude`
    pub fn validate(
        &self,
        route: &RouteGeometry,
        class: &VehicleClass,
        exclude: &[ZoneId],
        today: NaiveDate,
    ) -> ValidationResult {
        let violations = self
            .registry
            .restricting(class, today)
            .filter(|zone| !exclude.contains(&zone.id))
            .filter(|zone| Self::route_enters(route, zone))
            .map(ZoneViolation::from)
            .collect();
        ValidationResult::from_violations(violations)
    }

    /// Validate a raw polyline; fails with `InvalidInput` below two vertices
    pub fn validate_points(
        &self,
        points: &[GeoPoint],
        class: &VehicleClass,
        exclude: &[ZoneId],
        today: NaiveDate,
    ) -> Result<ValidationResult> {
        if points.len() < 2 {
            return Err(NavError::InvalidInput(format!(
                "cannot validate a route with {} vertices",
                points.len()
            )));
        }
        let route = RouteGeometry::new(points.to_vec())?;
        Ok(self.validate(&route, class, exclude, today))
    }

    /// Validate several candidates in parallel; results keep input order
    pub fn validate_many(
        &self,
        routes: &[RouteGeometry],
        class: &VehicleClass,
        exclude: &[ZoneId],
        today: NaiveDate,
    ) -> Vec<ValidationResult> {
        routes
            .par_iter()
            .map(|route| self.validate(route, class, exclude, today))
            .collect()
    }

    fn route_enters(route: &RouteGeometry, zone: &RestrictedZone) -> bool {
        geometry::line_intersects_polygon(route.points(), zone.boundary())
    }
}
