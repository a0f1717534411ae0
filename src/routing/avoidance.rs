//! Avoidance waypoints
//!
//! For each violated zone, proposes pass-through points just outside its
//! boundary on one side of the origin->destination line. The routing service
//! is then asked for a route through those points. Small zones get one
//! waypoint; larger ones get several spread along the boundary so the router
//! goes around the whole obstacle instead of clipping a corner.

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::core::config::AvoidanceConfig;
use crate::core::types::{GeoPoint, ZoneId};
use crate::geometry;
use crate::zones::{RestrictedZone, ZoneRegistry};

/// Zone size class, picked by area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZoneSize {
    Small,
    Medium,
    Large,
}

impl ZoneSize {
    pub fn waypoint_count(self) -> usize {
        match self {
            ZoneSize::Small => 1,
            ZoneSize::Medium => 2,
            ZoneSize::Large => 3,
        }
    }

    /// Positions along the boundary, as fractions of its length
    pub fn boundary_fractions(self) -> &'static [f64] {
        match self {
            ZoneSize::Small => &[0.5],
            ZoneSize::Medium => &[0.3, 0.7],
            ZoneSize::Large => &[0.2, 0.5, 0.8],
        }
    }
}

/// Side of the origin->destination direction a zone is bypassed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BypassSide {
    Left,
    Right,
}

impl BypassSide {
    fn bearing_offset(self) -> f64 {
        match self {
            BypassSide::Left => -90.0,
            BypassSide::Right => 90.0,
        }
    }

    /// Does a `side_of` value fall on this side (strictly)
    fn matches(self, side: f64) -> bool {
        match self {
            BypassSide::Left => side > 0.0,
            BypassSide::Right => side < 0.0,
        }
    }
}

/// Waypoints generated for one zone
#[derive(Debug, Clone, Serialize)]
pub struct ZoneWaypoints {
    pub zone_id: ZoneId,
    pub size: ZoneSize,
    pub side: BypassSide,
    pub margin_m: f64,
    pub waypoints: Vec<GeoPoint>,
}

pub struct AvoidancePlanner {
    registry: ZoneRegistry,
    config: AvoidanceConfig,
}

impl AvoidancePlanner {
    pub fn new(registry: ZoneRegistry, config: AvoidanceConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    /// Waypoints bypassing every zone in `violated`, ordered along the
    /// origin->destination line and deduplicated by rounded coordinate
    ///
    /// Unknown ids are ignored. Zones are processed in registry order.
    pub fn plan(&self, violated: &[ZoneId], origin: GeoPoint, destination: GeoPoint) -> Vec<GeoPoint> {
        let mut seen = AHashSet::new();
        let mut waypoints = Vec::new();

        for zone in self.registry.iter().filter(|z| violated.contains(&z.id)) {
            let planned = self.plan_zone(zone, origin, destination);
            tracing::debug!(
                "Zone {}: {:?}, bypass {:?}, {} waypoint(s)",
                zone.id,
                planned.size,
                planned.side,
                planned.waypoints.len()
            );
            for wp in planned.waypoints {
                if seen.insert(wp.rounded_key(self.config.dedup_decimals)) {
                    waypoints.push(wp);
                }
            }
        }

        order_along(origin, destination, &mut waypoints);
        waypoints
    }

    pub fn classify(&self, area_m2: f64) -> (ZoneSize, f64) {
        let c = &self.config;
        if area_m2 < c.small_zone_area_m2 {
            (ZoneSize::Small, c.small_margin_m)
        } else if area_m2 < c.medium_zone_area_m2 {
            (ZoneSize::Medium, c.medium_margin_m)
        } else {
            (ZoneSize::Large, c.large_margin_m)
        }
    }

    /// Waypoints for a single zone
    pub fn plan_zone(&self, zone: &RestrictedZone, origin: GeoPoint, destination: GeoPoint) -> ZoneWaypoints {
        let ring = zone.boundary();
        let (size, margin) = self.classify(geometry::polygon_area(ring));
        let radius = geometry::equivalent_radius(ring);
        let centroid = geometry::polygon_centroid(ring).unwrap_or(origin);
        let od_bearing = geometry::bearing(origin, destination);

        let candidates = self.candidate_boundary_points(zone, centroid, radius, origin, destination);
        let side = preferred_side(zone, centroid, radius + margin, od_bearing, origin, destination);

        // Axis through the centroid parallel to origin->destination
        let axis_end = geometry::destination(centroid, 1_000.0, od_bearing);
        let push = |p: GeoPoint| geometry::destination(p, margin, geometry::bearing(centroid, p));

        let boundary = geometry::polygon_boundary_as_line(ring);
        let boundary_len = geometry::line_length(&boundary);
        let target = size.waypoint_count();

        let mut keys = AHashSet::new();
        let mut waypoints = Vec::with_capacity(target);

        for &fraction in size.boundary_fractions() {
            let Some(p) = geometry::point_along_line(&boundary, boundary_len * fraction) else {
                continue;
            };
            if side.matches(geometry::side_of(centroid, axis_end, p)) {
                let wp = push(p);
                if keys.insert(wp.rounded_key(self.config.dedup_decimals)) {
                    waypoints.push(wp);
                }
            }
        }

        // Backfill from the closest candidates, whatever their side
        for p in candidates {
            if waypoints.len() >= target {
                break;
            }
            let wp = push(p);
            if keys.insert(wp.rounded_key(self.config.dedup_decimals)) {
                waypoints.push(wp);
            }
        }

        // The O->D line never came near the zone (the route bent into it);
        // the side probe itself is outside and on the right side.
        if waypoints.is_empty() {
            waypoints.push(geometry::destination(
                centroid,
                radius + margin,
                od_bearing + side.bearing_offset(),
            ));
        }

        ZoneWaypoints {
            zone_id: zone.id.clone(),
            size,
            side,
            margin_m: margin,
            waypoints,
        }
    }

    /// Boundary points nearest to samples of the O->D line, closest first
    fn candidate_boundary_points(
        &self,
        zone: &RestrictedZone,
        centroid: GeoPoint,
        radius: f64,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Vec<GeoPoint> {
        let boundary = geometry::polygon_boundary_as_line(zone.boundary());
        let od = [origin, destination];
        let od_len = geometry::haversine(origin, destination);
        let steps = (1.0 / self.config.sample_step).round().max(1.0) as usize;
        let reach = radius * self.config.candidate_radius_factor;

        let mut ranked: Vec<(OrderedFloat<f64>, GeoPoint)> = (0..=steps)
            .filter_map(|i| geometry::point_along_line(&od, od_len * i as f64 / steps as f64))
            .filter(|sample| geometry::haversine(*sample, centroid) <= reach)
            .filter_map(|sample| geometry::nearest_point_on_line(&boundary, sample))
            .map(|n| (OrderedFloat(n.distance_m), n.point))
            .collect();
        ranked.sort_by_key(|(d, _)| *d);

        let mut seen = AHashSet::new();
        ranked
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| seen.insert(p.rounded_key(self.config.dedup_decimals)))
            .collect()
    }
}

/// Probe both sides of the zone and pick one to go around
fn preferred_side(
    zone: &RestrictedZone,
    centroid: GeoPoint,
    probe_distance: f64,
    od_bearing: f64,
    origin: GeoPoint,
    destination: GeoPoint,
) -> BypassSide {
    let probe = |side: BypassSide| {
        geometry::destination(centroid, probe_distance, od_bearing + side.bearing_offset())
    };
    let left = probe(BypassSide::Left);
    let right = probe(BypassSide::Right);

    match (zone.contains(left), zone.contains(right)) {
        (false, true) => BypassSide::Left,
        (true, false) => BypassSide::Right,
        _ => {
            let detour = |p: GeoPoint| geometry::haversine(p, origin) + geometry::haversine(p, destination);
            if detour(right) < detour(left) {
                BypassSide::Right
            } else {
                BypassSide::Left
            }
        }
    }
}

/// Sort points by their projection onto the origin->destination line
pub(crate) fn order_along(origin: GeoPoint, destination: GeoPoint, points: &mut [GeoPoint]) {
    let od = [origin, destination];
    points.sort_by_cached_key(|p| {
        OrderedFloat(
            geometry::nearest_point_on_line(&od, *p)
                .map(|n| n.along_m)
                .unwrap_or(0.0),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::VehicleClass;
    use chrono::NaiveDate;

    fn square(id: &str, min_lon: f64, min_lat: f64, size: f64) -> RestrictedZone {
        RestrictedZone::new(
            ZoneId::new(id),
            id.to_string(),
            vec![
                GeoPoint::new(min_lon, min_lat),
                GeoPoint::new(min_lon + size, min_lat),
                GeoPoint::new(min_lon + size, min_lat + size),
                GeoPoint::new(min_lon, min_lat + size),
            ],
            vec![VehicleClass::new("CERO")],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
        )
    }

    fn planner(zones: Vec<RestrictedZone>) -> AvoidancePlanner {
        AvoidancePlanner::new(ZoneRegistry::new(zones).unwrap(), AvoidanceConfig::default())
    }

    #[test]
    fn test_size_classes() {
        let p = planner(vec![]);
        assert_eq!(p.classify(1_000_000.0), (ZoneSize::Small, 300.0));
        assert_eq!(p.classify(10_000_000.0), (ZoneSize::Medium, 500.0));
        assert_eq!(p.classify(100_000_000.0), (ZoneSize::Large, 800.0));
    }

    #[test]
    fn test_small_zone_gets_one_outside_waypoint() {
        // ~1 km square: small
        let zone = square("S", 0.0, 0.0, 0.009);
        let p = planner(vec![zone.clone()]);
        let origin = GeoPoint::new(-0.02, 0.0045);
        let destination = GeoPoint::new(0.03, 0.0045);

        let planned = p.plan_zone(&zone, origin, destination);
        assert_eq!(planned.size, ZoneSize::Small);
        assert_eq!(planned.waypoints.len(), 1);
        assert!(!zone.contains(planned.waypoints[0]));
    }

    #[test]
    fn test_large_zone_gets_three_waypoints_outside() {
        // ~6.7 km square: large
        let zone = square("L", 0.0, 0.0, 0.06);
        let p = planner(vec![zone.clone()]);
        let origin = GeoPoint::new(-0.05, 0.03);
        let destination = GeoPoint::new(0.11, 0.03);

        let planned = p.plan_zone(&zone, origin, destination);
        assert_eq!(planned.size, ZoneSize::Large);
        assert_eq!(planned.waypoints.len(), 3);
        for wp in &planned.waypoints {
            assert!(!zone.contains(*wp), "{:?} inside", wp);
        }
    }

    #[test]
    fn test_plan_orders_waypoints_along_route() {
        let a = square("A", 0.0, 0.0, 0.02);
        let b = square("B", 0.05, 0.0, 0.02);
        let p = planner(vec![b.clone(), a.clone()]);
        let origin = GeoPoint::new(-0.02, 0.01);
        let destination = GeoPoint::new(0.1, 0.01);

        let wps = p.plan(&[ZoneId::new("A"), ZoneId::new("B")], origin, destination);
        assert!(wps.len() >= 2);
        let along: Vec<f64> = wps.iter().map(|w| geometry::haversine(origin, *w)).collect();
        assert!(along.windows(2).all(|w| w[0] <= w[1] + 1.0), "{:?}", along);
    }

    #[test]
    fn test_overlapping_zones_do_not_duplicate() {
        // Same ring twice under different ids
        let a = square("A", 0.0, 0.0, 0.009);
        let b = square("B", 0.0, 0.0, 0.009);
        let p = planner(vec![a, b]);
        let origin = GeoPoint::new(-0.02, 0.0045);
        let destination = GeoPoint::new(0.03, 0.0045);

        let wps = p.plan(&[ZoneId::new("A"), ZoneId::new("B")], origin, destination);
        let keys: AHashSet<_> = wps.iter().map(|w| w.rounded_key(5)).collect();
        assert_eq!(keys.len(), wps.len());
        assert_eq!(wps.len(), 1);
    }

    #[test]
    fn test_far_zone_falls_back_to_side_probe() {
        // O->D line passes 50 km away
        let zone = square("FAR", 0.0, 0.5, 0.009);
        let p = planner(vec![zone.clone()]);
        let planned = p.plan_zone(&zone, GeoPoint::new(-0.1, 0.0), GeoPoint::new(0.1, 0.0));
        assert_eq!(planned.waypoints.len(), 1);
        assert!(!zone.contains(planned.waypoints[0]));
    }

    #[test]
    fn test_unknown_zone_ids_yield_nothing() {
        let p = planner(vec![square("A", 0.0, 0.0, 0.01)]);
        assert!(p
            .plan(&[ZoneId::new("NOPE")], GeoPoint::new(-0.1, 0.0), GeoPoint::new(0.1, 0.0))
            .is_empty());
    }
}
