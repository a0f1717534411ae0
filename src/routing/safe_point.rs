//! Safe points: substitute endpoints just outside a restricted zone
//!
//! When the origin or destination itself lies inside a zone the vehicle may
//! not enter, no valid route exists to that exact point. The resolver finds
//! the nearest boundary point and pushes it outward by a margin so the routing
//! service can snap it to a road outside the zone.

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::config::SafePointConfig;
use crate::core::types::{GeoPoint, VehicleClass, ZoneId};
use crate::geometry;
use crate::zones::{RestrictedZone, ZoneRegistry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafePoint {
    pub coordinates: GeoPoint,
    pub source_zone_id: ZoneId,
    pub zone_name: String,
    /// Great-circle distance from the query point, rounded to whole meters
    pub distance_m: f64,
}

pub struct SafePointResolver {
    registry: ZoneRegistry,
    config: SafePointConfig,
}

impl SafePointResolver {
    pub fn new(registry: ZoneRegistry, config: SafePointConfig) -> Self {
        Self { registry, config }
    }

    /// First zone in registry order that contains `point` and forbids `class`
    pub fn zone_containing(
        &self,
        point: GeoPoint,
        class: &VehicleClass,
        today: NaiveDate,
    ) -> Option<&RestrictedZone> {
        self.registry
            .restricting(class, today)
            .find(|zone| zone.contains(point))
    }

    /// Resolve a safe point for `point`, or `None` when it is not inside any
    /// applicable zone (the common case)
    pub fn resolve(
        &self,
        point: GeoPoint,
        class: &VehicleClass,
        today: NaiveDate,
    ) -> Option<SafePoint> {
        let zone = self.zone_containing(point, class, today)?;
        let coordinates = self.escape(zone, point)?;
        let distance_m = geometry::haversine(point, coordinates).round();

        tracing::debug!(
            "Safe point for {:?} inside {}: {:?} ({} m)",
            point,
            zone.id,
            coordinates,
            distance_m
        );

        Some(SafePoint {
            coordinates,
            source_zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
            distance_m,
        })
    }

    /// Push the nearest boundary point outward until it leaves the zone
    ///
    /// The first try uses the centroid->boundary bearing. If the candidate is
    /// still inside (non-convex rings), the query->boundary bearing is tried,
    /// then both again with a doubled margin.
    fn escape(&self, zone: &RestrictedZone, point: GeoPoint) -> Option<GeoPoint> {
        let boundary = geometry::polygon_boundary_as_line(zone.boundary());
        let nearest = geometry::nearest_point_on_line(&boundary, point)?.point;
        let centroid = geometry::polygon_centroid(zone.boundary())?;

        let outward = geometry::bearing(centroid, nearest);
        // A point on the boundary has no direction of its own
        let direct = if geometry::haversine(point, nearest) > 0.0 {
            geometry::bearing(point, nearest)
        } else {
            outward
        };

        let mut margin = self.config.margin_m;
        let mut candidate = geometry::destination(nearest, margin, outward);
        for attempt in 0..self.config.max_escape_attempts.max(1) {
            for bearing in [outward, direct] {
                candidate = geometry::destination(nearest, margin, bearing);
                if !zone.contains(candidate) {
                    return Some(candidate);
                }
            }
            tracing::debug!(
                "Safe point attempt {} for {} still inside; doubling margin",
                attempt + 1,
                zone.id
            );
            margin *= 2.0;
        }

        tracing::warn!(
            "Could not escape zone {} after {} attempts; using last candidate",
            zone.id,
            self.config.max_escape_attempts
        );
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn zone(id: &str, ring: &[(f64, f64)]) -> RestrictedZone {
        RestrictedZone::new(
            ZoneId::new(id),
            format!("Zone {}", id),
            ring.iter().copied().map(GeoPoint::from).collect(),
            vec![VehicleClass::new("CERO")],
            date(2024, 1, 1),
            date(2030, 12, 31),
        )
    }

    /// 2x2 km square centred near (0.009, 0.009)
    fn square_km() -> RestrictedZone {
        zone("SQ", &[(0.0, 0.0), (0.018, 0.0), (0.018, 0.018), (0.0, 0.018)])
    }

    fn resolver(zones: Vec<RestrictedZone>) -> SafePointResolver {
        SafePointResolver::new(ZoneRegistry::new(zones).unwrap(), SafePointConfig::default())
    }

    #[test]
    fn test_outside_point_has_no_safe_point() {
        let r = resolver(vec![square_km()]);
        assert!(r
            .resolve(GeoPoint::new(0.05, 0.05), &VehicleClass::new("B"), date(2025, 1, 1))
            .is_none());
    }

    #[test]
    fn test_allowed_class_has_no_safe_point() {
        let r = resolver(vec![square_km()]);
        assert!(r
            .resolve(GeoPoint::new(0.009, 0.009), &VehicleClass::new("CERO"), date(2025, 1, 1))
            .is_none());
    }

    #[test]
    fn test_near_edge_escapes_by_margin() {
        let r = resolver(vec![square_km()]);
        // ~110 m inside the east edge
        let p = GeoPoint::new(0.017, 0.009);
        let sp = r.resolve(p, &VehicleClass::new("B"), date(2025, 1, 1)).unwrap();

        assert_eq!(sp.source_zone_id, ZoneId::new("SQ"));
        assert!(!square_km().contains(sp.coordinates));
        assert!(sp.coordinates.lon > 0.018);
        // 111 m to the edge + 300 m margin
        assert!((sp.distance_m - 411.0).abs() < 15.0, "got {}", sp.distance_m);
        assert_eq!(sp.distance_m, sp.distance_m.round());
    }

    #[test]
    fn test_non_convex_ring_escapes() {
        // U shape opening north; the notch is outside the zone
        let u = zone(
            "U",
            &[
                (0.0, 0.0),
                (0.03, 0.0),
                (0.03, 0.03),
                (0.02, 0.03),
                (0.02, 0.01),
                (0.01, 0.01),
                (0.01, 0.03),
                (0.0, 0.03),
            ],
        );
        let r = resolver(vec![u.clone()]);
        // Inside the left arm, close to the notch
        let p = GeoPoint::new(0.0095, 0.02);
        let sp = r.resolve(p, &VehicleClass::new("B"), date(2025, 1, 1)).unwrap();
        assert!(!u.contains(sp.coordinates));
    }

    #[test]
    fn test_first_zone_in_order_wins() {
        let a = zone("A", &[(0.0, 0.0), (0.02, 0.0), (0.02, 0.02), (0.0, 0.02)]);
        let b = zone("B", &[(0.01, 0.01), (0.03, 0.01), (0.03, 0.03), (0.01, 0.03)]);
        let r = resolver(vec![a, b]);
        let found = r
            .zone_containing(GeoPoint::new(0.015, 0.015), &VehicleClass::new("B"), date(2025, 1, 1))
            .unwrap();
        assert_eq!(found.id, ZoneId::new("A"));
    }
}
