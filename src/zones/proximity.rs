//! Zone proximity monitor
//!
//! Watches a stream of positions (outside of active navigation) and reports
//! every zone forbidding the vehicle class within a radius. An alert fires
//! once when a zone enters the radius and re-arms after it leaves.

use ahash::AHashSet;
use chrono::NaiveDate;
use serde::Serialize;

use super::registry::ZoneRegistry;
use crate::core::types::{GeoPoint, VehicleClass, ZoneId};
use crate::geometry;

/// A zone within the monitoring radius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyZone {
    pub zone_id: ZoneId,
    pub name: String,
    /// Distance rounded to 0.1 km; 0 when inside
    pub distance_km: f64,
}

impl NearbyZone {
    pub fn is_inside(&self) -> bool {
        self.distance_km == 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProximityReport {
    /// All zones currently within the radius, in registry order
    pub nearby: Vec<NearbyZone>,
    /// Zones that entered the radius with this position
    pub newly_alerted: Vec<ZoneId>,
}

pub struct ZoneProximityMonitor {
    registry: ZoneRegistry,
    class: VehicleClass,
    radius_km: f64,
    alerted: AHashSet<ZoneId>,
}

impl ZoneProximityMonitor {
    pub fn new(registry: ZoneRegistry, class: VehicleClass, radius_km: f64) -> Self {
        Self {
            registry,
            class,
            radius_km,
            alerted: AHashSet::new(),
        }
    }

    pub fn check(&mut self, position: GeoPoint, today: NaiveDate) -> ProximityReport {
        let mut report = ProximityReport::default();

        for zone in self.registry.restricting(&self.class, today) {
            let distance_km = geometry::distance_point_to_polygon(position, zone.boundary()) / 1000.0;

            if distance_km <= self.radius_km {
                report.nearby.push(NearbyZone {
                    zone_id: zone.id.clone(),
                    name: zone.name.clone(),
                    distance_km: (distance_km * 10.0).round() / 10.0,
                });

                if self.alerted.insert(zone.id.clone()) {
                    tracing::info!("Approaching restricted zone {} ({:.1} km)", zone.name, distance_km);
                    report.newly_alerted.push(zone.id.clone());
                }
            } else {
                self.alerted.remove(&zone.id);
            }
        }

        report
    }

    /// Forget all alerts, e.g. when monitoring is switched off
    pub fn reset(&mut self) {
        self.alerted.clear();
    }

    /// Change the vehicle class; alerts re-arm because the zone set changes
    pub fn set_class(&mut self, class: VehicleClass) {
        self.class = class;
        self.alerted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::RestrictedZone;

    fn registry() -> ZoneRegistry {
        let ring = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.02, 0.0),
            GeoPoint::new(0.02, 0.02),
            GeoPoint::new(0.0, 0.02),
        ];
        ZoneRegistry::new(vec![RestrictedZone::new(
            ZoneId::new("Z"),
            "Zone".into(),
            ring,
            vec![VehicleClass::new("ECO")],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
        )])
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[test]
    fn test_alert_once_then_rearm() {
        let mut monitor = ZoneProximityMonitor::new(registry(), VehicleClass::new("C"), 5.0);

        // ~3.3 km east of the zone
        let near = GeoPoint::new(0.05, 0.01);
        let report = monitor.check(near, today());
        assert_eq!(report.nearby.len(), 1);
        assert_eq!(report.newly_alerted, vec![ZoneId::new("Z")]);

        // Still near: listed but not re-alerted
        let report = monitor.check(GeoPoint::new(0.04, 0.01), today());
        assert_eq!(report.nearby.len(), 1);
        assert!(report.newly_alerted.is_empty());

        // Leave the radius, come back: alert again
        let report = monitor.check(GeoPoint::new(0.2, 0.01), today());
        assert!(report.nearby.is_empty());
        let report = monitor.check(near, today());
        assert_eq!(report.newly_alerted.len(), 1);
    }

    #[test]
    fn test_inside_reports_zero_distance() {
        let mut monitor = ZoneProximityMonitor::new(registry(), VehicleClass::new("C"), 5.0);
        let report = monitor.check(GeoPoint::new(0.01, 0.01), today());
        assert!(report.nearby[0].is_inside());
    }

    #[test]
    fn test_allowed_class_is_ignored() {
        let mut monitor = ZoneProximityMonitor::new(registry(), VehicleClass::new("ECO"), 5.0);
        let report = monitor.check(GeoPoint::new(0.01, 0.01), today());
        assert!(report.nearby.is_empty());
    }
}
