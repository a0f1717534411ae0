//! Load-time checks on zone data: ring validity, dates, overlaps
//!
//! Zones are trusted once loaded; these checks run once when a registry is
//! built so that a malformed data file fails at startup instead of producing
//! silently wrong containment answers mid-trip.

use geo::{Intersects, LineString, Polygon};
use thiserror::Error;

use super::registry::RestrictedZone;
use crate::core::types::{GeoPoint, ZoneId};
use crate::geometry;

/// Problems found in a zone definition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoneDataError {
    #[error("zone {zone}: {count} vertices, at least {minimum} required")]
    InsufficientVertices { zone: ZoneId, count: usize, minimum: usize },

    #[error("zone {zone}: boundary edges cross each other")]
    SelfIntersecting { zone: ZoneId },

    #[error("zone {zone}: non-finite coordinate in boundary")]
    NonFiniteCoordinate { zone: ZoneId },

    #[error("zone {zone}: active_from is after active_to")]
    InvertedDateRange { zone: ZoneId },

    #[error("zone {zone}: duplicate id")]
    DuplicateId { zone: ZoneId },
}

pub struct ZoneValidator;

impl ZoneValidator {
    /// Validate a single zone definition
    pub fn validate_zone(zone: &RestrictedZone) -> Vec<ZoneDataError> {
        let mut errors = Vec::new();

        if zone.active_from > zone.active_to {
            errors.push(ZoneDataError::InvertedDateRange {
                zone: zone.id.clone(),
            });
        }

        if zone.boundary().iter().any(|p| !p.is_finite()) {
            errors.push(ZoneDataError::NonFiniteCoordinate {
                zone: zone.id.clone(),
            });
            return errors; // Can't do further checks
        }

        if zone.boundary().len() < 3 {
            errors.push(ZoneDataError::InsufficientVertices {
                zone: zone.id.clone(),
                count: zone.boundary().len(),
                minimum: 3,
            });
            return errors;
        }

        if Self::is_self_intersecting(zone.boundary()) {
            errors.push(ZoneDataError::SelfIntersecting {
                zone: zone.id.clone(),
            });
        }

        errors
    }

    /// Validate a full zone list, including id uniqueness
    pub fn validate_all(zones: &[RestrictedZone]) -> Vec<ZoneDataError> {
        let mut errors = Vec::new();
        let mut seen = ahash::AHashSet::new();
        for zone in zones {
            if !seen.insert(zone.id.clone()) {
                errors.push(ZoneDataError::DuplicateId {
                    zone: zone.id.clone(),
                });
            }
            errors.extend(Self::validate_zone(zone));
        }
        errors
    }

    /// Check if ring edges intersect each other (excluding adjacent edges)
    pub fn is_self_intersecting(ring: &[GeoPoint]) -> bool {
        let n = ring.len();
        if n < 4 {
            return false; // Triangle can't self-intersect
        }

        for i in 0..n {
            let a1 = ring[i];
            let a2 = ring[(i + 1) % n];

            for j in (i + 2)..n {
                // Skip adjacent edges
                if j == (i + n - 1) % n {
                    continue;
                }

                let b1 = ring[j];
                let b2 = ring[(j + 1) % n];

                if geometry::segments_cross(a1, a2, b1, b2) {
                    return true;
                }
            }
        }
        false
    }

    /// Pairs of zones whose polygons share any area or boundary
    ///
    /// Overlap is legal; safe-point resolution handles only the first
    /// containing zone in registry order, so callers log these at load time.
    pub fn overlapping_pairs(zones: &[RestrictedZone]) -> Vec<(ZoneId, ZoneId)> {
        let polygons: Vec<Polygon<f64>> = zones.iter().map(|z| to_geo_polygon(z.boundary())).collect();
        let mut pairs = Vec::new();
        for i in 0..zones.len() {
            for j in (i + 1)..zones.len() {
                if polygons[i].intersects(&polygons[j]) {
                    pairs.push((zones[i].id.clone(), zones[j].id.clone()));
                }
            }
        }
        pairs
    }
}

fn to_geo_polygon(ring: &[GeoPoint]) -> Polygon<f64> {
    let mut coords: Vec<(f64, f64)> = ring.iter().map(|p| (p.lon, p.lat)).collect();
    // Close the polygon
    if let Some(first) = coords.first().cloned() {
        coords.push(first);
    }
    Polygon::new(LineString::from(coords), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn zone(id: &str, ring: Vec<(f64, f64)>) -> RestrictedZone {
        RestrictedZone::new(
            ZoneId::new(id),
            id.to_string(),
            ring.into_iter().map(GeoPoint::from).collect(),
            vec![],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
        )
    }

    #[test]
    fn test_valid_square_passes() {
        let z = zone("A", vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(ZoneValidator::validate_zone(&z).is_empty());
    }

    #[test]
    fn test_concave_ring_is_not_self_intersecting() {
        let ring: Vec<GeoPoint> = vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (1.0, 1.0), (0.0, 2.0)]
            .into_iter()
            .map(GeoPoint::from)
            .collect();
        assert!(!ZoneValidator::is_self_intersecting(&ring));
    }

    #[test]
    fn test_bowtie_is_self_intersecting() {
        let z = zone("BOW", vec![(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        let errors = ZoneValidator::validate_zone(&z);
        assert!(errors.iter().any(|e| matches!(e, ZoneDataError::SelfIntersecting { .. })));
    }

    #[test]
    fn test_two_vertices_rejected() {
        let z = zone("LINE", vec![(0.0, 0.0), (1.0, 1.0)]);
        let errors = ZoneValidator::validate_zone(&z);
        assert!(matches!(
            errors.as_slice(),
            [ZoneDataError::InsufficientVertices { count: 2, minimum: 3, .. }]
        ));
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut z = zone("A", vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        std::mem::swap(&mut z.active_from, &mut z.active_to);
        let errors = ZoneValidator::validate_zone(&z);
        assert!(errors.iter().any(|e| matches!(e, ZoneDataError::InvertedDateRange { .. })));
    }

    #[test]
    fn test_duplicate_ids_detected() {
        let ring = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        let zones = vec![zone("A", ring.clone()), zone("A", ring)];
        let errors = ZoneValidator::validate_all(&zones);
        assert!(errors.iter().any(|e| matches!(e, ZoneDataError::DuplicateId { .. })));
    }

    #[test]
    fn test_overlap_detection() {
        let zones = vec![
            zone("A", vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]),
            zone("B", vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]),
            zone("C", vec![(10.0, 10.0), (11.0, 10.0), (11.0, 11.0)]),
        ];
        let pairs = ZoneValidator::overlapping_pairs(&zones);
        assert_eq!(pairs, vec![(ZoneId::new("A"), ZoneId::new("B"))]);
    }
}
