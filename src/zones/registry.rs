//! Restricted-zone registry
//!
//! The registry is an immutable, cheaply clonable list of zones. Order is
//! significant: validation reports violations in registry order and safe-point
//! resolution picks the first containing zone. A reload builds a new registry
//! and swaps it in; an existing one is never mutated.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use super::validation::ZoneValidator;
use crate::core::calendar;
use crate::core::error::{NavError, Result};
use crate::core::types::{GeoPoint, VehicleClass, ZoneId};
use crate::geometry::{self, BoundingBox};

/// A polygon forbidding some vehicle classes over a date range
#[derive(Debug, Clone)]
pub struct RestrictedZone {
    pub id: ZoneId,
    pub name: String,
    boundary: Vec<GeoPoint>,
    pub allowed_classes: Vec<VehicleClass>,
    pub active_from: NaiveDate,
    pub active_to: NaiveDate,
    bbox: Option<BoundingBox>,
}

impl RestrictedZone {
    pub fn new(
        id: ZoneId,
        name: String,
        boundary: Vec<GeoPoint>,
        allowed_classes: Vec<VehicleClass>,
        active_from: NaiveDate,
        active_to: NaiveDate,
    ) -> Self {
        let boundary = geometry::open_ring(boundary);
        let bbox = geometry::bounding_box(&boundary);
        Self {
            id,
            name,
            boundary,
            allowed_classes,
            active_from,
            active_to,
            bbox,
        }
    }

    /// Is the zone in force on `date` (inclusive range)
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        calendar::within(date, self.active_from, self.active_to)
    }

    pub fn allows(&self, class: &VehicleClass) -> bool {
        self.allowed_classes.contains(class)
    }

    /// Active on `date` and forbidding `class`
    pub fn restricts(&self, class: &VehicleClass, date: NaiveDate) -> bool {
        self.is_active_on(date) && !self.allows(class)
    }

    /// Open ring of vertices, implicitly closed
    pub fn boundary(&self) -> &[GeoPoint] {
        &self.boundary
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        match self.bbox {
            Some(b) if !b.contains(point) => false,
            _ => geometry::point_in_polygon(point, &self.boundary),
        }
    }
}

/// Immutable ordered set of restricted zones
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: Arc<[RestrictedZone]>,
}

impl ZoneRegistry {
    /// Build a registry, rejecting malformed zone definitions
    pub fn new(zones: Vec<RestrictedZone>) -> Result<Self> {
        let errors = ZoneValidator::validate_all(&zones);
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(NavError::ZoneData(messages.join("; ")));
        }

        for (a, b) in ZoneValidator::overlapping_pairs(&zones) {
            tracing::warn!("Zones {} and {} overlap; safe points use the first in order", a, b);
        }

        tracing::debug!("Loaded {} restricted zones", zones.len());
        Ok(Self {
            zones: zones.into(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a `.toml`, `.json` or `.geojson` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") | Some("geojson") => Self::from_geojson_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Parse `[[zone]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlZoneFile = toml::from_str(content)?;
        let zones = file
            .zone
            .into_iter()
            .map(TomlZone::into_zone)
            .collect::<Result<Vec<_>>>()?;
        Self::new(zones)
    }

    /// Parse a GeoJSON FeatureCollection of polygons
    ///
    /// Properties: `id`, `name`, `allowed_tags`, `valid_from`, `valid_to`.
    /// Only the outer ring of each polygon is used.
    pub fn from_geojson_str(content: &str) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(content)?;
        let zones = collection
            .features
            .into_iter()
            .map(Feature::into_zone)
            .collect::<Result<Vec<_>>>()?;
        Self::new(zones)
    }

    pub fn zones(&self) -> &[RestrictedZone] {
        &self.zones
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestrictedZone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, id: &ZoneId) -> Option<&RestrictedZone> {
        self.zones.iter().find(|z| &z.id == id)
    }

    /// Zones in force on `date`
    pub fn active_on(&self, date: NaiveDate) -> impl Iterator<Item = &RestrictedZone> {
        self.zones.iter().filter(move |z| z.is_active_on(date))
    }

    /// Zones in force on `date` that forbid `class`, in registry order
    ///
    /// The yielded zones borrow from the registry only, so they outlive `class`.
    pub fn restricting<'a, 'c>(
        &'a self,
        class: &'c VehicleClass,
        date: NaiveDate,
    ) -> impl Iterator<Item = &'a RestrictedZone> + 'c
    where
        'a: 'c,
    {
        self.zones.iter().filter(move |z| z.restricts(class, date))
    }

    /// A new registry with the given zones removed
    pub fn without(&self, ids: &[ZoneId]) -> Self {
        let kept: Vec<RestrictedZone> = self
            .zones
            .iter()
            .filter(|z| !ids.contains(&z.id))
            .cloned()
            .collect();
        Self { zones: kept.into() }
    }
}

// ============================================================================
// FILE FORMATS
// ============================================================================

#[derive(Deserialize)]
struct TomlZoneFile {
    #[serde(default)]
    zone: Vec<TomlZone>,
}

#[derive(Deserialize)]
struct TomlZone {
    id: String,
    name: String,
    allowed_classes: Vec<String>,
    active_from: String,
    active_to: String,
    boundary: Vec<[f64; 2]>,
}

impl TomlZone {
    fn into_zone(self) -> Result<RestrictedZone> {
        build_zone(
            self.id,
            self.name,
            self.allowed_classes,
            &self.active_from,
            &self.active_to,
            self.boundary,
        )
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: PolygonGeometry,
}

#[derive(Deserialize)]
struct FeatureProperties {
    id: String,
    name: String,
    allowed_tags: Vec<String>,
    valid_from: String,
    valid_to: String,
}

#[derive(Deserialize)]
struct PolygonGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<[f64; 2]>>,
}

impl Feature {
    fn into_zone(self) -> Result<RestrictedZone> {
        if self.geometry.kind != "Polygon" {
            return Err(NavError::ZoneData(format!(
                "zone {}: unsupported geometry type {}",
                self.properties.id, self.geometry.kind
            )));
        }
        let outer = self.geometry.coordinates.into_iter().next().unwrap_or_default();
        let p = self.properties;
        build_zone(p.id, p.name, p.allowed_tags, &p.valid_from, &p.valid_to, outer)
    }
}

fn build_zone(
    id: String,
    name: String,
    classes: Vec<String>,
    from: &str,
    to: &str,
    ring: Vec<[f64; 2]>,
) -> Result<RestrictedZone> {
    let active_from = parse_date(&id, from)?;
    let active_to = parse_date(&id, to)?;
    Ok(RestrictedZone::new(
        ZoneId(id),
        name,
        ring.into_iter().map(GeoPoint::from_lon_lat).collect(),
        classes.into_iter().map(VehicleClass).collect(),
        active_from,
        active_to,
    ))
}

fn parse_date(zone: &str, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| NavError::ZoneData(format!("zone {}: bad date {:?}: {}", zone, s, e)))
}
