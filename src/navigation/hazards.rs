//! Points the tracker announces when the driver gets close
//!
//! Points of interest and hazards share one shape. Fixed speed cameras are the
//! built-in hazard source, loaded from a TOML catalogue.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::events::ProximityKind;
use crate::core::error::{NavError, Result};
use crate::core::types::GeoPoint;
use crate::routing::RouteGeometry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPoint {
    pub id: String,
    pub label: String,
    pub kind: ProximityKind,
    pub position: GeoPoint,
    /// Announce radius; falls back to the tracker default for the kind
    #[serde(default)]
    pub radius_m: Option<f64>,
}

impl TrackedPoint {
    pub fn poi(id: impl Into<String>, label: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: ProximityKind::Poi,
            position,
            radius_m: None,
        }
    }

    pub fn hazard(id: impl Into<String>, label: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            kind: ProximityKind::Hazard,
            ..Self::poi(id, label, position)
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = Some(radius_m);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraDirection {
    #[serde(alias = "creciente")]
    Increasing,
    #[serde(alias = "decreciente")]
    Decreasing,
    #[serde(alias = "ambos")]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    #[serde(alias = "fijo")]
    Fixed,
    /// Average-speed section
    #[serde(alias = "tramo")]
    Section,
    #[serde(alias = "semaforo")]
    TrafficLight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedCamera {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub road: String,
    pub km: f64,
    pub speed_limit_kmh: u32,
    pub direction: CameraDirection,
    pub kind: CameraKind,
}

impl SpeedCamera {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }

    pub fn label(&self) -> String {
        let what = match self.kind {
            CameraKind::Fixed => "Speed camera",
            CameraKind::Section => "Average speed section",
            CameraKind::TrafficLight => "Red light camera",
        };
        format!("{} {} km {} ({} km/h)", what, self.road, self.km, self.speed_limit_kmh)
    }

    pub fn to_tracked(&self) -> TrackedPoint {
        TrackedPoint::hazard(self.id.clone(), self.label(), self.position())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraCatalogue {
    #[serde(default, rename = "camera")]
    pub cameras: Vec<SpeedCamera>,
}

impl CameraCatalogue {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse `[[camera]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let catalogue: CameraCatalogue = toml::from_str(content)?;
        if let Some(bad) = catalogue.cameras.iter().find(|c| !c.position().is_finite()) {
            return Err(NavError::InvalidInput(format!("camera {} has a non-finite position", bad.id)));
        }
        tracing::debug!("Loaded {} speed cameras", catalogue.cameras.len());
        Ok(catalogue)
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Cameras within `corridor_m` of the route line
    pub fn along_route(&self, route: &RouteGeometry, corridor_m: f64) -> Vec<&SpeedCamera> {
        let Some(bbox) = crate::geometry::bounding_box(route.points()) else {
            return Vec::new();
        };
        // ~111 km per degree of latitude; generous for longitude too
        let pad = corridor_m / 111_000.0 / route.start().lat.to_radians().cos().max(0.1);
        self.cameras
            .iter()
            .filter(|c| {
                c.lon >= bbox.min_lon - pad
                    && c.lon <= bbox.max_lon + pad
                    && c.lat >= bbox.min_lat - pad
                    && c.lat <= bbox.max_lat + pad
            })
            .filter(|c| route.snap(c.position()).distance_m <= corridor_m)
            .collect()
    }

    /// Tracked hazards for the cameras along a route
    pub fn tracked_along(&self, route: &RouteGeometry, corridor_m: f64) -> Vec<TrackedPoint> {
        self.along_route(route, corridor_m)
            .into_iter()
            .map(SpeedCamera::to_tracked)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERAS: &str = r#"
        [[camera]]
        id = "A1-018"
        lat = 40.5348
        lon = -3.6362
        road = "A-1"
        km = 18
        speed_limit_kmh = 120
        direction = "creciente"
        kind = "fijo"

        [[camera]]
        id = "A3-021"
        lat = 40.3750
        lon = -3.5500
        road = "A-3"
        km = 21
        speed_limit_kmh = 120
        direction = "both"
        kind = "section"
    "#;

    #[test]
    fn test_load_catalogue_with_spanish_aliases() {
        let catalogue = CameraCatalogue::from_toml_str(CAMERAS).unwrap();
        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.cameras[0].direction, CameraDirection::Increasing);
        assert_eq!(catalogue.cameras[0].kind, CameraKind::Fixed);
        assert_eq!(catalogue.cameras[1].kind, CameraKind::Section);
        assert_eq!(catalogue.cameras[0].label(), "Speed camera A-1 km 18 (120 km/h)");
    }

    #[test]
    fn test_along_route_filters_by_corridor() {
        let catalogue = CameraCatalogue::from_toml_str(CAMERAS).unwrap();
        // Short line passing right by the A-1 camera
        let route = RouteGeometry::from_lon_lat(&[[-3.64, 40.53], [-3.63, 40.54]]).unwrap();
        let near = catalogue.along_route(&route, 500.0);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].id, "A1-018");

        let tracked = catalogue.tracked_along(&route, 500.0);
        assert_eq!(tracked[0].kind, ProximityKind::Hazard);
    }
}
