//! HTTP routing service adapter (Mapbox Directions API)
//!
//! Intermediate waypoints are sent as pass-through points: only the first and
//! last coordinates are declared as stops, so the service returns a single
//! leg. Alternatives are only requested for two-point queries because the
//! service rejects them otherwise.

use reqwest::Client;
use serde::Deserialize;
use std::future::Future;

use super::{
    ManeuverKind, RouteCandidate, RouteGeometry, RouteLeg, RouteProvider, RouteRequest, RouteStep,
    TurnDirection,
};
use crate::core::error::{NavError, Result};
use crate::core::types::GeoPoint;

const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";

/// Directions client for one routing profile
pub struct MapboxDirections {
    client: Client,
    access_token: String,
    base_url: String,
    profile: String,
    language: String,
}

impl MapboxDirections {
    pub fn new(access_token: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            base_url: DEFAULT_BASE_URL.into(),
            profile: "driving".into(),
            language: "es".into(),
        }
    }

    /// Create a client from environment variables
    ///
    /// Required: MAPBOX_TOKEN
    /// Optional: MAPBOX_BASE_URL, MAPBOX_PROFILE (defaults to `driving`)
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("MAPBOX_TOKEN")
            .map_err(|_| NavError::Config("MAPBOX_TOKEN not set".into()))?;
        let mut client = Self::new(token);
        if let Ok(url) = std::env::var("MAPBOX_BASE_URL") {
            client.base_url = url;
        }
        if let Ok(profile) = std::env::var("MAPBOX_PROFILE") {
            client.profile = profile;
        }
        Ok(client)
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Request URL without the access token
    pub fn request_url(&self, request: &RouteRequest) -> String {
        let mut points = Vec::with_capacity(request.waypoints.len() + 2);
        points.push(request.origin);
        points.extend(request.waypoints.iter().copied());
        points.push(request.destination);

        let coords: Vec<String> = points
            .iter()
            .map(|p| format!("{:.6},{:.6}", p.lon, p.lat))
            .collect();

        let mut url = format!(
            "{}/directions/v5/mapbox/{}/{}?geometries=geojson&overview=full&steps=true&language={}",
            self.base_url.trim_end_matches('/'),
            self.profile,
            coords.join(";"),
            self.language
        );
        if request.waypoints.is_empty() {
            url.push_str(&format!("&alternatives={}", request.alternatives));
        } else {
            url.push_str(&format!("&waypoints=0;{}", points.len() - 1));
        }
        url
    }

    async fn fetch(&self, request: RouteRequest) -> Result<Vec<RouteCandidate>> {
        let url = self.request_url(&request);
        tracing::debug!("Directions request: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await
            .map_err(|e| NavError::Routing(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NavError::Routing(e.to_string()))?;

        // NoRoute / NoSegment come back as 200 or 422 with a code
        let parsed: std::result::Result<DirectionsResponse, _> = serde_json::from_str(&body);
        match parsed {
            Ok(directions) => parse_directions(directions),
            Err(_) if !status.is_success() => {
                Err(NavError::Routing(format!("HTTP {}: {}", status, body)))
            }
            Err(e) => Err(NavError::Json(e)),
        }
    }
}

impl RouteProvider for MapboxDirections {
    fn compute_route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<Vec<RouteCandidate>>> + Send {
        self.fetch(request.clone())
    }
}

/// Convert a directions response into route candidates
pub fn parse_directions(response: DirectionsResponse) -> Result<Vec<RouteCandidate>> {
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(NavError::NoRouteFound),
        other => {
            return Err(NavError::Routing(format!(
                "{}: {}",
                other,
                response.message.unwrap_or_default()
            )))
        }
    }

    response.routes.into_iter().map(route_from_wire).collect()
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Debug, Deserialize)]
struct WireRoute {
    geometry: WireLine,
    #[serde(default)]
    legs: Vec<WireLeg>,
}

#[derive(Debug, Deserialize)]
struct WireLine {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct WireLeg {
    distance: f64,
    duration: f64,
    #[serde(default)]
    steps: Vec<WireStep>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<WireLine>,
    maneuver: WireManeuver,
}

#[derive(Debug, Deserialize)]
struct WireManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    exit: Option<u32>,
    location: [f64; 2],
    #[serde(default)]
    instruction: String,
}

fn route_from_wire(route: WireRoute) -> Result<RouteCandidate> {
    let geometry = RouteGeometry::from_lon_lat(&route.geometry.coordinates)?;
    let legs = route.legs.into_iter().map(leg_from_wire).collect();
    Ok(RouteCandidate::new(geometry, legs))
}

fn leg_from_wire(leg: WireLeg) -> RouteLeg {
    RouteLeg {
        distance_m: leg.distance,
        duration_s: leg.duration,
        steps: leg.steps.into_iter().map(step_from_wire).collect(),
    }
}

fn step_from_wire(step: WireStep) -> RouteStep {
    let start_point = GeoPoint::from_lon_lat(step.maneuver.location);
    let end_point = step
        .geometry
        .as_ref()
        .and_then(|g| g.coordinates.last().copied())
        .map(GeoPoint::from_lon_lat)
        .unwrap_or(start_point);
    let maneuver = maneuver_kind(&step.maneuver);
    RouteStep {
        start_point,
        end_point,
        distance_m: step.distance,
        duration_s: step.duration,
        maneuver,
        instruction: step.maneuver.instruction,
    }
}

fn maneuver_kind(m: &WireManeuver) -> ManeuverKind {
    let direction = turn_direction(m.modifier.as_deref());
    match m.kind.as_str() {
        "depart" => ManeuverKind::Depart,
        "arrive" => ManeuverKind::Arrive,
        "turn" | "end of road" => ManeuverKind::Turn { direction },
        "continue" | "new name" | "notification" => ManeuverKind::Continue,
        "merge" => ManeuverKind::Merge,
        "on ramp" | "off ramp" => ManeuverKind::Ramp { direction },
        "fork" => ManeuverKind::Fork { direction },
        "roundabout" | "rotary" | "roundabout turn" | "exit roundabout" | "exit rotary" => {
            ManeuverKind::Roundabout { exit: m.exit }
        }
        _ => ManeuverKind::Other,
    }
}

fn turn_direction(modifier: Option<&str>) -> TurnDirection {
    match modifier {
        Some("slight left") => TurnDirection::SlightLeft,
        Some("left") => TurnDirection::Left,
        Some("sharp left") => TurnDirection::SharpLeft,
        Some("slight right") => TurnDirection::SlightRight,
        Some("right") => TurnDirection::Right,
        Some("sharp right") => TurnDirection::SharpRight,
        Some("uturn") => TurnDirection::UTurn,
        _ => TurnDirection::Straight,
    }
}
