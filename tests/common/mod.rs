//! Shared fixtures for the integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use std::future::Future;
use std::sync::{Arc, Mutex};

use zone_nav::core::calendar::{Clock, FixedClock};
use zone_nav::core::error::{NavError, Result};
use zone_nav::core::types::{GeoPoint, VehicleClass, ZoneId};
use zone_nav::routing::{RouteCandidate, RouteGeometry, RouteProvider, RouteRequest};
use zone_nav::zones::{RestrictedZone, ZoneRegistry};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A mid-2025 date; every fixture zone is active on it
pub fn today() -> NaiveDate {
    date(2025, 6, 1)
}

pub fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(today()))
}

/// Axis-aligned square zone with its south-west corner at `(min_lon, min_lat)`
pub fn square(id: &str, min_lon: f64, min_lat: f64, size: f64, allowed: &[&str]) -> RestrictedZone {
    RestrictedZone::new(
        ZoneId::new(id),
        format!("Zone {}", id),
        vec![
            GeoPoint::new(min_lon, min_lat),
            GeoPoint::new(min_lon + size, min_lat),
            GeoPoint::new(min_lon + size, min_lat + size),
            GeoPoint::new(min_lon, min_lat + size),
        ],
        allowed.iter().map(|c| VehicleClass::new(*c)).collect(),
        date(2024, 1, 1),
        date(2030, 12, 31),
    )
}

pub fn registry(zones: Vec<RestrictedZone>) -> ZoneRegistry {
    ZoneRegistry::new(zones).unwrap()
}

/// The bundled Spanish low-emission zones
pub fn spanish_zones() -> ZoneRegistry {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/zones.toml");
    ZoneRegistry::load(&path).unwrap()
}

pub fn line(points: &[[f64; 2]]) -> RouteGeometry {
    RouteGeometry::from_lon_lat(points).unwrap()
}

/// A router on an open plain: drives straight through every requested point
#[derive(Default)]
pub struct StraightLineProvider {
    requests: Mutex<Vec<RouteRequest>>,
}

impl StraightLineProvider {
    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl RouteProvider for StraightLineProvider {
    fn compute_route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<Vec<RouteCandidate>>> + Send {
        self.requests.lock().unwrap().push(request.clone());

        let mut points = vec![request.origin];
        points.extend(request.waypoints.iter().copied());
        points.push(request.destination);
        let answer = RouteGeometry::new(points).map(|g| vec![RouteCandidate::new(g, vec![])]);
        async move { answer }
    }
}

/// Ignores waypoints and always drives the direct line
#[derive(Default)]
pub struct StubbornProvider {
    calls: Mutex<usize>,
}

impl StubbornProvider {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl RouteProvider for StubbornProvider {
    fn compute_route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<Vec<RouteCandidate>>> + Send {
        *self.calls.lock().unwrap() += 1;
        let answer = RouteGeometry::new(vec![request.origin, request.destination])
            .map(|g| vec![RouteCandidate::new(g, vec![])]);
        async move { answer }
    }
}

/// A routing service that is down
pub struct FailingProvider;

impl RouteProvider for FailingProvider {
    fn compute_route(
        &self,
        _request: &RouteRequest,
    ) -> impl Future<Output = Result<Vec<RouteCandidate>>> + Send {
        async { Err(NavError::Routing("service unavailable".into())) }
    }
}
