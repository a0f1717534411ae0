//! Great-circle primitives: distance, bearing, destination

use crate::core::types::GeoPoint;

/// Earth radius in meters (WGS84 mean)
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two points in meters
pub fn haversine(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `from` to `to` in degrees, `[0, 360)`, 0 = north
pub fn bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

/// Point reached by travelling `distance_m` from `origin` along `bearing_deg`
pub fn destination(origin: GeoPoint, distance_m: f64, bearing_deg: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(normalize_longitude(lon2.to_degrees()), lat2.to_degrees())
}

/// Fold any angle into `[0, 360)`
pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg % 360.0;
    if b < 0.0 {
        b + 360.0
    } else {
        b
    }
}

/// Signed difference `to - from` folded into `(-180, 180]`
pub fn bearing_delta(from: f64, to: f64) -> f64 {
    let mut d = normalize_bearing(to) - normalize_bearing(from);
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

fn normalize_longitude(lon: f64) -> f64 {
    let l = (lon + 540.0) % 360.0 - 180.0;
    if l == -180.0 {
        180.0
    } else {
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lon, lat)
    }

    #[test]
    fn haversine_same_point() {
        let p = pt(-3.7038, 40.4168);
        assert!(haversine(p, p).abs() < 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Madrid to Toledo is roughly 67 km
        let madrid = pt(-3.7038, 40.4168);
        let toledo = pt(-4.0273, 39.8628);
        let dist = haversine(madrid, toledo);
        assert!(dist > 65_000.0 && dist < 70_000.0, "got {dist:.0} m");
    }

    #[test]
    fn bearing_cardinal_directions() {
        let o = pt(0.0, 0.0);
        assert!(bearing(o, pt(0.0, 1.0)).abs() < 1e-9);
        assert!((bearing(o, pt(1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(o, pt(0.0, -1.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(o, pt(-1.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn destination_round_trips_distance_and_bearing() {
        let origin = pt(2.1734, 41.3851);
        let dest = destination(origin, 1_500.0, 37.0);

        assert!((haversine(origin, dest) - 1_500.0).abs() < 0.01);
        assert!((bearing(origin, dest) - 37.0).abs() < 0.01);
    }

    #[test]
    fn bearing_delta_wraps() {
        assert!((bearing_delta(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((bearing_delta(10.0, 350.0) + 20.0).abs() < 1e-9);
        assert!((bearing_delta(0.0, 180.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn destination_wraps_antimeridian() {
        let p = destination(pt(179.999, 0.0), 1_000.0, 90.0);
        assert!(p.lon < -179.0);
    }
}
