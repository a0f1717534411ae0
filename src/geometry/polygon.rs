//! Polygon primitives over open lon/lat rings
//!
//! A ring is an ordered slice of vertices, implicitly closed (the last vertex
//! connects back to the first). Containment and crossing tests work in the
//! lon/lat plane; areas and distances are reported in meters.

use serde::Serialize;

use super::line::distance_point_to_segment;
use super::sphere::EARTH_RADIUS_M;
use crate::core::types::GeoPoint;

/// Tolerance for treating a point as lying on an edge (degrees², cross product)
const ON_EDGE_EPSILON: f64 = 1e-18;

/// Axis-aligned lon/lat extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }
}

pub fn bounding_box(ring: &[GeoPoint]) -> Option<BoundingBox> {
    let first = ring.first()?;
    let init = BoundingBox {
        min_lon: first.lon,
        min_lat: first.lat,
        max_lon: first.lon,
        max_lat: first.lat,
    };
    Some(ring.iter().fold(init, |b, p| BoundingBox {
        min_lon: b.min_lon.min(p.lon),
        min_lat: b.min_lat.min(p.lat),
        max_lon: b.max_lon.max(p.lon),
        max_lat: b.max_lat.max(p.lat),
    }))
}

/// Drop a repeated closing vertex, if present
pub fn open_ring(mut points: Vec<GeoPoint>) -> Vec<GeoPoint> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Iterate the ring's edges, including the closing edge
pub fn edges(ring: &[GeoPoint]) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Point-in-polygon by ray casting
///
/// Points on the boundary count as inside, so a route that only grazes a
/// zone edge is treated as entering it.
pub fn point_in_polygon(point: GeoPoint, ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    if edges(ring).any(|(a, b)| on_segment(a, b, point)) {
        return true;
    }

    let mut inside = false;
    for (a, b) in edges(ring) {
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let x_cross = (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if point.lon < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Distance from a point to a polygon in meters; 0 when inside
pub fn distance_point_to_polygon(point: GeoPoint, ring: &[GeoPoint]) -> f64 {
    if point_in_polygon(point, ring) {
        return 0.0;
    }
    edges(ring)
        .map(|(a, b)| distance_point_to_segment(point, a, b))
        .fold(f64::INFINITY, f64::min)
}

/// True if any line vertex is inside the polygon or any segment touches its boundary
pub fn line_intersects_polygon(line: &[GeoPoint], ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 || line.is_empty() {
        return false;
    }

    // Cheap reject on extents
    if let (Some(lb), Some(pb)) = (bounding_box(line), bounding_box(ring)) {
        if lb.max_lon < pb.min_lon
            || lb.min_lon > pb.max_lon
            || lb.max_lat < pb.min_lat
            || lb.min_lat > pb.max_lat
        {
            return false;
        }
    }

    if line.iter().any(|&p| point_in_polygon(p, ring)) {
        return true;
    }

    line.windows(2).any(|seg| {
        edges(ring).any(|(a, b)| segments_intersect(seg[0], seg[1], a, b))
    })
}

/// Area of the polygon in square meters
///
/// Shoelace formula in an equirectangular projection centred on the ring's
/// mean latitude.
pub fn polygon_area(ring: &[GeoPoint]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let lat0 = ring.iter().map(|p| p.lat).sum::<f64>() / ring.len() as f64;
    let m_per_deg = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
    let kx = m_per_deg * lat0.to_radians().cos();
    let ky = m_per_deg;

    let origin = ring[0];
    let twice_area: f64 = edges(ring)
        .map(|(a, b)| {
            let (ax, ay) = ((a.lon - origin.lon) * kx, (a.lat - origin.lat) * ky);
            let (bx, by) = ((b.lon - origin.lon) * kx, (b.lat - origin.lat) * ky);
            ax * by - bx * ay
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Area-weighted centroid of the polygon
///
/// Falls back to the vertex mean for degenerate (zero-area) rings.
pub fn polygon_centroid(ring: &[GeoPoint]) -> Option<GeoPoint> {
    let first = *ring.first()?;

    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (a, b) in edges(ring) {
        // Offsets from the first vertex keep the products well conditioned
        let (ax, ay) = (a.lon - first.lon, a.lat - first.lat);
        let (bx, by) = (b.lon - first.lon, b.lat - first.lat);
        let cross = ax * by - bx * ay;
        twice_area += cross;
        cx += (ax + bx) * cross;
        cy += (ay + by) * cross;
    }

    if twice_area.abs() < 1e-18 {
        let n = ring.len() as f64;
        let lon = ring.iter().map(|p| p.lon).sum::<f64>() / n;
        let lat = ring.iter().map(|p| p.lat).sum::<f64>() / n;
        return Some(GeoPoint::new(lon, lat));
    }

    Some(GeoPoint::new(
        first.lon + cx / (3.0 * twice_area),
        first.lat + cy / (3.0 * twice_area),
    ))
}

/// The ring as a closed polyline (first vertex repeated at the end)
pub fn polygon_boundary_as_line(ring: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut line = ring.to_vec();
    if let Some(&first) = ring.first() {
        if ring.last() != Some(&first) || ring.len() == 1 {
            line.push(first);
        }
    }
    line
}

/// Radius of the circle with the same area as the polygon (meters)
pub fn equivalent_radius(ring: &[GeoPoint]) -> f64 {
    (polygon_area(ring) / std::f64::consts::PI).sqrt()
}

/// Do segments `a1`-`a2` and `b1`-`b2` share at least one point?
///
/// Unlike a proper-crossing test this counts touching endpoints and collinear
/// overlap as intersecting.
pub fn segments_intersect(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    segments_cross(a1, a2, b1, b2)
        || on_segment(b1, b2, a1)
        || on_segment(b1, b2, a2)
        || on_segment(a1, a2, b1)
        || on_segment(a1, a2, b2)
}

/// Proper crossing: each segment strictly separates the other's endpoints
pub(crate) fn segments_cross(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    let d1 = cross_product_sign(b1, b2, a1);
    let d2 = cross_product_sign(b1, b2, a2);
    let d3 = cross_product_sign(a1, a2, b1);
    let d4 = cross_product_sign(a1, a2, b2);

    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn cross_product_sign(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> f64 {
    (b.lon - a.lon) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lon - a.lon)
}

/// Is `p` on the closed segment `a`-`b`?
fn on_segment(a: GeoPoint, b: GeoPoint, p: GeoPoint) -> bool {
    if cross_product_sign(a, b, p).abs() > ON_EDGE_EPSILON {
        return false;
    }
    p.lon >= a.lon.min(b.lon)
        && p.lon <= a.lon.max(b.lon)
        && p.lat >= a.lat.min(b.lat)
        && p.lat <= a.lat.max(b.lat)
}
