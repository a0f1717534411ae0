//! Polyline primitives: length, projection, interpolation

use serde::Serialize;

use super::sphere::haversine;
use crate::core::types::GeoPoint;

/// Result of projecting a position onto a polyline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearestPoint {
    /// Closest point on the line
    pub point: GeoPoint,
    /// Index of the segment start vertex (0-based)
    pub segment_index: usize,
    /// Distance from the query position to `point`, in meters
    pub distance_m: f64,
    /// Distance along the line from its first vertex to `point`, in meters
    pub along_m: f64,
}

/// Total length of a polyline in meters
pub fn line_length(line: &[GeoPoint]) -> f64 {
    line.windows(2).map(|w| haversine(w[0], w[1])).sum()
}

/// Cumulative distance to each vertex; first entry is 0
pub fn cumulative_lengths(line: &[GeoPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(line.len());
    let mut total = 0.0;
    if !line.is_empty() {
        out.push(0.0);
    }
    for w in line.windows(2) {
        total += haversine(w[0], w[1]);
        out.push(total);
    }
    out
}

/// Project a point onto the segment `a`-`b`
///
/// Uses a planar approximation scaled by the cosine of the segment's mean
/// latitude, accurate for segments of a few tens of kilometers. Returns the
/// projected point and the clamped segment parameter `t` in `[0, 1]`.
pub fn project_on_segment(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> (GeoPoint, f64) {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lon - a.lon) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lon - a.lon) * cos_lat;
    let py = p.lat - a.lat;

    let seg_len_sq = dx * dx + dy * dy;
    if seg_len_sq < 1e-24 {
        return (a, 0.0);
    }

    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);
    (
        GeoPoint::new(a.lon + t * (b.lon - a.lon), a.lat + t * (b.lat - a.lat)),
        t,
    )
}

/// Shortest distance from `p` to the segment `a`-`b` in meters
pub fn distance_point_to_segment(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
    let (projected, _) = project_on_segment(p, a, b);
    haversine(p, projected)
}

/// Closest point on a polyline and the distance travelled along it to get there
///
/// Ties resolve to the first segment in line order. A single-vertex line
/// projects onto that vertex. Returns `None` for an empty line.
pub fn nearest_point_on_line(line: &[GeoPoint], point: GeoPoint) -> Option<NearestPoint> {
    nearest_point_on_line_with(line, &cumulative_lengths(line), point)
}

/// [`nearest_point_on_line`] with a precomputed [`cumulative_lengths`] table
///
/// `cumulative` must hold one entry per vertex of `line`.
pub fn nearest_point_on_line_with(
    line: &[GeoPoint],
    cumulative: &[f64],
    point: GeoPoint,
) -> Option<NearestPoint> {
    debug_assert_eq!(line.len(), cumulative.len());
    match line.len() {
        0 => return None,
        1 => {
            return Some(NearestPoint {
                point: line[0],
                segment_index: 0,
                distance_m: haversine(point, line[0]),
                along_m: 0.0,
            })
        }
        _ => {}
    }

    let mut best: Option<NearestPoint> = None;

    for (i, (seg, start_m)) in line.windows(2).zip(cumulative).enumerate() {
        let (a, b) = (seg[0], seg[1]);
        let (projected, _) = project_on_segment(point, a, b);
        let dist = haversine(point, projected);

        let is_better = match &best {
            Some(prev) => dist < prev.distance_m,
            None => true,
        };

        if is_better {
            best = Some(NearestPoint {
                point: projected,
                segment_index: i,
                distance_m: dist,
                along_m: start_m + haversine(a, projected),
            });
        }
    }

    best
}

/// Point at `distance_m` along the line, clamped to its ends
pub fn point_along_line(line: &[GeoPoint], distance_m: f64) -> Option<GeoPoint> {
    let first = *line.first()?;
    if distance_m <= 0.0 {
        return Some(first);
    }

    let mut travelled = 0.0;
    for seg in line.windows(2) {
        let len = haversine(seg[0], seg[1]);
        if travelled + len >= distance_m && len > 0.0 {
            let t = (distance_m - travelled) / len;
            return Some(GeoPoint::new(
                seg[0].lon + t * (seg[1].lon - seg[0].lon),
                seg[0].lat + t * (seg[1].lat - seg[0].lat),
            ));
        }
        travelled += len;
    }

    line.last().copied()
}

/// Which side of the directed line `a`->`b` the point lies on
///
/// Positive = left, negative = right, zero = on the line. Computed in the
/// local projection around `a`.
pub fn side_of(a: GeoPoint, b: GeoPoint, p: GeoPoint) -> f64 {
    let cos_lat = a.lat.to_radians().cos();
    let (dx, dy) = ((b.lon - a.lon) * cos_lat, b.lat - a.lat);
    let (px, py) = ((p.lon - a.lon) * cos_lat, p.lat - a.lat);
    dx * py - dy * px
}
