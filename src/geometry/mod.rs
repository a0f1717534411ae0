//! Geometry kernel
//!
//! Pure functions over lon/lat points, shared by every other component so that
//! validation, safe points, avoidance and tracking all agree on distances.
//! Point-to-point distance, bearing and destination are great-circle; segment
//! projection uses a local equirectangular approximation, which is accurate for
//! the sub-100 km extents this crate deals with.

mod line;
mod polygon;
mod sphere;

pub use line::{
    cumulative_lengths, distance_point_to_segment, line_length, nearest_point_on_line,
    nearest_point_on_line_with, point_along_line, project_on_segment, side_of, NearestPoint,
};
pub use polygon::{
    bounding_box, distance_point_to_polygon, edges, equivalent_radius, line_intersects_polygon,
    open_ring, point_in_polygon, polygon_area, polygon_boundary_as_line, polygon_centroid,
    segments_intersect, BoundingBox,
};
pub(crate) use polygon::segments_cross;
pub use sphere::{bearing, bearing_delta, destination, haversine, normalize_bearing, EARTH_RADIUS_M};

