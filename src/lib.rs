//! Zone Nav - zone-aware routing and live navigation
//!
//! Validates routes against time-bounded restricted circulation zones per
//! vehicle class, proposes safe substitute endpoints and avoidance waypoints
//! for an external routing service, and tracks a live trip turn by turn.

pub mod core;
pub mod geometry;
pub mod navigation;
pub mod routing;
pub mod zones;
