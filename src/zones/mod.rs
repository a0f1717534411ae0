//! Restricted circulation zones: registry, load-time checks, proximity

mod proximity;
mod registry;
mod validation;

pub use proximity::{NearbyZone, ProximityReport, ZoneProximityMonitor};
pub use registry::{RestrictedZone, ZoneRegistry};
pub use validation::{ZoneDataError, ZoneValidator};
