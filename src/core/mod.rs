pub mod calendar;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::{Clock, FixedClock, SystemClock};
pub use config::NavConfig;
pub use error::{NavError, Result};
pub use types::{GeoPoint, TripId, VehicleClass, ZoneId};
