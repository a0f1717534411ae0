//! Live navigation: tracker state machine, async session, events

pub mod events;
pub mod format;
pub mod hazards;
pub mod session;
pub mod simulate;
pub mod state;
pub mod tracker;

pub use events::{NavEvent, ProximityEvent, ProximityKind};
pub use hazards::{CameraCatalogue, SpeedCamera, TrackedPoint};
pub use session::{FixResult, NavigationSession};
pub use simulate::SimulatedDrive;
pub use state::{FixError, NavigationState, PositionFix, TrackerPhase};
pub use tracker::{NavigationTracker, TripPlan};
