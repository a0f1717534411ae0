//! Events published by the navigation tracker
//!
//! The tracker defines payloads only; delivering them to speech, UI or logs is
//! up to whoever reads the channel.

use serde::{Deserialize, Serialize};

use super::format;
use super::state::FixError;
use crate::core::types::{GeoPoint, TripId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityKind {
    Zone,
    Poi,
    Hazard,
}

/// The driver came within the announce radius of something
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityEvent {
    pub kind: ProximityKind,
    pub subject_id: String,
    pub label: String,
    pub distance_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NavEvent {
    TripStarted {
        trip_id: TripId,
        total_distance_m: f64,
        first_instruction: Option<String>,
    },
    /// Fired once per step when its maneuver is within the announce distance
    UpcomingManeuver {
        step_index: usize,
        distance_m: f64,
        instruction: String,
    },
    /// Fired once per step when it becomes the current step
    CurrentManeuver { step_index: usize, instruction: String },
    Proximity(ProximityEvent),
    /// The fix is further from the route than the divergence threshold
    RerouteRequested {
        position: GeoPoint,
        distance_off_route_m: f64,
    },
    Arrived { trip_id: TripId },
    FixError { error: FixError },
}

impl NavEvent {
    /// Text suitable for a voice prompt, if the event warrants one
    pub fn announcement(&self) -> Option<String> {
        match self {
            NavEvent::TripStarted {
                first_instruction,
                total_distance_m,
                ..
            } => Some(match first_instruction {
                Some(text) => format!("{}. {} to go", text, format::format_distance(*total_distance_m)),
                None => format!("Route started. {} to go", format::format_distance(*total_distance_m)),
            }),
            NavEvent::UpcomingManeuver {
                distance_m,
                instruction,
                ..
            } => Some(format::upcoming_text(*distance_m, instruction)),
            NavEvent::CurrentManeuver { instruction, .. } => Some(instruction.clone()),
            NavEvent::Proximity(p) => Some(match p.kind {
                ProximityKind::Zone => format!(
                    "Restricted zone {} in {}",
                    p.label,
                    format::format_distance(p.distance_m)
                ),
                ProximityKind::Hazard => format!("{} in {}", p.label, format::format_distance(p.distance_m)),
                ProximityKind::Poi => format!("{} nearby", p.label),
            }),
            NavEvent::RerouteRequested { .. } => Some("Recalculating route".into()),
            NavEvent::Arrived { .. } => Some("You have arrived".into()),
            NavEvent::FixError { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hazard_announcement() {
        let event = NavEvent::Proximity(ProximityEvent {
            kind: ProximityKind::Hazard,
            subject_id: "A1-018".into(),
            label: "Speed camera A-1 km 18 (120 km/h)".into(),
            distance_m: 283.0,
        });
        assert_eq!(
            event.announcement().unwrap(),
            "Speed camera A-1 km 18 (120 km/h) in 280 m"
        );
    }

    #[test]
    fn test_fix_error_is_silent() {
        assert!(NavEvent::FixError {
            error: FixError::PermissionDenied
        }
        .announcement()
        .is_none());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(NavEvent::CurrentManeuver {
            step_index: 2,
            instruction: "Turn left".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "current_maneuver");
        assert_eq!(json["step_index"], 2);
    }
}
