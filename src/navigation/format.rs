//! Human-readable distances, durations, speeds and maneuvers

use crate::routing::{ManeuverKind, TurnDirection};

/// `850 m` below a kilometre (rounded to 10 m), `1.2 km` above
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters.max(0.0) / 10.0).round() as i64 * 10)
    }
}

/// `1 h 5 min`, `12 min`, or `< 1 min`
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as i64;
    if minutes < 1 {
        "< 1 min".to_string()
    } else if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{} h {} min", minutes / 60, minutes % 60)
    }
}

pub fn format_speed(mps: f64) -> String {
    format!("{:.0} km/h", mps * 3.6)
}

fn direction_text(direction: TurnDirection) -> &'static str {
    match direction {
        TurnDirection::Straight => "straight",
        TurnDirection::SlightLeft => "slightly left",
        TurnDirection::Left => "left",
        TurnDirection::SharpLeft => "sharp left",
        TurnDirection::SlightRight => "slightly right",
        TurnDirection::Right => "right",
        TurnDirection::SharpRight => "sharp right",
        TurnDirection::UTurn => "around",
    }
}

/// Generic text for a maneuver, used when the routing service gave none
pub fn maneuver_text(maneuver: ManeuverKind) -> String {
    match maneuver {
        ManeuverKind::Depart => "Start driving".into(),
        ManeuverKind::Arrive => "Arrive at your destination".into(),
        ManeuverKind::Continue => "Continue straight".into(),
        ManeuverKind::Merge => "Merge".into(),
        ManeuverKind::Turn {
            direction: TurnDirection::UTurn,
        } => "Make a U-turn".into(),
        ManeuverKind::Turn {
            direction: TurnDirection::Straight,
        } => "Continue straight".into(),
        ManeuverKind::Turn { direction } => format!("Turn {}", direction_text(direction)),
        ManeuverKind::Ramp { direction } => format!("Take the ramp {}", direction_text(direction)),
        ManeuverKind::Fork { direction } => format!("Keep {} at the fork", direction_text(direction)),
        ManeuverKind::Roundabout { exit: Some(n) } => format!("At the roundabout, take exit {}", n),
        ManeuverKind::Roundabout { exit: None } => "Enter the roundabout".into(),
        ManeuverKind::Other => "Continue".into(),
    }
}

/// `In 150 m, turn left`
pub fn upcoming_text(distance_m: f64, instruction: &str) -> String {
    let mut chars = instruction.chars();
    let lowered = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("In {}, {}", format_distance(distance_m), lowered)
}
