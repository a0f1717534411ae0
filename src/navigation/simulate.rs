//! Simulated position source
//!
//! Drives along a route at a constant speed, emitting fixes with seeded GPS
//! jitter. The same seed always produces the same drive.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::mpsc;

use super::session::FixResult;
use super::state::PositionFix;
use crate::core::types::GeoPoint;
use crate::geometry;
use crate::routing::{ManeuverKind, RouteGeometry, RouteStep, TurnDirection};

#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    pub speed_mps: f64,
    /// Time between fixes (seconds)
    pub interval_s: f64,
    /// Maximum horizontal error per fix (meters)
    pub jitter_m: f64,
    pub seed: u64,
    pub start_ms: u64,
}

impl Default for SimulatedDrive {
    fn default() -> Self {
        Self {
            speed_mps: 12.0,
            interval_s: 1.0,
            jitter_m: 5.0,
            seed: 42,
            start_ms: 0,
        }
    }
}

impl SimulatedDrive {
    /// All fixes from the first vertex to the last, inclusive
    pub fn fixes(&self, route: &RouteGeometry) -> Vec<PositionFix> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let total = route.total_length_m();
        let step_m = (self.speed_mps * self.interval_s).max(1.0);
        let count = (total / step_m).ceil() as usize;

        (0..=count)
            .filter_map(|i| {
                let along = (i as f64 * step_m).min(total);
                let on_route = geometry::point_along_line(route.points(), along)?;
                let ahead = geometry::point_along_line(route.points(), (along + 1.0).min(total))?;
                let heading = if ahead == on_route {
                    None
                } else {
                    Some(geometry::bearing(on_route, ahead))
                };

                let position = if self.jitter_m > 0.0 {
                    let offset = rng.gen_range(0.0..self.jitter_m);
                    let direction = rng.gen_range(0.0..360.0);
                    geometry::destination(on_route, offset, direction)
                } else {
                    on_route
                };
                let speed = (self.speed_mps + rng.gen_range(-0.5..0.5)).max(0.0);

                let mut fix = PositionFix::new(
                    position,
                    self.start_ms + (i as f64 * self.interval_s * 1000.0) as u64,
                )
                .with_speed(speed);
                fix.heading_deg = heading;
                Some(fix)
            })
            .collect()
    }

    /// Send the drive into a position channel, optionally paced in real time
    pub async fn feed(&self, route: &RouteGeometry, tx: mpsc::Sender<FixResult>, pace: Option<Duration>) {
        for fix in self.fixes(route) {
            if tx.send(Ok(fix)).await.is_err() {
                return;
            }
            if let Some(delay) = pace {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Turn classification by bearing change (degrees, positive is right)
pub fn classify_turn(delta_deg: f64) -> TurnDirection {
    let magnitude = delta_deg.abs();
    let right = delta_deg > 0.0;
    if magnitude > 170.0 {
        TurnDirection::UTurn
    } else if magnitude > 120.0 {
        if right {
            TurnDirection::SharpRight
        } else {
            TurnDirection::SharpLeft
        }
    } else if magnitude > 60.0 {
        if right {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        }
    } else if magnitude > 20.0 {
        if right {
            TurnDirection::SlightRight
        } else {
            TurnDirection::SlightLeft
        }
    } else {
        TurnDirection::Straight
    }
}

/// Derive turn-by-turn steps from bare geometry
///
/// A new step starts at every vertex where the heading changes by more than
/// 20 degrees. The list starts with a depart step and ends with an arrive step.
pub fn steps_from_geometry(route: &RouteGeometry) -> Vec<RouteStep> {
    let points = route.points();
    let cumulative = route.cumulative_m();

    let mut breaks = vec![0usize];
    let mut maneuvers = vec![ManeuverKind::Depart];
    for i in 1..points.len() - 1 {
        let before = geometry::bearing(points[i - 1], points[i]);
        let after = geometry::bearing(points[i], points[i + 1]);
        let direction = classify_turn(geometry::bearing_delta(before, after));
        if direction != TurnDirection::Straight {
            breaks.push(i);
            maneuvers.push(ManeuverKind::Turn { direction });
        }
    }
    let last = points.len() - 1;
    breaks.push(last);

    let mut steps: Vec<RouteStep> = breaks
        .windows(2)
        .zip(maneuvers)
        .map(|(w, maneuver)| {
            let distance_m = cumulative[w[1]] - cumulative[w[0]];
            RouteStep {
                start_point: points[w[0]],
                end_point: points[w[1]],
                distance_m,
                duration_s: 0.0,
                maneuver,
                instruction: super::format::maneuver_text(maneuver),
            }
        })
        .collect();

    let end: GeoPoint = points[last];
    steps.push(RouteStep {
        start_point: end,
        end_point: end,
        distance_m: 0.0,
        duration_s: 0.0,
        maneuver: ManeuverKind::Arrive,
        instruction: super::format::maneuver_text(ManeuverKind::Arrive),
    });
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> RouteGeometry {
        RouteGeometry::from_lon_lat(&[[0.0, 0.0], [0.01, 0.0], [0.01, 0.01]]).unwrap()
    }

    #[test]
    fn test_same_seed_same_drive() {
        let drive = SimulatedDrive::default();
        assert_eq!(drive.fixes(&route()), drive.fixes(&route()));

        let other = SimulatedDrive {
            seed: 7,
            ..SimulatedDrive::default()
        };
        assert_ne!(drive.fixes(&route()), other.fixes(&route()));
    }

    #[test]
    fn test_drive_covers_route_with_bounded_jitter() {
        let drive = SimulatedDrive::default();
        let r = route();
        let fixes = drive.fixes(&r);

        let last = fixes.last().unwrap();
        assert!(geometry::haversine(last.position(), r.end()) <= drive.jitter_m + 0.01);
        for f in &fixes {
            assert!(r.snap(f.position()).distance_m <= drive.jitter_m + 0.5);
        }
        assert!(fixes.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }

    #[test]
    fn test_classify_turn() {
        assert_eq!(classify_turn(5.0), TurnDirection::Straight);
        assert_eq!(classify_turn(90.0), TurnDirection::Right);
        assert_eq!(classify_turn(-90.0), TurnDirection::Left);
        assert_eq!(classify_turn(-175.0), TurnDirection::UTurn);
    }

    #[test]
    fn test_steps_from_geometry() {
        let steps = steps_from_geometry(&route());
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].maneuver, ManeuverKind::Depart);
        assert_eq!(
            steps[1].maneuver,
            ManeuverKind::Turn {
                direction: TurnDirection::Left
            }
        );
        assert_eq!(steps[2].maneuver, ManeuverKind::Arrive);
        assert_eq!(steps[1].start_point, steps[0].end_point);
    }
}
