//! Zone Nav - command line entry point
//!
//! Loads zone data and configuration, then runs one of the engine operations:
//! route validation, safe-point lookup, zone-aware planning through the
//! Mapbox directions API, a simulated drive through the tracker, or a
//! proximity check.

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use zone_nav::core::calendar::{Clock, FixedClock, SystemClock};
use zone_nav::core::config::NavConfig;
use zone_nav::core::error::{NavError, Result};
use zone_nav::core::types::{GeoPoint, VehicleClass, ZoneId};
use zone_nav::navigation::simulate::{steps_from_geometry, SimulatedDrive};
use zone_nav::navigation::{
    format, CameraCatalogue, NavEvent, NavigationSession, NavigationTracker, TripPlan,
};
use zone_nav::routing::{
    MapboxDirections, PlanOutcome, RouteGeometry, RouteValidator, SafePointResolver,
    VehicleProfile, ZoneAwarePlanner,
};
use zone_nav::zones::{ZoneProximityMonitor, ZoneRegistry};

/// Zone-aware routing engine
#[derive(Parser, Debug)]
#[command(name = "zone-nav")]
#[command(about = "Validate and plan routes around restricted circulation zones")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Zone data file (.toml, .json or .geojson)
    #[arg(long, global = true, default_value = "data/zones.toml")]
    zones: PathBuf,

    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate zone activity on this date (YYYY-MM-DD) instead of today
    #[arg(long, global = true)]
    date: Option<String>,

    /// Vehicle class tag (e.g. CERO, ECO, C, B, SIN)
    #[arg(long, global = true, default_value = "SIN")]
    class: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a route polyline against the zones
    Validate {
        /// JSON file: [[lon, lat], ...] or a GeoJSON LineString
        route: PathBuf,

        /// Zone ids to ignore
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Find a safe substitute endpoint for a point inside a zone
    SafePoint {
        /// Point as lon,lat
        #[arg(allow_hyphen_values = true, value_parser = parse_point)]
        point: GeoPoint,
    },

    /// Plan a zone-aware route (needs MAPBOX_TOKEN)
    Plan {
        /// Origin as lon,lat
        #[arg(allow_hyphen_values = true, value_parser = parse_point)]
        from: GeoPoint,

        /// Destination as lon,lat
        #[arg(allow_hyphen_values = true, value_parser = parse_point)]
        to: GeoPoint,

        /// Energy profile for the cost estimate: petrol, diesel, electric, hybrid
        #[arg(long, default_value = "petrol")]
        profile: String,
    },

    /// Drive a route through the tracker with simulated GPS
    Replay {
        /// JSON file: [[lon, lat], ...] or a GeoJSON LineString
        route: PathBuf,

        /// Speed camera catalogue (TOML)
        #[arg(long)]
        cameras: Option<PathBuf>,

        /// Simulated speed in km/h
        #[arg(long, default_value_t = 40.0)]
        speed_kmh: f64,

        /// Random seed for GPS jitter
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Delay between fixes in milliseconds (0 = as fast as possible)
        #[arg(long, default_value_t = 0)]
        pace_ms: u64,
    },

    /// List zones forbidding the class near a position
    Nearby {
        /// Position as lon,lat
        #[arg(allow_hyphen_values = true, value_parser = parse_point)]
        point: GeoPoint,

        /// Search radius in kilometers (config default when omitted)
        #[arg(long)]
        radius_km: Option<f64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("zone_nav=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let common = &cli.common;

    let config = match &common.config {
        Some(path) => NavConfig::load(path)?,
        None => NavConfig::new(),
    };
    let registry = ZoneRegistry::load(&common.zones)?;
    let clock: Arc<dyn Clock> = match &common.date {
        Some(date) => Arc::new(parse_date(date)?),
        None => Arc::new(SystemClock),
    };
    let class = VehicleClass::new(common.class.clone());
    tracing::info!(
        "Loaded {} zones; class {} on {}",
        registry.len(),
        class,
        clock.today()
    );

    match cli.command {
        Command::Validate { route, exclude } => {
            let route = load_route(&route)?;
            let exclude: Vec<ZoneId> = exclude.into_iter().map(ZoneId).collect();
            let result = RouteValidator::new(registry).validate(&route, &class, &exclude, clock.today());
            if common.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.valid {
                println!("Route is clear ({})", format::format_distance(route.total_length_m()));
            } else {
                println!("Route enters {} restricted zone(s):", result.violation_count());
                for v in &result.violated_zones {
                    println!("  {} - {}", v.zone_id, v.name);
                }
            }
        }

        Command::SafePoint { point } => {
            let resolver = SafePointResolver::new(registry, config.safe_point.clone());
            let safe = resolver.resolve(point, &class, clock.today());
            if common.json {
                println!("{}", serde_json::to_string_pretty(&safe)?);
            } else {
                match safe {
                    Some(sp) => println!(
                        "Inside {}; safe point {:.6},{:.6} ({} away)",
                        sp.zone_name,
                        sp.coordinates.lon,
                        sp.coordinates.lat,
                        format::format_distance(sp.distance_m)
                    ),
                    None => println!("Point is not inside any zone restricting {}", class),
                }
            }
        }

        Command::Plan { from, to, profile } => {
            let profile: VehicleProfile = profile.parse()?;
            let provider = MapboxDirections::from_env()?;
            let planner = ZoneAwarePlanner::new(provider, registry, &config, clock);

            let rt = Runtime::new()?;
            let outcome = rt.block_on(planner.plan(from, to, &class))?;
            print_outcome(&outcome, &profile, common.json)?;
        }

        Command::Replay {
            route,
            cameras,
            speed_kmh,
            seed,
            pace_ms,
        } => {
            let route = load_route(&route)?;
            let hazards = match cameras {
                Some(path) => CameraCatalogue::load(&path)?.tracked_along(&route, config.tracker.hazard_radius_m),
                None => Vec::new(),
            };
            let plan = TripPlan::new(route.clone(), steps_from_geometry(&route))
                .with_class(class.clone())
                .with_tracked_points(hazards);
            let drive = SimulatedDrive {
                speed_mps: speed_kmh / 3.6,
                seed,
                ..SimulatedDrive::default()
            };
            let tracker = NavigationTracker::new(config.tracker.clone(), registry, clock);

            let rt = Runtime::new()?;
            rt.block_on(replay(tracker, plan, route, drive, pace_ms, common.json))?;
        }

        Command::Nearby { point, radius_km } => {
            let radius = radius_km.unwrap_or(config.proximity.radius_km);
            let mut monitor = ZoneProximityMonitor::new(registry, class.clone(), radius);
            let report = monitor.check(point, clock.today());
            if common.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.nearby.is_empty() {
                println!("No zones restricting {} within {} km", class, radius);
            } else {
                for zone in &report.nearby {
                    if zone.is_inside() {
                        println!("  {} - inside", zone.name);
                    } else {
                        println!("  {} - {:.1} km", zone.name, zone.distance_km);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn replay(
    tracker: NavigationTracker,
    plan: TripPlan,
    route: RouteGeometry,
    drive: SimulatedDrive,
    pace_ms: u64,
    json: bool,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(32);
    let (session, mut events) = NavigationSession::start(tracker, plan, rx);
    let pace = (pace_ms > 0).then(|| Duration::from_millis(pace_ms));

    let feeder = tokio::spawn(async move { drive.feed(&route, tx, pace).await });
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Could not serialize event: {}", e),
                }
            } else if let Some(text) = event.announcement() {
                println!("{}", text);
            }
            if matches!(event, NavEvent::Arrived { .. }) {
                break;
            }
        }
    });

    feeder
        .await
        .map_err(|e| NavError::InvalidInput(format!("position feed failed: {}", e)))?;
    session.join().await;
    let _ = printer.await;
    Ok(())
}

fn print_outcome(outcome: &PlanOutcome, profile: &VehicleProfile, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let route = outcome.route();
    match outcome {
        PlanOutcome::Accepted(accepted) => {
            println!(
                "Route accepted ({:?}, {} waypoint(s))",
                accepted.source,
                accepted.waypoints.len()
            );
        }
        PlanOutcome::Degraded {
            residual_violations,
            ..
        } => {
            println!(
                "Degraded route via safe points; still inside {} zone(s) at the endpoints",
                residual_violations.len()
            );
        }
    }
    println!(
        "{} · {}",
        format::format_distance(route.distance_m()),
        format::format_duration(route.duration_s())
    );
    if let Some(cost) = profile.estimate(route.distance_m()) {
        println!("Estimated cost ({}): {}", profile.label, cost);
    }
    for step in route.steps() {
        println!("  {} ({})", step.instruction, format::format_distance(step.distance_m));
    }
    Ok(())
}

fn parse_point(s: &str) -> std::result::Result<GeoPoint, String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat, got {:?}", s))?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {}", e))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {}", e))?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_date(s: &str) -> Result<FixedClock> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(FixedClock)
        .map_err(|e| NavError::InvalidInput(format!("bad date {:?}: {}", s, e)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RouteFile {
    Coordinates(Vec<[f64; 2]>),
    LineString { coordinates: Vec<[f64; 2]> },
}

fn load_route(path: &Path) -> Result<RouteGeometry> {
    let content = std::fs::read_to_string(path)?;
    let coordinates = match serde_json::from_str::<RouteFile>(&content)? {
        RouteFile::Coordinates(c) => c,
        RouteFile::LineString { coordinates } => coordinates,
    };
    RouteGeometry::from_lon_lat(&coordinates)
}
