use std::error::Error;
use std::path::PathBuf;

use bevy_ecs::prelude::World;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use ride_core::clock::{SimulationClock, ONE_SEC_MS};
use ride_core::ecs::RideStatus;
use ride_core::geo::Coordinate;
use ride_core::map::{handle_map_click, LocationSelection, MapClick};
use ride_core::profiling::EventMetrics;
use ride_core::runner::{initialize_simulation, run_next_event, simulation_schedule};
use ride_core::scenario::{build_scenario, install_services, ScenarioParams, ServiceConfig};
use ride_core::session::{cancel_ride, has_open_ride, request_ride, ride_status};
use ride_core::telemetry::{RideTelemetry, SimSnapshots};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ride_cli",
    about = "Headless ride lifecycle simulator",
    long_about = "Builds a mock driver fleet, requests one ride between two map taps\n\
                  and advances the simulation clock until the ride settles."
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one ride and print the outcome
    Run(RunArgs),
    /// Print the default scenario configuration as JSON
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Scenario JSON file; unset keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Number of mock drivers
    #[arg(long)]
    drivers: Option<usize>,
    /// Pickup as "lat,lng"
    #[arg(long, allow_hyphen_values = true, value_parser = parse_coordinate, default_value = "-9.44,147.18")]
    pickup: Coordinate,
    /// Dropoff as "lat,lng"
    #[arg(long, allow_hyphen_values = true, value_parser = parse_coordinate, default_value = "-9.45,147.19")]
    dropoff: Coordinate,
    /// Fraction of the remaining distance a driver covers per second. The
    /// scenario default of 0.0004 needs several simulated hours per ride;
    /// pass 0.01 or more to finish within --max-sim-secs.
    #[arg(long)]
    drift_step: Option<f64>,
    /// Stop after this much simulated time. With the default drift step a
    /// ride is usually still open at 3600 s; raise --drift-step or this.
    #[arg(long, default_value_t = 3600)]
    max_sim_secs: u64,
    /// Cancel the ride this many simulated seconds after the request
    #[arg(long)]
    cancel_after_secs: Option<u64>,
    #[command(flatten)]
    services: ServiceArgs,
}

#[derive(Args)]
struct ServiceArgs {
    /// OpenRouteService base URL
    #[arg(long, env = "ORS_API_URL")]
    ors_url: Option<String>,
    #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
    ors_api_key: Option<String>,
    /// Nominatim base URL
    #[arg(long, env = "NOMINATIM_URL")]
    nominatim_url: Option<String>,
}

impl ServiceArgs {
    fn to_config(&self) -> ServiceConfig {
        ServiceConfig {
            ors_endpoint: self.ors_url.clone(),
            ors_api_key: self.ors_api_key.clone(),
            nominatim_endpoint: self.nominatim_url.clone(),
            ..Default::default()
        }
    }
}

fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got {raw:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    Coordinate::new(lat, lng)
        .validate()
        .map_err(|e| e.to_string())
}

// ── Commands ───────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    env_logger::builder()
        .filter_level(cli.log_level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&ScenarioParams::default())?);
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut params = match &args.config {
        Some(path) => ScenarioParams::from_json_file(path)?,
        None => ScenarioParams::default(),
    };
    if let Some(seed) = args.seed {
        params = params.with_seed(seed);
    }
    if let Some(drivers) = args.drivers {
        params = params.with_drivers(drivers);
    }
    if let Some(step) = args.drift_step {
        params = params.with_drift_step(step);
    }

    let mut world = World::new();
    build_scenario(&mut world, params);
    install_services(&mut world, &args.services.to_config());
    initialize_simulation(&mut world);

    for point in [args.pickup, args.dropoff] {
        handle_map_click(
            &mut world,
            MapClick {
                lat: point.lat,
                lng: point.lng,
            },
        )?;
    }
    print_selection(&world);

    let ride_id = request_ride(&mut world)?;
    let requested_at = world.resource::<SimulationClock>().now();
    let deadline = requested_at + args.max_sim_secs * ONE_SEC_MS;
    let cancel_at = args
        .cancel_after_secs
        .map(|secs| requested_at + secs * ONE_SEC_MS);

    let mut schedule = simulation_schedule();
    let mut steps = 0u64;
    loop {
        let now = world.resource::<SimulationClock>().now();
        if !has_open_ride(&world) || now >= deadline {
            break;
        }
        if cancel_at.is_some_and(|at| now >= at) {
            cancel_ride(&mut world)?;
            break;
        }
        if !run_next_event(&mut world, &mut schedule) {
            break;
        }
        steps += 1;
    }

    let now = world.resource::<SimulationClock>().now();
    if has_open_ride(&world) && now >= deadline {
        log::warn!(
            "ride still open after {} simulated seconds; try a larger --drift-step",
            args.max_sim_secs
        );
    }
    let outcome = match ride_status(&world) {
        Some(status) => status.to_string(),
        None => RideStatus::Cancelled.to_string(),
    };
    println!("\n=== Ride {ride_id} ===");
    println!("Outcome: {outcome}");
    println!("Steps executed: {steps}");
    println!("Simulation time: {} s", now / ONE_SEC_MS);

    print_telemetry(&world);
    world.resource::<EventMetrics>().print_summary();
    Ok(())
}

fn print_selection(world: &World) {
    let selection = world.resource::<LocationSelection>();
    println!(
        "Pickup:  {}",
        selection.pickup_label.as_deref().unwrap_or("-")
    );
    println!(
        "Dropoff: {}",
        selection.dropoff_label.as_deref().unwrap_or("-")
    );
    if let Some(route) = &selection.route_preview {
        println!(
            "Route:   {:.0} m, about {:.0} min ({} points)",
            route.distance_m,
            route.duration_secs / 60.0,
            route.waypoints.len()
        );
    }
}

fn print_telemetry(world: &World) {
    let telemetry = world.resource::<RideTelemetry>();
    println!("\n=== Telemetry ===");
    println!(
        "Match attempts: {} ({} retries)",
        telemetry.match_attempts, telemetry.match_retries
    );
    for r in &telemetry.completed_rides {
        println!(
            "Completed {} by {}: match {} s, pickup {} s, trip {} s",
            r.ride_id,
            r.driver_id,
            r.time_to_match() / ONE_SEC_MS,
            r.time_to_pickup() / ONE_SEC_MS,
            r.trip_duration() / ONE_SEC_MS,
        );
    }
    for r in &telemetry.cancelled_rides {
        let driver = r
            .driver_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "no driver".to_string());
        println!(
            "Cancelled {} while {} ({driver}) at {} s",
            r.ride_id,
            r.status_at_cancel,
            r.cancelled_at / ONE_SEC_MS
        );
    }
    println!(
        "Snapshots captured: {}",
        world.resource::<SimSnapshots>().snapshots.len()
    );
}
