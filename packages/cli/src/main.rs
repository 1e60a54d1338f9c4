#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the safe-route hazard service.
//!
//! Loads the layered configuration, builds a [`HazardService`], runs one
//! command, and prints its result as JSON on stdout. Logs go to stderr
//! through `pretty_env_logger` and are controlled by `RUST_LOG`.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use safe_route_fusion::Measurements;
use safe_route_geography_models::GeoPoint;
use safe_route_risk_models::{HazardReport, HazardSource};
use safe_route_service::{HazardService, RiskContext, SafeRouteConfig};
use serde::{Deserialize, Serialize};

/// Fuse hazard signals and compute safe routes.
#[derive(Parser)]
#[command(name = "safe_route")]
#[command(about = "Fuse hazard signals and compute safe routes")]
struct Cli {
    /// Config file. Defaults to `$SAFE_ROUTE_CONFIG`, then the built-in
    /// configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the composite risk at a point.
    Evaluate {
        /// Latitude.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Compare the standard and safe routes between two points.
    Route {
        /// Origin latitude.
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,

        /// Origin longitude.
        #[arg(long, allow_hyphen_values = true)]
        from_lng: f64,

        /// Destination latitude.
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,

        /// Destination longitude.
        #[arg(long, allow_hyphen_values = true)]
        to_lng: f64,

        /// Graph area (default: the configured area).
        #[arg(long)]
        area: Option<String>,

        /// JSON file with an array of `{"lat", "lng", "text"}` reports.
        #[arg(long)]
        reports: Option<PathBuf>,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Run a drill at a point and show the resulting risk.
    Drill {
        /// Scenario key (`FLASH_FLOOD` or `LANDSLIDE`).
        #[arg(long, default_value = "FLASH_FLOOD")]
        scenario: String,

        /// Latitude.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Poll the sensor feed once.
    Sensors,
}

/// Location context shared by `evaluate` and `route`.
#[derive(Args)]
struct ContextArgs {
    /// Rainfall in mm.
    #[arg(long)]
    rainfall_mm: Option<f64>,

    /// Terrain slope in degrees.
    #[arg(long)]
    slope_deg: Option<f64>,

    /// Soil moisture in percent.
    #[arg(long)]
    soil_moisture_pct: Option<f64>,

    /// River level in cm.
    #[arg(long)]
    river_level_cm: Option<f64>,

    /// Seismic magnitude.
    #[arg(long)]
    seismic: Option<f64>,

    /// Free-text hazard description to classify.
    #[arg(long)]
    text: Option<String>,
}

impl From<ContextArgs> for RiskContext {
    fn from(args: ContextArgs) -> Self {
        Self {
            measurements: Measurements {
                rainfall_mm: args.rainfall_mm,
                slope_deg: args.slope_deg,
                soil_moisture_pct: args.soil_moisture_pct,
                river_level_cm: args.river_level_cm,
                seismic: args.seismic,
            },
            features: None,
            text: args.text,
        }
    }
}

/// One entry of a `--reports` file.
#[derive(Deserialize)]
struct ReportInput {
    lat: f64,
    lng: f64,
    text: String,
}

fn load_reports(path: &Path) -> Result<Vec<HazardReport>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let inputs: Vec<ReportInput> = serde_json::from_str(&contents)?;
    let reports = inputs
        .into_iter()
        .map(|input| {
            let point = GeoPoint::new(input.lat, input.lng)?;
            Ok(HazardReport::text(point, input.text, HazardSource::Crowd))
        })
        .collect::<Result<Vec<_>, safe_route_geography_models::ValidationError>>()?;
    log::info!("Loaded {} reports from {}", reports.len(), path.display());
    Ok(reports)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = SafeRouteConfig::load(cli.config.as_deref())?;
    let service = HazardService::from_config(&config)?;

    match cli.command {
        Commands::Evaluate { lat, lng, context } => {
            let risk = service.evaluate(lat, lng, &context.into()).await?;
            print_json(&risk)?;
        }
        Commands::Route {
            from_lat,
            from_lng,
            to_lat,
            to_lng,
            area,
            reports,
            context,
        } => {
            let origin = GeoPoint::new(from_lat, from_lng)?;
            let destination = GeoPoint::new(to_lat, to_lng)?;
            let reports = match reports {
                Some(path) => load_reports(&path)?,
                None => Vec::new(),
            };
            let area = area.unwrap_or_else(|| service.default_area().to_string());
            let decision = service
                .compute_route_in(&area, &origin, &destination, &reports, &context.into())
                .await?;
            print_json(&decision)?;
        }
        Commands::Drill { scenario, lat, lng } => {
            let target = GeoPoint::new(lat, lng)?;
            let drill = service.start_drill(&scenario, target);
            log::info!("Drill {} started at {target}", drill.scenario);
            let proposal = service.propose(target, &RiskContext::default()).await;
            service.stop_drill();
            print_json(&serde_json::json!({
                "drill": drill,
                "proposal": proposal,
            }))?;
        }
        Commands::Sensors => {
            let snapshot = service.sensor_snapshot().await;
            print_json(&snapshot)?;
        }
    }

    Ok(())
}
