//! Convert a NetCDF (or Zarr) dataset to a CoverageJSON file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use edr_providers::convert::{netcdf_to_coveragejson, Profile, SourceAxes, DEFAULT_X_VAL, DEFAULT_Y_VAL};

/// Convert NetCDF to CoverageJSON.
#[derive(Parser, Debug)]
#[command(name = "covjson-convert")]
struct Args {
    /// Input NetCDF file (or Zarr directory)
    netcdf_file: String,

    /// Output CoverageJSON file
    output_file: PathBuf,

    /// x variable in the source file
    x: String,

    /// y variable in the source file
    y: String,

    /// t variable in the source file
    t: String,

    /// Source file profile: timeSeries|grid
    #[arg(value_parser = parse_profile)]
    sprofile: Profile,

    /// x position of a single time series
    #[arg(long, default_value_t = DEFAULT_X_VAL)]
    x_val: f64,

    /// y position of a single time series
    #[arg(long, default_value_t = DEFAULT_Y_VAL)]
    y_val: f64,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

fn parse_profile(s: &str) -> std::result::Result<Profile, String> {
    s.parse().map_err(|e: edr_providers::ProviderError| e.to_string())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    let data = grid_dataset::open_dataset(&args.netcdf_file)
        .with_context(|| format!("Failed to open {}", args.netcdf_file))?;

    let axes = SourceAxes {
        x: args.x.clone(),
        y: args.y.clone(),
        t: args.t.clone(),
    };
    let document = netcdf_to_coveragejson(&data, &axes, args.sprofile, args.x_val, args.y_val)
        .with_context(|| format!("Failed to convert {}", args.netcdf_file))?;

    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(&args.output_file, json)
        .with_context(|| format!("Failed to write {:?}", args.output_file))?;

    info!("Converted {} to {}", args.netcdf_file, args.output_file.display());
    Ok(())
}
