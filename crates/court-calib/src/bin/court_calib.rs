//! court-calib CLI: calibrate from traced court lines and project points.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use court_calib::core::{init_from_env, ImagePoint, WorldPoint};
use court_calib::io::{CalibrationConfig, CalibrationReport};
use court_calib::transform::{image_to_world_with_inverse, world_to_image};
use serde::Serialize;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "court-calib")]
#[command(about = "Calibrate a fixed camera against court lines and map points between image and court")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the homography for a JSON calibration config and write a report.
    Calibrate(CalibrateArgs),

    /// Map a point through a calibration report.
    Project(ProjectArgs),
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Path to the JSON calibration config.
    #[arg(long)]
    config: PathBuf,

    /// Report path. Overrides `output_path` from the config.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Exit with an error when the calibration should be redone.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Args)]
struct ProjectArgs {
    /// Path to a report written by `calibrate`.
    #[arg(long)]
    report: PathBuf,

    /// Image x in pixels, or court x in meters with `--world`.
    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    /// Image y in pixels, or court y in meters with `--world`.
    #[arg(long, allow_negative_numbers = true)]
    y: f64,

    /// Height above the court in meters. Estimated from the camera prior
    /// when omitted.
    #[arg(long)]
    z: Option<f64>,

    /// Treat the input as a court point and print its image position.
    #[arg(long)]
    world: bool,
}

#[derive(Serialize)]
struct CalibrateSummary<'a> {
    report: &'a PathBuf,
    overall_score: f64,
    reprojection_error_px: f64,
    confidence: f64,
    needs_recalibration: bool,
}

fn main() {
    let _ = init_from_env(log::LevelFilter::Warn);
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Project(args) => run_project(&args),
    }
}

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    let config = CalibrationConfig::load_json(&args.config)?;
    let correspondences = config.correspondences()?;
    let mut session = config.build_session();
    session.calibrate(&correspondences, config.camera)?;

    let report = CalibrationReport::from_session(&session).ok_or("calibration produced no report")?;
    let out = args.out.clone().unwrap_or_else(|| config.output_path());
    report.write_json(&out)?;

    let summary = CalibrateSummary {
        report: &out,
        overall_score: report.validation.overall_score,
        reprojection_error_px: report.parameters.reprojection_error_px,
        confidence: report.parameters.confidence,
        needs_recalibration: report.needs_recalibration,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.strict && report.needs_recalibration {
        return Err(format!(
            "calibration needs to be redone (score {:.2})",
            report.validation.overall_score
        )
        .into());
    }
    Ok(())
}

fn run_project(args: &ProjectArgs) -> CliResult<()> {
    let report = CalibrationReport::load_json(&args.report)?;
    let h = report.parameters.homography;

    if args.world {
        let p = WorldPoint::new(args.x, args.y, args.z.unwrap_or(0.0));
        let img = world_to_image(&p, &h).ok_or("point maps to infinity")?;
        println!("{}", serde_json::to_string(&img)?);
        return Ok(());
    }

    let inverse = h.inverse().ok_or("homography in report is singular")?;
    let world = image_to_world_with_inverse(
        ImagePoint::new(args.x, args.y),
        &inverse.h,
        args.z,
        report.parameters.camera.as_ref(),
        &report.transform,
    )
    .ok_or("point maps to infinity")?;
    println!("{}", serde_json::to_string(&world)?);
    Ok(())
}
