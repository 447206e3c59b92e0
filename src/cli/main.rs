use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

use exif_scramble::{config, exif, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "exif-scramble",
    version,
    about = "Re-encode images as JPEG with a random camera identity and GPS position in EXIF"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Output directory (default: output.output_dir from the config)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Path to config file (default: exif-scramble.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default exif-scramble.json and exit
    #[arg(long)]
    init: bool,

    /// Seed the random generator for reproducible output
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display the camera and GPS metadata of each image and exit
    #[arg(long = "show-exif")]
    show_exif: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    // Handle --show-exif
    if cli.show_exif {
        let images = pipeline::collect_images(&cli.paths, &config.filter);
        if images.is_empty() {
            anyhow::bail!("No supported image files found in the specified paths.");
        }
        for image_path in &images {
            print_exif(image_path)?;
        }
        return Ok(());
    }

    let output_dir = cli.output.clone().unwrap_or_else(|| config.output.output_dir.clone());
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // A single file is scrambled directly and its error fails the run.
    if let [single] = cli.paths.as_slice() {
        if single.is_file() {
            let file_name = single.file_name().context("Input path has no file name")?;
            let output = output_dir.join(file_name);
            let outcome = pipeline::scramble_image(single, &output, &mut rng, &config)
                .with_context(|| format!("Failed to scramble {}", single.display()))?;

            log::info!(
                "Wrote {} ({} {}, {:.6}, {:.6})",
                outcome.output.display(),
                outcome.identity.make,
                outcome.identity.model,
                outcome.coordinate.latitude,
                outcome.coordinate.longitude
            );
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            return Ok(());
        }
    }

    let images = pipeline::collect_images(&cli.paths, &config.filter);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s) to process", images.len());

    let report = pipeline::process_batch(&images, &output_dir, &mut rng, &config);

    if cli.json {
        let json_results: Vec<serde_json::Value> = report
            .results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "status": r.status,
                    "output": r.outcome.as_ref().map(|o| o.output.display().to_string()),
                    "make": r.outcome.as_ref().map(|o| o.identity.make.as_str()),
                    "model": r.outcome.as_ref().map(|o| o.identity.model.as_str()),
                    "latitude": r.outcome.as_ref().map(|o| o.coordinate.latitude),
                    "longitude": r.outcome.as_ref().map(|o| o.coordinate.longitude),
                    "error": r.failure,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the identity and GPS metadata of a file.
fn print_exif(path: &Path) -> Result<()> {
    let data = exif::read_exif(path)?;

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let camera_fields = [
        ("Make", data.make.as_deref()),
        ("Model", data.model.as_deref()),
        ("Software", data.software.as_deref()),
    ];
    if camera_fields.iter().any(|(_, v)| v.is_some()) {
        println!("  {BOLD}Camera / Device{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (tag, val) in &camera_fields {
            if let Some(v) = val {
                print_row(tag, v);
            }
        }
        println!();
    }

    if data.has_gps {
        println!("  {BOLD}GPS{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        if let (Some(lat), Some(r)) = (data.gps_latitude, data.gps_latitude_ref) {
            print_row("GPSLatitude", &format!("{lat:.6} ({r})"));
        }
        if let (Some(lon), Some(r)) = (data.gps_longitude, data.gps_longitude_ref) {
            print_row("GPSLongitude", &format!("{lon:.6} ({r})"));
        }
        println!();
    }

    if !data.has_gps && camera_fields.iter().all(|(_, v)| v.is_none()) {
        println!("  {DIM}(no EXIF metadata found){RESET}");
        println!();
    }

    Ok(())
}

/// Print a single row in the EXIF display table.
fn print_row(tag: &str, val: &str) {
    println!("  {:<22} : {val}", tag);
}
