use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use exif_scramble::{config, upload};

#[derive(Parser, Debug)]
#[command(
    name = "exif-scramble-server",
    version,
    about = "Upload form that scrambles the EXIF metadata of submitted images"
)]
struct Cli {
    /// Path to config file (default: exif-scramble.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address (default: server.bind from the config)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let bind = config.server.bind.clone();
    log::info!(
        "Uploads staged in {}, processed into {}",
        config.server.upload_dir.display(),
        config.server.processed_dir.display()
    );
    let app = upload::create_router(config);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    log::info!("Listening on http://{bind}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
