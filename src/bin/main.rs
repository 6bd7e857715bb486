//! dnstemple binary entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dnstemple::{telemetry, Config, Pipeline};
use tracing::debug;

/// Simple yet powerful DNS TEMPlating Engine.
#[derive(Parser, Debug)]
#[command(name = "dnstemple")]
#[command(version, about, long_about = None)]
struct Args {
    /// The configuration file to use (YAML).
    #[arg(short, long, default_value = "dnstemple.yaml")]
    config: PathBuf,

    /// Template files; `<domain><extensions.in>` becomes `<domain><extensions.out>`.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&args.config)?;

    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    debug!(
        config_file = %args.config.display(),
        files = args.files.len(),
        "Starting dnstemple"
    );

    let outcome = Pipeline::new(&config).run(&args.files).await?;

    if let Some(catalog) = &outcome.catalog {
        println!("{catalog}");
    }
    for domain in &outcome.modified {
        println!("{domain}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dnstemple: {e}");
            ExitCode::FAILURE
        }
    }
}
