//! Fusion Gateway - high-performance AI API aggregation gateway

use clap::Parser;
use fusion_gateway::config::Config;
use fusion_gateway::server;
use fusion_gateway::utils::logging;
use std::process::ExitCode;

/// Command-line arguments for the gateway binary
#[derive(Debug, Parser)]
#[command(name = "gateway", version, about = "OpenAI-compatible AI API aggregation gateway")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "FUSION_CONFIG", default_value = "config/gateway.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; ignore a missing file
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.logging.level);

    match server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
