use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use labstat::cli::{self, Cli};
use labstat::config::Config;
use labstat::engine::Engine;
use labstat::response::ErrorResponse;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    labstat::observability::init_tracing();
    let args = Cli::parse();

    let config = Config::from_env();
    labstat::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let engine = Engine::new(config.wal_path())?;
    info!(
        data_dir = %config.data_dir.display(),
        replayed = engine.replayed_events(),
        "engine opened"
    );
    if engine.replayed_events() as u64 > config.compact_threshold {
        engine.compact_wal().await?;
    }

    let render = |value: &serde_json::Value| {
        if args.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    };

    match cli::execute(&engine, args.command).await {
        Ok(value) => {
            println!("{}", render(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{e}");
            let body = serde_json::to_value(ErrorResponse::from(&e))?;
            println!("{}", render(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
