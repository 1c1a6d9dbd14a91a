#![cfg(not(tarpaulin_include))]

use excel_service::{ServiceConfig, app};

/// Main entry point for the Excel service
///
/// Reads `PORT` (default 8080) and `HOST` (default 0.0.0.0) from the environment
/// and serves until interrupted. Log output is controlled with `RUST_LOG`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::from_env()?;
    if let Err(e) = app::run(config).await {
        log::error!("Failed to start service: {e}");
        return Err(e);
    }
    Ok(())
}
