//! Relay server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p encore-relay
//! ```
//!
//! Configuration is loaded from environment variables.

use encore_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Relay failed to start");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Load configuration before tracing so the log format can follow it
    let config = AppConfig::from_env()?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_app(&config.app)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        address = %config.relay.address(),
        "Configuration loaded"
    );

    encore_relay::run(config).await?;

    Ok(())
}
