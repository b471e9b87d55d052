//! HeartRisk: heart disease risk assessment
//!
//! Main entry point for the terminal application.

use anyhow::Result;

use heartrisk::config::AppConfig;
use heartrisk::logging;
use heartrisk::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    let _guard = logging::init(&config)?;

    tracing::info!(schema = %config.schema, "Starting HeartRisk...");

    // Refuse to start if the model cannot be loaded, verified or bound.
    let mut app = App::from_config(&config)?;
    app.run()?;

    tracing::info!("HeartRisk shutdown complete.");
    Ok(())
}
