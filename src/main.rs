//! ==============================================================================
//! main.rs - air node entry point
//! ==============================================================================
//!
//! purpose:
//!     brings the node up in a fixed order and then serves the status page.
//!
//! startup sequence:
//!     1. load configuration (config/node.toml or defaults)
//!     2. install the tracing subscriber
//!     3. wait for the network (bounded attempts, fatal on exhaustion)
//!     4. build the hardware handle once; it is passed down, never global
//!     5. bring up the display (best effort) and show status
//!     6. serve `GET /` until the process is stopped
//!
//!     ┌────────────┐   GET /   ┌──────────────┐
//!     │  browser   │ ────────> │ orchestrator │──> sensors (hal)
//!     └────────────┘ <──────── │  (one pass)  │──> collector (reqwest)
//!                      html    └──────────────┘──> template (disk)
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use air_node::config::NodeConfig;
use air_node::display::{DisplayPresenter, STARTUP_LINES};
use air_node::hal::{Hal, HardwareProvider};
use air_node::network;
use air_node::orchestrator::RequestOrchestrator;
use air_node::server;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration. the configured log level is not known
    // yet, so the loader logs through a temporary default subscriber.
    let config = tracing::subscriber::with_default(
        tracing_subscriber::fmt().finish(),
        NodeConfig::load_or_default,
    );

    // step 2: logging
    init_tracing(&config.logging.level);
    tracing::info!("===========================================================");
    tracing::info!("  Air Node v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("===========================================================");
    config.log_summary();

    // step 3: network
    if let Err(e) = network::wait_for_network(&config.network).await {
        tracing::error!("[STARTUP] Exiting: {}", e);
        return Err(e.into());
    }

    // step 4: hardware handle
    let hw: Arc<dyn HardwareProvider> = Arc::new(Hal::new(config.sensors.adc_i2c_address));

    // step 5: display
    let display = DisplayPresenter::init(hw.clone(), &config.display)
        .inspect_err(|e| tracing::error!("[STARTUP] Exiting: {}", e))?;

    let orchestrator = RequestOrchestrator::from_config(hw, &config)
        .context("failed to build request pipeline")?;

    display.show_status(&STARTUP_LINES);
    tracing::info!("[STARTUP] ✓ Node ready");

    // step 6: serve
    server::serve(&config.server, Arc::new(orchestrator)).await
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            format!("{app_name}={level},tower_http={level}").into()
        }))
        .init();
}
