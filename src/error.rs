//! ==============================================================================
//! error.rs - fault taxonomy for the node
//! ==============================================================================
//!
//! purpose:
//!     one typed enum for every failure the node can observe.
//!     per-request faults (hardware, network, asset) are always converted
//!     into degraded values by the component that sees them. only startup
//!     faults ever reach main and abort the process.
//!
//! ==============================================================================

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// sensor or bus failure; degrades to an invalid reading
    #[error("hardware fault on {device}: {message}")]
    Hardware { device: String, message: String },

    /// telemetry push failure; logged and dropped
    #[error("network fault: {0}")]
    Network(String),

    /// page template missing or unreadable; degrades to the fallback body
    #[error("failed to load template {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// network join or bus scan failure; the node does not start serving
    #[error("startup fault: {0}")]
    Startup(String),

    /// config file parsed but its values are unusable
    #[error("config error: {0}")]
    Config(String),
}

impl NodeError {
    pub fn hardware(device: impl Into<String>, message: impl ToString) -> Self {
        Self::Hardware {
            device: device.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
