//! ==============================================================================
//! network.rs - wait for the node to join the network
//! ==============================================================================
//!
//! purpose:
//!     the os owns wifi association and dhcp. the node only waits, with a
//!     bounded number of attempts one interval apart, until the kernel has
//!     a route out and a local address to use. running out of attempts is a
//!     startup fault.
//!
//! ==============================================================================

use std::net::{IpAddr, UdpSocket};
use std::time::Duration;

use crate::config::NetworkConfig;
use crate::error::NodeError;

/// local address the kernel would use to reach `probe_addr`.
/// connecting a udp socket only selects a route; nothing is sent.
pub fn local_address(probe_addr: &str) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(probe_addr)?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Err(std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no local address"));
    }
    Ok(ip)
}

pub async fn wait_for_network(config: &NetworkConfig) -> Result<IpAddr, NodeError> {
    let interval = Duration::from_secs(config.retry_interval_seconds);

    for attempt in 1..=config.max_attempts {
        match local_address(&config.probe_addr) {
            Ok(ip) => {
                tracing::info!("[NETWORK] Connected, IP address: {}", ip);
                return Ok(ip);
            }
            Err(e) => {
                tracing::info!(
                    "[NETWORK] Attempting to connect... ({}/{}): {}",
                    attempt,
                    config.max_attempts,
                    e
                );
            }
        }
        if attempt < config.max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(NodeError::Startup(format!(
        "network not reachable after {} attempts",
        config.max_attempts
    )))
}
