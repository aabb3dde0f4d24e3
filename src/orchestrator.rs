//! ==============================================================================
//! orchestrator.rs - the per-request pipeline
//! ==============================================================================
//!
//! purpose:
//!     one pass per incoming request:
//!
//! ```text
//!         Idle -> Capturing -> Publishing -> Rendering -> Responding -> Idle
//!
//!     every stage degrades instead of failing, so `handle` always produces
//!     exactly one html response.
//! ```
//!
//! concurrency:
//!     the sensors are single-owner hardware with no arbitration. the
//!     orchestrator owns the hardware handle and a mutex that is held for
//!     the whole pass, so overlapping requests queue up instead of
//!     interleaving bus transactions.
//!
//! relationships:
//!     - uses: snapshot.rs, publisher.rs, page.rs
//!     - used by: server.rs (GET /)
//!
//! ==============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::NodeConfig;
use crate::hal::HardwareProvider;
use crate::page::{PageRenderer, Rendered};
use crate::publisher::RemotePublisher;
use crate::snapshot::{ReadingSnapshot, SensorSet};

pub const CONTENT_TYPE_HTML: &str = "text/html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Capturing,
    Publishing,
    Rendering,
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Capturing => "capturing",
            Stage::Publishing => "publishing",
            Stage::Rendering => "rendering",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub body: String,
    pub content_type: &'static str,
}

pub struct RequestOrchestrator {
    hw: Arc<dyn HardwareProvider>,
    sensors: SensorSet,
    publisher: RemotePublisher,
    renderer: PageRenderer,
    hardware_lock: Mutex<()>,
}

impl RequestOrchestrator {
    pub fn new(
        hw: Arc<dyn HardwareProvider>,
        sensors: SensorSet,
        publisher: RemotePublisher,
        renderer: PageRenderer,
    ) -> Self {
        Self { hw, sensors, publisher, renderer, hardware_lock: Mutex::new(()) }
    }

    pub fn from_config(hw: Arc<dyn HardwareProvider>, config: &NodeConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            hw,
            SensorSet::new(&config.sensors),
            RemotePublisher::new(&config.telemetry)?,
            PageRenderer::new(config.template.path.clone()),
        ))
    }

    pub async fn handle(&self) -> PageResponse {
        let _guard = self.hardware_lock.lock().await;

        enter(Stage::Capturing);
        let snapshot = self.capture().await;

        enter(Stage::Publishing);
        self.publisher.publish(&snapshot).await;

        enter(Stage::Rendering);
        let body = match self.renderer.render(&snapshot) {
            Rendered::Page(html) => html,
            fallback @ Rendered::Fallback => {
                enter(Stage::Responding);
                return respond(fallback.into_body());
            }
        };

        enter(Stage::Responding);
        respond(body)
    }

    /// blocking bus io runs off the async workers
    async fn capture(&self) -> ReadingSnapshot {
        let hw = self.hw.clone();
        let sensors = self.sensors.clone();
        match tokio::task::spawn_blocking(move || sensors.capture(hw.as_ref())).await {
            Ok(snapshot) => {
                tracing::debug!("[PIPELINE] Captured {}/4 valid readings", snapshot.valid_count());
                snapshot
            }
            Err(e) => {
                tracing::warn!("[PIPELINE] ⚠ Capture task failed: {}", e);
                ReadingSnapshot::faulted()
            }
        }
    }
}

fn enter(stage: Stage) {
    tracing::debug!("[PIPELINE] -> {}", stage);
}

fn respond(body: String) -> PageResponse {
    let response = PageResponse { body, content_type: CONTENT_TYPE_HTML };
    enter(Stage::Idle);
    response
}
