//! ==============================================================================
//! page.rs - html status page from a template file
//! ==============================================================================
//!
//! purpose:
//!     substitutes snapshot values into the html template. the template is
//!     read from disk on every request, so it can be edited while the node
//!     runs. a missing or unreadable template yields a fixed fallback body.
//!
//! relationships:
//!     - uses: snapshot.rs (ReadingSnapshot)
//!     - used by: orchestrator.rs
//!
//! ==============================================================================

use std::path::{Path, PathBuf};

use crate::error::NodeError;
use crate::snapshot::ReadingSnapshot;
use crate::sensors::SensorValue;

/// shown in place of any value that failed or read exactly zero
pub const SENSOR_ERROR: &str = "Sensor Error";

/// body served when the template cannot be loaded
pub const FALLBACK_BODY: &str = "Error loading page";

pub const PLACEHOLDERS: [&str; 4] = ["temp", "hum", "mq9_voltage", "mq135_voltage"];

/// placeholder name -> display text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    entries: [(&'static str, String); 4],
}

impl RenderContext {
    pub fn from_snapshot(snapshot: &ReadingSnapshot) -> Self {
        let [temp, hum, gas_a, gas_b] = snapshot.values();
        Self {
            entries: [
                (PLACEHOLDERS[0], display_text(temp)),
                (PLACEHOLDERS[1], display_text(hum)),
                (PLACEHOLDERS[2], display_text(gas_a)),
                (PLACEHOLDERS[3], display_text(gas_b)),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

fn display_text(value: &SensorValue) -> String {
    if value.is_error() {
        SENSOR_ERROR.to_string()
    } else {
        value.format_raw()
    }
}

/// literal `{{ name }}` replacement; every occurrence, nothing else touched
pub fn render_template(ctx: &RenderContext, template: &str) -> String {
    ctx.entries().fold(template.to_string(), |html, (name, value)| {
        html.replace(&format!("{{{{ {} }}}}", name), value)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Page(String),
    /// template unavailable; body is `FALLBACK_BODY`
    Fallback,
}

impl Rendered {
    pub fn into_body(self) -> String {
        match self {
            Rendered::Page(html) => html,
            Rendered::Fallback => FALLBACK_BODY.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageRenderer {
    template_path: PathBuf,
}

impl PageRenderer {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self { template_path: template_path.into() }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// read fresh on every call; non-utf8 content counts as corrupt
    pub fn load_template(&self) -> Result<String, NodeError> {
        std::fs::read_to_string(&self.template_path).map_err(|source| NodeError::Asset {
            path: self.template_path.clone(),
            source,
        })
    }

    pub fn render(&self, snapshot: &ReadingSnapshot) -> Rendered {
        match self.load_template() {
            Ok(template) => Rendered::Page(render_template(&RenderContext::from_snapshot(snapshot), &template)),
            Err(e) => {
                tracing::warn!("[PAGE] ⚠ {}", e);
                Rendered::Fallback
            }
        }
    }
}
