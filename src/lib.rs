//! air-node: gas and climate monitoring node.
//!
//! each `GET /` captures a fresh snapshot of the sensors, pushes it to the
//! remote collector (best effort) and renders it into the html template.

pub mod config;
pub mod display;
pub mod error;
pub mod hal;
pub mod network;
pub mod orchestrator;
pub mod page;
pub mod publisher;
pub mod sensors;
pub mod server;
pub mod snapshot;

pub use error::NodeError;
