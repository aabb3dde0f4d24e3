//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `node.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: Where the status page listens.
//!     - NetworkConfig: How long to wait for the network at startup.
//!     - SensorsConfig: Climate sensor pin/model, gas sensor ADC channels and vrefs.
//!     - DisplayConfig: OLED address and whether it is mandatory.
//!     - TelemetryConfig: Remote collector url, api key, invalid-slot policy.
//!     - TemplateConfig: Path of the html template read on every request.
//!
//! ==============================================================================

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::NodeError;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub network: NetworkConfig,
    pub sensors: SensorsConfig,
    pub display: DisplayConfig,
    pub telemetry: TelemetryConfig,
    pub template: TemplateConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub max_attempts: u32,
    pub retry_interval_seconds: u64,
    /// any routable address; only used to learn which local address the
    /// kernel would pick, no packet is sent
    pub probe_addr: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_interval_seconds: 1,
            probe_addr: "8.8.8.8:80".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(from = "SensorsFile")]
pub struct SensorsConfig {
    /// i2c address of the adc both gas sensors are wired to
    pub adc_i2c_address: u8,
    pub climate: ClimateConfig,
    pub gas_a: GasSensorConfig,
    pub gas_b: GasSensorConfig,
}

/// `[sensors]` as written in the file; missing keys of a gas sensor fall
/// back to that sensor's own defaults, not to a shared one
#[derive(Deserialize, Default)]
#[serde(default)]
struct SensorsFile {
    adc_i2c_address: Option<u8>,
    climate: ClimateConfig,
    gas_a: GasSensorFile,
    gas_b: GasSensorFile,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GasSensorFile {
    label: Option<String>,
    adc_channel: Option<u8>,
    vref: Option<f64>,
}

impl GasSensorFile {
    fn over(self, base: GasSensorConfig) -> GasSensorConfig {
        GasSensorConfig {
            label: self.label.unwrap_or(base.label),
            adc_channel: self.adc_channel.unwrap_or(base.adc_channel),
            vref: self.vref.unwrap_or(base.vref),
        }
    }
}

impl From<SensorsFile> for SensorsConfig {
    fn from(file: SensorsFile) -> Self {
        let defaults = SensorsConfig::default();
        Self {
            adc_i2c_address: file.adc_i2c_address.unwrap_or(defaults.adc_i2c_address),
            climate: file.climate,
            gas_a: file.gas_a.over(defaults.gas_a),
            gas_b: file.gas_b.over(defaults.gas_b),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClimateModel {
    #[default]
    Dht11,
    Dht22,
}

impl ClimateModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateModel::Dht11 => "dht11",
            ClimateModel::Dht22 => "dht22",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClimateConfig {
    pub model: ClimateModel,
    pub gpio_pin: u8,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self { model: ClimateModel::Dht11, gpio_pin: 2 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GasSensorConfig {
    pub label: String,
    pub adc_channel: u8,
    /// full-scale reference voltage for this sensor's ADC input
    pub vref: f64,
}

impl GasSensorConfig {
    /// MQ-9 (CO / flammable gas) on channel 0, 3.3 V full scale
    pub fn mq9() -> Self {
        Self { label: "mq9".to_string(), adc_channel: 0, vref: 3.3 }
    }

    /// MQ-135 (air quality) on channel 1, 5 V full scale
    pub fn mq135() -> Self {
        Self { label: "mq135".to_string(), adc_channel: 1, vref: 5.0 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    pub i2c_address: u8,
    pub width: u32,
    pub height: u32,
    /// treat a failed bus scan as fatal instead of running headless
    pub required: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            i2c_address: 0x3C,
            width: 128,
            height: 64,
            required: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidSlotPolicy {
    /// send the 0 sentinel, indistinguishable from a real zero
    #[default]
    Zero,
    /// leave the field out so the collector records no value
    Omit,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub url: String,
    pub api_key: String,
    pub invalid_slots: InvalidSlotPolicy,
    /// unset means no timeout beyond what the transport enforces
    pub timeout_seconds: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://api.thingspeak.com/update".to_string(),
            api_key: String::new(),
            invalid_slots: InvalidSlotPolicy::Zero,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TemplateConfig {
    pub path: PathBuf,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("static").join("index.html") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            adc_i2c_address: 0x48,
            climate: ClimateConfig::default(),
            gas_a: GasSensorConfig::mq9(),
            gas_b: GasSensorConfig::mq135(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), NodeError> {
        for gas in [&self.sensors.gas_a, &self.sensors.gas_b] {
            if !(gas.vref.is_finite() && gas.vref > 0.0) {
                return Err(NodeError::Config(format!(
                    "sensor {}: vref must be a positive voltage, got {}",
                    gas.label, gas.vref
                )));
            }
        }
        if self.sensors.gas_a.adc_channel == self.sensors.gas_b.adc_channel {
            return Err(NodeError::Config(format!(
                "gas sensors share adc channel {}",
                self.sensors.gas_a.adc_channel
            )));
        }
        if self.network.max_attempts == 0 {
            return Err(NodeError::Config("network.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("node.toml"),
            PathBuf::from("..").join("config").join("node.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        tracing::info!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[CONFIG] Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        tracing::warn!("[CONFIG] No config file found - using defaults");
        Self::default()
    }

    /// Log configuration summary (api key redacted)
    pub fn log_summary(&self) {
        tracing::info!("[CONFIG] Listen: {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "[CONFIG] Climate: {} on gpio {}",
            self.sensors.climate.model.as_str(),
            self.sensors.climate.gpio_pin
        );
        for gas in [&self.sensors.gas_a, &self.sensors.gas_b] {
            tracing::info!("[CONFIG] Gas: {} on adc {} (vref {} V)", gas.label, gas.adc_channel, gas.vref);
        }
        tracing::info!(
            "[CONFIG] Display: {} at 0x{:02X}",
            if self.display.enabled { "enabled" } else { "disabled" },
            self.display.i2c_address
        );
        tracing::info!(
            "[CONFIG] Telemetry: {} -> {} (api key {})",
            if self.telemetry.enabled { "enabled" } else { "disabled" },
            self.telemetry.url,
            if self.telemetry.api_key.is_empty() { "unset" } else { "set" }
        );
        tracing::info!("[CONFIG] Template: {}", self.template.path.display());
    }
}
