//! ==============================================================================
//! hal.rs - Hardware Abstraction Layer
//! ==============================================================================
//!
//! purpose:
//!     provides a unified interface for the node's hardware: the climate
//!     sensor, the i2c adc the gas sensors hang off, and the oled display.
//!     abstracts away the difference between running on a real Raspberry Pi
//!     (using `rppal`) and a development machine (using mocks).
//!
//! design philosophy:
//!     - "Compile Anywhere": The node should compile on Windows/Mac/Linux.
//!     - "Owned Handles": `Hal` is built once in main and handed to the
//!       orchestrator and display presenter. there is no global device state.
//!     - "Faults are values": every call returns a `NodeError::Hardware`
//!       on failure; the readers decide how to degrade.
//!
//! relationships:
//!     - used by: sensors.rs (climate + adc reads), display.rs (scan + draw)
//!     - uses: rppal (on feature="hardware")
//!     - uses: std::process::Command (python drivers for dht and ssd1306,
//!       killed when they outlive `DRIVER_TIMEOUT`)
//!
//! ==============================================================================

use crate::config::ClimateModel;
use crate::error::Result;

#[cfg(any(feature = "hardware", test))]
use std::{
    io,
    process::{Command, Output, Stdio},
    time::{Duration, Instant},
};

pub trait HardwareProvider: Send + Sync {
    /// one combined measurement: (temperature in celsius, relative humidity in %)
    fn read_climate(&self, model: ClimateModel, pin: u8) -> Result<(f64, f64)>;
    /// 16-bit sample from one single-ended adc channel, scaled so that
    /// 65535 corresponds to `vref` volts on the input
    fn read_adc(&self, channel: u8, vref: f64) -> Result<u16>;
    /// addresses of every device answering on the i2c bus
    fn scan_i2c(&self) -> Result<Vec<u8>>;
    /// clear the display and draw one line of text per row
    fn draw_lines(&self, addr: u8, width: u32, height: u32, lines: &[String]) -> Result<()>;
}

// ==============================================================================================
// MOCK IMPLEMENTATION (For WSL / Non-Hardware Build)
// ==============================================================================================
#[cfg(not(feature = "hardware"))]
pub struct Hal {
    adc_addr: u8,
}

#[cfg(not(feature = "hardware"))]
impl Hal {
    pub fn new(adc_addr: u8) -> Self {
        tracing::info!("Using MOCK HAL (No hardware access)");
        Self { adc_addr }
    }
}

#[cfg(not(feature = "hardware"))]
impl HardwareProvider for Hal {
    fn read_climate(&self, model: ClimateModel, pin: u8) -> Result<(f64, f64)> {
        tracing::debug!("[MOCK {}] Reading pin {}", model.as_str().to_uppercase(), pin);
        Ok((24.5, 60.0))
    }

    fn read_adc(&self, channel: u8, vref: f64) -> Result<u16> {
        tracing::debug!("[MOCK ADC] Addr: 0x{:02X}, channel {} ({} V)", self.adc_addr, channel, vref);
        // roughly 1.2 V at 3.3 V full scale and 2.0 V at 5 V full scale
        Ok(match channel {
            0 => 23831,
            1 => 26214,
            _ => 0,
        })
    }

    fn scan_i2c(&self) -> Result<Vec<u8>> {
        Ok(vec![0x3C, self.adc_addr])
    }

    fn draw_lines(&self, addr: u8, width: u32, height: u32, lines: &[String]) -> Result<()> {
        tracing::debug!("[MOCK OLED] 0x{:02X} {}x{}: {:?}", addr, width, height, lines);
        Ok(())
    }
}

// ==============================================================================================
// REAL IMPLEMENTATION (For Raspberry Pi)
// ==============================================================================================
#[cfg(feature = "hardware")]
pub struct Hal {
    adc_addr: u8,
}

/// python drivers get this long before they are killed
#[cfg(feature = "hardware")]
const DRIVER_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(any(feature = "hardware", test))]
const DRIVER_POLL: Duration = Duration::from_millis(20);

/// run `command` to completion, killing it once `timeout` has passed.
/// a killed driver is reported as `io::ErrorKind::TimedOut`.
#[cfg(any(feature = "hardware", test))]
fn run_with_timeout(mut command: Command, timeout: Duration) -> io::Result<Output> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output();
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            child.wait().ok();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("killed after {:?}", timeout),
            ));
        }
        std::thread::sleep(DRIVER_POLL);
    }
}

#[cfg(any(feature = "hardware", test))]
#[cfg_attr(not(feature = "hardware"), allow(dead_code))]
mod ads1115 {
    pub const REG_CONVERSION: u8 = 0x00;
    pub const REG_CONFIG: u8 = 0x01;
    /// single-shot start, single-shot mode, 128 SPS, comparator off
    const CONFIG_BASE: u16 = 0x8000 | 0x0100 | (0b100 << 5) | 0x0003;
    /// one conversion at 128 SPS takes ~7.8 ms
    pub const CONVERSION_MS: u64 = 9;
    /// positive full-scale code of a single-ended conversion
    const MAX_CODE: f64 = 32767.0;

    /// programmable gain settings: (full-scale volts, PGA bits)
    const RANGES: [(f64, u16); 6] = [
        (0.256, 0b101),
        (0.512, 0b100),
        (1.024, 0b011),
        (2.048, 0b010),
        (4.096, 0b001),
        (6.144, 0b000),
    ];

    /// narrowest gain whose range still covers `vref`
    pub fn range_for(vref: f64) -> (f64, u16) {
        RANGES
            .iter()
            .copied()
            .find(|(full_scale, _)| *full_scale >= vref)
            .unwrap_or(RANGES[RANGES.len() - 1])
    }

    pub fn single_ended(channel: u8, pga: u16) -> u16 {
        CONFIG_BASE | ((pga & 0b111) << 9) | ((0b100 | (channel as u16 & 0b11)) << 12)
    }

    /// convert a conversion code taken at `full_scale` into a sample where
    /// 65535 is `vref`; inputs above `vref` saturate
    pub fn to_u16(raw: i16, full_scale: f64, vref: f64) -> u16 {
        let volts = raw.max(0) as f64 * full_scale / MAX_CODE;
        (volts / vref * 65535.0).round().clamp(0.0, 65535.0) as u16
    }
}

#[cfg(feature = "hardware")]
impl Hal {
    pub fn new(adc_addr: u8) -> Self {
        tracing::info!("Using REAL HARDWARE HAL (rppal)");
        Self { adc_addr }
    }

    fn bus(&self, device: &str) -> Result<rppal::i2c::I2c> {
        rppal::i2c::I2c::new().map_err(|e| crate::error::NodeError::hardware(device, e))
    }
}

#[cfg(feature = "hardware")]
impl HardwareProvider for Hal {
    fn read_climate(&self, model: ClimateModel, pin: u8) -> Result<(f64, f64)> {
        use crate::error::NodeError;

        // NOTE: dht sensors need microsecond bit-banging; the adafruit driver
        // handles timing compensation that userspace rust cannot guarantee.
        let device = format!("{}-gpio{}", model.as_str(), pin);
        let script = format!(
            r#"
import sys
try:
    import adafruit_dht, board, json
    dht = adafruit_dht.{}(board.D{})
    try:
        t, h = dht.temperature, dht.humidity
        if t is not None and h is not None:
            print(json.dumps({{"t": t, "h": h}}))
        else:
            print("null")
    finally:
        dht.exit()
except Exception as e:
    print(str(e), file=sys.stderr)
    sys.exit(1)
"#,
            model.as_str().to_uppercase(),
            pin
        );

        let mut command = Command::new("python3");
        command.args(["-c", &script]);
        let output = run_with_timeout(command, DRIVER_TIMEOUT)
            .map_err(|e| NodeError::hardware(&device, format!("python3 driver: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NodeError::hardware(&device, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout == "null" || stdout.is_empty() {
            return Err(NodeError::hardware(&device, "sensor returned null"));
        }

        let parsed: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|e| NodeError::hardware(&device, format!("json parse error: {} (got: {})", e, stdout)))?;
        let temp = parsed["t"]
            .as_f64()
            .ok_or_else(|| NodeError::hardware(&device, "missing temperature"))?;
        let humidity = parsed["h"]
            .as_f64()
            .ok_or_else(|| NodeError::hardware(&device, "missing humidity"))?;

        Ok((temp, humidity))
    }

    fn read_adc(&self, channel: u8, vref: f64) -> Result<u16> {
        use crate::error::NodeError;

        let device = format!("adc-0x{:02X}-ch{}", self.adc_addr, channel);
        let fault = |e: rppal::i2c::Error| NodeError::hardware(&device, e);

        let mut i2c = self.bus(&device)?;
        i2c.set_slave_address(self.adc_addr as u16).map_err(fault)?;

        let (full_scale, pga) = ads1115::range_for(vref);
        let config = ads1115::single_ended(channel, pga).to_be_bytes();
        i2c.write(&[ads1115::REG_CONFIG, config[0], config[1]]).map_err(fault)?;
        std::thread::sleep(std::time::Duration::from_millis(ads1115::CONVERSION_MS));

        let mut buf = [0u8; 2];
        i2c.write_read(&[ads1115::REG_CONVERSION], &mut buf).map_err(fault)?;
        Ok(ads1115::to_u16(i16::from_be_bytes(buf), full_scale, vref))
    }

    fn scan_i2c(&self) -> Result<Vec<u8>> {
        let mut i2c = self.bus("i2c-bus")?;
        let mut found = Vec::new();
        let mut probe = [0u8; 1];
        // 0x03..=0x77 is the non-reserved 7-bit range
        for addr in 0x03u8..=0x77 {
            if i2c.set_slave_address(addr as u16).is_err() {
                continue;
            }
            if i2c.read(&mut probe).is_ok() {
                found.push(addr);
            }
        }
        Ok(found)
    }

    fn draw_lines(&self, addr: u8, width: u32, height: u32, lines: &[String]) -> Result<()> {
        use crate::error::NodeError;

        let device = format!("ssd1306-0x{:02X}", addr);
        let text_calls: String = lines
            .iter()
            .enumerate()
            .map(|(row, line)| format!("draw.text((0, {}), {:?}, fill=255)\n", row * 10, line))
            .collect();

        let script = format!(
            r#"
import board, busio, adafruit_ssd1306
from PIL import Image, ImageDraw
i2c = busio.I2C(board.SCL, board.SDA)
oled = adafruit_ssd1306.SSD1306_I2C({w}, {h}, i2c, addr=0x{addr:02X})
oled.fill(0)
image = Image.new("1", ({w}, {h}))
draw = ImageDraw.Draw(image)
{calls}
oled.image(image)
oled.show()
"#,
            w = width,
            h = height,
            addr = addr,
            calls = text_calls
        );

        let mut command = Command::new("python3");
        command.args(["-c", &script]);
        let output = run_with_timeout(command, DRIVER_TIMEOUT)
            .map_err(|e| NodeError::hardware(&device, format!("python3 driver: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NodeError::hardware(&device, stderr.trim()));
        }
        Ok(())
    }
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(all(test, not(feature = "hardware")))]
mod tests {
    use super::*;

    #[test]
    fn test_mock_scan_reports_display_and_adc() {
        let hal = Hal::new(0x48);
        let found = hal.scan_i2c().unwrap();
        assert!(found.contains(&0x3C));
        assert!(found.contains(&0x48));
    }

    #[test]
    fn test_mock_climate_is_combined() {
        let hal = Hal::new(0x48);
        assert_eq!(hal.read_climate(ClimateModel::Dht11, 2).unwrap(), (24.5, 60.0));
    }
}
