//! ==============================================================================
//! display.rs - best-effort status lines on the oled
//! ==============================================================================
//!
//! purpose:
//!     shows short status text at startup. if the display never came up
//!     the presenter holds no device and every call is a no-op; the node
//!     serves pages either way.
//!
//! relationships:
//!     - uses: hal.rs (scan_i2c, draw_lines)
//!     - used by: main.rs (startup only, never per request)
//!
//! ==============================================================================

use std::sync::Arc;

use crate::config::DisplayConfig;
use crate::error::NodeError;
use crate::hal::HardwareProvider;

pub const INITIALIZED: &str = "Initialized!";
pub const SERVER_READY: &str = "Web Server Ready";

/// what the screen shows once the web server is about to start
pub const STARTUP_LINES: [&str; 2] = [INITIALIZED, SERVER_READY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Panel {
    addr: u8,
    width: u32,
    height: u32,
}

pub struct DisplayPresenter {
    hw: Arc<dyn HardwareProvider>,
    panel: Option<Panel>,
}

impl DisplayPresenter {
    /// scans the bus and attaches the panel if it answers.
    /// only a scan failure with `required = true` is an error.
    pub fn init(hw: Arc<dyn HardwareProvider>, config: &DisplayConfig) -> Result<Self, NodeError> {
        if !config.enabled {
            tracing::info!("[DISPLAY] Disabled in config");
            return Ok(Self { hw, panel: None });
        }

        let found = match hw.scan_i2c() {
            Ok(found) => found,
            Err(e) if config.required => {
                return Err(NodeError::Startup(format!("i2c bus scan failed: {}", e)));
            }
            Err(e) => {
                tracing::warn!("[DISPLAY] ⚠ I2C initialization failed: {}", e);
                Vec::new()
            }
        };
        tracing::info!("[DISPLAY] I2C devices found: {:02X?}", found);

        let panel = if found.contains(&config.i2c_address) {
            Some(Panel { addr: config.i2c_address, width: config.width, height: config.height })
        } else if config.required {
            return Err(NodeError::Startup(format!(
                "no display at 0x{:02X} on the i2c bus",
                config.i2c_address
            )));
        } else {
            tracing::warn!("[DISPLAY] ⚠ No display at 0x{:02X}, running headless", config.i2c_address);
            None
        };

        let presenter = Self { hw, panel };
        presenter.show_status(&[INITIALIZED]);
        Ok(presenter)
    }

    pub fn is_available(&self) -> bool {
        self.panel.is_some()
    }

    /// one line per row; draw errors are logged and dropped
    pub fn show_status(&self, lines: &[&str]) {
        let Some(panel) = self.panel else {
            return;
        };
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        if let Err(e) = self.hw.draw_lines(panel.addr, panel.width, panel.height, &lines) {
            tracing::warn!("[DISPLAY] ⚠ {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClimateModel;
    use crate::error::Result;
    use std::sync::Mutex;

    struct RecordingBus {
        scan: Option<Vec<u8>>,
        draw_fails: bool,
        drawn: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingBus {
        fn new(scan: Option<Vec<u8>>) -> Arc<Self> {
            Arc::new(Self { scan, draw_fails: false, drawn: Mutex::new(Vec::new()) })
        }
    }

    impl HardwareProvider for RecordingBus {
        fn read_climate(&self, _model: ClimateModel, _pin: u8) -> Result<(f64, f64)> {
            unreachable!("display never reads sensors")
        }

        fn read_adc(&self, _channel: u8, _vref: f64) -> Result<u16> {
            unreachable!("display never reads sensors")
        }

        fn scan_i2c(&self) -> Result<Vec<u8>> {
            self.scan.clone().ok_or_else(|| NodeError::hardware("i2c-bus", "no devices"))
        }

        fn draw_lines(&self, _addr: u8, _width: u32, _height: u32, lines: &[String]) -> Result<()> {
            self.drawn.lock().unwrap().push(lines.to_vec());
            if self.draw_fails {
                return Err(NodeError::hardware("ssd1306-0x3C", "nack"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_startup_lines_drawn() {
        let bus = RecordingBus::new(Some(vec![0x3C]));
        let presenter = DisplayPresenter::init(bus.clone(), &DisplayConfig::default()).unwrap();
        assert!(presenter.is_available());

        presenter.show_status(&STARTUP_LINES);
        let drawn = bus.drawn.lock().unwrap();
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn[0], vec!["Initialized!"]);
        assert_eq!(drawn[1], vec!["Initialized!", "Web Server Ready"]);
    }

    #[test]
    fn test_missing_display_is_noop() {
        let bus = RecordingBus::new(Some(vec![0x48]));
        let presenter = DisplayPresenter::init(bus.clone(), &DisplayConfig::default()).unwrap();
        assert!(!presenter.is_available());

        presenter.show_status(&STARTUP_LINES);
        assert!(bus.drawn.lock().unwrap().is_empty());
    }

    #[test]
    fn test_scan_failure_is_noop_unless_required() {
        let presenter = DisplayPresenter::init(RecordingBus::new(None), &DisplayConfig::default()).unwrap();
        assert!(!presenter.is_available());

        let required = DisplayConfig { required: true, ..DisplayConfig::default() };
        let err = DisplayPresenter::init(RecordingBus::new(None), &required).err().unwrap();
        assert!(matches!(err, NodeError::Startup(_)));
    }

    #[test]
    fn test_draw_failure_is_swallowed() {
        let bus = Arc::new(RecordingBus {
            scan: Some(vec![0x3C]),
            draw_fails: true,
            drawn: Mutex::new(Vec::new()),
        });
        let presenter = DisplayPresenter::init(bus.clone(), &DisplayConfig::default()).unwrap();
        presenter.show_status(&STARTUP_LINES);
        assert_eq!(bus.drawn.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_disabled_never_scans() {
        let config = DisplayConfig { enabled: false, required: true, ..DisplayConfig::default() };
        let presenter = DisplayPresenter::init(RecordingBus::new(None), &config).unwrap();
        assert!(!presenter.is_available());
    }
}
