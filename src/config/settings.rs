use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    // Serial NMEA receiver
    pub serial_port: String,
    pub serial_baud: u32,

    // Bus GNSS receiver
    pub bus_device: String,
    pub bus_address: u16,

    // Power control lines
    pub gpio_chip: String,
    pub rail_enable_line: u32,
    pub module_power_line: u32,
    pub rail_settle_ms: u64,
    pub module_boot_ms: u64,

    // Polling
    pub fix_timeout_secs: u64,
    pub poll_interval_secs: u64,

    // Diagnostics
    pub diagnostics: DiagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagConfig {
    pub console: bool,
    pub aux_port: Option<String>,
    pub aux_baud: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyS1".to_string(),
            serial_baud: 9600,

            bus_device: "/dev/i2c-1".to_string(),
            bus_address: 0x42,

            gpio_chip: "/dev/gpiochip0".to_string(),
            rail_enable_line: 17,
            module_power_line: 34,
            rail_settle_ms: 1000,
            module_boot_ms: 2000,

            fix_timeout_secs: 10,
            poll_interval_secs: 120,

            diagnostics: DiagConfig {
                console: true,
                aux_port: None,
                aux_baud: 115200,
            },
        }
    }
}

impl TrackerConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        // Override with command line arguments
        if let Some(port) = matches.get_one::<String>("port") {
            config.serial_port = port.clone();
        }
        if let Some(baud) = matches.get_one::<String>("baud") {
            config.serial_baud = baud.parse()?;
        }
        if let Some(bus) = matches.get_one::<String>("bus") {
            config.bus_device = bus.clone();
        }
        if let Some(interval) = matches.get_one::<String>("interval") {
            config.poll_interval_secs = interval.parse()?;
        }

        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: TrackerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
