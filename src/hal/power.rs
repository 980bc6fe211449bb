use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use log::info;
use std::thread;
use std::time::Duration;

use crate::utils::error::GnssError;

/// Two-line power control for the GNSS module socket: a shared peripheral
/// 3V3 rail and the module's own power/reset line.
pub trait PowerRail {
    fn set_peripheral_rail(&mut self, on: bool) -> Result<(), GnssError>;
    fn set_module_power(&mut self, on: bool) -> Result<(), GnssError>;
}

pub struct CdevPowerRail {
    rail: LineHandle,
    module: LineHandle,
}

impl CdevPowerRail {
    pub fn new(chip_path: &str, rail_line: u32, module_line: u32) -> Result<Self, GnssError> {
        let mut chip = Chip::new(chip_path).map_err(|e| {
            GnssError::ConnectionError(format!("Failed to open GPIO chip {}: {}", chip_path, e))
        })?;

        let rail = Self::request_output(&mut chip, rail_line)?;
        let module = Self::request_output(&mut chip, module_line)?;

        Ok(Self { rail, module })
    }

    fn request_output(chip: &mut Chip, line: u32) -> Result<LineHandle, GnssError> {
        chip.get_line(line)
            .and_then(|l| l.request(LineRequestFlags::OUTPUT, 0, "tracker-gnss"))
            .map_err(|e| {
                GnssError::ConnectionError(format!("Failed to request GPIO line {}: {}", line, e))
            })
    }
}

impl PowerRail for CdevPowerRail {
    fn set_peripheral_rail(&mut self, on: bool) -> Result<(), GnssError> {
        self.rail.set_value(on as u8).map_err(|e| {
            GnssError::CommunicationError(format!("Peripheral rail write failed: {}", e))
        })
    }

    fn set_module_power(&mut self, on: bool) -> Result<(), GnssError> {
        self.module.set_value(on as u8).map_err(|e| {
            GnssError::CommunicationError(format!("Module power write failed: {}", e))
        })
    }
}

/// Fixed power-up sequence for the module socket: enable the peripheral rail,
/// hold the module line low while the rail settles, then release it and give
/// the module time to boot before any bus traffic.
pub fn run_power_sequence(
    rail: &mut dyn PowerRail,
    settle: Duration,
    boot: Duration,
) -> Result<(), GnssError> {
    info!("Running GNSS module power-up sequence");

    rail.set_peripheral_rail(true)?;
    rail.set_module_power(false)?;
    thread::sleep(settle);
    rail.set_module_power(true)?;
    thread::sleep(boot);

    Ok(())
}
