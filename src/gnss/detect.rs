use log::info;
use std::fmt;
use std::thread;
use std::time::Duration;

use super::nmea_receiver::NmeaReceiver;
use crate::config::TrackerConfig;
use crate::diag::Diagnostics;
use crate::hal::ddc::LinuxDdc;
use crate::hal::power::{run_power_sequence, PowerRail};
use crate::ubx::UbxClient;
use crate::utils::error::GnssError;

/// Which of the two interchangeable receiver modules is attached. Decided
/// once at startup and read by the fix poller on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    SerialNmea,
    BusGnss,
    Unknown,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::SerialNmea => write!(f, "serial-nmea"),
            ModuleKind::BusGnss => write!(f, "bus-gnss"),
            ModuleKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Detection result: the module tag plus the owned driver for whichever
/// receiver was found.
pub struct DetectedModule {
    pub kind: ModuleKind,
    pub bus: Option<UbxClient<LinuxDdc>>,
    pub serial: Option<NmeaReceiver>,
}

pub struct ModuleDetector {
    config: TrackerConfig,
}

impl ModuleDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Power up the module socket, then probe for the bus receiver and fall
    /// back to the serial one. Absence of the bus receiver is assumed to
    /// imply presence of the serial receiver, so detection always yields one
    /// of the two kinds.
    pub fn detect(
        &self,
        power: &mut dyn PowerRail,
        diag: &mut Diagnostics,
    ) -> Result<DetectedModule, GnssError> {
        run_power_sequence(
            power,
            Duration::from_millis(self.config.rail_settle_ms),
            Duration::from_millis(self.config.module_boot_ms),
        )?;

        diag.status("Trying to initialize bus GNSS receiver");
        match LinuxDdc::open(&self.config.bus_device, self.config.bus_address) {
            Ok(transport) => {
                let mut client = UbxClient::new(transport);
                if client.probe() {
                    client.set_ddc_output_ubx(self.config.bus_address)?;
                    client.save_port_config()?;
                    diag.status("Detected bus GNSS receiver");
                    return Ok(DetectedModule {
                        kind: ModuleKind::BusGnss,
                        bus: Some(client),
                        serial: None,
                    });
                }
                diag.status("Bus GNSS receiver not detected at default address");
                // dropping the client releases the bus
            }
            Err(e) => {
                info!("Bus not available: {}", e);
            }
        }

        diag.status("Initializing serial NMEA receiver");
        let port = self.config.serial_port.clone();
        let baud = self.config.serial_baud;
        let serial = open_blocking(|| NmeaReceiver::new(&port, baud), SERIAL_RETRY_WAIT, diag);
        diag.status("Detected serial NMEA receiver");

        Ok(DetectedModule {
            kind: ModuleKind::SerialNmea,
            bus: None,
            serial: Some(serial),
        })
    }
}

const SERIAL_RETRY_WAIT: Duration = Duration::from_millis(500);

/// Block until the serial line is ready. Detection always yields one of the
/// two module kinds, so an unopenable port is waited out, not reported.
fn open_blocking<T>(
    mut open: impl FnMut() -> Result<T, GnssError>,
    retry_wait: Duration,
    diag: &mut Diagnostics,
) -> T {
    loop {
        match open() {
            Ok(value) => return value,
            Err(e) => {
                diag.status(&format!("Serial line not ready: {}", e));
                thread::sleep(retry_wait);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_blocking_retries_until_ready() {
        let mut diag = Diagnostics::new();
        let mut attempts = 0;

        let value = open_blocking(
            || {
                attempts += 1;
                if attempts < 3 {
                    Err(GnssError::ConnectionError("port busy".to_string()))
                } else {
                    Ok(attempts)
                }
            },
            Duration::ZERO,
            &mut diag,
        );

        assert_eq!(value, 3);
    }
}
