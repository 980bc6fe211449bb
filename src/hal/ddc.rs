use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use log::debug;

use crate::utils::error::GnssError;

/// Register exposing the high byte of the receiver's pending-byte count.
const REG_BYTES_AVAILABLE: u8 = 0xFD;
/// Register exposing the message stream.
const REG_DATA_STREAM: u8 = 0xFF;

/// Byte-stream access to a receiver on the shared addressed bus.
///
/// Modeled on the u-blox DDC register layout: the pending-byte count lives at
/// 0xFD/0xFE and the message stream at 0xFF. Writes go to the bus directly.
pub trait DdcTransport {
    fn write_frame(&mut self, data: &[u8]) -> Result<(), GnssError>;
    fn bytes_available(&mut self) -> Result<usize, GnssError>;
    fn read_stream(&mut self, buf: &mut [u8]) -> Result<usize, GnssError>;
}

pub struct LinuxDdc {
    dev: LinuxI2CDevice,
}

impl LinuxDdc {
    pub fn open(bus_device: &str, address: u16) -> Result<Self, GnssError> {
        let dev = LinuxI2CDevice::new(bus_device, address).map_err(|e| {
            GnssError::ConnectionError(format!(
                "Failed to open bus {} at address 0x{:02x}: {}",
                bus_device, address, e
            ))
        })?;

        debug!("Opened DDC bus {} at address 0x{:02x}", bus_device, address);
        Ok(Self { dev })
    }
}

impl DdcTransport for LinuxDdc {
    fn write_frame(&mut self, data: &[u8]) -> Result<(), GnssError> {
        self.dev
            .write(data)
            .map_err(|e| GnssError::CommunicationError(format!("Bus write failed: {}", e)))
    }

    fn bytes_available(&mut self) -> Result<usize, GnssError> {
        self.dev
            .write(&[REG_BYTES_AVAILABLE])
            .map_err(|e| GnssError::CommunicationError(format!("Bus write failed: {}", e)))?;

        let mut count = [0u8; 2];
        self.dev
            .read(&mut count)
            .map_err(|e| GnssError::CommunicationError(format!("Bus read failed: {}", e)))?;

        let avail = u16::from_be_bytes(count);
        // 0xFFFF means the count registers are not ready yet
        if avail == 0xFFFF {
            return Ok(0);
        }
        Ok(avail as usize)
    }

    fn read_stream(&mut self, buf: &mut [u8]) -> Result<usize, GnssError> {
        self.dev
            .write(&[REG_DATA_STREAM])
            .map_err(|e| GnssError::CommunicationError(format!("Bus write failed: {}", e)))?;

        self.dev
            .read(buf)
            .map_err(|e| GnssError::CommunicationError(format!("Bus read failed: {}", e)))?;
        Ok(buf.len())
    }
}
