use log::{debug, warn};
use std::thread;
use std::time::{Duration, Instant};

use super::frame::{FrameParser, UbxFrame};
use crate::hal::ddc::DdcTransport;
use crate::utils::error::GnssError;

pub const CLASS_NAV: u8 = 0x01;
pub const ID_NAV_DOP: u8 = 0x04;
pub const ID_NAV_PVT: u8 = 0x07;

pub const CLASS_ACK: u8 = 0x05;
pub const ID_ACK_NAK: u8 = 0x00;
pub const ID_ACK_ACK: u8 = 0x01;

pub const CLASS_CFG: u8 = 0x06;
pub const ID_CFG_PRT: u8 = 0x00;
pub const ID_CFG_CFG: u8 = 0x09;

/// DDC port identifier in CFG-PRT.
const PORT_ID_DDC: u8 = 0;
/// outProtoMask bit for the binary protocol.
const PROTO_UBX: u16 = 0x0001;
/// inProtoMask allowing UBX, NMEA and RTCM inbound.
const PROTO_IN_ALL: u16 = 0x0007;
/// CFG-CFG mask selecting the communication-port settings subsection.
const CFG_SUBSEC_IOPORT: u32 = 0x0000_0001;

const NAV_PVT_LEN: usize = 92;
const NAV_DOP_LEN: usize = 18;

const RX_CHUNK: usize = 128;

/// Query interface the fix poller uses against the bus receiver. Each call is
/// a distinct read transaction on the bus.
pub trait GnssBusClient {
    fn fix_ok(&mut self) -> Result<bool, GnssError>;
    /// Degrees, scaled by 1e-7.
    fn latitude(&mut self) -> Result<i32, GnssError>;
    /// Degrees, scaled by 1e-7.
    fn longitude(&mut self) -> Result<i32, GnssError>;
    /// Height above mean sea level, millimeters.
    fn altitude_msl(&mut self) -> Result<i32, GnssError>;
    /// Horizontal dilution of precision, 0.01 units.
    fn hdop(&mut self) -> Result<u16, GnssError>;
    fn satellites(&mut self) -> Result<u8, GnssError>;
}

/// Binary-protocol client for a u-blox style receiver on the shared bus.
pub struct UbxClient<T: DdcTransport> {
    transport: T,
    parser: FrameParser,
    response_timeout: Duration,
}

impl<T: DdcTransport> UbxClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            parser: FrameParser::new(),
            response_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Check whether a receiver answers on the bus at all. Absence is a
    /// normal outcome, not an error.
    pub fn probe(&mut self) -> bool {
        match self.transact(
            &UbxFrame::new(CLASS_CFG, ID_CFG_PRT, vec![PORT_ID_DDC]),
            CLASS_CFG,
            ID_CFG_PRT,
        ) {
            Ok(_) => true,
            Err(e) => {
                debug!("Bus receiver probe failed: {}", e);
                false
            }
        }
    }

    /// Restrict the receiver's bus output to the binary protocol, silencing
    /// its textual chatter.
    pub fn set_ddc_output_ubx(&mut self, bus_address: u16) -> Result<(), GnssError> {
        let mut payload = vec![0u8; 20];
        payload[0] = PORT_ID_DDC;
        // mode: slave address in bits 7..1
        let mode = (bus_address as u32) << 1;
        payload[4..8].copy_from_slice(&mode.to_le_bytes());
        payload[12..14].copy_from_slice(&PROTO_IN_ALL.to_le_bytes());
        payload[14..16].copy_from_slice(&PROTO_UBX.to_le_bytes());

        self.send_with_ack(&UbxFrame::new(CLASS_CFG, ID_CFG_PRT, payload))
    }

    /// Persist the port settings to the receiver's non-volatile store so they
    /// survive power cycles.
    pub fn save_port_config(&mut self) -> Result<(), GnssError> {
        let mut payload = vec![0u8; 12];
        payload[4..8].copy_from_slice(&CFG_SUBSEC_IOPORT.to_le_bytes());

        self.send_with_ack(&UbxFrame::new(CLASS_CFG, ID_CFG_CFG, payload))
    }

    fn nav_pvt(&mut self) -> Result<Vec<u8>, GnssError> {
        let frame = self.transact(&UbxFrame::poll(CLASS_NAV, ID_NAV_PVT), CLASS_NAV, ID_NAV_PVT)?;
        if frame.payload.len() < NAV_PVT_LEN {
            return Err(GnssError::InvalidResponse);
        }
        Ok(frame.payload)
    }

    fn nav_dop(&mut self) -> Result<Vec<u8>, GnssError> {
        let frame = self.transact(&UbxFrame::poll(CLASS_NAV, ID_NAV_DOP), CLASS_NAV, ID_NAV_DOP)?;
        if frame.payload.len() < NAV_DOP_LEN {
            return Err(GnssError::InvalidResponse);
        }
        Ok(frame.payload)
    }

    fn send_with_ack(&mut self, request: &UbxFrame) -> Result<(), GnssError> {
        let ack = self.transact(request, CLASS_ACK, ID_ACK_ACK)?;
        if ack.payload.len() >= 2 && ack.payload[0] == request.class && ack.payload[1] == request.id
        {
            Ok(())
        } else {
            Err(GnssError::InvalidResponse)
        }
    }

    /// Send a request and scan the inbound stream for the matching response
    /// within the response deadline. A NAK addressed at our request aborts
    /// immediately; unrelated periodic messages are skipped.
    fn transact(
        &mut self,
        request: &UbxFrame,
        want_class: u8,
        want_id: u8,
    ) -> Result<UbxFrame, GnssError> {
        self.transport.write_frame(&request.to_bytes())?;

        let deadline = Instant::now() + self.response_timeout;
        let mut chunk = [0u8; RX_CHUNK];

        while Instant::now() < deadline {
            let available = self.transport.bytes_available()?;
            if available == 0 {
                thread::sleep(Duration::from_millis(2));
                continue;
            }

            let n = available.min(chunk.len());
            let read = self.transport.read_stream(&mut chunk[..n])?;

            for &byte in &chunk[..read] {
                match self.parser.push(byte) {
                    Some(Ok(frame)) => {
                        if frame.is(want_class, want_id) {
                            return Ok(frame);
                        }
                        if frame.is(CLASS_ACK, ID_ACK_NAK)
                            && frame.payload.len() >= 2
                            && frame.payload[0] == request.class
                            && frame.payload[1] == request.id
                        {
                            return Err(GnssError::NackReceived);
                        }
                        debug!(
                            "Skipping unrelated frame class=0x{:02x} id=0x{:02x}",
                            frame.class, frame.id
                        );
                    }
                    Some(Err(e)) => warn!("Dropped corrupt frame: {}", e),
                    None => {}
                }
            }
        }

        Err(GnssError::Timeout)
    }
}

fn read_i32(payload: &[u8], offset: usize) -> Result<i32, GnssError> {
    payload
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
        .ok_or(GnssError::InvalidResponse)
}

fn read_u16(payload: &[u8], offset: usize) -> Result<u16, GnssError> {
    payload
        .get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or(GnssError::InvalidResponse)
}

fn read_u8(payload: &[u8], offset: usize) -> Result<u8, GnssError> {
    payload.get(offset).copied().ok_or(GnssError::InvalidResponse)
}

impl<T: DdcTransport> GnssBusClient for UbxClient<T> {
    fn fix_ok(&mut self) -> Result<bool, GnssError> {
        let pvt = self.nav_pvt()?;
        // flags byte, gnssFixOK bit
        Ok(read_u8(&pvt, 21)? & 0x01 != 0)
    }

    fn latitude(&mut self) -> Result<i32, GnssError> {
        let pvt = self.nav_pvt()?;
        read_i32(&pvt, 28)
    }

    fn longitude(&mut self) -> Result<i32, GnssError> {
        let pvt = self.nav_pvt()?;
        read_i32(&pvt, 24)
    }

    fn altitude_msl(&mut self) -> Result<i32, GnssError> {
        let pvt = self.nav_pvt()?;
        read_i32(&pvt, 36)
    }

    fn hdop(&mut self) -> Result<u16, GnssError> {
        let dop = self.nav_dop()?;
        read_u16(&dop, 12)
    }

    fn satellites(&mut self) -> Result<u8, GnssError> {
        let pvt = self.nav_pvt()?;
        read_u8(&pvt, 23)
    }
}
