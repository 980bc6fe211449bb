use log::{debug, info};
use nmea::Nmea;
use serialport::SerialPort;
use std::io::Read;
use std::time::Duration;

use super::sample::FixAccumulator;
use crate::utils::error::GnssError;

const RX_CHUNK: usize = 512;

// NMEA sentences are at most 82 bytes; anything pending beyond a few times
// that without a newline is not sentence data.
const MAX_PENDING_LEN: usize = 256;

/// A source of decoded NMEA field updates the fix poller can drain.
pub trait NmeaSource {
    /// Decode whatever bytes are currently pending into the accumulator.
    /// Returns true if at least one sentence was decoded.
    fn pump(&mut self, acc: &mut FixAccumulator) -> Result<bool, GnssError>;
}

/// Line assembly plus incremental sentence decoding, separated from the port
/// so it can be driven from any byte stream.
pub struct SentenceDecoder {
    parser: Nmea,
    line_buffer: String,
}

impl Default for SentenceDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceDecoder {
    pub fn new() -> Self {
        Self {
            parser: Nmea::default(),
            line_buffer: String::new(),
        }
    }

    /// Feed raw bytes; decode complete sentences into the accumulator.
    /// Stops early once the core fields are all acquired.
    pub fn feed(&mut self, bytes: &[u8], acc: &mut FixAccumulator) -> bool {
        let mut decoded = false;
        self.line_buffer.push_str(&String::from_utf8_lossy(bytes));

        while let Some(newline_pos) = self.line_buffer.find('\n') {
            let line = self.line_buffer[..newline_pos]
                .trim_end_matches('\r')
                .trim()
                .to_string();
            self.line_buffer.drain(..=newline_pos);

            if !line.starts_with('$') {
                continue;
            }

            match self.parser.parse(&line) {
                Ok(sentence_type) => {
                    debug!("Decoded NMEA sentence: {:?}", sentence_type);
                    acc.observe(&self.parser);
                    decoded = true;

                    if acc.core_fields_complete() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Failed to decode NMEA sentence {}: {:?}", line, e);
                }
            }
        }

        self.enforce_buffer_cap();
        decoded
    }

    /// A receiver left emitting non-sentence data (binary frames, line noise)
    /// never produces a newline; drop such bytes instead of buffering them
    /// across polls, keeping at most one partial sentence.
    fn enforce_buffer_cap(&mut self) {
        if self.line_buffer.len() <= MAX_PENDING_LEN {
            return;
        }

        debug!(
            "Discarding {} bytes of non-sentence serial data",
            self.line_buffer.len()
        );
        match self.line_buffer.rfind('$') {
            Some(pos) if self.line_buffer.len() - pos <= MAX_PENDING_LEN => {
                self.line_buffer.drain(..pos);
            }
            _ => self.line_buffer.clear(),
        }
    }
}

/// Serial-attached NMEA receiver on a dedicated line at a fixed baud rate.
pub struct NmeaReceiver {
    port: Box<dyn SerialPort>,
    decoder: SentenceDecoder,
}

impl NmeaReceiver {
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, GnssError> {
        info!("Opening NMEA receiver on {} at {} baud", port_name, baud_rate);

        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| {
                GnssError::ConnectionError(format!(
                    "Failed to open GPS port {}: {}",
                    port_name, e
                ))
            })?;

        Ok(Self {
            port,
            decoder: SentenceDecoder::new(),
        })
    }
}

impl NmeaSource for NmeaReceiver {
    fn pump(&mut self, acc: &mut FixAccumulator) -> Result<bool, GnssError> {
        let mut decoded = false;
        let mut buf = [0u8; RX_CHUNK];

        loop {
            let pending = self
                .port
                .bytes_to_read()
                .map_err(|e| GnssError::CommunicationError(format!("Serial query failed: {}", e)))?
                as usize;
            if pending == 0 {
                break;
            }

            let n = pending.min(buf.len());
            match self.port.read(&mut buf[..n]) {
                Ok(0) => break,
                Ok(read) => {
                    decoded |= self.decoder.feed(&buf[..read], acc);
                    if acc.core_fields_complete() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76\r\n";
    const RMC: &str = "$GPRMC,092750.000,A,5321.6802,N,00630.3372,W,0.02,31.66,280511,,,A*43\r\n";

    #[test]
    fn test_gga_populates_position_altitude_hdop_sats() {
        let mut decoder = SentenceDecoder::new();
        let mut acc = FixAccumulator::new();

        assert!(decoder.feed(GGA.as_bytes(), &mut acc));

        assert!(acc.has_position());
        // 53 deg 21.6802 min north, 6 deg 30.3372 min west
        assert!((acc.latitude - 5336133).abs() <= 1, "lat {}", acc.latitude);
        assert!((acc.longitude + 650562).abs() <= 1, "lon {}", acc.longitude);
        assert_eq!(acc.altitude, 61);
        assert_eq!(acc.hdop, 1);
        assert_eq!(acc.sats, 8);
    }

    #[test]
    fn test_rmc_adds_speed() {
        let mut decoder = SentenceDecoder::new();
        let mut acc = FixAccumulator::new();

        decoder.feed(GGA.as_bytes(), &mut acc);
        decoder.feed(RMC.as_bytes(), &mut acc);

        assert!(acc.core_fields_complete());
        assert_eq!(acc.speed, 0); // 0.02 knots rounds down to zero m/s
    }

    #[test]
    fn test_partial_lines_are_buffered() {
        let mut decoder = SentenceDecoder::new();
        let mut acc = FixAccumulator::new();

        let (head, tail) = GGA.split_at(20);
        assert!(!decoder.feed(head.as_bytes(), &mut acc));
        assert!(decoder.feed(tail.as_bytes(), &mut acc));
        assert!(acc.has_position());
    }

    #[test]
    fn test_line_buffer_bounded_without_newlines() {
        let mut decoder = SentenceDecoder::new();
        let mut acc = FixAccumulator::new();

        // a receiver stuck emitting binary frames on the serial line
        let chunk = [0xB5u8; 1024];
        for _ in 0..1024 {
            decoder.feed(&chunk, &mut acc);
        }

        assert!(
            decoder.line_buffer.len() <= MAX_PENDING_LEN,
            "line buffer grew to {} bytes",
            decoder.line_buffer.len()
        );
    }

    #[test]
    fn test_partial_sentence_survives_preceding_garbage() {
        let mut decoder = SentenceDecoder::new();
        let mut acc = FixAccumulator::new();

        let (head, tail) = GGA.split_at(20);
        let mut bytes = vec![b'x'; 300];
        bytes.extend_from_slice(head.as_bytes());

        assert!(!decoder.feed(&bytes, &mut acc));
        assert!(decoder.feed(tail.as_bytes(), &mut acc));
        assert!(acc.has_position());
    }

    #[test]
    fn test_garbage_lines_are_ignored() {
        let mut decoder = SentenceDecoder::new();
        let mut acc = FixAccumulator::new();

        assert!(!decoder.feed(b"not a sentence\r\n$GPXYZ,bad*00\r\n", &mut acc));
        assert!(!acc.has_position());
    }
}
