use super::sample::FixAccumulator;

pub const TRACKER_RECORD_LEN: usize = 14;

/// Fixed-layout binary record handed to the transport layer:
/// `[lat0..3, lon0..3, alt0, alt1, hdop, spd0, spd1, sats]`,
/// little-endian within each multi-byte field.
///
/// The record is overwritten in place on every successful poll; after a
/// failed poll it still holds the previous values, so consumers must check
/// the poll result before trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerRecord {
    bytes: [u8; TRACKER_RECORD_LEN],
}

impl TrackerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, sample: &FixAccumulator) {
        self.bytes[0..4].copy_from_slice(&sample.latitude.to_le_bytes());
        self.bytes[4..8].copy_from_slice(&sample.longitude.to_le_bytes());
        // altitude and hdop carry only their low bytes
        self.bytes[8..10].copy_from_slice(&(sample.altitude as u16).to_le_bytes());
        self.bytes[10] = sample.hdop as u8;
        self.bytes[11..13].copy_from_slice(&sample.speed.to_le_bytes());
        self.bytes[13] = sample.sats;
    }

    pub fn as_bytes(&self) -> &[u8; TRACKER_RECORD_LEN] {
        &self.bytes
    }

    /// Degrees, scaled by 1e5.
    pub fn latitude(&self) -> i32 {
        i32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    /// Degrees, scaled by 1e5.
    pub fn longitude(&self) -> i32 {
        i32::from_le_bytes([self.bytes[4], self.bytes[5], self.bytes[6], self.bytes[7]])
    }

    /// Meters.
    pub fn altitude(&self) -> i16 {
        i16::from_le_bytes([self.bytes[8], self.bytes[9]])
    }

    pub fn hdop(&self) -> u8 {
        self.bytes[10]
    }

    /// Meters per second.
    pub fn speed(&self) -> u16 {
        u16::from_le_bytes([self.bytes[11], self.bytes[12]])
    }

    pub fn satellites(&self) -> u8 {
        self.bytes[13]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut sample = FixAccumulator::new();
        sample.set_position(1234567, -7654321);
        sample.set_altitude(100);
        sample.set_speed(5);
        sample.set_hdop(12);
        sample.set_satellites(8);

        let mut record = TrackerRecord::new();
        record.encode(&sample);

        assert_eq!(record.latitude(), 1234567);
        assert_eq!(record.longitude(), -7654321);
        assert_eq!(record.altitude(), 100);
        assert_eq!(record.speed(), 5);
        assert_eq!(record.hdop(), 12);
        assert_eq!(record.satellites(), 8);
    }

    #[test]
    fn test_layout_is_little_endian() {
        let mut sample = FixAccumulator::new();
        sample.set_position(0x0403_0201, 0x0807_0605);
        sample.set_altitude(0x0B0A);
        sample.set_hdop(0x0C);
        sample.set_speed(0x0E0D);
        sample.set_satellites(0x0F);

        let mut record = TrackerRecord::new();
        record.encode(&sample);

        assert_eq!(
            record.as_bytes(),
            &[
                0x01, 0x02, 0x03, 0x04, // lat
                0x05, 0x06, 0x07, 0x08, // lon
                0x0A, 0x0B, // alt
                0x0C, // hdop
                0x0D, 0x0E, // speed
                0x0F, // sats
            ]
        );
    }

    #[test]
    fn test_hdop_truncates_to_one_byte() {
        let mut sample = FixAccumulator::new();
        sample.set_position(1, 1);
        sample.set_hdop(0x0304);

        let mut record = TrackerRecord::new();
        record.encode(&sample);

        assert_eq!(record.hdop(), 0x04);
    }

    #[test]
    fn test_negative_altitude_survives_low_word() {
        let mut sample = FixAccumulator::new();
        sample.set_position(1, 1);
        sample.set_altitude(-42);

        let mut record = TrackerRecord::new();
        record.encode(&sample);

        assert_eq!(record.altitude(), -42);
    }
}
