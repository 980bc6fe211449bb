use nmea::Nmea;

const KNOTS_TO_MPS: f32 = 0.514444;

/// Fields gathered during one poll cycle, each with an acquired flag that
/// latches the first time the field is observed with a valid value.
///
/// A cycle is usable as soon as the position is acquired; the remaining
/// fields default to zero when they never arrive.
#[derive(Debug, Clone, Default)]
pub struct FixAccumulator {
    /// Degrees, scaled by 1e5.
    pub latitude: i32,
    /// Degrees, scaled by 1e5.
    pub longitude: i32,
    /// Meters.
    pub altitude: i32,
    /// Meters per second.
    pub speed: u16,
    pub hdop: u16,
    pub sats: u8,

    has_position: bool,
    has_altitude: bool,
    has_speed: bool,
    has_hdop: bool,
    has_sats: bool,
}

impl FixAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&mut self, latitude: i32, longitude: i32) {
        self.latitude = latitude;
        self.longitude = longitude;
        self.has_position = true;
    }

    pub fn set_altitude(&mut self, meters: i32) {
        self.altitude = meters;
        self.has_altitude = true;
    }

    pub fn set_speed(&mut self, mps: u16) {
        self.speed = mps;
        self.has_speed = true;
    }

    pub fn set_hdop(&mut self, hdop: u16) {
        self.hdop = hdop;
        self.has_hdop = true;
    }

    pub fn set_satellites(&mut self, sats: u8) {
        self.sats = sats;
        self.has_sats = true;
    }

    /// Take over whatever valid fields the sentence parser currently holds.
    pub fn observe(&mut self, parser: &Nmea) {
        if let (Some(lat), Some(lon)) = (parser.latitude, parser.longitude) {
            self.set_position((lat * 100_000.0) as i32, (lon * 100_000.0) as i32);
        }
        if let Some(alt) = parser.altitude {
            self.set_altitude(alt as i32);
        }
        if let Some(knots) = parser.speed_over_ground {
            self.set_speed((knots * KNOTS_TO_MPS) as u16);
        }
        if let Some(hdop) = parser.hdop {
            self.set_hdop(hdop as u16);
        }
        if let Some(sats) = parser.num_of_fix_satellites {
            self.set_satellites(sats.min(u8::MAX as u32) as u8);
        }
    }

    pub fn has_position(&self) -> bool {
        self.has_position
    }

    /// The record is worth transmitting if the position was acquired,
    /// whatever the state of the other fields.
    pub fn is_usable(&self) -> bool {
        self.has_position
    }

    /// Early-exit condition for the serial polling loop: position, altitude,
    /// speed and dilution acquired. Satellite count is allowed to lag.
    pub fn core_fields_complete(&self) -> bool {
        self.has_position && self.has_altitude && self.has_speed && self.has_hdop
    }
}
