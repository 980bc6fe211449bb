use log::warn;
use std::thread;
use std::time::{Duration, Instant};

use super::detect::ModuleKind;
use super::nmea_receiver::NmeaSource;
use super::record::TrackerRecord;
use super::sample::FixAccumulator;
use crate::diag::Diagnostics;
use crate::ubx::GnssBusClient;
use crate::utils::error::GnssError;

const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(10);
const SERIAL_IDLE_WAIT: Duration = Duration::from_millis(10);

/// Polls the detected receiver for a position fix and keeps the encoded
/// record. The record is only rewritten on a successful poll; after a failed
/// one it still holds the previous fix.
pub struct FixPoller {
    record: TrackerRecord,
    fix_timeout: Duration,
}

impl Default for FixPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl FixPoller {
    pub fn new() -> Self {
        Self {
            record: TrackerRecord::new(),
            fix_timeout: DEFAULT_FIX_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fix_timeout = timeout;
        self
    }

    pub fn record(&self) -> &TrackerRecord {
        &self.record
    }

    /// One poll attempt against whichever module was detected. Returns true
    /// and updates the record when a usable fix was acquired; any failure is
    /// reported as false and left for the caller's cadence to retry.
    pub fn poll(
        &mut self,
        module: ModuleKind,
        serial: Option<&mut dyn NmeaSource>,
        bus: Option<&mut dyn GnssBusClient>,
        diag: &mut Diagnostics,
    ) -> bool {
        diag.status("Trying to get fix from GPS");

        let sample = match module {
            ModuleKind::SerialNmea => match serial {
                Some(source) => self.poll_serial(source, diag),
                None => {
                    diag.status("Serial NMEA receiver not initialized");
                    return false;
                }
            },
            ModuleKind::BusGnss => match bus {
                Some(client) => self.poll_bus(client, diag),
                None => {
                    diag.status("Bus GNSS receiver not initialized");
                    return false;
                }
            },
            ModuleKind::Unknown => {
                diag.status("No valid GNSS module selected");
                return false;
            }
        };

        diag.status("GPS poll finished");

        match sample {
            Some(sample) if sample.is_usable() => {
                diag.status(&format!(
                    "Lat: {:.5} Lon: {:.5}",
                    sample.latitude as f64 / 100_000.0,
                    sample.longitude as f64 / 100_000.0
                ));
                self.record.encode(&sample);
                true
            }
            _ => {
                diag.status("No valid location found");
                false
            }
        }
    }

    /// Drain and decode sentences until position, altitude, speed and
    /// dilution are all acquired or the time budget runs out. Position alone
    /// is enough for success once the budget expires.
    fn poll_serial(
        &self,
        source: &mut dyn NmeaSource,
        diag: &mut Diagnostics,
    ) -> Option<FixAccumulator> {
        diag.status("Polling serial NMEA receiver");

        let mut acc = FixAccumulator::new();
        let deadline = Instant::now() + self.fix_timeout;

        loop {
            if let Err(e) = source.pump(&mut acc) {
                warn!("Serial receiver read error: {}", e);
            }
            if acc.core_fields_complete() {
                break;
            }
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(SERIAL_IDLE_WAIT);
        }

        Some(acc)
    }

    /// Single fix-quality query; only on a positive answer are the position
    /// fields read, once each. No retry loop and no time budget.
    fn poll_bus(
        &self,
        client: &mut dyn GnssBusClient,
        diag: &mut Diagnostics,
    ) -> Option<FixAccumulator> {
        diag.status("Polling bus GNSS receiver");

        match self.query_bus(client) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Bus receiver query failed: {}", e);
                None
            }
        }
    }

    fn query_bus(&self, client: &mut dyn GnssBusClient) -> Result<Option<FixAccumulator>, GnssError> {
        if !client.fix_ok()? {
            return Ok(None);
        }

        let mut acc = FixAccumulator::new();
        // native 1e-7 degrees down to the shared 1e-5 representation
        let latitude = client.latitude()? / 100;
        let longitude = client.longitude()? / 100;
        acc.set_position(latitude, longitude);
        acc.set_altitude(client.altitude_msl()? / 1000);
        acc.set_hdop(client.hdop()?);
        acc.set_satellites(client.satellites()?);

        Ok(Some(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn diag() -> Diagnostics {
        Diagnostics::new()
    }

    /// Scripted NMEA source: each pump applies the next batch of field
    /// updates to the accumulator.
    #[derive(Default)]
    struct ScriptedSource {
        steps: VecDeque<Vec<Field>>,
    }

    enum Field {
        Position(i32, i32),
        Altitude(i32),
        Speed(u16),
        Hdop(u16),
        Satellites(u8),
    }

    impl ScriptedSource {
        fn step(mut self, fields: Vec<Field>) -> Self {
            self.steps.push_back(fields);
            self
        }
    }

    impl NmeaSource for ScriptedSource {
        fn pump(&mut self, acc: &mut FixAccumulator) -> Result<bool, GnssError> {
            let Some(fields) = self.steps.pop_front() else {
                return Ok(false);
            };
            for field in &fields {
                match *field {
                    Field::Position(lat, lon) => acc.set_position(lat, lon),
                    Field::Altitude(m) => acc.set_altitude(m),
                    Field::Speed(v) => acc.set_speed(v),
                    Field::Hdop(h) => acc.set_hdop(h),
                    Field::Satellites(s) => acc.set_satellites(s),
                }
            }
            Ok(!fields.is_empty())
        }
    }

    /// Bus client scripted per call, counting every read issued.
    struct CountingBusClient {
        fix_ok: bool,
        latitude: i32,
        longitude: i32,
        altitude_mm: i32,
        hdop: u16,
        sats: u8,
        field_reads: usize,
    }

    impl CountingBusClient {
        fn without_fix() -> Self {
            Self {
                fix_ok: false,
                latitude: 0,
                longitude: 0,
                altitude_mm: 0,
                hdop: 0,
                sats: 0,
                field_reads: 0,
            }
        }

        fn with_fix(latitude: i32, longitude: i32) -> Self {
            Self {
                fix_ok: true,
                latitude,
                longitude,
                altitude_mm: 100_000,
                hdop: 120,
                sats: 9,
                field_reads: 0,
            }
        }
    }

    impl GnssBusClient for CountingBusClient {
        fn fix_ok(&mut self) -> Result<bool, GnssError> {
            Ok(self.fix_ok)
        }

        fn latitude(&mut self) -> Result<i32, GnssError> {
            self.field_reads += 1;
            Ok(self.latitude)
        }

        fn longitude(&mut self) -> Result<i32, GnssError> {
            self.field_reads += 1;
            Ok(self.longitude)
        }

        fn altitude_msl(&mut self) -> Result<i32, GnssError> {
            self.field_reads += 1;
            Ok(self.altitude_mm)
        }

        fn hdop(&mut self) -> Result<u16, GnssError> {
            self.field_reads += 1;
            Ok(self.hdop)
        }

        fn satellites(&mut self) -> Result<u8, GnssError> {
            self.field_reads += 1;
            Ok(self.sats)
        }
    }

    #[test]
    fn test_unknown_module_fails_and_keeps_record() {
        let mut poller = FixPoller::new();
        let before = poller.record().clone();

        assert!(!poller.poll(ModuleKind::Unknown, None, None, &mut diag()));
        assert_eq!(poller.record(), &before);
    }

    #[test]
    fn test_bus_without_fix_issues_no_field_reads() {
        let mut poller = FixPoller::new();
        let before = poller.record().clone();
        let mut client = CountingBusClient::without_fix();

        assert!(!poller.poll(ModuleKind::BusGnss, None, Some(&mut client), &mut diag()));
        assert_eq!(client.field_reads, 0);
        assert_eq!(poller.record(), &before);
    }

    #[test]
    fn test_bus_fix_normalizes_native_coordinates() {
        let mut poller = FixPoller::new();
        let mut client = CountingBusClient::with_fix(473851234, -122345678);

        assert!(poller.poll(ModuleKind::BusGnss, None, Some(&mut client), &mut diag()));
        assert_eq!(poller.record().latitude(), 4738512);
        assert_eq!(poller.record().longitude(), -1223456);
        assert_eq!(poller.record().altitude(), 100);
        assert_eq!(poller.record().satellites(), 9);
    }

    #[test]
    fn test_serial_early_exit_when_core_fields_arrive() {
        let mut poller = FixPoller::new(); // full 10 second budget
        let mut source = ScriptedSource::default()
            .step(vec![Field::Position(1234567, -7654321), Field::Hdop(12)])
            .step(vec![Field::Altitude(100), Field::Speed(5)]);

        let started = Instant::now();
        let ok = poller.poll(ModuleKind::SerialNmea, Some(&mut source), None, &mut diag());

        assert!(ok);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(poller.record().latitude(), 1234567);
        assert_eq!(poller.record().speed(), 5);
    }

    #[test]
    fn test_serial_position_only_succeeds_at_deadline() {
        let mut poller = FixPoller::new().with_timeout(Duration::from_millis(50));
        let mut source =
            ScriptedSource::default().step(vec![Field::Position(1234567, -7654321)]);

        assert!(poller.poll(ModuleKind::SerialNmea, Some(&mut source), None, &mut diag()));
        assert_eq!(poller.record().latitude(), 1234567);
    }

    #[test]
    fn test_serial_no_position_fails_despite_other_fields() {
        let mut poller = FixPoller::new().with_timeout(Duration::from_millis(50));
        let before = poller.record().clone();
        let mut source = ScriptedSource::default().step(vec![
            Field::Altitude(100),
            Field::Speed(5),
            Field::Hdop(12),
            Field::Satellites(8),
        ]);

        assert!(!poller.poll(ModuleKind::SerialNmea, Some(&mut source), None, &mut diag()));
        assert_eq!(poller.record(), &before);
    }

    #[test]
    fn test_failed_poll_keeps_previous_fix() {
        let mut poller = FixPoller::new();
        let mut client = CountingBusClient::with_fix(473851234, -122345678);
        assert!(poller.poll(ModuleKind::BusGnss, None, Some(&mut client), &mut diag()));
        let good = poller.record().clone();

        let mut dead = CountingBusClient::without_fix();
        assert!(!poller.poll(ModuleKind::BusGnss, None, Some(&mut dead), &mut diag()));
        assert_eq!(poller.record(), &good);
    }
}
