//! GNSS tracker polling library
//!
//! Detects which of two interchangeable GNSS receiver modules is attached to
//! a tracker node (a binary-protocol receiver on the shared addressed bus, or
//! an NMEA receiver on a dedicated serial line), initializes the one found,
//! and polls it for position fixes normalized into a fixed 14-byte record for
//! the transport layer.

pub mod cli;
pub mod config;
pub mod diag;
pub mod gnss;
pub mod hal;
pub mod ubx;
pub mod utils;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use diag::{ConsoleSink, DiagSink, Diagnostics, SerialSink};
pub use gnss::{
    DetectedModule, FixAccumulator, FixPoller, ModuleDetector, ModuleKind, NmeaReceiver,
    NmeaSource, TrackerRecord,
};
pub use hal::{CdevPowerRail, DdcTransport, LinuxDdc, PowerRail};
pub use ubx::{GnssBusClient, UbxClient};
pub use utils::error::GnssError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
