pub mod detect;
pub mod nmea_receiver;
pub mod poller;
pub mod record;
pub mod sample;

pub use detect::{DetectedModule, ModuleDetector, ModuleKind};
pub use nmea_receiver::{NmeaReceiver, NmeaSource, SentenceDecoder};
pub use poller::FixPoller;
pub use record::{TrackerRecord, TRACKER_RECORD_LEN};
pub use sample::FixAccumulator;
