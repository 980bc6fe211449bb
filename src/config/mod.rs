pub mod settings;

pub use settings::{DiagConfig, TrackerConfig};
