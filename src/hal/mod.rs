pub mod ddc;
pub mod power;

pub use ddc::{DdcTransport, LinuxDdc};
pub use power::{run_power_sequence, CdevPowerRail, PowerRail};
