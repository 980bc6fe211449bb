pub mod checksum;
pub mod client;
pub mod frame;

pub use checksum::fletcher8;
pub use client::{GnssBusClient, UbxClient};
pub use frame::{FrameParser, UbxFrame};
