use thiserror::Error;

#[derive(Error, Debug)]
pub enum GnssError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Frame checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid response from receiver")]
    InvalidResponse,

    #[error("Receiver rejected request (NAK)")]
    NackReceived,

    #[error("Timeout waiting for receiver")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for GnssError {
    fn from(err: std::io::Error) -> Self {
        GnssError::CommunicationError(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for GnssError {
    fn from(err: serde_json::Error) -> Self {
        GnssError::InvalidData(format!("JSON error: {}", err))
    }
}
