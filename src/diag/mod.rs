//! Diagnostic status lines fanned out to any number of text sinks.
//!
//! The core calls `Diagnostics::status` without knowing how many sinks are
//! attached or whether any of them is connected. Emission is best-effort; a
//! dead sink never fails a poll.

use log::{info, warn};
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;

use crate::utils::error::GnssError;

pub trait DiagSink: Send {
    fn emit(&mut self, line: &str);
    fn sink_type(&self) -> &str;
}

/// Local console sink, mirrored into the log.
pub struct ConsoleSink;

impl DiagSink for ConsoleSink {
    fn emit(&mut self, line: &str) {
        info!("{}", line);
    }

    fn sink_type(&self) -> &str {
        "console"
    }
}

/// Auxiliary text channel over a serial line, e.g. a wireless UART bridge.
pub struct SerialSink {
    port: Box<dyn SerialPort>,
}

impl SerialSink {
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, GnssError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| {
                GnssError::ConnectionError(format!(
                    "Failed to open diagnostic port {}: {}",
                    port_name, e
                ))
            })?;

        Ok(Self { port })
    }
}

impl DiagSink for SerialSink {
    fn emit(&mut self, line: &str) {
        if let Err(e) = self
            .port
            .write_all(line.as_bytes())
            .and_then(|_| self.port.write_all(b"\n"))
        {
            warn!("Diagnostic port write failed: {}", e);
        }
    }

    fn sink_type(&self) -> &str {
        "serial"
    }
}

#[derive(Default)]
pub struct Diagnostics {
    sinks: Vec<Box<dyn DiagSink>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn attach(&mut self, sink: Box<dyn DiagSink>) {
        info!("Attached diagnostic sink: {}", sink.sink_type());
        self.sinks.push(sink);
    }

    pub fn status(&mut self, msg: &str) {
        for sink in &mut self.sinks {
            sink.emit(msg);
        }
    }
}
