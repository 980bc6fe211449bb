use log::debug;

use super::checksum::fletcher8;
use crate::utils::error::GnssError;

pub const SYNC_CHAR_1: u8 = 0xB5;
pub const SYNC_CHAR_2: u8 = 0x62;

// Largest payload we accept; anything bigger is a corrupted length field.
const MAX_PAYLOAD_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxFrame {
    pub class: u8,
    pub id: u8,
    pub payload: Vec<u8>,
}

impl UbxFrame {
    pub fn new(class: u8, id: u8, payload: Vec<u8>) -> Self {
        Self { class, id, payload }
    }

    /// Empty-payload poll request for the given message.
    pub fn poll(class: u8, id: u8) -> Self {
        Self::new(class, id, Vec::new())
    }

    pub fn is(&self, class: u8, id: u8) -> bool {
        self.class == class && self.id == id
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.payload.len() as u16;
        let mut body = Vec::with_capacity(4 + self.payload.len());
        body.push(self.class);
        body.push(self.id);
        body.extend_from_slice(&len.to_le_bytes());
        body.extend_from_slice(&self.payload);

        let (ck_a, ck_b) = fletcher8(&body);

        let mut out = Vec::with_capacity(body.len() + 4);
        out.push(SYNC_CHAR_1);
        out.push(SYNC_CHAR_2);
        out.extend_from_slice(&body);
        out.push(ck_a);
        out.push(ck_b);
        out
    }
}

#[derive(Debug)]
enum State {
    Sync0,
    Sync1,
    Class,
    Id,
    Length0,
    Length1,
    Body,
    Checksum0,
    Checksum1,
}

/// Incremental frame decoder. Feed bytes one at a time; resynchronizes on
/// garbage between frames and rejects frames with a bad checksum.
pub struct FrameParser {
    state: State,
    class: u8,
    id: u8,
    length: u16,
    payload: Vec<u8>,
    ck_a: u8,
    ck_b: u8,
    rx_ck_a: u8,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: State::Sync0,
            class: 0,
            id: 0,
            length: 0,
            payload: Vec::new(),
            ck_a: 0,
            ck_b: 0,
            rx_ck_a: 0,
        }
    }

    fn reset(&mut self) {
        self.state = State::Sync0;
        self.payload = Vec::new();
        self.ck_a = 0;
        self.ck_b = 0;
    }

    fn update_checksum(&mut self, byte: u8) {
        self.ck_a = self.ck_a.wrapping_add(byte);
        self.ck_b = self.ck_b.wrapping_add(self.ck_a);
    }

    /// Push one byte; returns a frame (or checksum error) when one completes.
    pub fn push(&mut self, byte: u8) -> Option<Result<UbxFrame, GnssError>> {
        match self.state {
            State::Sync0 => {
                if byte == SYNC_CHAR_1 {
                    self.state = State::Sync1;
                }
            }
            State::Sync1 => {
                if byte == SYNC_CHAR_2 {
                    self.ck_a = 0;
                    self.ck_b = 0;
                    self.state = State::Class;
                } else {
                    self.state = State::Sync0;
                }
            }
            State::Class => {
                self.class = byte;
                self.update_checksum(byte);
                self.state = State::Id;
            }
            State::Id => {
                self.id = byte;
                self.update_checksum(byte);
                self.state = State::Length0;
            }
            State::Length0 => {
                self.length = byte as u16;
                self.update_checksum(byte);
                self.state = State::Length1;
            }
            State::Length1 => {
                self.length |= (byte as u16) << 8;
                self.update_checksum(byte);

                if self.length as usize > MAX_PAYLOAD_LEN {
                    debug!("Discarding frame with implausible length {}", self.length);
                    self.reset();
                } else if self.length == 0 {
                    self.payload = Vec::new();
                    self.state = State::Checksum0;
                } else {
                    self.payload = Vec::with_capacity(self.length as usize);
                    self.state = State::Body;
                }
            }
            State::Body => {
                self.payload.push(byte);
                self.update_checksum(byte);
                if self.payload.len() == self.length as usize {
                    self.state = State::Checksum0;
                }
            }
            State::Checksum0 => {
                self.rx_ck_a = byte;
                self.state = State::Checksum1;
            }
            State::Checksum1 => {
                let ok = self.rx_ck_a == self.ck_a && byte == self.ck_b;
                let frame = UbxFrame {
                    class: self.class,
                    id: self.id,
                    payload: std::mem::take(&mut self.payload),
                };
                self.reset();

                return Some(if ok {
                    Ok(frame)
                } else {
                    Err(GnssError::ChecksumMismatch)
                });
            }
        }
        None
    }
}
