//! Frame encoding and decoding for the co-processor link.
//!
//! Frame format:
//! - START (1 byte): 0x7E synchronization byte
//! - LENGTH (1 byte): payload length (0-240)
//! - TYPE (1 byte): message type identifier
//! - SEQ (1 byte): request sequence number, echoed by replies
//! - PAYLOAD (0-240 bytes): type-specific data
//! - CRC (1 byte): CRC-8 (poly 0x07, init 0x00) over LENGTH, TYPE, SEQ and PAYLOAD

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0x7E;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 240;

/// Bytes of framing around the payload (START + LENGTH + TYPE + SEQ + CRC)
pub const FRAME_OVERHEAD: usize = 5;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + MAX_PAYLOAD_SIZE;

const CRC8_POLY: u8 = 0x07;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// CRC mismatch
    InvalidCrc,
    /// Invalid frame structure or unknown message type
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: u8,
    pub seq: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

/// CRC-8 over a run of bytes, continuing from `crc`
pub fn crc8(mut crc: u8, bytes: &[u8]) -> u8 {
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

impl Frame {
    pub fn new(msg_type: u8, seq: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self {
            msg_type,
            seq,
            payload,
        })
    }

    /// Create a frame with no payload
    pub fn empty(msg_type: u8, seq: u8) -> Self {
        Self {
            msg_type,
            seq,
            payload: Vec::new(),
        }
    }

    fn crc(length: u8, msg_type: u8, seq: u8, payload: &[u8]) -> u8 {
        crc8(crc8(0, &[length, msg_type, seq]), payload)
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.payload.len();
        let frame_len = FRAME_OVERHEAD + len;
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let length = len as u8;
        buffer[0] = FRAME_START;
        buffer[1] = length;
        buffer[2] = self.msg_type;
        buffer[3] = self.seq;
        buffer[4..4 + len].copy_from_slice(&self.payload);
        buffer[4 + len] = Self::crc(length, self.msg_type, self.seq, &self.payload);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// Byte-at-a-time frame decoder
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    expected_length: u8,
    msg_type: u8,
    seq: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    Length,
    Type,
    Seq,
    Payload,
    Crc,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Start,
            buffer: Vec::new(),
            expected_length: 0,
            msg_type: 0,
            seq: 0,
        }
    }

    /// Drop any partially received frame
    pub fn reset(&mut self) {
        self.state = ParseState::Start;
        self.buffer.clear();
        self.expected_length = 0;
        self.msg_type = 0;
        self.seq = 0;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on parse error.
    /// After an error the parser is back to hunting for START.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::Start => {
                if byte == FRAME_START {
                    self.state = ParseState::Length;
                }
                Ok(None)
            }
            ParseState::Length => {
                if byte as usize > MAX_PAYLOAD_SIZE {
                    self.reset();
                    return Err(FrameError::InvalidFrame);
                }
                self.expected_length = byte;
                self.state = ParseState::Type;
                Ok(None)
            }
            ParseState::Type => {
                self.msg_type = byte;
                self.state = ParseState::Seq;
                Ok(None)
            }
            ParseState::Seq => {
                self.seq = byte;
                self.buffer.clear();
                self.state = if self.expected_length == 0 {
                    ParseState::Crc
                } else {
                    ParseState::Payload
                };
                Ok(None)
            }
            ParseState::Payload => {
                // Length was bounded when it was read
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.expected_length as usize {
                    self.state = ParseState::Crc;
                }
                Ok(None)
            }
            ParseState::Crc => {
                let expected =
                    Frame::crc(self.expected_length, self.msg_type, self.seq, &self.buffer);
                if byte != expected {
                    self.reset();
                    return Err(FrameError::InvalidCrc);
                }

                let frame = Frame {
                    msg_type: self.msg_type,
                    seq: self.seq,
                    payload: core::mem::take(&mut self.buffer),
                };
                self.reset();
                Ok(Some(frame))
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame and the number of bytes consumed to
    /// reach it; bytes after the frame are left for the next call.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (Result<Option<Frame>, FrameError>, usize) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                other => return (other, i + 1),
            }
        }
        (Ok(None), bytes.len())
    }
}
