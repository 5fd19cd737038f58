//! HPMA115C0 wire format
//!
//! Host sends fixed size command frames to the sensor:
//!
//! ```text
//! 68 01 CC KK
//! ```
//!
//! and the sensor answers with a length prefixed response frame:
//!
//! ```text
//! 40 LL CC <LL-1 payload bytes> KK
//! ```
//!
//! `CC` is a [`Command`] code and `KK` is a [`checksum`] which makes the sum of all bytes of
//! the frame equal to zero modulo 256.
use core::convert::TryFrom;
#[cfg(feature = "std")]
use core::fmt;
use heapless::Vec;

pub mod reader;

/// Head of every frame sent from host to the sensor
pub const COMMAND_HEAD: u8 = 0x68;
/// Head of every frame sent from the sensor to host
pub const RESPONSE_HEAD: u8 = 0x40;
/// Command frames never carry payload, so LEN is always 1
pub const COMMAND_LENGTH: u8 = 0x01;
pub const COMMAND_FRAME_SIZE: usize = 4;

/// Size of the internal response buffer, including HEAD and LEN bytes
pub const MAX_RESPONSE_SIZE: usize = 16;
/// HEAD, LEN, CMD and checksum
const RESPONSE_OVERHEAD: usize = 4;
pub const MAX_PAYLOAD_LENGTH: usize = MAX_RESPONSE_SIZE - RESPONSE_OVERHEAD;

pub type PayloadVec = Vec<u8, MAX_PAYLOAD_LENGTH>;
pub type ResponseVec = Vec<u8, MAX_RESPONSE_SIZE>;

/// Commands understood by the sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    StartMeasurement = 0x01,
    StopMeasurement = 0x02,
    ReadMeasurement = 0x04,
    SetAdjustmentCoefficient = 0x08,
    ReadAdjustmentCoefficient = 0x10,
    StopAutoSend = 0x20,
    EnableAutoSend = 0x40,
}

impl TryFrom<u8> for Command {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Command::StartMeasurement),
            0x02 => Ok(Command::StopMeasurement),
            0x04 => Ok(Command::ReadMeasurement),
            0x08 => Ok(Command::SetAdjustmentCoefficient),
            0x10 => Ok(Command::ReadAdjustmentCoefficient),
            0x20 => Ok(Command::StopAutoSend),
            0x40 => Ok(Command::EnableAutoSend),
            _ => Err("Unknown Command"),
        }
    }
}

#[cfg(feature = "std")]
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Command::StartMeasurement => write!(f, "start particle measurement"),
            Command::StopMeasurement => write!(f, "stop particle measurement"),
            Command::ReadMeasurement => write!(f, "read particle measurement"),
            Command::SetAdjustmentCoefficient => write!(f, "set adjustment coefficient"),
            Command::ReadAdjustmentCoefficient => write!(f, "read adjustment coefficient"),
            Command::StopAutoSend => write!(f, "stop auto send"),
            Command::EnableAutoSend => write!(f, "enable auto send"),
        }
    }
}

/// Computes the frame checksum of `bytes`: `(256 - sum) % 256`
pub fn checksum(bytes: &[u8]) -> u8 {
    checksum_of(bytes.iter().copied())
}

fn checksum_of(bytes: impl IntoIterator<Item = u8>) -> u8 {
    bytes.into_iter().fold(0u8, u8::wrapping_add).wrapping_neg()
}

/// Frame sent from host to the sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    command: Command,
    checksum: u8,
}

impl OutboundFrame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            checksum: checksum(&[COMMAND_HEAD, COMMAND_LENGTH, command as u8]),
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Bytes as they go over the wire
    pub fn to_bytes(&self) -> [u8; COMMAND_FRAME_SIZE] {
        [COMMAND_HEAD, COMMAND_LENGTH, self.command as u8, self.checksum]
    }
}

impl From<Command> for OutboundFrame {
    fn from(command: Command) -> Self {
        OutboundFrame::new(command)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Well formed frame answering a different command, e.g. a stale auto send packet
    CommandMismatch { expected: u8, received: u8 },
    ChecksumMismatch { expected: u8, received: u8 },
}

#[cfg(feature = "std")]
impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValidationError::CommandMismatch { expected, received } => write!(
                f,
                "response answers command {:#04x}, expected {:#04x}",
                received, expected
            ),
            ValidationError::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum mismatch: computed {:#04x}, received {:#04x}",
                expected, received
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ValidationError {}

/// Payload does not fit into [`MAX_PAYLOAD_LENGTH`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityError {
    pub len: usize,
}

/// Response frame as read from the wire, not validated yet
///
/// Only [`reader::FrameReader`] and [`InboundFrame::new`] create these. The length byte is
/// kept as received, `payload.len()` is always `length - 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFrame {
    length: u8,
    command: u8,
    payload: PayloadVec,
    checksum: u8,
}

impl InboundFrame {
    /// Builds a well formed response to `command`, as the sensor would send it
    pub fn new(command: Command, payload: &[u8]) -> Result<Self, CapacityError> {
        let payload = PayloadVec::from_slice(payload).map_err(|_| CapacityError {
            len: payload.len(),
        })?;
        let mut frame = InboundFrame {
            length: payload.len() as u8 + 1,
            command: command as u8,
            payload,
            checksum: 0,
        };
        frame.checksum = frame.computed_checksum();
        Ok(frame)
    }

    pub(crate) fn from_parts(length: u8, command: u8, payload: PayloadVec, checksum: u8) -> Self {
        InboundFrame {
            length,
            command,
            payload,
            checksum,
        }
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    fn header(&self) -> [u8; 3] {
        [RESPONSE_HEAD, self.length, self.command]
    }

    fn computed_checksum(&self) -> u8 {
        checksum_of(
            self.header()
                .into_iter()
                .chain(self.payload.iter().copied()),
        )
    }

    /// Checks the frame answers `expected` and is not corrupted, returns its payload
    pub fn validate(&self, expected: Command) -> Result<&[u8], ValidationError> {
        if self.command != expected as u8 {
            return Err(ValidationError::CommandMismatch {
                expected: expected as u8,
                received: self.command,
            });
        }

        let computed = self.computed_checksum();
        if computed != self.checksum {
            return Err(ValidationError::ChecksumMismatch {
                expected: computed,
                received: self.checksum,
            });
        }

        Ok(&self.payload)
    }

    /// Bytes as they go over the wire
    pub fn to_bytes(&self) -> ResponseVec {
        let mut bytes = ResponseVec::new();
        // payload is bounded by MAX_PAYLOAD_LENGTH so the whole frame fits
        bytes.extend(
            self.header()
                .into_iter()
                .chain(self.payload.iter().copied())
                .chain(Some(self.checksum)),
        );
        bytes
    }
}
