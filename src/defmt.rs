use defmt::Formatter;

use crate::frame::reader::FrameError;
use crate::frame::{Command, InboundFrame, OutboundFrame, ValidationError};
use crate::measurement::{DecodeError, Measurement};
use crate::mock::MockError;
use crate::sensor::Error as SensorError;

impl defmt::Format for Command {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "Command({=u8:#x})", *self as u8)
    }
}

impl defmt::Format for OutboundFrame {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "OutboundFrame {=[u8]:x}", &self.to_bytes()[..])
    }
}

impl defmt::Format for InboundFrame {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "InboundFrame {{ len: {=u8}, cmd: {=u8:#x}, payload: {=[u8]:x}, checksum: {=u8:#x} }}",
            self.length(),
            self.command(),
            self.payload(),
            self.checksum()
        )
    }
}

impl defmt::Format for ValidationError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            ValidationError::CommandMismatch { expected, received } => defmt::write!(
                fmt,
                "CommandMismatch {{ expected: {=u8:#x}, received: {=u8:#x} }}",
                *expected,
                *received
            ),
            ValidationError::ChecksumMismatch { expected, received } => defmt::write!(
                fmt,
                "ChecksumMismatch {{ expected: {=u8:#x}, received: {=u8:#x} }}",
                *expected,
                *received
            ),
        }
    }
}

impl<E: defmt::Format> defmt::Format for FrameError<E> {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            FrameError::SyncTimeout => defmt::write!(fmt, "SyncTimeout"),
            FrameError::LengthTimeout => defmt::write!(fmt, "LengthTimeout"),
            FrameError::InvalidLength(len) => defmt::write!(fmt, "InvalidLength({=u8})", *len),
            FrameError::ShortRead { expected, received } => defmt::write!(
                fmt,
                "ShortRead {{ expected: {=usize}, received: {=usize} }}",
                *expected,
                *received
            ),
            FrameError::Transport(e) => defmt::write!(fmt, "Transport({})", e),
        }
    }
}

impl defmt::Format for DecodeError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            DecodeError::PayloadTooShort(len) => {
                defmt::write!(fmt, "PayloadTooShort({=usize})", *len)
            }
        }
    }
}

impl defmt::Format for Measurement {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(
            fmt,
            "PM1.0={=u16} PM2.5={=u16} PM4.0={=u16} PM10={=u16}",
            self.pm1_0,
            self.pm2_5,
            self.pm4_0,
            self.pm10
        )
    }
}

impl<E: defmt::Format> defmt::Format for SensorError<E> {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            SensorError::Frame(e) => defmt::write!(fmt, "Frame({})", e),
            SensorError::Validation(e) => defmt::write!(fmt, "Validation({})", e),
            SensorError::PayloadLength { expected, received } => defmt::write!(
                fmt,
                "PayloadLength {{ expected: {=usize}, received: {=usize} }}",
                *expected,
                *received
            ),
            SensorError::Write(e) => defmt::write!(fmt, "Write({})", e),
        }
    }
}

impl defmt::Format for MockError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            MockError::RxFull => defmt::write!(fmt, "RxFull"),
            MockError::TxFull => defmt::write!(fmt, "TxFull"),
            MockError::WriteFailed => defmt::write!(fmt, "WriteFailed"),
            MockError::ReadFailed => defmt::write!(fmt, "ReadFailed"),
        }
    }
}
