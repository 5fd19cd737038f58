//! Synchronization on the response stream
//!
//! [`FrameReader`] turns a possibly noisy byte stream into a candidate [`InboundFrame`]. It
//! only cares about framing: whether the frame answers the right command and has a correct
//! checksum is decided by [`InboundFrame::validate`].
#[cfg(feature = "std")]
use core::fmt;
use core::time::Duration;

use super::{InboundFrame, PayloadVec, MAX_RESPONSE_SIZE, RESPONSE_HEAD};
use crate::transport::{Clock, Transport};

/// HEAD and LEN bytes, consumed before the body is read into the buffer
const HEADER_SIZE: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// How long to look for [`RESPONSE_HEAD`]
    pub sync: Duration,
    /// Pause after the head byte so the rest of the burst can arrive
    pub settle: Duration,
    /// How long to wait for the length byte
    pub length: Duration,
    /// How long to wait for the frame body
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            sync: Duration::from_millis(100),
            settle: Duration::from_millis(1),
            length: Duration::from_millis(100),
            read: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError<E> {
    /// No response head seen in time
    SyncTimeout,
    /// Head seen, length byte never came
    LengthTimeout,
    /// Declared length does not fit the buffers, stream is out of sync or frame unsupported
    InvalidLength(u8),
    /// Stream stalled in the middle of the frame body
    ShortRead { expected: usize, received: usize },
    Transport(E),
}

#[cfg(feature = "std")]
impl<E: fmt::Display> fmt::Display for FrameError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameError::SyncTimeout => write!(f, "timed out waiting for response head"),
            FrameError::LengthTimeout => write!(f, "timed out waiting for response length"),
            FrameError::InvalidLength(len) => write!(f, "invalid response length {}", len),
            FrameError::ShortRead { expected, received } => write!(
                f,
                "response cut short: expected {} bytes, received {}",
                expected, received
            ),
            FrameError::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for FrameError<E> {}

pub struct FrameReader {
    timeouts: Timeouts,
    buf: [u8; MAX_RESPONSE_SIZE],
}

impl FrameReader {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            buf: [0; MAX_RESPONSE_SIZE],
        }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Reads one response frame whose payload fits into `max_payload_len` bytes
    pub fn read_frame<T: Transport, C: Clock>(
        &mut self,
        transport: &mut T,
        clock: &mut C,
        max_payload_len: usize,
    ) -> Result<InboundFrame, FrameError<T::Error>> {
        self.buf = [0; MAX_RESPONSE_SIZE];

        self.sync(transport, clock)?;
        clock.delay(self.timeouts.settle);

        let length = self.read_length(transport, clock)?;
        let len = length as usize;
        if len == 0 || len + 1 > MAX_RESPONSE_SIZE - HEADER_SIZE || len - 1 > max_payload_len {
            log::warn!(
                "rejecting response length {}, payload capacity {}",
                length,
                max_payload_len
            );
            return Err(FrameError::InvalidLength(length));
        }

        // CMD, payload and checksum
        let body = &mut self.buf[..len + 1];
        let received = transport
            .read_exact(body, self.timeouts.read)
            .map_err(FrameError::Transport)?;
        if received < body.len() {
            return Err(FrameError::ShortRead {
                expected: body.len(),
                received,
            });
        }

        // len - 1 <= MAX_RESPONSE_SIZE - HEADER_SIZE - 2, fits PayloadVec
        let payload =
            PayloadVec::from_slice(&body[1..len]).map_err(|_| FrameError::InvalidLength(length))?;
        let frame = InboundFrame::from_parts(length, body[0], payload, body[len]);
        log::debug!(
            "received frame cmd={:#04x} len={} checksum={:#04x}",
            frame.command(),
            length,
            frame.checksum()
        );
        Ok(frame)
    }

    fn sync<T: Transport, C: Clock>(
        &self,
        transport: &mut T,
        clock: &mut C,
    ) -> Result<(), FrameError<T::Error>> {
        let deadline = clock.now().saturating_add(self.timeouts.sync);
        let mut skipped = 0usize;
        loop {
            let now = clock.now();
            if now >= deadline {
                break;
            }
            match transport
                .read_byte(deadline - now)
                .map_err(FrameError::Transport)?
            {
                Some(RESPONSE_HEAD) => {
                    if skipped > 0 {
                        log::debug!("skipped {} bytes before response head", skipped);
                    }
                    return Ok(());
                }
                Some(_) => skipped += 1,
                None => break,
            }
        }
        log::debug!("no response head, {} bytes skipped", skipped);
        Err(FrameError::SyncTimeout)
    }

    fn read_length<T: Transport, C: Clock>(
        &self,
        transport: &mut T,
        clock: &mut C,
    ) -> Result<u8, FrameError<T::Error>> {
        let deadline = clock.now().saturating_add(self.timeouts.length);
        while transport
            .bytes_available()
            .map_err(FrameError::Transport)?
            == 0
        {
            if clock.now() >= deadline {
                return Err(FrameError::LengthTimeout);
            }
        }
        transport
            .read_byte(Duration::ZERO)
            .map_err(FrameError::Transport)?
            .ok_or(FrameError::LengthTimeout)
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(Timeouts::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Command, ValidationError, MAX_PAYLOAD_LENGTH};
    use crate::mock::{MockClock, MockError, MockTransport};

    type TestTransport = MockTransport<64>;

    fn measurement_frame() -> InboundFrame {
        InboundFrame::new(
            Command::ReadMeasurement,
            &[
                0x00, 0x0a, 0x00, 0x19, 0x00, 0x0f, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00,
            ],
        )
        .unwrap()
    }

    fn read(
        transport: &mut TestTransport,
        max_payload_len: usize,
    ) -> Result<InboundFrame, FrameError<MockError>> {
        let mut clock = MockClock::default();
        FrameReader::default().read_frame(transport, &mut clock, max_payload_len)
    }

    #[test]
    fn test_read_frame() {
        let frame = measurement_frame();
        let mut transport = TestTransport::new();
        transport.push_rx(&frame.to_bytes()).unwrap();

        assert_eq!(read(&mut transport, MAX_PAYLOAD_LENGTH), Ok(frame));
        assert_eq!(transport.unread(), 0);
    }

    #[test]
    fn test_read_scenario_bytes() {
        let mut transport = TestTransport::new();
        transport
            .push_rx(&[
                0x40, 0x0d, 0x04, 0x00, 0x0a, 0x00, 0x19, 0x00, 0x0f, 0x00, 0x20, 0x00, 0x00,
                0x00, 0x00, 0x5d,
            ])
            .unwrap();
        let frame = read(&mut transport, 12).unwrap();
        assert_eq!(frame.length(), 13);
        assert_eq!(frame.command(), 0x04);
        assert_eq!(frame.payload().len(), 12);
        assert_eq!(frame.checksum(), 0x5d);
        assert!(frame.validate(Command::ReadMeasurement).is_ok());
    }

    #[test]
    fn test_resync_after_garbage() {
        let frame = measurement_frame();
        let mut transport = TestTransport::new();
        transport.push_rx(&[0xa5, 0xa5, 0x00, 0xff, 0x13]).unwrap();
        transport.push_rx(&frame.to_bytes()).unwrap();

        assert_eq!(read(&mut transport, MAX_PAYLOAD_LENGTH), Ok(frame));
    }

    #[test]
    fn test_sync_timeout_without_head() {
        let mut transport = TestTransport::new();
        transport.push_rx(&[0xa5, 0xa5, 0x00, 0xff]).unwrap();
        assert_eq!(
            read(&mut transport, MAX_PAYLOAD_LENGTH),
            Err(FrameError::SyncTimeout)
        );
    }

    #[test]
    fn test_sync_timeout_when_head_comes_too_late() {
        let mut transport = TestTransport::new();
        transport.push_rx(&[0x00; 40]).unwrap();
        transport.push_rx(&measurement_frame().to_bytes()).unwrap();

        let mut clock = MockClock::default();
        let mut reader = FrameReader::new(Timeouts {
            sync: Duration::from_millis(10),
            ..Timeouts::default()
        });
        assert_eq!(
            reader.read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH),
            Err(FrameError::SyncTimeout)
        );
        assert!(clock.elapsed() <= Duration::from_millis(12));
        assert!(transport.unread() > 0);
    }

    #[test]
    fn test_length_timeout() {
        let mut transport = TestTransport::new();
        transport.push_rx(&[0x40]).unwrap();

        let mut clock = MockClock::default();
        let mut reader = FrameReader::default();
        assert_eq!(
            reader.read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH),
            Err(FrameError::LengthTimeout)
        );
        assert!(clock.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_zero_length_is_invalid() {
        let mut transport = TestTransport::new();
        transport.push_rx(&[0x40, 0x00, 0x04, 0xbc]).unwrap();
        assert_eq!(
            read(&mut transport, MAX_PAYLOAD_LENGTH),
            Err(FrameError::InvalidLength(0))
        );
    }

    #[test]
    fn test_length_larger_than_response_buffer() {
        let mut transport = TestTransport::new();
        transport.push_rx(&[0x40, 0x0e]).unwrap();
        transport.push_rx(&[0x00; 15]).unwrap();
        assert_eq!(read(&mut transport, 64), Err(FrameError::InvalidLength(0x0e)));
        // body was not consumed
        assert_eq!(transport.unread(), 15);
    }

    #[test]
    fn test_length_larger_than_caller_capacity() {
        let frame = measurement_frame();
        let mut transport = TestTransport::new();
        transport.push_rx(&frame.to_bytes()).unwrap();
        assert_eq!(read(&mut transport, 11), Err(FrameError::InvalidLength(0x0d)));
        assert_eq!(transport.unread(), 14);
    }

    #[test]
    fn test_garbage_length_byte() {
        let mut transport = TestTransport::new();
        transport.push_rx(&[0x40, 0xff, 0x01, 0x02]).unwrap();
        assert_eq!(
            read(&mut transport, MAX_PAYLOAD_LENGTH),
            Err(FrameError::InvalidLength(0xff))
        );
    }

    #[test]
    fn test_short_read() {
        let bytes = measurement_frame().to_bytes();
        let mut transport = TestTransport::new();
        transport.push_rx(&bytes[..10]).unwrap();
        assert_eq!(
            read(&mut transport, MAX_PAYLOAD_LENGTH),
            Err(FrameError::ShortRead {
                expected: 14,
                received: 8
            })
        );
    }

    #[test]
    fn test_reader_does_not_check_command_or_checksum() {
        let mut bytes = InboundFrame::new(Command::StopAutoSend, &[0x01, 0x02])
            .unwrap()
            .to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let mut transport = TestTransport::new();
        transport.push_rx(&bytes).unwrap();

        let frame = read(&mut transport, MAX_PAYLOAD_LENGTH).unwrap();
        assert_eq!(frame.command(), Command::StopAutoSend as u8);
        assert!(frame.validate(Command::StopAutoSend).is_err());
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let first = InboundFrame::new(Command::ReadAdjustmentCoefficient, &[0x64]).unwrap();
        let second = measurement_frame();
        let mut transport = TestTransport::new();
        transport.push_rx(&first.to_bytes()).unwrap();
        transport.push_rx(&second.to_bytes()).unwrap();

        let mut clock = MockClock::default();
        let mut reader = FrameReader::default();
        assert_eq!(
            reader.read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH),
            Ok(first)
        );
        assert_eq!(
            reader.read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH),
            Ok(second)
        );
    }

    #[test]
    fn test_longest_timeouts_do_not_overflow() {
        let longest = Timeouts {
            sync: Duration::MAX,
            settle: Duration::ZERO,
            length: Duration::MAX,
            read: Duration::MAX,
        };

        let mut transport = TestTransport::new();
        let mut clock = MockClock::default();
        let mut reader = FrameReader::new(longest);
        assert_eq!(
            reader.read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH),
            Err(FrameError::SyncTimeout)
        );

        let frame = measurement_frame();
        transport.push_rx(&frame.to_bytes()).unwrap();
        assert_eq!(
            reader.read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH),
            Ok(frame)
        );
    }

    #[test]
    fn test_header_bit_flips_rejected() {
        let bytes = measurement_frame().to_bytes();
        for bit in 0..8 {
            // HEAD
            let mut corrupted = bytes.clone();
            corrupted[0] ^= 1 << bit;
            let mut transport = TestTransport::new();
            transport.push_rx(&corrupted).unwrap();
            assert_eq!(
                read(&mut transport, MAX_PAYLOAD_LENGTH),
                Err(FrameError::SyncTimeout)
            );

            // LEN
            let mut corrupted = bytes.clone();
            corrupted[1] ^= 1 << bit;
            let mut transport = TestTransport::new();
            transport.push_rx(&corrupted).unwrap();
            match read(&mut transport, MAX_PAYLOAD_LENGTH) {
                Ok(frame) => assert!(
                    matches!(
                        frame.validate(Command::ReadMeasurement),
                        Err(ValidationError::ChecksumMismatch { .. })
                    ),
                    "length {:#04x} accepted",
                    corrupted[1]
                ),
                Err(e) => assert!(
                    matches!(
                        e,
                        FrameError::InvalidLength(_) | FrameError::ShortRead { .. }
                    ),
                    "length {:#04x} gave {:?}",
                    corrupted[1],
                    e
                ),
            }

            // CMD
            let mut corrupted = bytes.clone();
            corrupted[2] ^= 1 << bit;
            let mut transport = TestTransport::new();
            transport.push_rx(&corrupted).unwrap();
            let frame = read(&mut transport, MAX_PAYLOAD_LENGTH).unwrap();
            assert_eq!(
                frame.validate(Command::ReadMeasurement),
                Err(ValidationError::CommandMismatch {
                    expected: 0x04,
                    received: 0x04 ^ (1 << bit)
                })
            );
        }
    }
}
