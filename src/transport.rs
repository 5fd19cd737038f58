//! Boundary between the driver and the outside world
//!
//! [`Transport`] is the byte channel to the sensor (usually an UART), [`Clock`] is whatever
//! the platform uses to measure and wait for time. Both are blocking; the driver polls them
//! against deadlines.
use core::time::Duration;

/// Duplex byte channel to the sensor
pub trait Transport {
    type Error;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Number of bytes which can be read right now without blocking
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;

    /// Reads a single byte, `None` if nothing arrived within `timeout`
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, Self::Error>;

    /// Fills `buf` with bytes arriving within `timeout`, returns how many were read
    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;

    /// Drops everything received so far
    fn clear_input(&mut self) -> Result<(), Self::Error> {
        while self.bytes_available()? > 0 {
            if self.read_byte(Duration::ZERO)?.is_none() {
                break;
            }
        }
        Ok(())
    }
}

/// Monotonic time source
pub trait Clock {
    /// Time elapsed since an arbitrary, fixed point in the past
    fn now(&mut self) -> Duration;

    fn delay(&mut self, duration: Duration);
}

#[cfg(feature = "std")]
pub use self::std_impl::StdClock;

#[cfg(feature = "std")]
mod std_impl {
    use super::Clock;
    use core::time::Duration;
    use std::time::Instant;

    /// [`Clock`] backed by [`std::time::Instant`] and [`std::thread::sleep`]
    pub struct StdClock {
        started: Instant,
    }

    impl StdClock {
        pub fn new() -> Self {
            Self {
                started: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for StdClock {
        fn now(&mut self) -> Duration {
            self.started.elapsed()
        }

        fn delay(&mut self, duration: Duration) {
            std::thread::sleep(duration)
        }
    }
}

#[cfg(feature = "serial")]
pub use self::serial::{SerialTransport, BAUD_RATE};

#[cfg(feature = "serial")]
mod serial {
    use super::Transport;
    use core::time::Duration;
    use serialport::{ClearBuffer, SerialPort};
    use std::io::{self, Read, Write};
    use std::time::Instant;

    /// HPMA115C0 talks 9600 baud, 8N1
    pub const BAUD_RATE: u32 = 9_600;

    /// [`Transport`] over a [`serialport::SerialPort`]
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        pub fn new(port: Box<dyn SerialPort>) -> Self {
            Self { port }
        }

        /// Opens `path` with the sensor's line settings
        pub fn open(path: &str) -> Result<Self, serialport::Error> {
            let port = serialport::new(path, BAUD_RATE)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(Duration::from_millis(100))
                .open()?;
            Ok(Self::new(port))
        }

        pub fn into_inner(self) -> Box<dyn SerialPort> {
            self.port
        }
    }

    impl Transport for SerialTransport {
        type Error = serialport::Error;

        fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.port.write_all(bytes)?;
            self.port.flush()?;
            Ok(())
        }

        fn bytes_available(&mut self) -> Result<usize, Self::Error> {
            Ok(self.port.bytes_to_read()? as usize)
        }

        fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, Self::Error> {
            let mut buf = [0u8; 1];
            match self.read_exact(&mut buf, timeout)? {
                1 => Ok(Some(buf[0])),
                _ => Ok(None),
            }
        }

        fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Self::Error> {
            let started = Instant::now();
            let mut filled = 0;
            while filled < buf.len() {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    // a zero timeout still picks up what is already buffered
                    if timeout.is_zero() && self.port.bytes_to_read()? > 0 {
                        self.port.set_timeout(Duration::from_millis(1))?;
                    } else {
                        break;
                    }
                } else {
                    self.port.set_timeout(timeout - elapsed)?;
                }
                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(filled)
        }

        fn clear_input(&mut self) -> Result<(), Self::Error> {
            self.port.clear(ClearBuffer::Input)
        }
    }
}

#[cfg(feature = "embedded-io")]
pub use self::embedded::EmbeddedIoTransport;

#[cfg(feature = "embedded-io")]
mod embedded {
    use super::{Clock, Transport};
    use core::time::Duration;
    use embedded_io::{Read, ReadReady, Write};

    /// [`Transport`] over any UART implementing the blocking [`embedded_io`] traits
    ///
    /// Reads never block on the UART: it is only read when [`ReadReady::read_ready`] says so,
    /// and `C` decides when a timeout ran out.
    pub struct EmbeddedIoTransport<U, C> {
        uart: U,
        clock: C,
    }

    impl<U, C> EmbeddedIoTransport<U, C> {
        pub fn new(uart: U, clock: C) -> Self {
            Self { uart, clock }
        }

        pub fn release(self) -> (U, C) {
            (self.uart, self.clock)
        }
    }

    impl<U, C> Transport for EmbeddedIoTransport<U, C>
    where
        U: Read + ReadReady + Write,
        C: Clock,
    {
        type Error = U::Error;

        fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.uart.write_all(bytes)?;
            self.uart.flush()
        }

        // ReadReady only tells whether at least one byte is waiting
        fn bytes_available(&mut self) -> Result<usize, Self::Error> {
            Ok(usize::from(self.uart.read_ready()?))
        }

        fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, Self::Error> {
            let mut buf = [0u8; 1];
            match self.read_exact(&mut buf, timeout)? {
                1 => Ok(Some(buf[0])),
                _ => Ok(None),
            }
        }

        fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Self::Error> {
            let deadline = self.clock.now().saturating_add(timeout);
            let mut filled = 0;
            while filled < buf.len() {
                if self.uart.read_ready()? {
                    match self.uart.read(&mut buf[filled..])? {
                        0 => break,
                        n => filled += n,
                    }
                } else if self.clock.now() >= deadline {
                    break;
                }
            }
            Ok(filled)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::frame::reader::{FrameError, FrameReader};
        use crate::frame::{Command, InboundFrame, MAX_PAYLOAD_LENGTH};
        use crate::mock::MockClock;
        use crate::sensor::{Error, Hpma115c0};
        use core::convert::Infallible;
        use embedded_io::ErrorType;

        /// UART answering every write with the staged reply
        #[derive(Default)]
        struct Uart {
            rx: Vec<u8>,
            reply: Vec<u8>,
            tx: Vec<u8>,
        }

        impl ErrorType for Uart {
            type Error = Infallible;
        }

        impl Read for Uart {
            fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
                let count = buf.len().min(self.rx.len());
                buf[..count].copy_from_slice(&self.rx[..count]);
                self.rx.drain(..count);
                Ok(count)
            }
        }

        impl ReadReady for Uart {
            fn read_ready(&mut self) -> Result<bool, Self::Error> {
                Ok(!self.rx.is_empty())
            }
        }

        impl Write for Uart {
            fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
                self.tx.extend_from_slice(buf);
                self.rx.append(&mut self.reply);
                Ok(buf.len())
            }

            fn flush(&mut self) -> Result<(), Self::Error> {
                Ok(())
            }
        }

        fn measurement_frame() -> InboundFrame {
            InboundFrame::new(
                Command::ReadMeasurement,
                &[
                    0x00, 0x0a, 0x00, 0x19, 0x00, 0x0f, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00,
                ],
            )
            .unwrap()
        }

        #[test]
        fn test_read_frame_over_uart() {
            let frame = measurement_frame();
            let uart = Uart {
                rx: frame.to_bytes().to_vec(),
                ..Uart::default()
            };
            let mut transport = EmbeddedIoTransport::new(uart, MockClock::default());

            let mut clock = MockClock::default();
            let received = FrameReader::default()
                .read_frame(&mut transport, &mut clock, MAX_PAYLOAD_LENGTH)
                .unwrap();
            assert_eq!(received, frame);
            assert!(received.validate(Command::ReadMeasurement).is_ok());
        }

        #[test]
        fn test_read_exact_stops_at_deadline() {
            let uart = Uart {
                rx: vec![0x01, 0x02],
                ..Uart::default()
            };
            let mut transport = EmbeddedIoTransport::new(uart, MockClock::default());

            let mut buf = [0u8; 4];
            assert_eq!(
                transport.read_exact(&mut buf, Duration::from_millis(10)),
                Ok(2)
            );
            assert_eq!(&buf[..2], &[0x01, 0x02]);
            assert_eq!(transport.read_byte(Duration::ZERO), Ok(None));

            let (_, clock) = transport.release();
            assert!(clock.elapsed() >= Duration::from_millis(10));
        }

        #[test]
        fn test_sensor_over_uart() {
            let uart = Uart {
                // stale auto send data, flushed before the request
                rx: vec![0x40, 0x05],
                reply: measurement_frame().to_bytes().to_vec(),
                ..Uart::default()
            };
            let transport = EmbeddedIoTransport::new(uart, MockClock::default());
            let mut sensor = Hpma115c0::new(transport, MockClock::default());

            let m = sensor.read_particle_measurement().unwrap();
            assert_eq!([m.pm1_0, m.pm2_5, m.pm4_0, m.pm10], [10, 25, 15, 32]);

            assert_eq!(
                sensor.read_particle_measurement(),
                Err(Error::Frame(FrameError::SyncTimeout))
            );

            let (transport, _) = sensor.release();
            let (uart, _) = transport.release();
            assert_eq!(
                uart.tx,
                vec![0x68, 0x01, 0x04, 0x93, 0x68, 0x01, 0x04, 0x93]
            );
        }
    }
}
