//! HPMA115C0 driver
//!
//! [`Hpma115c0`] owns the transport and keeps the latest successfully decoded
//! [`Measurement`]. Every call runs to completion before returning: commands are written,
//! responses are awaited within the configured [`Timeouts`] and nothing is left in flight.
//!
//! Talking to a real sensor needs a serial port, so this is not run as a doctest:
//!
//! ```ignore
//! let transport = SerialTransport::open("/dev/ttyUSB0")?;
//! let mut sensor = Hpma115c0::new(transport, StdClock::new());
//! sensor.init()?;
//! let measurement = sensor.read_particle_measurement()?;
//! ```
use core::convert::TryFrom;
#[cfg(feature = "std")]
use core::fmt;
use core::time::Duration;

use crate::frame::reader::{FrameError, FrameReader, Timeouts};
use crate::frame::{Command, InboundFrame, OutboundFrame, ValidationError};
use crate::measurement::{DecodeError, Measurement};
use crate::transport::{Clock, Transport};

/// Payload of the read measurement response, 8 bytes of concentrations and 4 reserved
pub const MEASUREMENT_PAYLOAD_LENGTH: usize = 12;
/// Payload of the read adjustment coefficient response
pub const COEFFICIENT_PAYLOAD_LENGTH: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub timeouts: Timeouts,
    /// Pause before each of the commands sent by [`Hpma115c0::init`]
    pub init_delay: Duration,
}

impl Config {
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_init_delay(mut self, init_delay: Duration) -> Self {
        self.init_delay = init_delay;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            init_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<E> {
    Frame(FrameError<E>),
    Validation(ValidationError),
    /// Valid response, but not of the size the command answers with
    PayloadLength { expected: usize, received: usize },
    /// Command could not be sent
    Write(E),
}

impl<E> From<FrameError<E>> for Error<E> {
    fn from(e: FrameError<E>) -> Error<E> {
        Error::Frame(e)
    }
}

impl<E> From<ValidationError> for Error<E> {
    fn from(e: ValidationError) -> Error<E> {
        Error::Validation(e)
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Frame(e) => write!(f, "{}", e),
            Error::Validation(e) => write!(f, "{}", e),
            Error::PayloadLength { expected, received } => write!(
                f,
                "response payload has {} bytes, expected {}",
                received, expected
            ),
            Error::Write(e) => write!(f, "cannot send command: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

pub struct Hpma115c0<T, C> {
    transport: T,
    clock: C,
    reader: FrameReader,
    init_delay: Duration,
    latest: Measurement,
}

impl<T: Transport, C: Clock> Hpma115c0<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self::with_config(transport, clock, Config::default())
    }

    pub fn with_config(transport: T, clock: C, config: Config) -> Self {
        Self {
            transport,
            clock,
            reader: FrameReader::new(config.timeouts),
            init_delay: config.init_delay,
            latest: Measurement::default(),
        }
    }

    /// Starts measuring and switches auto send off, so data only comes when asked for
    pub fn init(&mut self) -> Result<(), Error<T::Error>> {
        self.clock.delay(self.init_delay);
        self.start_measurement()?;
        self.clock.delay(self.init_delay);
        self.disable_auto_send()?;
        log::debug!("sensor initialized");
        Ok(())
    }

    /// Asks the sensor for the current concentrations
    ///
    /// On success the result is also latched and available through [`Self::latest`]. On
    /// failure the latched measurement stays as it was.
    pub fn read_particle_measurement(&mut self) -> Result<Measurement, Error<T::Error>> {
        let frame = self.request(Command::ReadMeasurement, MEASUREMENT_PAYLOAD_LENGTH)?;
        let measurement = Measurement::try_from(frame.payload()).map_err(
            |DecodeError::PayloadTooShort(received)| Error::PayloadLength {
                expected: MEASUREMENT_PAYLOAD_LENGTH,
                received,
            },
        )?;
        log::debug!(
            "PM1.0={} PM2.5={} PM4.0={} PM10={}",
            measurement.pm1_0,
            measurement.pm2_5,
            measurement.pm4_0,
            measurement.pm10
        );
        self.latest = measurement;
        Ok(measurement)
    }

    /// Reads the customer adjustment coefficient (30 - 200, 100 by default)
    pub fn read_adjustment_coefficient(&mut self) -> Result<u8, Error<T::Error>> {
        let frame = self.request(
            Command::ReadAdjustmentCoefficient,
            COEFFICIENT_PAYLOAD_LENGTH,
        )?;
        Ok(frame.payload()[0])
    }

    pub fn start_measurement(&mut self) -> Result<(), Error<T::Error>> {
        self.send(Command::StartMeasurement)
    }

    pub fn stop_measurement(&mut self) -> Result<(), Error<T::Error>> {
        self.send(Command::StopMeasurement)
    }

    pub fn enable_auto_send(&mut self) -> Result<(), Error<T::Error>> {
        self.send(Command::EnableAutoSend)
    }

    pub fn disable_auto_send(&mut self) -> Result<(), Error<T::Error>> {
        self.send(Command::StopAutoSend)
    }

    /// Latest successfully read measurement, all zeros before the first one
    pub fn latest(&self) -> Measurement {
        self.latest
    }

    pub fn pm1_0(&self) -> u16 {
        self.latest.pm1_0
    }

    pub fn pm2_5(&self) -> u16 {
        self.latest.pm2_5
    }

    pub fn pm4_0(&self) -> u16 {
        self.latest.pm4_0
    }

    pub fn pm10(&self) -> u16 {
        self.latest.pm10
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Gives back the transport and clock
    pub fn release(self) -> (T, C) {
        (self.transport, self.clock)
    }

    // anything received before the command is stale, e.g. auto send packets or ACKs
    fn send(&mut self, command: Command) -> Result<(), Error<T::Error>> {
        let frame = OutboundFrame::from(command);
        self.transport
            .clear_input()
            .map_err(|e| Error::Frame(FrameError::Transport(e)))?;
        self.transport
            .write(&frame.to_bytes())
            .map_err(Error::Write)?;
        log::debug!(
            "sent command {:#04x} checksum={:#04x}",
            command as u8,
            frame.checksum()
        );
        Ok(())
    }

    fn request(
        &mut self,
        command: Command,
        payload_len: usize,
    ) -> Result<InboundFrame, Error<T::Error>> {
        self.send(command)?;
        let frame = self
            .reader
            .read_frame(&mut self.transport, &mut self.clock, payload_len)?;
        let payload = frame.validate(command).map_err(|e| {
            log::warn!("rejected response to {:?}: {:?}", command, e);
            e
        })?;
        if payload.len() != payload_len {
            return Err(Error::PayloadLength {
                expected: payload_len,
                received: payload.len(),
            });
        }
        Ok(frame)
    }
}
