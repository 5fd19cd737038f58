//! Particle concentrations reported by the sensor
use core::convert::TryFrom;
#[cfg(feature = "std")]
use core::fmt;

/// Bytes of the read measurement payload carrying the four concentrations
pub const MEASUREMENT_FIELDS_LENGTH: usize = 8;

/// Concentrations in µg/m³, as reported by a single read measurement response
///
/// All fields are zero until the first successful read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Measurement {
    pub pm1_0: u16,
    pub pm2_5: u16,
    pub pm4_0: u16,
    pub pm10: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    PayloadTooShort(usize),
}

#[cfg(feature = "std")]
impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DecodeError::PayloadTooShort(len) => write!(
                f,
                "measurement payload has {} bytes, at least {} needed",
                len, MEASUREMENT_FIELDS_LENGTH
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

impl TryFrom<&[u8]> for Measurement {
    type Error = DecodeError;

    /// Decodes big endian PM1.0, PM2.5, PM4.0 and PM10 at offsets 0, 2, 4 and 6.
    /// Anything after the first 8 bytes is reserved and ignored.
    fn try_from(payload: &[u8]) -> Result<Self, Self::Error> {
        if payload.len() < MEASUREMENT_FIELDS_LENGTH {
            return Err(DecodeError::PayloadTooShort(payload.len()));
        }
        let field = |offset: usize| u16::from_be_bytes([payload[offset], payload[offset + 1]]);
        Ok(Measurement {
            pm1_0: field(0),
            pm2_5: field(2),
            pm4_0: field(4),
            pm10: field(6),
        })
    }
}

#[cfg(feature = "std")]
impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PM1.0 {} µg/m³, PM2.5 {} µg/m³, PM4.0 {} µg/m³, PM10 {} µg/m³",
            self.pm1_0, self.pm2_5, self.pm4_0, self.pm10
        )
    }
}
