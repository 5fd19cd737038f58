//! Serial protocol driver for the Honeywell HPMA115C0 particle sensor.
//!
//! The host talks to the sensor with fixed four byte command frames and gets back length
//! prefixed, checksummed response frames. [`frame`] holds the wire format,
//! [`frame::reader`] the synchronization logic and [`sensor`] the driver which puts it all
//! together and latches the latest [`Measurement`].

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod frame;
pub mod measurement;
pub mod mock;
pub mod sensor;
pub mod transport;

// include defmt::Format implementations
// we don't want them derive()d in the modules unless defmt-impl feature is set
#[cfg(feature = "defmt-impl")]
pub mod defmt;

// reexport heapless
pub use heapless;

#[cfg(feature = "embedded-io")]
pub use embedded_io;

pub use frame::{Command, InboundFrame, OutboundFrame};
pub use measurement::Measurement;
pub use sensor::{Config, Error, Hpma115c0};
pub use transport::{Clock, Transport};
