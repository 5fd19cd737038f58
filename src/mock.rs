//! In-memory [`Transport`] and [`Clock`] implementations
//!
//! Useful for testing code built on top of the driver and for decoding captured traffic
//! without hardware. Nothing here ever blocks: [`MockTransport`] answers immediately and
//! [`MockClock`] moves forward by a fixed tick every time it is asked for the time, so all
//! deadlines are eventually reached.
#[cfg(feature = "std")]
use core::fmt;
use core::time::Duration;
use heapless::Vec;

use crate::transport::{Clock, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockError {
    /// Receive buffer capacity exceeded
    RxFull,
    /// Transmit buffer capacity exceeded
    TxFull,
    /// Write failure requested with [`MockTransport::fail_writes`]
    WriteFailed,
    /// Read failure requested with [`MockTransport::fail_reads`]
    ReadFailed,
}

#[cfg(feature = "std")]
impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MockError::RxFull => write!(f, "receive buffer full"),
            MockError::TxFull => write!(f, "transmit buffer full"),
            MockError::WriteFailed => write!(f, "write failed"),
            MockError::ReadFailed => write!(f, "read failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MockError {}

/// Transport holding at most `N` received and `N` sent bytes
pub struct MockTransport<const N: usize> {
    rx: Vec<u8, N>,
    rx_pos: usize,
    reply: Vec<u8, N>,
    tx: Vec<u8, N>,
    fail_writes: bool,
    fail_reads: bool,
}

impl<const N: usize> MockTransport<N> {
    pub fn new() -> Self {
        Self {
            rx: Vec::new(),
            rx_pos: 0,
            reply: Vec::new(),
            tx: Vec::new(),
            fail_writes: false,
            fail_reads: false,
        }
    }

    /// Makes `bytes` readable right away
    pub fn push_rx(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        self.ltrim();
        self.rx
            .extend_from_slice(bytes)
            .map_err(|_| MockError::RxFull)
    }

    /// Makes `bytes` readable once the next write happens, the way a sensor answers a command
    pub fn reply_with(&mut self, bytes: &[u8]) -> Result<(), MockError> {
        self.reply
            .extend_from_slice(bytes)
            .map_err(|_| MockError::RxFull)
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Everything written so far
    pub fn sent(&self) -> &[u8] {
        &self.tx
    }

    pub fn clear_sent(&mut self) {
        self.tx.clear();
    }

    /// Number of received bytes nobody read yet
    pub fn unread(&self) -> usize {
        self.rx.len() - self.rx_pos
    }

    // forget already consumed bytes so the capacity can be reused
    fn ltrim(&mut self) {
        if self.rx_pos == 0 {
            return;
        }
        let mut rest = Vec::new();
        // rest is never longer than rx
        let _ = rest.extend_from_slice(&self.rx[self.rx_pos..]);
        self.rx = rest;
        self.rx_pos = 0;
    }
}

impl<const N: usize> Default for MockTransport<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Transport for MockTransport<N> {
    type Error = MockError;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockError::WriteFailed);
        }
        self.tx
            .extend_from_slice(bytes)
            .map_err(|_| MockError::TxFull)?;
        if !self.reply.is_empty() {
            let reply = core::mem::take(&mut self.reply);
            self.push_rx(&reply)?;
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(MockError::ReadFailed);
        }
        Ok(self.unread())
    }

    fn read_byte(&mut self, _timeout: Duration) -> Result<Option<u8>, Self::Error> {
        if self.fail_reads {
            return Err(MockError::ReadFailed);
        }
        match self.rx.get(self.rx_pos) {
            Some(&byte) => {
                self.rx_pos += 1;
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(MockError::ReadFailed);
        }
        let count = buf.len().min(self.unread());
        buf[..count].copy_from_slice(&self.rx[self.rx_pos..self.rx_pos + count]);
        self.rx_pos += count;
        Ok(count)
    }
}

/// Clock advancing by `tick` on every [`Clock::now`] call and by the requested amount on
/// every [`Clock::delay`]
pub struct MockClock {
    now: Duration,
    tick: Duration,
}

impl MockClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            tick,
        }
    }

    /// Time passed so far, without advancing the clock
    pub fn elapsed(&self) -> Duration {
        self.now
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Clock for MockClock {
    fn now(&mut self) -> Duration {
        self.now = self.now.saturating_add(self.tick);
        self.now
    }

    fn delay(&mut self, duration: Duration) {
        self.now = self.now.saturating_add(duration);
    }
}
