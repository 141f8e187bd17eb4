//! Line Assembly
//!
//! Bytes arrive one at a time from the serial port. [`LineReader`] collects
//! them until `\n` and hands out the finished line. A line that does not
//! fit (including room for a terminator) is reported once as
//! [`ProtocolError::BufferOverflow`]; everything up to the next `\n` is then
//! dropped.
//!
//! ```rust
//! use fanbridge_protocol::reader::LineReader;
//!
//! let mut reader = LineReader::<160>::new();
//! let mut line = None;
//! for &b in b"GetCfg\n" {
//!     if let Ok(l) = reader.feed(b) {
//!         line = Some(l.len());
//!     }
//! }
//! assert_eq!(line, Some(6));
//! ```

use heapless::Vec;

use crate::errors::ProtocolError;

/// Default line buffer size
pub const LINE_BUFFER_SIZE: usize = 160;

/// Reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Collecting,
    /// A line was handed out; clear before the next byte
    Delivered,
    /// Overflowed; drop until end of line
    Discarding,
}

/// Newline-terminated line assembler with an `N`-byte buffer
#[derive(Debug)]
pub struct LineReader<const N: usize> {
    buf: Vec<u8, N>,
    mode: Mode,
}

impl<const N: usize> LineReader<N> {
    /// Empty reader
    pub const fn new() -> Self {
        Self { buf: Vec::new(), mode: Mode::Collecting }
    }

    /// Feed one byte
    ///
    /// Returns the completed line (without `\n`) when `byte` ends one,
    /// `WouldBlock` while a line is incomplete or being discarded.
    pub fn feed(&mut self, byte: u8) -> nb::Result<&str, ProtocolError> {
        if self.mode == Mode::Delivered {
            self.buf.clear();
            self.mode = Mode::Collecting;
        }

        match (self.mode, byte) {
            (Mode::Discarding, b'\n') => {
                self.mode = Mode::Collecting;
                Err(nb::Error::WouldBlock)
            }
            (Mode::Discarding, _) => Err(nb::Error::WouldBlock),
            (_, b'\n') => {
                self.mode = Mode::Delivered;
                core::str::from_utf8(&self.buf).map_err(|_| nb::Error::Other(ProtocolError::Syntax))
            }
            (_, b) => {
                // the last slot stays reserved, as for a C terminator
                if self.buf.len() + 1 >= N || self.buf.push(b).is_err() {
                    self.buf.clear();
                    self.mode = Mode::Discarding;
                    return Err(nb::Error::Other(ProtocolError::BufferOverflow));
                }
                Err(nb::Error::WouldBlock)
            }
        }
    }

    /// Drop any partial line and leave overflow mode
    pub fn reset(&mut self) {
        self.buf.clear();
        self.mode = Mode::Collecting;
    }

    /// Bytes buffered for the current line
    pub fn pending(&self) -> usize {
        match self.mode {
            Mode::Collecting => self.buf.len(),
            Mode::Delivered | Mode::Discarding => 0,
        }
    }
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}
