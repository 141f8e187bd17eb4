//! Host Command Protocol for FanBridge
//!
//! ## Overview
//!
//! The controller talks to a host over a plain serial line. The host sends
//! one command per line; the controller answers every line with exactly one
//! response line and, independently, prints a status report every few
//! cycles.
//!
//! ```text
//!  host  ── "SetPwmFilt 0.1 0.05\n" ──→  LineReader ─→ Command::parse
//!                                                          │
//!  host  ←── "OK\r\n" / "E <msg>\r\n" ── Reply / ProtocolError ←┘ Command::execute
//!  host  ←── "*A PWM1_in:.. \r\n"        ReportLine (from CycleOutcome)
//! ```
//!
//! ## Line format
//!
//! - Tokens are separated by whitespace; a trailing `\r` is ignored.
//! - Lines longer than the buffer are answered with `E Buffer overflow`
//!   and dropped.
//! - Responses end with `\r\n`.
//!
//! Nothing here allocates. Output goes to any `core::fmt::Write`.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod command;
pub mod errors;
pub mod format;
pub mod parse;
pub mod reader;

use core::fmt::{self, Write};

use fanbridge_core::traits::ByteStore;
use fanbridge_core::{ConfigStore, ControllerState, StartupReport, StatusReport};

pub use command::Command;
pub use errors::{ProtocolError, ProtocolResult};
pub use format::{ConfigLine, FaultLine, Reply, ReportLine};
pub use reader::{LineReader, LINE_BUFFER_SIZE};

/// Line terminator of every response
pub const EOL: &str = "\r\n";

/// Parse and execute one line, then write its single response line
pub fn dispatch<W, B, const F: usize, const S: usize, const T: usize, const P: usize>(
    line: &str,
    controller: &mut ControllerState<F, S, T, P>,
    store: &mut ConfigStore<B, F, S, T, P>,
    out: &mut W,
) -> fmt::Result
where
    W: Write + ?Sized,
    B: ByteStore,
{
    match Command::<F, S, P>::parse(line).and_then(|command| command.execute(controller, store)) {
        Ok(reply) => write!(out, "{}{}", reply, EOL),
        Err(error) => write_error(out, error),
    }
}

fn write_error<W: Write + ?Sized>(out: &mut W, error: ProtocolError) -> fmt::Result {
    log_debug!("command rejected, code {}", error.code());
    write!(out, "E {}{}", error, EOL)
}

/// Power-on banner: version, dimensions and the startup fault, if any
pub fn write_banner<W, const F: usize, const S: usize, const T: usize, const P: usize>(
    out: &mut W,
    controller: &ControllerState<F, S, T, P>,
    startup: &StartupReport,
) -> fmt::Result
where
    W: Write + ?Sized,
{
    write!(out, "{}{}", Reply::<S, P>::Version, EOL)?;
    write!(out, "{}{}", ConfigLine(&controller.config_summary()), EOL)?;
    if let Some(fault) = &startup.fault {
        log_error!("startup fault reported to host");
        write!(out, "{}{}", FaultLine { fault, geometry: controller.geometry() }, EOL)?;
    }
    Ok(())
}

/// Periodic status line
pub fn write_report<W, const F: usize, const S: usize>(out: &mut W, report: &StatusReport<F, S>) -> fmt::Result
where
    W: Write + ?Sized,
{
    write!(out, "{}{}", ReportLine(report), EOL)
}

/// Serial command front end: a line reader feeding [`dispatch`]
#[derive(Debug, Default)]
pub struct Console<const N: usize = LINE_BUFFER_SIZE> {
    reader: LineReader<N>,
}

impl<const N: usize> Console<N> {
    /// Idle console
    pub const fn new() -> Self {
        Self { reader: LineReader::new() }
    }

    /// Feed one received byte; a completed line is executed and answered
    pub fn feed<W, B, const F: usize, const S: usize, const T: usize, const P: usize>(
        &mut self,
        byte: u8,
        controller: &mut ControllerState<F, S, T, P>,
        store: &mut ConfigStore<B, F, S, T, P>,
        out: &mut W,
    ) -> fmt::Result
    where
        W: Write + ?Sized,
        B: ByteStore,
    {
        match self.reader.feed(byte) {
            Ok(line) => dispatch(line, controller, store, out),
            Err(nb::Error::WouldBlock) => Ok(()),
            Err(nb::Error::Other(error)) => write_error(out, error),
        }
    }

    /// Feed a run of received bytes
    pub fn feed_all<W, B, const F: usize, const S: usize, const T: usize, const P: usize>(
        &mut self,
        bytes: &[u8],
        controller: &mut ControllerState<F, S, T, P>,
        store: &mut ConfigStore<B, F, S, T, P>,
        out: &mut W,
    ) -> fmt::Result
    where
        W: Write + ?Sized,
        B: ByteStore,
    {
        for &b in bytes {
            self.feed(b, controller, store, out)?;
        }
        Ok(())
    }
}
