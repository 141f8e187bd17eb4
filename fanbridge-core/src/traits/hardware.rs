//! Board Peripherals
//!
//! ## PWM input capture
//!
//! The capture hardware is split in two halves:
//!
//! - The interrupt handlers (edge capture and counter overflow) own nothing.
//!   They call [`CaptureSession::on_edge`] and [`CaptureSession::on_overflow`]
//!   on a session shared with the control thread, and apply the returned
//!   [`EdgeAction`] to the timer registers.
//! - The control thread owns a [`CaptureDriver`] that arms the timer for a
//!   new session and disarms it before the session's slots are read.
//!
//! [`CaptureSession::on_edge`]: crate::capture::CaptureSession::on_edge
//! [`CaptureSession::on_overflow`]: crate::capture::CaptureSession::on_overflow
//! [`EdgeAction`]: crate::capture::EdgeAction

use crate::capture::CaptureSession;

/// Per-fan PWM outputs
pub trait FanOutputs {
    /// Drive `fan` at `duty` percent (0-100)
    fn set_duty(&mut self, fan: usize, duty: u8);
}

/// Raw analog samples for every temperature channel
///
/// Channel 0 is the MCU's internal die sensor, channels 1.. are the external
/// sensors in pin order.
pub trait AnalogSensors {
    /// One raw conversion result (10-bit on the reference MCU)
    fn sample(&mut self, sensor: usize) -> u16;
}

/// Direct read access to the PWM input pin
pub trait InputLine {
    /// Current logic level of the pin
    fn is_high(&mut self) -> bool;

    /// Delay between two samples of a majority vote
    ///
    /// One CPU cycle on the reference board. The default does nothing, which
    /// suits mocks.
    fn resample_delay(&mut self) {}
}

/// Timer control for PWM input capture
///
/// The driver also exposes the input pin, used when the edge timestamps look
/// implausible and the line is sampled directly instead.
pub trait CaptureDriver: InputLine {
    /// Clear the counter and flags, select the first edge and enable both
    /// the edge-capture and overflow interrupts for `session`
    fn arm(&mut self, session: &CaptureSession);

    /// Disable both capture interrupts
    fn disarm(&mut self);
}

impl<T: FanOutputs + ?Sized> FanOutputs for &mut T {
    fn set_duty(&mut self, fan: usize, duty: u8) {
        (**self).set_duty(fan, duty)
    }
}

impl<T: AnalogSensors + ?Sized> AnalogSensors for &mut T {
    fn sample(&mut self, sensor: usize) -> u16 {
        (**self).sample(sensor)
    }
}
