//! PWM Input Capture Constants
//!
//! The capture timer runs from the undivided 16 MHz clock, so one tick is
//! 62.5 ns and the 16-bit counter overflows after ~4.1 ms (~244 Hz). Any
//! input slower than that, or frozen at one level, ends in the overflow path.

/// Samples taken when the line level is resampled directly.
///
/// Used by the overflow handler and by the noise fallback. Should be even so
/// that the majority threshold is exact.
pub const PWM_IN_RESAMPLE: u16 = 100;

/// Maximum disagreement between the two period measurements (ticks).
///
/// Very short pulses are sometimes missed by the capture unit, which shows
/// up as two period estimates that disagree.
pub const PERIOD_TOLERANCE_TICKS: u16 = 50;

/// Width spans of this many periods or more are treated as garbage.
pub const MAX_MISSED_PERIODS: u16 = 4;

/// Slot value written by the overflow handler when the line is held low.
pub const SENTINEL_LINE_LOW: u16 = 0;

/// Slot value written by the overflow handler when the line is held high.
pub const SENTINEL_LINE_HIGH: u16 = 100;

/// Capture timer tick length in microseconds (16 MHz, no prescaler).
pub const TICK_US: f32 = 0.0625;

/// Phase value at which a capture session is complete.
pub const PHASE_COMPLETE: u8 = 5;
