//! PWM Input Duty-Cycle Capture
//!
//! The mainboard's fan header drives a PWM signal whose duty cycle is the
//! fan speed it asks for. This module measures it with a 16-bit timer in
//! input-capture mode.
//!
//! ## Capture protocol
//!
//! One session records four edge timestamps across six phases:
//!
//! ```text
//!  phase  edge         action
//!  0      first edge   slot 0 <- t
//!  1      same edge    slot 1 <- t, switch to the opposite edge
//!  2      opposite     skipped (may be stale after the edge switch)
//!  3      opposite     slot 2 <- t
//!  4      opposite     slot 3 <- t, disable interrupts
//!  5      complete
//! ```
//!
//! `slot1 - slot0` and `slot3 - slot2` are both one period. `slot3 - slot1`
//! is a whole number of periods plus one pulse, so the pulse width is that
//! span modulo the period. A missed edge only adds another period to the
//! span, which the modulo absorbs.
//!
//! If no edge arrives within a full counter range the line is frozen (0 % or
//! 100 %). The overflow handler samples the pin, fills all four slots with a
//! sentinel and completes the session.
//!
//! ## Sharing with interrupt handlers
//!
//! [`CaptureSession`] is the only state shared between interrupt handlers and
//! the control thread. Handlers store the slots with `Relaxed` and publish the
//! phase with `Release`; the control thread observes completion with
//! `Acquire`, disarms the timer and only then reads the slots.
//!
//! ```rust
//! use fanbridge_core::capture::{evaluate, CaptureOutcome, CaptureSession, PulsePolarity};
//!
//! let session = CaptureSession::new();
//! session.begin();
//! for t in [100u16, 1100, 1150, 1300, 2300] {
//!     session.on_edge(t);
//! }
//! let snapshot = session.take().unwrap();
//! match evaluate(&snapshot, PulsePolarity::Negative) {
//!     CaptureOutcome::Measured(timing) => assert_eq!(timing.duty(), 80.0),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use core::sync::atomic::{AtomicU16, AtomicU8, Ordering};

use crate::constants::capture::{
    MAX_MISSED_PERIODS, PERIOD_TOLERANCE_TICKS, PHASE_COMPLETE, PWM_IN_RESAMPLE,
    SENTINEL_LINE_HIGH, SENTINEL_LINE_LOW, TICK_US,
};
use crate::constants::control::PWM_FILTER_INIT;
use crate::errors::CaptureError;
use crate::filter::ExpFilter;
use crate::traits::{CaptureDriver, InputLine};

/// Phase of a session that was consumed or never started
const PHASE_IDLE: u8 = PHASE_COMPLETE + 1;

/// Which part of the period counts as "on"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PulsePolarity {
    /// The active part of the period is the low pulse (fan headers pull the
    /// line low; the reference board measures through an inverting stage)
    #[default]
    Negative,
    /// The active part of the period is the high pulse
    Positive,
}

impl PulsePolarity {
    /// Duty cycle of a line frozen at the given level
    pub fn level_duty(self, line_high: bool) -> f32 {
        match (self, line_high) {
            (Self::Negative, true) | (Self::Positive, false) => 0.0,
            (Self::Negative, false) | (Self::Positive, true) => 100.0,
        }
    }
}

/// What an interrupt handler should do to the timer after a call into the
/// session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAction {
    /// Keep capturing on the current edge
    Continue,
    /// Clear the capture flag and capture on the opposite edge from now on
    SwitchEdge,
    /// Session complete, disable both capture interrupts
    Disable,
    /// Session not active, nothing was recorded
    Ignore,
}

/// Shared state of one capture session
///
/// Place it in a `static` so that interrupt handlers can reach it:
///
/// ```rust
/// use fanbridge_core::capture::CaptureSession;
///
/// static PWM_IN: CaptureSession = CaptureSession::new();
/// ```
#[derive(Debug)]
pub struct CaptureSession {
    slots: [AtomicU16; 4],
    phase: AtomicU8,
}

impl CaptureSession {
    /// Idle session; handlers ignore it until [`begin`](Self::begin)
    pub const fn new() -> Self {
        Self {
            slots: [AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0)],
            phase: AtomicU8::new(PHASE_IDLE),
        }
    }

    /// Reset to phase 0. Call before arming the timer.
    pub fn begin(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
        self.phase.store(0, Ordering::Release);
    }

    /// Edge-capture interrupt: record `timestamp` and advance the phase
    pub fn on_edge(&self, timestamp: u16) -> EdgeAction {
        match self.phase.load(Ordering::Acquire) {
            0 => {
                self.slots[0].store(timestamp, Ordering::Relaxed);
                self.phase.store(1, Ordering::Release);
                EdgeAction::Continue
            }
            1 => {
                self.slots[1].store(timestamp, Ordering::Relaxed);
                self.phase.store(2, Ordering::Release);
                EdgeAction::SwitchEdge
            }
            2 => {
                self.phase.store(3, Ordering::Release);
                EdgeAction::Continue
            }
            3 => {
                self.slots[2].store(timestamp, Ordering::Relaxed);
                self.phase.store(4, Ordering::Release);
                EdgeAction::Continue
            }
            4 => {
                self.slots[3].store(timestamp, Ordering::Relaxed);
                self.phase.store(PHASE_COMPLETE, Ordering::Release);
                EdgeAction::Disable
            }
            _ => EdgeAction::Ignore,
        }
    }

    /// Overflow interrupt: the line did not move for a whole counter range
    ///
    /// `line_high` is the majority-voted pin level, see [`resample_line`].
    pub fn on_overflow(&self, line_high: bool) -> EdgeAction {
        if self.phase.load(Ordering::Acquire) >= PHASE_COMPLETE {
            return EdgeAction::Ignore;
        }
        let sentinel = if line_high { SENTINEL_LINE_HIGH } else { SENTINEL_LINE_LOW };
        for slot in &self.slots {
            slot.store(sentinel, Ordering::Relaxed);
        }
        self.phase.store(PHASE_COMPLETE, Ordering::Release);
        EdgeAction::Disable
    }

    /// Current phase (0-5, 6 when idle)
    pub fn phase(&self) -> u8 {
        self.phase.load(Ordering::Acquire)
    }

    /// True once the session reached phase 5 and was not consumed yet
    pub fn is_complete(&self) -> bool {
        self.phase() == PHASE_COMPLETE
    }

    /// Read the slots of a complete session without consuming it
    pub fn snapshot(&self) -> Option<CaptureSnapshot> {
        if !self.is_complete() {
            return None;
        }
        Some(self.read_slots())
    }

    /// Read the slots of a complete session and mark it idle
    ///
    /// Returns `None` if the session is still running or was already taken.
    pub fn take(&self) -> Option<CaptureSnapshot> {
        self.phase
            .compare_exchange(PHASE_COMPLETE, PHASE_IDLE, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| self.read_slots())
    }

    fn read_slots(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            ticks: [
                self.slots[0].load(Ordering::Relaxed),
                self.slots[1].load(Ordering::Relaxed),
                self.slots[2].load(Ordering::Relaxed),
                self.slots[3].load(Ordering::Relaxed),
            ],
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

/// The four timestamps of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureSnapshot {
    /// Raw counter values, slot order
    pub ticks: [u16; 4],
}

impl CaptureSnapshot {
    /// True when all four slots hold the same value (overflow sentinel)
    pub fn is_flat(&self) -> bool {
        let t = self.ticks;
        t[0] == t[1] && t[1] == t[2] && t[2] == t[3]
    }
}

/// Period and pulse width of an accepted measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseTiming {
    period: u16,
    pulse: u16,
    duty: f32,
}

impl PulseTiming {
    /// Period in timer ticks
    pub fn period_ticks(&self) -> u16 {
        self.period
    }

    /// Width of the captured pulse in timer ticks
    pub fn pulse_ticks(&self) -> u16 {
        self.pulse
    }

    /// Unfiltered duty cycle in percent
    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// Period in microseconds
    pub fn period_us(&self) -> f32 {
        self.period as f32 * TICK_US
    }

    /// Pulse width in microseconds
    pub fn pulse_us(&self) -> f32 {
        self.pulse as f32 * TICK_US
    }

    /// Signal frequency in kHz
    pub fn frequency_khz(&self) -> f32 {
        1000.0 / self.period_us()
    }
}

/// Result of evaluating a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureOutcome {
    /// Line frozen at one level
    Flatline {
        /// 0 or 100
        duty: f32,
    },
    /// Edge timestamps passed the plausibility checks
    Measured(PulseTiming),
    /// Edge timestamps look like noise; the line must be sampled directly
    Rejected {
        /// Difference between the two period estimates (ticks)
        period_diff: i32,
        /// Whole periods spanned by the width measurement
        periods: u16,
    },
}

/// Turn a completed snapshot into a duty cycle, or reject it
///
/// Pure: all counter arithmetic wraps at 16 bits, like the hardware.
pub fn evaluate(snapshot: &CaptureSnapshot, polarity: PulsePolarity) -> CaptureOutcome {
    let t = snapshot.ticks;

    if snapshot.is_flat() {
        return CaptureOutcome::Flatline {
            duty: polarity.level_duty(t[0] != SENTINEL_LINE_LOW),
        };
    }

    let period = t[3].wrapping_sub(t[2]);
    let candidate = t[1].wrapping_sub(t[0]);
    let width = t[3].wrapping_sub(t[1]);
    let period_diff = period as i32 - candidate as i32;

    if period == 0 {
        return CaptureOutcome::Rejected { period_diff, periods: 0 };
    }

    let pulse = width % period;
    let periods = width / period;

    if period_diff.unsigned_abs() >= PERIOD_TOLERANCE_TICKS as u32
        || pulse > period
        || periods >= MAX_MISSED_PERIODS
    {
        return CaptureOutcome::Rejected { period_diff, periods };
    }

    let active = match polarity {
        PulsePolarity::Negative => period - pulse,
        PulsePolarity::Positive => pulse,
    };
    let duty = active as f32 * 100.0 / period as f32;

    CaptureOutcome::Measured(PulseTiming { period, pulse, duty })
}

/// Majority vote over `samples` direct reads of the line
///
/// High if at least half of the samples were high.
pub fn resample_line<L: InputLine + ?Sized>(line: &mut L, samples: u16) -> bool {
    let mut highs: u16 = 0;
    for _ in 0..samples {
        if line.is_high() {
            highs += 1;
        }
        line.resample_delay();
    }
    highs >= samples / 2
}

/// Filtered duty-cycle measurement on top of a [`CaptureSession`]
#[derive(Debug, Clone)]
pub struct DutyCycleMeter {
    polarity: PulsePolarity,
    filter: ExpFilter,
    resample: u16,
    last: Option<CaptureOutcome>,
}

impl DutyCycleMeter {
    /// Meter with the given polarity, filter start value and resample count
    pub const fn new(polarity: PulsePolarity, initial: f32, resample: u16) -> Self {
        Self {
            polarity,
            filter: ExpFilter::new(initial),
            resample,
            last: None,
        }
    }

    /// Pulse polarity in use
    pub fn polarity(&self) -> PulsePolarity {
        self.polarity
    }

    /// Current filtered duty
    pub fn duty(&self) -> f32 {
        self.filter.value()
    }

    /// Outcome of the most recent evaluated session
    pub fn last_outcome(&self) -> Option<CaptureOutcome> {
        self.last
    }

    /// Overwrite the filter state
    pub fn reset_filter(&mut self, value: f32) {
        self.filter.reset(value);
    }

    /// Begin a new session and arm the timer for it
    pub fn start<D: CaptureDriver + ?Sized>(&mut self, session: &CaptureSession, driver: &mut D) {
        session.begin();
        driver.arm(session);
    }

    /// Complete the running session if it is done
    ///
    /// Returns `WouldBlock` until the session reaches phase 5. Then the timer
    /// is disarmed, the snapshot evaluated (falling back to sampling the line
    /// on rejection) and the raw duty folded into the filter with `weight`.
    ///
    /// A session that is idle, because it was never started or someone else
    /// took it, fails with [`CaptureError::SessionIdle`].
    pub fn poll<D: CaptureDriver + ?Sized>(
        &mut self,
        session: &CaptureSession,
        driver: &mut D,
        weight: f32,
    ) -> nb::Result<f32, CaptureError> {
        match session.phase() {
            PHASE_COMPLETE => {}
            PHASE_IDLE => return Err(nb::Error::Other(CaptureError::SessionIdle)),
            _ => return Err(nb::Error::WouldBlock),
        }
        driver.disarm();
        let snapshot = session
            .take()
            .ok_or(nb::Error::Other(CaptureError::SessionIdle))?;

        let outcome = evaluate(&snapshot, self.polarity);
        let raw = match outcome {
            CaptureOutcome::Flatline { duty } => {
                log_trace!("pwm in: flat line, duty {}", duty);
                duty
            }
            CaptureOutcome::Measured(timing) => {
                log_trace!(
                    "pwm in: period {} pulse {} duty {}",
                    timing.period_ticks(),
                    timing.pulse_ticks(),
                    timing.duty()
                );
                timing.duty()
            }
            CaptureOutcome::Rejected { period_diff, periods } => {
                let high = resample_line(driver, self.resample);
                log_debug!(
                    "pwm in: rejected (period diff {}, periods {}), line high: {}",
                    period_diff,
                    periods,
                    high
                );
                self.polarity.level_duty(high)
            }
        };
        self.last = Some(outcome);

        Ok(self.filter.apply(weight, raw))
    }

    /// Run one full session and spin until it completes
    ///
    /// If the session is lost to another consumer the previous filtered duty
    /// stands for this cycle.
    pub fn measure<D: CaptureDriver + ?Sized>(
        &mut self,
        session: &CaptureSession,
        driver: &mut D,
        weight: f32,
    ) -> f32 {
        self.start(session, driver);
        match nb::block!(self.poll(session, driver, weight)) {
            Ok(duty) => duty,
            Err(CaptureError::SessionIdle) => {
                driver.disarm();
                log_warn!("pwm in: capture session consumed elsewhere, keeping {}", self.filter.value());
                self.filter.value()
            }
        }
    }
}

impl Default for DutyCycleMeter {
    fn default() -> Self {
        Self::new(PulsePolarity::Negative, PWM_FILTER_INIT, PWM_IN_RESAMPLE)
    }
}
