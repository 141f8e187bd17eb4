//! Operating Modes and Controller Reports
//!
//! ```text
//!   any ──── ModeManual(d) ───→ Manual
//!   any ──── ModeAuto ────────→ Auto      (persisted data not re-validated)
//!   any ──── ModeFailsafe ────→ Failsafe
//!   startup load failure ─────→ Failsafe
//!   undecodable mode tag ─────→ Failsafe
//! ```
//!
//! The mode is stored as its one-letter tag. A tag that decodes to none of
//! the three modes forces Failsafe.

use crate::errors::StoreError;
use crate::store::Region;

/// Which source drives the fan outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatingMode {
    /// Interpolate the calibration table from input duty and temperature
    Auto,
    /// Fixed per-fan duties
    Manual,
    /// Mirror the measured input duty
    Failsafe,
}

impl OperatingMode {
    /// One-letter tag used in reports
    pub const fn tag(self) -> u8 {
        match self {
            Self::Auto => b'A',
            Self::Manual => b'M',
            Self::Failsafe => b'F',
        }
    }

    /// Decode a tag
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'A' => Some(Self::Auto),
            b'M' => Some(Self::Manual),
            b'F' => Some(Self::Failsafe),
            _ => None,
        }
    }

    /// Tag as a `char`
    pub fn as_char(self) -> char {
        self.tag() as char
    }
}

/// Storage cell for the operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCell(u8);

impl ModeCell {
    /// Cell holding `mode`
    pub const fn new(mode: OperatingMode) -> Self {
        Self(mode.tag())
    }

    /// Current mode. An undecodable tag is rewritten to Failsafe.
    pub fn resolve(&mut self) -> OperatingMode {
        match OperatingMode::from_tag(self.0) {
            Some(mode) => mode,
            None => {
                log_error!("invalid operating mode tag {}, forcing failsafe", self.0);
                self.0 = OperatingMode::Failsafe.tag();
                OperatingMode::Failsafe
            }
        }
    }

    /// Current mode without repairing the cell
    pub fn peek(&self) -> Option<OperatingMode> {
        OperatingMode::from_tag(self.0)
    }

    /// Store `mode`
    pub fn set(&mut self, mode: OperatingMode) {
        self.0 = mode.tag();
    }

    /// Store a raw tag, bypassing decoding
    #[cfg(test)]
    pub(crate) fn set_raw(&mut self, tag: u8) {
        self.0 = tag;
    }
}

/// An explicit mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest<const F: usize> {
    /// Switch to Auto without re-validating persisted data
    Auto,
    /// Switch to Manual with one duty (0-100) per fan
    Manual([u8; F]),
    /// Switch to Failsafe
    Failsafe,
}

/// Periodic status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport<const F: usize, const S: usize> {
    /// Mode at the time of the report
    pub mode: OperatingMode,
    /// Filtered input duty, rounded
    pub duty_in: u8,
    /// Filtered reading of every sensor
    pub temps: [i16; S],
    /// Output duty of every fan
    pub outputs: [u8; F],
}

/// What one control cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome<const F: usize, const S: usize> {
    /// Mode the outputs were computed in
    pub mode: OperatingMode,
    /// Filtered input duty, rounded
    pub duty_in: u8,
    /// Duty sent to every fan
    pub outputs: [u8; F],
    /// Status LED level, toggles every cycle
    pub heartbeat: bool,
    /// Present once every report period
    pub report: Option<StatusReport<F, S>>,
}

/// Dimensions and grid of the controller, as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigSummary {
    /// Fan outputs
    pub fans: usize,
    /// Temperature sensors, internal one included
    pub sensors: usize,
    /// Duty axis step
    pub pwm_step: u8,
    /// Duty buckets
    pub pwm_buckets: usize,
    /// Lowest grid temperature
    pub temp_min: i16,
    /// Temperature axis step
    pub temp_step: u8,
    /// Highest grid temperature
    pub temp_max: i16,
    /// Temperature buckets
    pub temp_buckets: usize,
}

/// The persisted record that stopped the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupFault {
    /// Record that failed
    pub region: Region,
    /// Why it failed
    pub error: StoreError,
}

/// Result of the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupReport {
    /// Mode the controller starts in
    pub mode: OperatingMode,
    /// First failing record, if any
    pub fault: Option<StartupFault>,
}

impl StartupReport {
    /// True when every record loaded
    pub fn is_clean(&self) -> bool {
        self.fault.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for mode in [OperatingMode::Auto, OperatingMode::Manual, OperatingMode::Failsafe] {
            assert_eq!(OperatingMode::from_tag(mode.tag()), Some(mode));
        }
        assert_eq!(OperatingMode::from_tag(b'X'), None);
        assert_eq!(OperatingMode::Manual.as_char(), 'M');
    }

    #[test]
    fn invalid_tag_forces_failsafe() {
        let mut cell = ModeCell::new(OperatingMode::Auto);
        cell.set_raw(0x7F);
        assert_eq!(cell.peek(), None);
        assert_eq!(cell.resolve(), OperatingMode::Failsafe);
        assert_eq!(cell.peek(), Some(OperatingMode::Failsafe));
    }
}
