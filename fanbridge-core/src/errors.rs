//! Error Types for the Control Core
//!
//! Errors here follow the same rules as everything else that runs on the
//! controller:
//!
//! 1. **No heap**: variants carry only integers and `&'static str`.
//! 2. **Copy**: errors are returned from the control loop and from command
//!    handlers by value; nothing is boxed.
//! 3. **Local recovery**: every error is handled by the caller that received
//!    it. Only the startup sequence turns a persistence failure into a global
//!    effect (forcing Failsafe).
//!
//! ## Error Categories
//!
//! - [`ConfigError`]: a command tried to write an out-of-range index or value.
//!   Nothing was mutated.
//! - [`StoreError`]: a persisted record failed validation or the backend
//!   refused an access. In-memory state is untouched.
//! - [`TemperatureError`]: a weighted average could not be formed.
//! - [`CaptureError`]: a capture session was polled that nobody armed, or
//!   that another consumer already took.
//!
//! Measurement ambiguity in the PWM capture is not an error: the capture
//! falls back to resampling the line and always yields a duty.

use thiserror_no_std::Error;

/// Result type for configuration writes
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Rejected configuration writes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Fan index not below the fan count
    #[error("Fan index {index} out of range (fans: {count})")]
    FanOutOfRange {
        /// Index supplied by the caller
        index: usize,
        /// Number of fans
        count: usize,
    },

    /// Temperature weight negative or not a number
    #[error("Temperature weight for sensor {sensor} is invalid")]
    InvalidWeight {
        /// Sensor whose weight was rejected
        sensor: usize,
    },

    /// Every temperature weight of a fan is zero
    #[error("Temperature weights sum to zero")]
    ZeroWeightSum,

    /// Filter weight outside [0, 1]
    #[error("Filter weight outside [0, 1]")]
    InvalidFilterWeight,

    /// Duty cycle above 100 %
    #[error("Duty {value} exceeds 100%")]
    DutyOutOfRange {
        /// Rejected duty value
        value: u8,
    },

    /// Calibration geometry inconsistent with the table dimensions
    #[error("Calibration geometry invalid: {reason}")]
    InvalidGeometry {
        /// What did not line up
        reason: &'static str,
    },

    /// Status report period of zero cycles
    #[error("Report period must be at least one cycle")]
    ZeroReportPeriod,

    /// Line resampling with zero samples
    #[error("Resample count must be at least one")]
    ZeroResampleCount,

    /// Filter start value is infinite or NaN
    #[error("Filter initial value is not finite")]
    NonFiniteFilterInit,
}

/// Persistence failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Stored checksum does not match the data bytes
    #[error("Checksum mismatch at {address:#06x}: stored {stored:#04x}, computed {computed:#04x}")]
    ChecksumMismatch {
        /// Start address of the record
        address: usize,
        /// Checksum byte read back
        stored: u8,
        /// Checksum computed over the data bytes
        computed: u8,
    },

    /// Checksum matched but the decoded values are not acceptable
    #[error("Invalid payload at {address:#06x}: {reason}")]
    InvalidPayload {
        /// Start address of the record
        address: usize,
        /// Which value was rejected
        reason: &'static str,
    },

    /// Access past the end of the backing store
    #[error("Access of {len} bytes at {address:#06x} exceeds capacity {capacity}")]
    OutOfBounds {
        /// Start address of the access
        address: usize,
        /// Length of the access
        len: usize,
        /// Capacity of the store
        capacity: usize,
    },

    /// The backend failed the read or write
    #[error("Storage backend failure: {reason}")]
    Backend {
        /// Backend-specific description
        reason: &'static str,
    },

    /// Record address out of range for the layout
    #[error("Record {index} does not exist")]
    NoSuchRecord {
        /// Index of the record
        index: usize,
    },
}

/// PWM input capture failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// The session was never started or another consumer already took it
    #[error("Capture session is idle")]
    SessionIdle,
}

/// Failures forming an effective temperature
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureError {
    /// The fan's weights sum to zero, the weighted mean is undefined
    #[error("Temperature weights of fan {fan} sum to zero")]
    ZeroWeightSum {
        /// Fan whose weights were used
        fan: usize,
    },

    /// Fan index not below the fan count
    #[error("Fan index {fan} out of range")]
    FanOutOfRange {
        /// Index supplied by the caller
        fan: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::FanOutOfRange { index, count } =>
                defmt::write!(fmt, "Fan {} out of range ({})", index, count),
            Self::InvalidWeight { sensor } =>
                defmt::write!(fmt, "Invalid weight for sensor {}", sensor),
            Self::ZeroWeightSum =>
                defmt::write!(fmt, "Weights sum to zero"),
            Self::InvalidFilterWeight =>
                defmt::write!(fmt, "Filter weight outside [0, 1]"),
            Self::DutyOutOfRange { value } =>
                defmt::write!(fmt, "Duty {} > 100", value),
            Self::InvalidGeometry { reason } =>
                defmt::write!(fmt, "Geometry: {}", reason),
            Self::ZeroReportPeriod =>
                defmt::write!(fmt, "Report period 0"),
            Self::ZeroResampleCount =>
                defmt::write!(fmt, "Resample count 0"),
            Self::NonFiniteFilterInit =>
                defmt::write!(fmt, "Filter init not finite"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StoreError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ChecksumMismatch { address, stored, computed } =>
                defmt::write!(fmt, "Checksum @{}: {} != {}", address, stored, computed),
            Self::InvalidPayload { address, reason } =>
                defmt::write!(fmt, "Payload @{}: {}", address, reason),
            Self::OutOfBounds { address, len, capacity } =>
                defmt::write!(fmt, "OOB @{}+{} (cap {})", address, len, capacity),
            Self::Backend { reason } =>
                defmt::write!(fmt, "Backend: {}", reason),
            Self::NoSuchRecord { index } =>
                defmt::write!(fmt, "No record {}", index),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CaptureError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::SessionIdle => defmt::write!(fmt, "Capture session idle"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TemperatureError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::ZeroWeightSum { fan } => defmt::write!(fmt, "Zero weight sum (fan {})", fan),
            Self::FanOutOfRange { fan } => defmt::write!(fmt, "Fan {} out of range", fan),
        }
    }
}
