//! Constants for fanbridge Core
//!
//! Every numeric value the controller depends on lives here, with the
//! reason it has that value. The defaults describe the reference board: an
//! AVR-class MCU sitting between a server mainboard's fan header and two
//! fans, with the internal die sensor plus three MCP9701 analog sensors.
//!
//! ## Organization
//!
//! - **Control**: fan/sensor counts, calibration grid, defaults, reporting
//! - **Capture**: PWM input measurement thresholds and sentinels
//! - **Sensors**: raw-to-Celsius conversion coefficients
//! - **Store**: persisted layout constants
//!
//! Grid dimensions are derived here with `const fn` so that the table types
//! and the persisted layout agree at compile time.

/// Fan count, sensor count, calibration grid and control loop cadence.
pub mod control;

/// PWM input capture thresholds and sentinel values.
pub mod capture;

/// Sensor conversion coefficients.
pub mod sensors;

/// Persisted layout constants.
pub mod store;

pub use control::{
    FANS, TEMP_EXT_SENSORS, TEMP_SENSORS, TEMP_MIN_C, TEMP_MAX_C, TEMP_STEP_C,
    PWM_STEP_PCT, TEMP_BUCKETS, PWM_BUCKETS, DEFAULT_DUTY_PCT, REPORT_FREQ,
};

pub use capture::{
    PWM_IN_RESAMPLE, PERIOD_TOLERANCE_TICKS, MAX_MISSED_PERIODS,
    SENTINEL_LINE_LOW, SENTINEL_LINE_HIGH, TICK_US,
};

pub use store::CHECKSUM_MAGIC;
