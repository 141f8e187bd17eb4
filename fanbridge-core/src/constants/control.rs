//! Control Loop and Calibration Grid Constants
//!
//! The calibration grid is a regular 2-D lattice: temperature buckets on one
//! axis, input duty buckets on the other. Both axes are snapped to fixed
//! steps so that bucket lookup is a single integer division.

// ===== CHANNEL COUNTS =====

/// Number of independent fan outputs.
///
/// The reference MCU has two free 8-bit timers with PWM output compare
/// units, one per fan. More fans must be wired in parallel.
pub const FANS: usize = 2;

/// Number of external analog temperature sensors (A0, A1, ...).
pub const TEMP_EXT_SENSORS: usize = 3;

/// Total temperature channels. Sensor 0 is always the internal die sensor.
pub const TEMP_SENSORS: usize = TEMP_EXT_SENSORS + 1;

// ===== CALIBRATION GRID =====

/// Lowest temperature covered by the mapping table (°C).
///
/// Anything colder is treated as this value.
pub const TEMP_MIN_C: i16 = 20;

/// Highest temperature covered by the mapping table (°C).
///
/// Anything hotter is treated as this value.
pub const TEMP_MAX_C: i16 = 55;

/// Temperature axis step (°C).
pub const TEMP_STEP_C: u8 = 5;

/// Duty axis step (percent).
pub const PWM_STEP_PCT: u8 = 5;

/// Number of temperature buckets for a temperature range and step.
pub const fn temp_bucket_count(min_c: i16, max_c: i16, step_c: u8) -> usize {
    ((max_c - min_c) as usize / step_c as usize) + 1
}

/// Number of duty buckets for a duty step.
pub const fn pwm_bucket_count(step_pct: u8) -> usize {
    (100 / step_pct as usize) + 1
}

/// Temperature buckets in the reference grid (20..=55 °C in 5 °C steps = 8).
pub const TEMP_BUCKETS: usize = temp_bucket_count(TEMP_MIN_C, TEMP_MAX_C, TEMP_STEP_C);

/// Duty buckets in the reference grid (0..=100 % in 5 % steps = 21).
pub const PWM_BUCKETS: usize = pwm_bucket_count(PWM_STEP_PCT);

// ===== DEFAULTS =====

/// Duty used for every mapping cell before calibration data is loaded,
/// and for every fan at power-on.
///
/// High enough to keep a typical server chassis cool while the controller
/// is still validating its calibration.
pub const DEFAULT_DUTY_PCT: u8 = 35;

/// Initial value of the PWM input filter.
pub const PWM_FILTER_INIT: f32 = 0.0;

/// Default PWM input filter weight (a slow filter).
pub const PWM_FILTER_WEIGHT: f32 = 0.05;

/// Initial value of every temperature filter (°C).
pub const TEMP_FILTER_INIT: f32 = 20.0;

/// Default temperature filter weight.
pub const TEMP_FILTER_WEIGHT: f32 = 0.05;

// ===== REPORTING =====

/// Control loop iterations between two status reports.
pub const REPORT_FREQ: u16 = 70;
