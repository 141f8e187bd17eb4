//! Sensor Conversion Coefficients
//!
//! Both sensor kinds are converted with a straight line, so every constant
//! here ends up as a `(scale, offset)` pair in
//! [`SensorTransform`](crate::temperature::SensorTransform).

// ===== INTERNAL DIE SENSOR =====

/// ADC reading of the internal die sensor at 0 °C.
///
/// The datasheet suggests ~1 mV/°C; the application-note example is closer
/// to 1.1 with an offset of 288. These values come from bench measurements
/// and need per-chip calibration to be exact.
pub const INTERNAL_TEMP_OFFSET: f32 = 324.31;

/// ADC counts per °C for the internal die sensor.
pub const INTERNAL_TEMP_COEFF: f32 = 1.22;

// ===== MCP9701 =====

/// MCP9701 output voltage at 0 °C (V).
pub const MCP9701_V0: f32 = 0.400;

/// MCP9701 temperature coefficient (V/°C).
pub const MCP9701_TC: f32 = 0.0195;

/// ADC reference voltage (V).
///
/// Measured on the reference board when powered over USB, where a schottky
/// diode drops the nominal 5 V.
pub const MCP9701_VREF: f32 = 4.97;

/// ADC full-scale count.
pub const ADC_STEPS: f32 = 1024.0;

/// °C per ADC count for the MCP9701 (~0.249).
pub const MCP9701_SCALE: f32 = (MCP9701_VREF / MCP9701_TC) / ADC_STEPS;

/// °C subtracted after scaling (~20.51).
pub const MCP9701_OFFSET: f32 = MCP9701_V0 / MCP9701_TC;

// ===== DERIVED =====

/// °C per ADC count for the internal die sensor.
pub const INTERNAL_TEMP_SCALE: f32 = 1.0 / INTERNAL_TEMP_COEFF;

/// °C subtracted after scaling for the internal die sensor.
pub const INTERNAL_TEMP_SHIFT: f32 = INTERNAL_TEMP_OFFSET / INTERNAL_TEMP_COEFF;
