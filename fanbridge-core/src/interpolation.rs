//! Calibration Table and Bilinear Interpolation
//!
//! Each fan owns a 2-D table of output duties indexed by temperature bucket
//! and input-duty bucket. Buckets sit on a regular grid:
//!
//! ```text
//!   temperature axis: TEMP_MIN, TEMP_MIN + TEMP_STEP, ..., TEMP_MAX   (T buckets)
//!   duty axis:        0, PWM_STEP, 2*PWM_STEP, ..., 100               (P buckets)
//! ```
//!
//! ## Bilinear Interpolation
//!
//! For an input between grid points the four surrounding cells are blended,
//! first along the duty axis, then along the temperature axis:
//!
//! ```text
//!   v1  = (Q[t1][p1]*(PS-dp) + Q[t1][p2]*dp) / PS
//!   v2  = (Q[t2][p1]*(PS-dp) + Q[t2][p2]*dp) / PS
//!   out = (v1*(TS-dt) + v2*dt) / TS
//! ```
//!
//! where `dp`/`dt` are the remainders of the input past the lower grid line.
//! On a grid line the remainder is zero and the upper index equals the lower
//! one, so grid points come back exactly. There is no extrapolation: inputs
//! are clamped to the covered range first.
//!
//! ## Memory Usage
//!
//! The reference grid (8 x 21 bytes per fan, two fans) is 336 bytes.

use crate::constants::control::{
    DEFAULT_DUTY_PCT, PWM_STEP_PCT, TEMP_MAX_C, TEMP_MIN_C, TEMP_STEP_C,
};
use crate::errors::{ConfigError, ConfigResult};

/// Grid spacing of the calibration table
///
/// Computed once and checked against the table dimensions; immutable for the
/// life of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    temp_min: i16,
    temp_max: i16,
    temp_step: u8,
    pwm_step: u8,
}

impl Geometry {
    /// 20..=55 °C in 5 °C steps, 0..=100 % in 5 % steps
    pub const fn reference() -> Self {
        Self {
            temp_min: TEMP_MIN_C,
            temp_max: TEMP_MAX_C,
            temp_step: TEMP_STEP_C,
            pwm_step: PWM_STEP_PCT,
        }
    }

    /// Validated geometry
    ///
    /// Both steps must be non-zero and divide their axis exactly.
    pub fn new(temp_min: i16, temp_max: i16, temp_step: u8, pwm_step: u8) -> ConfigResult<Self> {
        if temp_step == 0 || pwm_step == 0 {
            return Err(ConfigError::InvalidGeometry { reason: "zero step" });
        }
        if temp_max <= temp_min {
            return Err(ConfigError::InvalidGeometry { reason: "empty temperature range" });
        }
        if (temp_max as i32 - temp_min as i32) % temp_step as i32 != 0 {
            return Err(ConfigError::InvalidGeometry { reason: "temperature step does not divide range" });
        }
        if 100 % pwm_step != 0 {
            return Err(ConfigError::InvalidGeometry { reason: "duty step does not divide 100" });
        }
        Ok(Self { temp_min, temp_max, temp_step, pwm_step })
    }

    /// Fail unless the geometry produces exactly `T` x `P` buckets
    pub fn check_dimensions<const T: usize, const P: usize>(&self) -> ConfigResult<()> {
        if self.temp_buckets() != T {
            return Err(ConfigError::InvalidGeometry { reason: "temperature bucket count mismatch" });
        }
        if self.pwm_buckets() != P {
            return Err(ConfigError::InvalidGeometry { reason: "duty bucket count mismatch" });
        }
        Ok(())
    }

    /// Lowest covered temperature
    pub fn temp_min(&self) -> i16 {
        self.temp_min
    }

    /// Highest covered temperature
    pub fn temp_max(&self) -> i16 {
        self.temp_max
    }

    /// Temperature axis step
    pub fn temp_step(&self) -> u8 {
        self.temp_step
    }

    /// Duty axis step
    pub fn pwm_step(&self) -> u8 {
        self.pwm_step
    }

    /// Number of temperature buckets
    pub fn temp_buckets(&self) -> usize {
        (self.span() as usize / self.temp_step as usize) + 1
    }

    /// Width of the temperature axis, computed wide so extreme ranges fit
    #[inline]
    fn span(&self) -> u32 {
        (self.temp_max as i32 - self.temp_min as i32) as u32
    }

    /// Offset of `t` above `temp_min`; `t` must already be clamped
    #[inline]
    fn offset(&self, t: i16) -> u16 {
        (t as i32 - self.temp_min as i32) as u16
    }

    /// Number of duty buckets
    pub fn pwm_buckets(&self) -> usize {
        (100 / self.pwm_step as usize) + 1
    }

    /// Clamp `t` to `[temp_min, temp_max]`
    #[inline]
    pub fn normalize_temp(&self, t: i16) -> i16 {
        t.clamp(self.temp_min, self.temp_max)
    }

    /// Bucket containing `t`, rounding down and clamping to the table
    pub fn temp_index(&self, t: i16) -> usize {
        if t <= self.temp_min {
            return 0;
        }
        if t >= self.temp_max {
            return self.temp_buckets() - 1;
        }
        self.offset(t) as usize / self.temp_step as usize
    }

    /// Temperature at the grid line of bucket `index`
    pub fn temp_from_index(&self, index: usize) -> i16 {
        let t = self.temp_min as i32 + index as i32 * self.temp_step as i32;
        t.clamp(self.temp_min as i32, self.temp_max as i32) as i16
    }

    /// Lower bucket, upper bucket and remainder of a position on one axis
    #[inline]
    fn bracket(offset: u16, step: u8, buckets: usize) -> (usize, usize, u16) {
        let step = step as u16;
        let last = buckets - 1;
        let lower = (offset / step) as usize;
        let dist = offset % step;
        let upper = if dist != 0 { lower + 1 } else { lower };
        (lower.min(last), upper.min(last), dist)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::reference()
    }
}

/// Per-fan calibration tables, `[fan][temperature bucket][duty bucket]`
///
/// Every cell is a duty in 0..=100; writes enforce it so reads never check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable<const F: usize, const T: usize, const P: usize> {
    cells: [[[u8; P]; T]; F],
}

impl<const F: usize, const T: usize, const P: usize> MappingTable<F, T, P> {
    /// Every cell set to `duty`
    pub fn filled(duty: u8) -> ConfigResult<Self> {
        check_duty(duty)?;
        Ok(Self { cells: [[[duty; P]; T]; F] })
    }

    /// One row: the duty curve of `fan` at temperature bucket `temp`
    pub fn row(&self, fan: usize, temp: usize) -> Option<&[u8; P]> {
        self.cells.get(fan)?.get(temp)
    }

    /// Replace one row; every value must be at most 100
    pub fn set_row(&mut self, fan: usize, temp: usize, values: [u8; P]) -> ConfigResult<()> {
        if fan >= F {
            return Err(ConfigError::FanOutOfRange { index: fan, count: F });
        }
        if temp >= T {
            return Err(ConfigError::InvalidGeometry { reason: "temperature bucket out of range" });
        }
        for &v in &values {
            check_duty(v)?;
        }
        self.cells[fan][temp] = values;
        Ok(())
    }

    /// Single cell
    pub fn get(&self, fan: usize, temp: usize, duty: usize) -> Option<u8> {
        self.row(fan, temp)?.get(duty).copied()
    }

    /// Output duty of `fan` for input duty `duty_in` at temperature `temp`
    ///
    /// `duty_in` above 100 and temperatures outside the grid are clamped.
    /// The result is rounded half up.
    pub fn interpolate(&self, geometry: &Geometry, fan: usize, duty_in: u8, temp: i16) -> ConfigResult<u8> {
        let table = self
            .cells
            .get(fan)
            .ok_or(ConfigError::FanOutOfRange { index: fan, count: F })?;

        let temp_offset = geometry.offset(geometry.normalize_temp(temp));
        let (t1, t2, dt) = Geometry::bracket(temp_offset, geometry.temp_step, T);
        let (p1, p2, dp) = Geometry::bracket(duty_in.min(100) as u16, geometry.pwm_step, P);

        let ps = geometry.pwm_step as f32;
        let ts = geometry.temp_step as f32;
        let dp = dp as f32;
        let dt = dt as f32;

        let v1 = (table[t1][p1] as f32 * (ps - dp) + table[t1][p2] as f32 * dp) / ps;
        let v2 = (table[t2][p1] as f32 * (ps - dp) + table[t2][p2] as f32 * dp) / ps;
        let out = (v1 * (ts - dt) + v2 * dt) / ts;

        Ok(libm::floorf(out + 0.5) as u8)
    }
}

impl<const F: usize, const T: usize, const P: usize> Default for MappingTable<F, T, P> {
    fn default() -> Self {
        Self { cells: [[[DEFAULT_DUTY_PCT; P]; T]; F] }
    }
}

#[inline]
fn check_duty(value: u8) -> ConfigResult<()> {
    if value > 100 {
        return Err(ConfigError::DutyOutOfRange { value });
    }
    Ok(())
}
