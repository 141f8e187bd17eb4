//! Exponential smoothing
//!
//! Every measurement channel (the PWM input and each temperature sensor) is
//! smoothed by a single-pole low-pass filter:
//!
//! ```text
//! state' = w * sample + (1 - w) * state
//! ```
//!
//! `w = 1` passes samples through unchanged, `w = 0` freezes the state.
//! Weights come from the command channel and from persistent storage, so
//! they are validated once in [`FilterWeights::new`] and never again in the
//! hot path.

use crate::constants::control::{PWM_FILTER_WEIGHT, TEMP_FILTER_WEIGHT};
use crate::errors::{ConfigError, ConfigResult};

/// Single-pole exponential filter state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpFilter {
    state: f32,
}

impl ExpFilter {
    /// Filter starting at `initial`
    pub const fn new(initial: f32) -> Self {
        Self { state: initial }
    }

    /// Fold `sample` into the state and return the new state.
    ///
    /// `weight` must lie in [0, 1]. Callers holding externally supplied
    /// weights get that guarantee from [`FilterWeights`].
    #[inline]
    pub fn apply(&mut self, weight: f32, sample: f32) -> f32 {
        debug_assert!((0.0..=1.0).contains(&weight));
        self.state = weight * sample + (1.0 - weight) * self.state;
        self.state
    }

    /// Current state
    #[inline]
    pub fn value(&self) -> f32 {
        self.state
    }

    /// Overwrite the state
    pub fn reset(&mut self, value: f32) {
        self.state = value;
    }
}

/// True if `w` is usable as a filter weight
#[inline]
pub fn is_valid_weight(w: f32) -> bool {
    w.is_finite() && (0.0..=1.0).contains(&w)
}

/// The pair of filter weights shared by all channels
///
/// `pwm` smooths the captured input duty, `temp` smooths every temperature
/// sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterWeights {
    pwm: f32,
    temp: f32,
}

impl FilterWeights {
    /// Validated pair; both weights must be finite and within [0, 1]
    pub fn new(pwm: f32, temp: f32) -> ConfigResult<Self> {
        if !is_valid_weight(pwm) || !is_valid_weight(temp) {
            return Err(ConfigError::InvalidFilterWeight);
        }
        Ok(Self { pwm, temp })
    }

    /// Weight of the PWM input filter
    #[inline]
    pub fn pwm(&self) -> f32 {
        self.pwm
    }

    /// Weight of the temperature filters
    #[inline]
    pub fn temp(&self) -> f32 {
        self.temp
    }
}

impl Default for FilterWeights {
    fn default() -> Self {
        Self { pwm: PWM_FILTER_WEIGHT, temp: TEMP_FILTER_WEIGHT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_one_passes_through() {
        let mut f = ExpFilter::new(20.0);
        assert_eq!(f.apply(1.0, 42.0), 42.0);
    }

    #[test]
    fn weight_zero_holds_state() {
        let mut f = ExpFilter::new(20.0);
        assert_eq!(f.apply(0.0, 42.0), 20.0);
        assert_eq!(f.value(), 20.0);
    }

    #[test]
    fn half_weight_is_midpoint() {
        let mut f = ExpFilter::new(0.0);
        assert!((f.apply(0.5, 10.0) - 5.0).abs() < 1e-6);
        assert!((f.apply(0.5, 10.0) - 7.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_weights() {
        assert!(FilterWeights::new(1.5, 0.1).is_err());
        assert!(FilterWeights::new(0.1, -0.1).is_err());
        assert!(FilterWeights::new(f32::NAN, 0.1).is_err());
        assert!(FilterWeights::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn default_weights() {
        let w = FilterWeights::default();
        assert_eq!(w.pwm(), 0.05);
        assert_eq!(w.temp(), 0.05);
    }
}
