//! Controller Configuration
//!
//! Runtime choices that the table dimensions do not fix. Built with
//! `with_*` methods; every value is validated once when the controller is
//! constructed.
//!
//! ```rust
//! use fanbridge_core::config::ControllerConfig;
//! use fanbridge_core::capture::PulsePolarity;
//!
//! let config = ControllerConfig::<4>::default()
//!     .with_polarity(PulsePolarity::Positive)
//!     .with_report_every(10);
//! assert_eq!(config.report_every, 10);
//! ```

use crate::capture::PulsePolarity;
use crate::constants::capture::PWM_IN_RESAMPLE;
use crate::constants::control::{
    DEFAULT_DUTY_PCT, PWM_FILTER_INIT, REPORT_FREQ, TEMP_FILTER_INIT,
};
use crate::errors::{ConfigError, ConfigResult};
use crate::interpolation::Geometry;
use crate::temperature::{default_transforms, SensorTransform};

/// Everything configurable about one controller with `S` sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig<const S: usize> {
    /// Calibration grid
    pub geometry: Geometry,
    /// Which part of the input period is "on"
    pub polarity: PulsePolarity,
    /// Raw-to-Celsius transform per sensor
    pub transforms: [SensorTransform; S],
    /// Initial and reset value of the input duty filter
    pub pwm_filter_init: f32,
    /// Initial and reset value of every temperature filter
    pub temp_filter_init: f32,
    /// Duty for every fan and mapping cell before calibration loads
    pub default_duty: u8,
    /// Cycles between status reports
    pub report_every: u16,
    /// Samples per direct line resample
    pub resample: u16,
}

impl<const S: usize> ControllerConfig<S> {
    /// Set the calibration grid
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the input pulse polarity
    pub fn with_polarity(mut self, polarity: PulsePolarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the transform of every sensor
    pub fn with_transforms(mut self, transforms: [SensorTransform; S]) -> Self {
        self.transforms = transforms;
        self
    }

    /// Set the initial filter values
    pub fn with_filter_init(mut self, pwm: f32, temp: f32) -> Self {
        self.pwm_filter_init = pwm;
        self.temp_filter_init = temp;
        self
    }

    /// Set the startup duty
    pub fn with_default_duty(mut self, duty: u8) -> Self {
        self.default_duty = duty;
        self
    }

    /// Set the report period in cycles
    pub fn with_report_every(mut self, cycles: u16) -> Self {
        self.report_every = cycles;
        self
    }

    /// Set the resample count
    pub fn with_resample(mut self, samples: u16) -> Self {
        self.resample = samples;
        self
    }

    /// Check the values that are not checked by their own types
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_duty > 100 {
            return Err(ConfigError::DutyOutOfRange { value: self.default_duty });
        }
        if self.report_every == 0 {
            return Err(ConfigError::ZeroReportPeriod);
        }
        if self.resample == 0 {
            return Err(ConfigError::ZeroResampleCount);
        }
        if !self.pwm_filter_init.is_finite() || !self.temp_filter_init.is_finite() {
            return Err(ConfigError::NonFiniteFilterInit);
        }
        Ok(())
    }
}

impl<const S: usize> Default for ControllerConfig<S> {
    fn default() -> Self {
        Self {
            geometry: Geometry::reference(),
            polarity: PulsePolarity::Negative,
            transforms: default_transforms(),
            pwm_filter_init: PWM_FILTER_INIT,
            temp_filter_init: TEMP_FILTER_INIT,
            default_duty: DEFAULT_DUTY_PCT,
            report_every: REPORT_FREQ,
            resample: PWM_IN_RESAMPLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = ControllerConfig::<4>::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.default_duty, 35);
        assert_eq!(c.report_every, 70);
    }

    #[test]
    fn rejects_bad_values() {
        let c = ControllerConfig::<4>::default();
        assert_eq!(c.with_default_duty(101).validate(), Err(ConfigError::DutyOutOfRange { value: 101 }));
        assert_eq!(c.with_report_every(0).validate(), Err(ConfigError::ZeroReportPeriod));
        assert_eq!(c.with_resample(0).validate(), Err(ConfigError::ZeroResampleCount));
        assert_eq!(c.with_filter_init(f32::INFINITY, 20.0).validate(), Err(ConfigError::NonFiniteFilterInit));
        assert_eq!(c.with_filter_init(35.0, f32::NAN).validate(), Err(ConfigError::NonFiniteFilterInit));
    }
}
