//! Temperature Model
//!
//! Each sensor's raw ADC sample goes through a linear transform to °C and
//! then through its own exponential filter. Every fan sees its own
//! "effective" temperature: a weighted mean of all sensors using that fan's
//! weight vector, truncated to whole degrees and clamped to the calibration
//! range.
//!
//! ```text
//!            ┌─────────────┐   ┌──────────┐
//!  ADC[s] ──→│ raw*k - c   │──→│ ExpFilter│──→ reading[s] (°C, i16)
//!            └─────────────┘   └──────────┘
//!
//!  effective(fan) = clamp( trunc( Σ w[fan][s]*reading[s] / Σ w[fan][s] ) )
//! ```
//!
//! Weights are not normalized; only their ratios matter. A vector summing to
//! zero has no mean and is rejected by [`validate_weights`].

use crate::constants::control::TEMP_FILTER_INIT;
use crate::constants::sensors::{
    INTERNAL_TEMP_SCALE, INTERNAL_TEMP_SHIFT, MCP9701_OFFSET, MCP9701_SCALE,
};
use crate::errors::{ConfigError, ConfigResult, TemperatureError};
use crate::filter::ExpFilter;
use crate::interpolation::Geometry;
use crate::traits::AnalogSensors;

/// Linear raw-to-Celsius conversion: `celsius = raw * scale - offset`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorTransform {
    /// °C per ADC count
    pub scale: f32,
    /// °C subtracted after scaling
    pub offset: f32,
}

impl SensorTransform {
    /// Arbitrary linear transform
    pub const fn linear(scale: f32, offset: f32) -> Self {
        Self { scale, offset }
    }

    /// The MCU's internal die sensor (bench calibrated)
    pub const fn internal_die() -> Self {
        Self::linear(INTERNAL_TEMP_SCALE, INTERNAL_TEMP_SHIFT)
    }

    /// Microchip MCP9701 on a 10-bit ADC with a 4.97 V reference
    pub const fn mcp9701() -> Self {
        Self::linear(MCP9701_SCALE, MCP9701_OFFSET)
    }

    /// Convert one raw sample
    #[inline]
    pub fn convert(&self, raw: u16) -> f32 {
        raw as f32 * self.scale - self.offset
    }
}

/// Sensor 0 on the internal die sensor, every other channel on an MCP9701
pub const fn default_transforms<const S: usize>() -> [SensorTransform; S] {
    let mut out = [SensorTransform::mcp9701(); S];
    if S > 0 {
        out[0] = SensorTransform::internal_die();
    }
    out
}

/// Accept a weight vector only if every weight is finite and non-negative
/// and the weights do not sum to zero
pub fn validate_weights(weights: &[f32]) -> ConfigResult<()> {
    let mut sum = 0.0f32;
    for (sensor, &w) in weights.iter().enumerate() {
        if !w.is_finite() || w < 0.0 {
            return Err(ConfigError::InvalidWeight { sensor });
        }
        sum += w;
    }
    if sum <= 0.0 {
        return Err(ConfigError::ZeroWeightSum);
    }
    Ok(())
}

/// Sensor readings and per-fan weights
#[derive(Debug, Clone)]
pub struct TemperatureModel<const F: usize, const S: usize> {
    geometry: Geometry,
    transforms: [SensorTransform; S],
    filters: [ExpFilter; S],
    filter_init: f32,
    readings: [i16; S],
    weights: [[f32; S]; F],
}

impl<const F: usize, const S: usize> TemperatureModel<F, S> {
    /// All weights zero, all filters at `filter_init`
    pub fn new(geometry: Geometry, transforms: [SensorTransform; S], filter_init: f32) -> Self {
        Self {
            geometry,
            transforms,
            filters: [ExpFilter::new(filter_init); S],
            filter_init,
            readings: [filter_init as i16; S],
            weights: [[0.0; S]; F],
        }
    }

    /// Sample every sensor once and fold it into its filter
    pub fn sample<A: AnalogSensors + ?Sized>(&mut self, adc: &mut A, weight: f32) {
        for s in 0..S {
            let celsius = self.transforms[s].convert(adc.sample(s));
            let filtered = self.filters[s].apply(weight, celsius);
            // float to int casts truncate toward zero and saturate
            self.readings[s] = filtered as i16;
        }
    }

    /// Last filtered reading of every sensor
    pub fn readings(&self) -> &[i16; S] {
        &self.readings
    }

    /// Put every filter back to its initial value
    pub fn reset_filters(&mut self) {
        for f in &mut self.filters {
            f.reset(self.filter_init);
        }
        self.readings = [self.filter_init as i16; S];
    }

    /// Weight vector of `fan`
    pub fn weights(&self, fan: usize) -> Option<&[f32; S]> {
        self.weights.get(fan)
    }

    /// Replace the weight vector of `fan` after validating it
    pub fn set_weights(&mut self, fan: usize, weights: [f32; S]) -> ConfigResult<()> {
        if fan >= F {
            return Err(ConfigError::FanOutOfRange { index: fan, count: F });
        }
        validate_weights(&weights)?;
        self.weights[fan] = weights;
        Ok(())
    }

    /// Install a vector that was already validated (loaded from storage)
    pub(crate) fn install_weights(&mut self, fan: usize, weights: [f32; S]) {
        if let Some(slot) = self.weights.get_mut(fan) {
            *slot = weights;
        }
    }

    /// Effective temperature of `fan`, truncated and clamped
    pub fn average_temp(&self, fan: usize) -> Result<i16, TemperatureError> {
        let weights = self.weights.get(fan).ok_or(TemperatureError::FanOutOfRange { fan })?;

        let mut sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for (w, &t) in weights.iter().zip(self.readings.iter()) {
            sum += w * t as f32;
            weight_sum += w;
        }
        if weight_sum == 0.0 {
            return Err(TemperatureError::ZeroWeightSum { fan });
        }

        Ok(self.geometry.normalize_temp((sum / weight_sum) as i16))
    }

    /// Clamp `t` to the calibration range
    pub fn normalize_temp(&self, t: i16) -> i16 {
        self.geometry.normalize_temp(t)
    }
}

impl<const F: usize, const S: usize> Default for TemperatureModel<F, S> {
    fn default() -> Self {
        Self::new(Geometry::reference(), default_transforms(), TEMP_FILTER_INIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Adc([u16; 4]);

    impl AnalogSensors for Adc {
        fn sample(&mut self, sensor: usize) -> u16 {
            self.0[sensor]
        }
    }

    #[test]
    fn transforms() {
        let die = SensorTransform::internal_die();
        assert!((die.convert(324) - (-0.254)).abs() < 0.01);
        assert!((die.convert(355) - 25.155).abs() < 0.01);

        let mcp = SensorTransform::mcp9701();
        // 0.4 V at 0 °C is ~82.4 counts
        assert!(mcp.convert(82).abs() < 0.2);
        assert!((mcp.convert(184) - 25.28).abs() < 0.05);
    }

    #[test]
    fn default_channel_layout() {
        let t: [SensorTransform; 4] = default_transforms();
        assert_eq!(t[0], SensorTransform::internal_die());
        assert_eq!(t[3], SensorTransform::mcp9701());
    }

    #[test]
    fn weighted_average_truncates() {
        let mut model = TemperatureModel::<2, 4>::default();
        let mut adc = Adc([0; 4]);
        // one sample with weight 1 sets the readings exactly
        adc.0 = [355, 184, 222, 262];
        model.sample(&mut adc, 1.0);
        assert_eq!(model.readings(), &[25, 25, 34, 44]);

        model.set_weights(0, [0.0, 1.0, 1.0, 0.0]).unwrap();
        // (25 + 34) / 2 = 29.5 -> 29
        assert_eq!(model.average_temp(0), Ok(29));
    }

    #[test]
    fn average_is_clamped() {
        let mut model = TemperatureModel::<2, 4>::default();
        let mut adc = Adc([0, 0, 0, 1023]);
        model.sample(&mut adc, 1.0);
        model.set_weights(1, [0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(model.average_temp(1), Ok(55));
        model.set_weights(1, [1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(model.average_temp(1), Ok(20));
    }

    #[test]
    fn zero_weights_are_an_error() {
        let model = TemperatureModel::<2, 4>::default();
        assert_eq!(model.average_temp(0), Err(TemperatureError::ZeroWeightSum { fan: 0 }));
        assert_eq!(model.average_temp(5), Err(TemperatureError::FanOutOfRange { fan: 5 }));
    }

    #[test]
    fn weight_validation() {
        let mut model = TemperatureModel::<2, 4>::default();
        assert_eq!(model.set_weights(0, [0.0; 4]), Err(ConfigError::ZeroWeightSum));
        assert_eq!(
            model.set_weights(0, [1.0, -0.5, 0.0, 0.0]),
            Err(ConfigError::InvalidWeight { sensor: 1 })
        );
        assert_eq!(
            model.set_weights(0, [1.0, 0.0, f32::NAN, 0.0]),
            Err(ConfigError::InvalidWeight { sensor: 2 })
        );
        assert_eq!(
            model.set_weights(2, [1.0; 4]),
            Err(ConfigError::FanOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(model.weights(0), Some(&[0.0; 4]));
    }

    #[test]
    fn filters_reset_to_initial_value() {
        let mut model = TemperatureModel::<1, 4>::default();
        let mut adc = Adc([355, 184, 184, 184]);
        model.sample(&mut adc, 1.0);
        model.reset_filters();
        assert_eq!(model.readings(), &[20; 4]);
        model.sample(&mut adc, 0.0);
        assert_eq!(model.readings(), &[20; 4]);
    }
}
