//! Duty to Timer Conversion for Fan Outputs
//!
//! The reference board generates each fan PWM with an 8-bit timer in fast
//! PWM mode, clocked at 2 MHz with TOP = 79: 80 ticks of 0.5 µs, i.e. 25 kHz
//! as the 4-pin fan specification asks. A duty becomes a compare value in
//! 0..=79.
//!
//! 0 % and 100 % cannot be produced by the compare unit without a glitch,
//! so they are driven as static pin levels. Leaving that static mode needs
//! the timer reconfigured before a compare value is written.

/// Timer TOP value (period of 80 ticks)
pub const PWM_TOP: u8 = 79;

/// Electrical sense of the output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputPolarity {
    /// Pin high means fan on
    Normal,
    /// Pin low means fan on (fan headers pull low)
    #[default]
    Inverted,
}

/// How a driver should set the pin for a duty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDrive {
    /// Disconnect the compare unit and hold the pin at a level
    Static {
        /// Pin level
        high: bool,
    },
    /// Write a compare value
    Compare {
        /// Compare register value, 0..=79
        value: u8,
        /// The timer was in static mode and must be set up again first
        restart: bool,
    },
}

/// Output channel bookkeeping for one fan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyOutput {
    polarity: OutputPolarity,
    static_level: bool,
}

impl DutyOutput {
    /// Channel with the timer running in compare mode
    pub const fn new(polarity: OutputPolarity) -> Self {
        Self { polarity, static_level: false }
    }

    /// Compare value for `duty` (clamped to 100)
    pub fn compare_value(&self, duty: u8) -> u8 {
        let duty = duty.min(100) as u16;
        let active = match self.polarity {
            OutputPolarity::Normal => duty,
            OutputPolarity::Inverted => 100 - duty,
        };
        (active * PWM_TOP as u16 / 100) as u8
    }

    /// Decide how to drive the pin for `duty` and remember whether the
    /// channel is now in static mode
    pub fn drive(&mut self, duty: u8) -> PinDrive {
        let on = match self.polarity {
            OutputPolarity::Normal => true,
            OutputPolarity::Inverted => false,
        };
        match duty {
            0 => {
                self.static_level = true;
                PinDrive::Static { high: !on }
            }
            d if d >= 100 => {
                self.static_level = true;
                PinDrive::Static { high: on }
            }
            d => {
                let restart = core::mem::replace(&mut self.static_level, false);
                PinDrive::Compare { value: self.compare_value(d), restart }
            }
        }
    }
}

impl Default for DutyOutput {
    fn default() -> Self {
        Self::new(OutputPolarity::default())
    }
}
