//! Command Errors
//!
//! Every rejected line produces exactly one `E <message>` response. The
//! numeric codes are stable and shared with host tooling; codes -15 to -18
//! cover the load commands and the line reader.

use thiserror_no_std::Error;

/// Result type for command handling
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Why a command line was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Blank line
    #[error("No data")]
    NoData,

    /// Unknown command word or unreadable line
    #[error("Syntax error")]
    Syntax,

    /// Expected `F<n>`
    #[error("Syntax error (fan)")]
    SyntaxFan,

    /// Expected `T:<celsius>`
    #[error("Syntax error (temperature)")]
    SyntaxTemp,

    /// Missing, negative or unusable temperature weight
    #[error("Syntax error (temperature weight)")]
    SyntaxTempWeight,

    /// Expected `F<n>:<duty>` in fan order
    #[error("Syntax error (fan/pwm)")]
    SyntaxFanPwm,

    /// Manual duty missing or above 100
    #[error("Syntax error (PWM value)")]
    SyntaxPwmValue,

    /// Filter weight missing or outside [0, 1]
    #[error("Syntax error (PWM filter)")]
    SyntaxPwmFilter,

    /// Mapping row short or holding a value above 100
    #[error("Syntax error (PWM table)")]
    SyntaxPwmTable,

    /// Tokens after the last expected one
    #[error("Syntax error (extra data/token)")]
    ExtraData,

    /// Fan number outside 1..=F
    #[error("Wrong fan number")]
    FanNumber,

    /// Store refused the filter record
    #[error("Saving PWM filter params")]
    SavePwmFilter,

    /// Store refused a mapping row
    #[error("Saving PWM map")]
    SavePwmMap,

    /// Store refused a weight row
    #[error("Saving temp. weights")]
    SaveTempWeights,

    /// Persisted filter record failed validation
    #[error("Loading PWM filter params")]
    LoadPwmFilter,

    /// Persisted mapping row failed validation
    #[error("Loading PWM map")]
    LoadPwmMap,

    /// Persisted weight row failed validation
    #[error("Loading temp. weights")]
    LoadTempWeights,

    /// Line longer than the reader's buffer
    #[error("Buffer overflow")]
    BufferOverflow,

    /// Reserved
    #[error("Not implemented yet")]
    NotImplemented,
}

impl ProtocolError {
    /// Numeric code
    pub const fn code(self) -> i16 {
        match self {
            Self::NoData => -1,
            Self::Syntax => -2,
            Self::SyntaxFan => -3,
            Self::SyntaxTemp => -4,
            Self::SyntaxTempWeight => -5,
            Self::SyntaxFanPwm => -6,
            Self::SyntaxPwmValue => -7,
            Self::SyntaxPwmFilter => -8,
            Self::SyntaxPwmTable => -9,
            Self::ExtraData => -10,
            Self::FanNumber => -11,
            Self::SavePwmFilter => -12,
            Self::SavePwmMap => -13,
            Self::SaveTempWeights => -14,
            Self::LoadPwmFilter => -15,
            Self::LoadPwmMap => -16,
            Self::LoadTempWeights => -17,
            Self::BufferOverflow => -18,
            Self::NotImplemented => -100,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ProtocolError {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "E{}", self.code())
    }
}
