//! Wire Text
//!
//! Everything the controller prints, as `Display` impls so that any
//! `core::fmt::Write` sink works (a UART writer on the board, a `String` on
//! the host):
//!
//! ```text
//! OK
//! FanBridge 1.0-RC2
//! Fans:2 Temps:4 PWM_step:5 PWM_coeffs:21 Temp_min:20 Temp_step:5 Temp_max:55 Temp_coeffs:8
//! F1 0.0000 1.0000 0.0000 0.0000
//! 0.0500 0.0500
//! F1 T:35 0 5 10 .. 100
//! *A PWM1_in:20 T0_in:23 T1_in:30 T2_in:31 T3_in:29 F1_out:20 F2_out:30
//! *E EEPROM checksum mismatch (temp. weights F:2). Using failsafe mode.
//! ```
//!
//! Floats are printed with four decimals, fans numbered from 1.

use core::fmt::{self, Display, Formatter};

use fanbridge_core::state::{ConfigSummary, StartupFault, StatusReport};
use fanbridge_core::{FilterWeights, Geometry, Region, StoreError, FIRMWARE_VERSION};

/// Product name in the version line
pub const PRODUCT: &str = "FanBridge";

/// Successful command reply for `S` sensors and `P` duty buckets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply<const S: usize, const P: usize> {
    /// Plain acknowledgement
    Ok,
    /// Version line
    Version,
    /// Dimension line
    Config(ConfigSummary),
    /// Weight vector of one fan
    TempWeights {
        /// Zero-based fan index
        fan: usize,
        /// One weight per sensor
        weights: [f32; S],
    },
    /// Filter weight pair
    PwmFilter(FilterWeights),
    /// One mapping row
    PwmMap {
        /// Zero-based fan index
        fan: usize,
        /// Grid temperature of the row
        temp: i16,
        /// Duty per duty bucket
        row: [u8; P],
    },
}

impl<const S: usize, const P: usize> Display for Reply<S, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Version => write!(f, "{} {}", PRODUCT, FIRMWARE_VERSION),
            Self::Config(summary) => ConfigLine(summary).fmt(f),
            Self::TempWeights { fan, weights } => {
                write!(f, "F{}", fan + 1)?;
                for w in weights {
                    write!(f, " {:.4}", w)?;
                }
                Ok(())
            }
            Self::PwmFilter(weights) => write!(f, "{:.4} {:.4}", weights.pwm(), weights.temp()),
            Self::PwmMap { fan, temp, row } => {
                write!(f, "F{} T:{}", fan + 1, temp)?;
                for v in row {
                    write!(f, " {}", v)?;
                }
                Ok(())
            }
        }
    }
}

/// `Fans:.. Temps:.. ..` line
pub struct ConfigLine<'a>(pub &'a ConfigSummary);

impl Display for ConfigLine<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = self.0;
        write!(
            f,
            "Fans:{} Temps:{} PWM_step:{} PWM_coeffs:{} Temp_min:{} Temp_step:{} Temp_max:{} Temp_coeffs:{}",
            s.fans, s.sensors, s.pwm_step, s.pwm_buckets, s.temp_min, s.temp_step, s.temp_max, s.temp_buckets
        )
    }
}

/// Periodic `*<mode> PWM1_in:..` line
pub struct ReportLine<'a, const F: usize, const S: usize>(pub &'a StatusReport<F, S>);

impl<const F: usize, const S: usize> Display for ReportLine<'_, F, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(f, "*{} PWM1_in:{}", r.mode.as_char(), r.duty_in)?;
        for (i, t) in r.temps.iter().enumerate() {
            write!(f, " T{}_in:{}", i, t)?;
        }
        for (i, d) in r.outputs.iter().enumerate() {
            write!(f, " F{}_out:{}", i + 1, d)?;
        }
        Ok(())
    }
}

/// `*E EEPROM ..` line for the record that stopped startup
pub struct FaultLine<'a> {
    /// Failing record
    pub fault: &'a StartupFault,
    /// Grid used to name mapping rows by temperature
    pub geometry: &'a Geometry,
}

impl Display for FaultLine<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let what = match self.fault.error {
            StoreError::ChecksumMismatch { .. } => "checksum mismatch",
            _ => "invalid data",
        };
        write!(f, "*E EEPROM {} (", what)?;
        match self.fault.region {
            Region::FilterWeights => f.write_str("PWM exp. filter")?,
            Region::TempWeights { fan } => write!(f, "temp. weights F:{}", fan + 1)?,
            Region::MappingRow { fan, temp } => write!(
                f,
                "PWM mapping table F:{} T:{}",
                fan + 1,
                self.geometry.temp_from_index(temp)
            )?,
        }
        f.write_str("). Using failsafe mode.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use fanbridge_core::OperatingMode;
    use heapless::String;

    fn render<D: Display>(d: D) -> String<256> {
        let mut s = String::new();
        write!(s, "{}", d).unwrap();
        s
    }

    #[test]
    fn report_line() {
        let report = StatusReport::<2, 4> {
            mode: OperatingMode::Auto,
            duty_in: 20,
            temps: [23, 30, 31, 29],
            outputs: [20, 30],
        };
        assert_eq!(
            render(ReportLine(&report)).as_str(),
            "*A PWM1_in:20 T0_in:23 T1_in:30 T2_in:31 T3_in:29 F1_out:20 F2_out:30"
        );
    }

    #[test]
    fn fault_lines() {
        let geometry = Geometry::reference();
        let mismatch = StoreError::ChecksumMismatch { address: 0, stored: 0xFF, computed: 0xD0 };

        let fault = StartupFault { region: Region::FilterWeights, error: mismatch };
        assert_eq!(
            render(FaultLine { fault: &fault, geometry: &geometry }).as_str(),
            "*E EEPROM checksum mismatch (PWM exp. filter). Using failsafe mode."
        );

        let fault = StartupFault { region: Region::MappingRow { fan: 1, temp: 3 }, error: mismatch };
        assert_eq!(
            render(FaultLine { fault: &fault, geometry: &geometry }).as_str(),
            "*E EEPROM checksum mismatch (PWM mapping table F:2 T:35). Using failsafe mode."
        );
    }

    #[test]
    fn weight_and_filter_replies() {
        let reply = Reply::<4, 21>::TempWeights { fan: 0, weights: [0.0, 1.0, 0.25, 0.0] };
        assert_eq!(render(reply).as_str(), "F1 0.0000 1.0000 0.2500 0.0000");

        let reply = Reply::<4, 21>::PwmFilter(FilterWeights::default());
        assert_eq!(render(reply).as_str(), "0.0500 0.0500");
    }
}
