//! Host Commands
//!
//! ```text
//! Ver                              firmware version
//! GetCfg                           dimensions and grid
//! GetTempWeights  F<n>             Set.. F<n> w1 .. wS    Save.. / Load.. F<n>
//! GetPwmFilt                       Set.. <pwm> <temp>     Save.. / Load..
//! GetPwmMap       F<n> T:<t>       Set.. F<n> T:<t> v1 .. vP
//!                                  Save.. / Load.. F<n> T:<t>
//! ModeManual      F1:<d> F2:<d> ..
//! ModeAuto
//! ModeFailsafe
//! ```
//!
//! Fans are numbered from 1 on the wire. A map temperature selects the
//! bucket it falls in (rounded down, clamped) and replies echo the grid
//! temperature of that bucket.
//!
//! Parsing is separate from execution: [`Command::parse`] only reads the
//! line, [`Command::execute`] is the only place controller or store state
//! changes, and it changes nothing when it fails.

use fanbridge_core::traits::ByteStore;
use fanbridge_core::{ConfigStore, ControllerState, FilterWeights, ModeRequest};

use crate::errors::{ProtocolError, ProtocolResult};
use crate::format::Reply;
use crate::parse::{self, Tokens};

/// One parsed command line for `F` fans, `S` sensors and `P` duty buckets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command<const F: usize, const S: usize, const P: usize> {
    /// `Ver`
    Version,
    /// `GetCfg`
    GetConfig,
    /// `GetTempWeights F<n>`
    GetTempWeights {
        /// Zero-based fan index
        fan: usize,
    },
    /// `SetTempWeights F<n> w1 .. wS`
    SetTempWeights {
        /// Zero-based fan index
        fan: usize,
        /// One weight per sensor
        weights: [f32; S],
    },
    /// `SaveTempWeights F<n>`
    SaveTempWeights {
        /// Zero-based fan index
        fan: usize,
    },
    /// `LoadTempWeights F<n>`
    LoadTempWeights {
        /// Zero-based fan index
        fan: usize,
    },
    /// `GetPwmFilt`
    GetPwmFilter,
    /// `SetPwmFilt <pwm> <temp>`
    SetPwmFilter(FilterWeights),
    /// `SavePwmFilt`
    SavePwmFilter,
    /// `LoadPwmFilt`
    LoadPwmFilter,
    /// `GetPwmMap F<n> T:<t>`
    GetPwmMap {
        /// Zero-based fan index
        fan: usize,
        /// Requested temperature
        temp: i16,
    },
    /// `SetPwmMap F<n> T:<t> v1 .. vP`
    SetPwmMap {
        /// Zero-based fan index
        fan: usize,
        /// Requested temperature
        temp: i16,
        /// Duty per duty bucket
        row: [u8; P],
    },
    /// `SavePwmMap F<n> T:<t>`
    SavePwmMap {
        /// Zero-based fan index
        fan: usize,
        /// Requested temperature
        temp: i16,
    },
    /// `LoadPwmMap F<n> T:<t>`
    LoadPwmMap {
        /// Zero-based fan index
        fan: usize,
        /// Requested temperature
        temp: i16,
    },
    /// `ModeManual F1:<d> F2:<d> ..`
    ModeManual([u8; F]),
    /// `ModeAuto`
    ModeAuto,
    /// `ModeFailsafe`
    ModeFailsafe,
}

impl<const F: usize, const S: usize, const P: usize> Command<F, S, P> {
    /// Parse one line (without its newline)
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let mut tokens = Tokens::new(line);
        let word = tokens.next_token().ok_or(ProtocolError::NoData)?;

        let command = match word {
            "Ver" => Self::Version,
            "GetCfg" => Self::GetConfig,

            "GetTempWeights" => Self::GetTempWeights { fan: parse::fan(tokens.next_token(), F)? },
            "SetTempWeights" => {
                let fan = parse::fan(tokens.next_token(), F)?;
                let mut weights = [0.0f32; S];
                for w in weights.iter_mut() {
                    *w = parse::weight(tokens.next_token())?;
                }
                Self::SetTempWeights { fan, weights }
            }
            "SaveTempWeights" => Self::SaveTempWeights { fan: parse::fan(tokens.next_token(), F)? },
            "LoadTempWeights" => Self::LoadTempWeights { fan: parse::fan(tokens.next_token(), F)? },

            "GetPwmFilt" => Self::GetPwmFilter,
            "SetPwmFilt" => {
                let pwm = parse::filter_weight(tokens.next_token())?;
                let temp = parse::filter_weight(tokens.next_token())?;
                let weights = FilterWeights::new(pwm, temp).map_err(|_| ProtocolError::SyntaxPwmFilter)?;
                Self::SetPwmFilter(weights)
            }
            "SavePwmFilt" => Self::SavePwmFilter,
            "LoadPwmFilt" => Self::LoadPwmFilter,

            "GetPwmMap" | "SavePwmMap" | "LoadPwmMap" => {
                let fan = parse::fan(tokens.next_token(), F)?;
                let temp = parse::temp(tokens.next_token())?;
                match word {
                    "GetPwmMap" => Self::GetPwmMap { fan, temp },
                    "SavePwmMap" => Self::SavePwmMap { fan, temp },
                    _ => Self::LoadPwmMap { fan, temp },
                }
            }
            "SetPwmMap" => {
                let fan = parse::fan(tokens.next_token(), F)?;
                let temp = parse::temp(tokens.next_token())?;
                let mut row = [0u8; P];
                for v in row.iter_mut() {
                    *v = parse::map_cell(tokens.next_token())?;
                }
                Self::SetPwmMap { fan, temp, row }
            }

            "ModeManual" => {
                let mut duties = [0u8; F];
                for (expected, d) in duties.iter_mut().enumerate() {
                    let (fan, duty) = parse::fan_duty(tokens.next_token(), F)?;
                    if fan != expected {
                        return Err(ProtocolError::SyntaxFanPwm);
                    }
                    *d = duty;
                }
                Self::ModeManual(duties)
            }
            "ModeAuto" => Self::ModeAuto,
            "ModeFailsafe" => Self::ModeFailsafe,

            _ => return Err(ProtocolError::Syntax),
        };

        tokens.finish()?;
        Ok(command)
    }

    /// Apply the command to `controller` and `store`
    pub fn execute<B: ByteStore, const T: usize>(
        &self,
        controller: &mut ControllerState<F, S, T, P>,
        store: &mut ConfigStore<B, F, S, T, P>,
    ) -> ProtocolResult<Reply<S, P>> {
        let geometry = *controller.geometry();

        let reply = match *self {
            Self::Version => Reply::Version,
            Self::GetConfig => Reply::Config(controller.config_summary()),

            Self::GetTempWeights { fan } => Reply::TempWeights {
                fan,
                weights: controller.temp_weights(fan).map_err(|_| ProtocolError::FanNumber)?,
            },
            Self::SetTempWeights { fan, weights } => {
                controller
                    .set_temp_weights(fan, weights)
                    .map_err(|_| ProtocolError::SyntaxTempWeight)?;
                Reply::Ok
            }
            Self::SaveTempWeights { fan } => {
                controller
                    .save_temp_weights(store, fan)
                    .map_err(|_| ProtocolError::SaveTempWeights)?;
                Reply::Ok
            }
            Self::LoadTempWeights { fan } => {
                controller
                    .load_temp_weights(store, fan)
                    .map_err(|_| ProtocolError::LoadTempWeights)?;
                Reply::Ok
            }

            Self::GetPwmFilter => Reply::PwmFilter(controller.filter_weights()),
            Self::SetPwmFilter(weights) => {
                controller.set_filter_weights(weights);
                Reply::Ok
            }
            Self::SavePwmFilter => {
                controller.save_filter_weights(store).map_err(|_| ProtocolError::SavePwmFilter)?;
                Reply::Ok
            }
            Self::LoadPwmFilter => {
                controller.load_filter_weights(store).map_err(|_| ProtocolError::LoadPwmFilter)?;
                Reply::Ok
            }

            Self::GetPwmMap { fan, temp } => {
                let t = geometry.temp_index(temp);
                Reply::PwmMap {
                    fan,
                    temp: geometry.temp_from_index(t),
                    row: controller.mapping_row(fan, t).map_err(|_| ProtocolError::FanNumber)?,
                }
            }
            Self::SetPwmMap { fan, temp, row } => {
                let t = geometry.temp_index(temp);
                controller
                    .set_mapping_row(fan, t, row)
                    .map_err(|_| ProtocolError::SyntaxPwmTable)?;
                Reply::Ok
            }
            Self::SavePwmMap { fan, temp } => {
                let t = geometry.temp_index(temp);
                controller
                    .save_mapping_row(store, fan, t)
                    .map_err(|_| ProtocolError::SavePwmMap)?;
                Reply::Ok
            }
            Self::LoadPwmMap { fan, temp } => {
                let t = geometry.temp_index(temp);
                controller
                    .load_mapping_row(store, fan, t)
                    .map_err(|_| ProtocolError::LoadPwmMap)?;
                Reply::Ok
            }

            Self::ModeManual(duties) => {
                controller
                    .request_mode(ModeRequest::Manual(duties))
                    .map_err(|_| ProtocolError::SyntaxPwmValue)?;
                Reply::Ok
            }
            Self::ModeAuto => {
                controller.request_mode(ModeRequest::Auto).map_err(|_| ProtocolError::Syntax)?;
                Reply::Ok
            }
            Self::ModeFailsafe => {
                controller.request_mode(ModeRequest::Failsafe).map_err(|_| ProtocolError::Syntax)?;
                Reply::Ok
            }
        };

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Cmd = Command<2, 4, 21>;

    #[test]
    fn parses_simple_words() {
        assert_eq!(Cmd::parse("Ver"), Ok(Cmd::Version));
        assert_eq!(Cmd::parse("ModeAuto\r"), Ok(Cmd::ModeAuto));
        assert_eq!(Cmd::parse("ModeFailsafe x"), Err(ProtocolError::ExtraData));
        assert_eq!(Cmd::parse(""), Err(ProtocolError::NoData));
        assert_eq!(Cmd::parse("Reboot"), Err(ProtocolError::Syntax));
    }

    #[test]
    fn parses_weights() {
        assert_eq!(
            Cmd::parse("SetTempWeights F2 0.1 0.2 0.3 0.4"),
            Ok(Cmd::SetTempWeights { fan: 1, weights: [0.1, 0.2, 0.3, 0.4] })
        );
        assert_eq!(Cmd::parse("SetTempWeights F2 0.1 0.2 0.3"), Err(ProtocolError::SyntaxTempWeight));
        assert_eq!(
            Cmd::parse("SetTempWeights F2 0.1 0.2 0.3 0.4 0.5"),
            Err(ProtocolError::ExtraData)
        );
    }

    #[test]
    fn manual_mode_needs_fans_in_order() {
        assert_eq!(Cmd::parse("ModeManual F1:20 F2:30"), Ok(Cmd::ModeManual([20, 30])));
        assert_eq!(Cmd::parse("ModeManual F2:30 F1:20"), Err(ProtocolError::SyntaxFanPwm));
        assert_eq!(Cmd::parse("ModeManual F1:20"), Err(ProtocolError::SyntaxFanPwm));
        assert_eq!(Cmd::parse("ModeManual F1:20 F2:130"), Err(ProtocolError::SyntaxPwmValue));
        assert_eq!(Cmd::parse("ModeManual F1:20 F3:30"), Err(ProtocolError::FanNumber));
    }

    #[test]
    fn map_rows_need_every_bucket() {
        let line = "SetPwmMap F1 T:20 0 5 10 15 20 25 30 35 40 45 50 55 60 65 70 75 80 85 90 95 100";
        match Cmd::parse(line) {
            Ok(Cmd::SetPwmMap { fan: 0, temp: 20, row }) => assert_eq!(row[20], 100),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Cmd::parse("SetPwmMap F1 T:20 0 5 10"), Err(ProtocolError::SyntaxPwmTable));
        assert_eq!(Cmd::parse("SetPwmMap F1 0 5 10"), Err(ProtocolError::SyntaxTemp));
        assert_eq!(Cmd::parse("GetPwmMap F1"), Err(ProtocolError::SyntaxTemp));
    }

    #[test]
    fn filter_pair_is_range_checked() {
        assert_eq!(
            Cmd::parse("SetPwmFilt 0.1 0.5"),
            Ok(Cmd::SetPwmFilter(FilterWeights::new(0.1, 0.5).unwrap()))
        );
        assert_eq!(Cmd::parse("SetPwmFilt 30 0.1"), Err(ProtocolError::SyntaxPwmFilter));
        assert_eq!(Cmd::parse("SetPwmFilt 0.1"), Err(ProtocolError::SyntaxPwmFilter));
    }
}
