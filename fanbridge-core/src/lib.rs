//! Core control engine for FanBridge
//!
//! Sits between a mainboard's fan header and the real fans: measures the
//! PWM duty the board asks for, blends it with local temperature readings
//! through a calibration table and drives every fan with the result.
//!
//! Key constraints:
//! - Runs on an 8-bit MCU with 2KB RAM and 1KB EEPROM
//! - No heap allocation anywhere in the control path
//! - Hardware access only through the traits in [`traits`]
//!
//! ```no_run
//! use fanbridge_core::{ConfigStore, ControllerConfig, ControllerState, RamStore};
//! use fanbridge_core::capture::CaptureSession;
//! # use fanbridge_core::traits::{AnalogSensors, CaptureDriver, FanOutputs, InputLine};
//! # struct Board;
//! # impl InputLine for Board { fn is_high(&mut self) -> bool { false } }
//! # impl CaptureDriver for Board {
//! #     fn arm(&mut self, _: &CaptureSession) {}
//! #     fn disarm(&mut self) {}
//! # }
//! # impl AnalogSensors for Board { fn sample(&mut self, _: usize) -> u16 { 0 } }
//! # impl FanOutputs for Board { fn set_duty(&mut self, _: usize, _: u8) {} }
//! # let (mut capture, mut adc, mut fans) = (Board, Board, Board);
//!
//! static SESSION: CaptureSession = CaptureSession::new();
//!
//! let mut store = ConfigStore::<_, 2, 4, 8, 21>::new(RamStore::<1024>::new()).unwrap();
//! let mut controller = ControllerState::<2, 4, 8, 21>::new(ControllerConfig::default()).unwrap();
//! controller.startup(&mut store, &mut fans);
//!
//! loop {
//!     let outcome = controller.run_cycle(&SESSION, &mut capture, &mut adc, &mut fans);
//!     if let Some(_report) = outcome.report {
//!         // forward to the host
//!     }
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod capture;
pub mod config;
pub mod constants;
pub mod control;
pub mod errors;
pub mod filter;
pub mod interpolation;
pub mod output;
pub mod state;
pub mod store;
pub mod temperature;
pub mod traits;

// Public API
pub use config::ControllerConfig;
pub use control::ControllerState;
pub use errors::{CaptureError, ConfigError, ConfigResult, StoreError, StoreResult, TemperatureError};
pub use filter::FilterWeights;
pub use interpolation::{Geometry, MappingTable};
pub use state::{CycleOutcome, ModeRequest, OperatingMode, StartupReport, StatusReport};
pub use store::{ConfigStore, RamStore, Region};
pub use traits::{AnalogSensors, ByteStore, CaptureDriver, FanOutputs, InputLine};

#[cfg(feature = "std")]
pub use store::FileStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Firmware release string reported to the host
pub const FIRMWARE_VERSION: &str = "1.0-RC2";

/// Controller with the reference board's dimensions
pub type ReferenceController = ControllerState<
    { constants::FANS },
    { constants::TEMP_SENSORS },
    { constants::TEMP_BUCKETS },
    { constants::PWM_BUCKETS },
>;
