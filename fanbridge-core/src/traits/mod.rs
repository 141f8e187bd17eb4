//! Hardware Abstractions for the Control Core
//!
//! The core never touches registers. Everything it needs from the board is
//! expressed as a small trait, implemented by the platform crate for real
//! hardware and by mocks in tests.
//!
//! ## Module Organization
//!
//! - [`hardware`] - fan outputs, analog sensors, PWM input capture
//! - [`storage`] - byte-addressed persistent memory
//!
//! ## Design Notes
//!
//! All traits use static dispatch: the control loop is generic over its
//! hardware and monomorphizes to direct calls. Methods take `&mut self`
//! because every implementation drives peripherals with side effects.
//!
//! ## Usage Example
//!
//! ```rust
//! use fanbridge_core::traits::FanOutputs;
//!
//! struct Recorder { duties: [u8; 2] }
//!
//! impl FanOutputs for Recorder {
//!     fn set_duty(&mut self, fan: usize, duty: u8) {
//!         self.duties[fan] = duty;
//!     }
//! }
//!
//! let mut fans = Recorder { duties: [0; 2] };
//! fans.set_duty(1, 40);
//! assert_eq!(fans.duties, [0, 40]);
//! ```

pub mod hardware;
pub mod storage;

pub use hardware::{AnalogSensors, CaptureDriver, FanOutputs, InputLine};
pub use storage::ByteStore;
