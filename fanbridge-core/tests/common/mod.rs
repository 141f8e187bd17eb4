//! Common test utilities for integration tests
//!
//! This module provides:
//! - A simulated board: scripted PWM input, fixed ADC counts and fans that
//!   record every duty they are given
//! - Edge-train synthesis for a given period and duty
//! - A calibration fixture written through the real store
//!
//! Everything uses the reference dimensions (2 fans, 4 sensors, 8 x 21 grid).

#![allow(dead_code)]

pub mod harness;

use fanbridge_core::capture::CaptureSession;
use fanbridge_core::store::ConfigStore;
use fanbridge_core::temperature::SensorTransform;
use fanbridge_core::traits::{AnalogSensors, ByteStore, CaptureDriver, FanOutputs, InputLine};
use fanbridge_core::{ControllerConfig, ControllerState, FilterWeights, RamStore};

pub const FANS: usize = 2;
pub const SENSORS: usize = 4;
pub const TEMPS: usize = 8;
pub const PWMS: usize = 21;

pub type Controller = ControllerState<FANS, SENSORS, TEMPS, PWMS>;
pub type Store<B> = ConfigStore<B, FANS, SENSORS, TEMPS, PWMS>;
pub type Eeprom = RamStore<1024>;

/// Timer ticks per period of a 25 kHz input at 16 MHz
pub const PERIOD_25KHZ: u16 = 640;

/// What the mainboard's PWM line does during a capture session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSignal {
    /// Clean pulse train, first edge at `start`
    Pulses { period: u16, duty: u8, start: u16 },
    /// Line frozen; the counter overflows
    Stuck { high: bool },
    /// Raw edge timestamps, line level `high` when sampled directly
    Edges { ticks: [u16; 5], high: bool },
}

/// Edge timestamps a negative-polarity input with `duty` percent active
/// would produce, starting at `start` and wrapping like the counter
pub fn pulse_edges(period: u16, duty: u8, start: u16) -> [u16; 5] {
    let low = (period as u32 * (100 - duty.min(100) as u32) / 100) as u16;
    [
        start,
        start.wrapping_add(period),
        start.wrapping_add(period).wrapping_add(low),
        start.wrapping_add(period.wrapping_mul(2)).wrapping_add(low),
        start.wrapping_add(period.wrapping_mul(3)).wrapping_add(low),
    ]
}

/// Timer input side of the simulated board
#[derive(Debug)]
pub struct ScriptedInput {
    pub signal: InputSignal,
    pub armed: usize,
    pub disarmed: usize,
    pub reads: usize,
}

impl ScriptedInput {
    pub fn new(signal: InputSignal) -> Self {
        Self { signal, armed: 0, disarmed: 0, reads: 0 }
    }

    pub fn duty(duty: u8) -> Self {
        Self::new(InputSignal::Pulses { period: PERIOD_25KHZ, duty, start: 100 })
    }
}

impl InputLine for ScriptedInput {
    fn is_high(&mut self) -> bool {
        self.reads += 1;
        match self.signal {
            InputSignal::Pulses { .. } => false,
            InputSignal::Stuck { high } | InputSignal::Edges { high, .. } => high,
        }
    }
}

impl CaptureDriver for ScriptedInput {
    fn arm(&mut self, session: &CaptureSession) {
        self.armed += 1;
        match self.signal {
            InputSignal::Pulses { period, duty, start } => {
                for t in pulse_edges(period, duty, start) {
                    session.on_edge(t);
                }
            }
            InputSignal::Stuck { high } => {
                session.on_overflow(high);
            }
            InputSignal::Edges { ticks, .. } => {
                for t in ticks {
                    session.on_edge(t);
                }
            }
        }
    }

    fn disarm(&mut self) {
        self.disarmed += 1;
    }
}

/// ADC returning fixed counts per channel
#[derive(Debug, Clone, Copy)]
pub struct FixedAdc(pub [u16; SENSORS]);

impl FixedAdc {
    /// Counts that make every sensor read `celsius` through the default
    /// transforms
    pub fn at(celsius: [i16; SENSORS]) -> Self {
        let mut counts = [0u16; SENSORS];
        for (s, c) in counts.iter_mut().enumerate() {
            let transform = if s == 0 { SensorTransform::internal_die() } else { SensorTransform::mcp9701() };
            *c = counts_for(&transform, celsius[s]);
        }
        Self(counts)
    }
}

impl AnalogSensors for FixedAdc {
    fn sample(&mut self, sensor: usize) -> u16 {
        self.0[sensor]
    }
}

/// Smallest count whose converted value truncates to `celsius`
pub fn counts_for(transform: &SensorTransform, celsius: i16) -> u16 {
    ((celsius as f32 + transform.offset) / transform.scale + 0.01).ceil() as u16
}

/// Fans that remember everything they were told
#[derive(Debug, Default)]
pub struct RecordingFans {
    pub current: [u8; FANS],
    pub writes: Vec<(usize, u8)>,
}

impl FanOutputs for RecordingFans {
    fn set_duty(&mut self, fan: usize, duty: u8) {
        self.current[fan] = duty;
        self.writes.push((fan, duty));
    }
}

/// Calibration used across tests
///
/// - Filters undamped (weight 1.0) so one cycle settles
/// - Fan 1 follows sensor 1; fan 2 averages sensors 2 and 3
/// - Cell (t, p) = 4p + 2t, monotone on both axes
pub struct Calibration {
    pub filter: FilterWeights,
    pub weights: [[f32; SENSORS]; FANS],
}

impl Calibration {
    pub fn ramp_cell(temp: usize, pwm: usize) -> u8 {
        (4 * pwm + 2 * temp) as u8
    }

    pub fn ramp_row(temp: usize) -> [u8; PWMS] {
        let mut row = [0u8; PWMS];
        for (p, v) in row.iter_mut().enumerate() {
            *v = Self::ramp_cell(temp, p);
        }
        row
    }

    /// Persist everything into `store`
    pub fn write<B: ByteStore>(&self, store: &mut Store<B>) {
        store.save_filter_weights(&self.filter).unwrap();
        for fan in 0..FANS {
            store.save_temp_weights(fan, &self.weights[fan]).unwrap();
            for t in 0..TEMPS {
                store.save_mapping_row(fan, t, &Self::ramp_row(t)).unwrap();
            }
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            filter: FilterWeights::new(1.0, 1.0).unwrap(),
            weights: [[0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 1.0]],
        }
    }
}

/// Fresh EEPROM holding the default calibration
pub fn calibrated_store() -> Store<Eeprom> {
    let mut store = Store::new(Eeprom::new()).unwrap();
    Calibration::default().write(&mut store);
    store
}

/// Controller after a clean startup on the default calibration
pub fn calibrated_controller() -> (Controller, Store<Eeprom>, RecordingFans) {
    let mut store = calibrated_store();
    let mut fans = RecordingFans::default();
    let mut controller = Controller::new(ControllerConfig::default()).unwrap();
    let report = controller.startup(&mut store, &mut fans);
    assert!(report.is_clean(), "calibrated startup failed: {:?}", report);
    (controller, store, fans)
}
