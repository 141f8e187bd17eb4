//! Deterministic drivers for multi-cycle tests
//!
//! Provides:
//! - A seeded RNG for jitter without pulling in `rand`
//! - A cycle runner that collects every outcome

use fanbridge_core::capture::CaptureSession;
use fanbridge_core::CycleOutcome;

use super::{Controller, FixedAdc, RecordingFans, ScriptedInput, FANS, SENSORS};

/// Deterministic RNG for test reproducibility
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    /// Uniform in `min..max`
    pub fn gen_range(&mut self, min: u16, max: u16) -> u16 {
        min + (self.next_u32() % (max - min) as u32) as u16
    }
}

/// Run `cycles` control cycles against one scripted board
pub fn run_cycles(
    controller: &mut Controller,
    input: &mut ScriptedInput,
    adc: &mut FixedAdc,
    fans: &mut RecordingFans,
    cycles: usize,
) -> Vec<CycleOutcome<FANS, SENSORS>> {
    let session = CaptureSession::new();
    (0..cycles)
        .map(|_| controller.run_cycle(&session, input, adc, fans))
        .collect()
}
