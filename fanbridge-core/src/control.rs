//! The Control Loop
//!
//! [`ControllerState`] owns everything the firmware knows: calibration,
//! filters, the operating mode and the last outputs. The platform's main
//! loop calls [`ControllerState::run_cycle`] forever and routes host
//! commands to the getters and setters in between cycles.
//!
//! ## One cycle
//!
//! ```text
//!  arm capture ─→ spin until complete ─→ filtered duty_in
//!                                             │
//!  sample sensors ─→ filtered readings        │
//!                          │                  │
//!        ┌─────────────────┼──────────────────┤
//!        ↓ Auto            ↓ Manual           ↓ Failsafe
//!  interpolate(fan,     manual[fan]        duty_in
//!   duty_in, temp(fan))
//!        └─────────────────┴──────────────────┘
//!                          ↓
//!                   set_duty(fan, ·)
//! ```
//!
//! Every fan receives a duty on every cycle. A fan whose temperature cannot
//! be formed in Auto mode falls back to `duty_in` for that cycle.
//!
//! ## Startup
//!
//! Fans start at the default duty. Records load in a fixed order (filter
//! pair, per-fan weights, mapping rows); the first failure stops the
//! sequence and leaves the controller in Failsafe.

use crate::capture::{CaptureSession, DutyCycleMeter};
use crate::config::ControllerConfig;
use crate::errors::{ConfigError, ConfigResult, StoreError, StoreResult};
use crate::filter::FilterWeights;
use crate::interpolation::{Geometry, MappingTable};
use crate::state::{
    ConfigSummary, CycleOutcome, ModeCell, ModeRequest, OperatingMode, StartupFault,
    StartupReport, StatusReport,
};
use crate::store::{ConfigStore, Region, StoreLayout};
use crate::temperature::TemperatureModel;
use crate::traits::{AnalogSensors, ByteStore, CaptureDriver, FanOutputs};

/// Complete controller state for `F` fans, `S` sensors and a `T` x `P` grid
#[derive(Debug, Clone)]
pub struct ControllerState<const F: usize, const S: usize, const T: usize, const P: usize> {
    geometry: Geometry,
    default_duty: u8,
    report_every: u16,
    pwm_filter_init: f32,

    temps: TemperatureModel<F, S>,
    table: MappingTable<F, T, P>,
    filter_weights: FilterWeights,
    meter: DutyCycleMeter,
    manual: [u8; F],
    mode: ModeCell,
    persisted_valid: bool,

    duty_in: u8,
    outputs: [u8; F],
    loop_count: u16,
    heartbeat: bool,
}

impl<const F: usize, const S: usize, const T: usize, const P: usize> ControllerState<F, S, T, P> {
    /// Controller in Auto mode with default tables; call
    /// [`startup`](Self::startup) before the first cycle
    pub fn new(config: ControllerConfig<S>) -> ConfigResult<Self> {
        config.validate()?;
        config.geometry.check_dimensions::<T, P>()?;

        Ok(Self {
            geometry: config.geometry,
            default_duty: config.default_duty,
            report_every: config.report_every,
            pwm_filter_init: config.pwm_filter_init,
            temps: TemperatureModel::new(config.geometry, config.transforms, config.temp_filter_init),
            table: MappingTable::filled(config.default_duty)?,
            filter_weights: FilterWeights::default(),
            meter: DutyCycleMeter::new(config.polarity, config.pwm_filter_init, config.resample),
            manual: [config.default_duty; F],
            mode: ModeCell::new(OperatingMode::Auto),
            persisted_valid: false,
            duty_in: 0,
            outputs: [config.default_duty; F],
            loop_count: 0,
            heartbeat: false,
        })
    }

    /// Power-on sequence: start the fans, reset tables, load persisted
    /// records in order and pick the initial mode
    pub fn startup<B, O>(&mut self, store: &mut ConfigStore<B, F, S, T, P>, fans: &mut O) -> StartupReport
    where
        B: ByteStore,
        O: FanOutputs + ?Sized,
    {
        for fan in 0..F {
            fans.set_duty(fan, self.default_duty);
        }
        self.outputs = [self.default_duty; F];

        for fan in 0..F {
            self.temps.install_weights(fan, [0.0; S]);
        }
        self.table = MappingTable::filled(self.default_duty).unwrap_or_default();
        self.mode.set(OperatingMode::Auto);
        self.persisted_valid = false;

        let fault = self.load_all(store);
        if let Some(fault) = fault {
            log_error!("startup: persisted configuration invalid, using failsafe mode");
            self.mode.set(OperatingMode::Failsafe);
            return StartupReport { mode: OperatingMode::Failsafe, fault: Some(fault) };
        }

        self.persisted_valid = true;
        log_info!("startup: configuration loaded, auto mode");
        StartupReport { mode: OperatingMode::Auto, fault: None }
    }

    fn load_all<B: ByteStore>(&mut self, store: &mut ConfigStore<B, F, S, T, P>) -> Option<StartupFault> {
        match store.load_filter_weights() {
            Ok(weights) => self.filter_weights = weights,
            Err(error) => return Some(StartupFault { region: Region::FilterWeights, error }),
        }

        self.meter.reset_filter(self.pwm_filter_init);
        self.temps.reset_filters();

        for fan in 0..F {
            match store.load_temp_weights(fan) {
                Ok(weights) => self.temps.install_weights(fan, weights),
                Err(error) => return Some(StartupFault { region: Region::TempWeights { fan }, error }),
            }
        }

        for fan in 0..F {
            for temp in 0..T {
                let region = Region::MappingRow { fan, temp };
                let loaded = store
                    .load_mapping_row(fan, temp)
                    .and_then(|row| self.install_row(store.layout(), fan, temp, row));
                if let Err(error) = loaded {
                    return Some(StartupFault { region, error });
                }
            }
        }

        None
    }

    /// Put a row that came out of the store into the table. A row the table
    /// refuses is reported against the record it was read from.
    fn install_row(&mut self, layout: &StoreLayout, fan: usize, temp: usize, row: [u8; P]) -> StoreResult<()> {
        self.table.set_row(fan, temp, row).map_err(|_| {
            let address = layout
                .span(Region::MappingRow { fan, temp })
                .map_or(0, |(address, _)| address);
            StoreError::InvalidPayload { address, reason: "mapping row rejected by table" }
        })
    }

    /// One iteration of the control loop
    pub fn run_cycle<D, A, O>(
        &mut self,
        session: &CaptureSession,
        capture: &mut D,
        adc: &mut A,
        fans: &mut O,
    ) -> CycleOutcome<F, S>
    where
        D: CaptureDriver + ?Sized,
        A: AnalogSensors + ?Sized,
        O: FanOutputs + ?Sized,
    {
        let filtered = self.meter.measure(session, capture, self.filter_weights.pwm());
        let duty = libm::floorf(filtered + 0.5).clamp(0.0, 100.0) as u8;
        self.duty_in = duty;

        self.temps.sample(adc, self.filter_weights.temp());

        let mode = self.mode.resolve();
        for fan in 0..F {
            let out = match mode {
                OperatingMode::Failsafe => duty,
                OperatingMode::Manual => self.manual[fan],
                OperatingMode::Auto => self.auto_duty(fan, duty),
            };
            fans.set_duty(fan, out);
            self.outputs[fan] = out;
        }

        self.heartbeat = !self.heartbeat;

        self.loop_count += 1;
        let report = if self.loop_count >= self.report_every {
            self.loop_count = 0;
            Some(self.status_report())
        } else {
            None
        };

        CycleOutcome {
            mode,
            duty_in: duty,
            outputs: self.outputs,
            heartbeat: self.heartbeat,
            report,
        }
    }

    fn auto_duty(&self, fan: usize, duty: u8) -> u8 {
        match self.temps.average_temp(fan) {
            Ok(t) => {
                let t = self.temps.normalize_temp(t);
                self.table.interpolate(&self.geometry, fan, duty, t).unwrap_or(duty)
            }
            Err(_) => {
                log_warn!("fan {}: temperature weights unusable, passing input duty through", fan);
                duty
            }
        }
    }

    /// Snapshot of mode, input, readings and outputs
    pub fn status_report(&self) -> StatusReport<F, S> {
        StatusReport {
            mode: self.mode(),
            duty_in: self.duty_in,
            temps: *self.temps.readings(),
            outputs: self.outputs,
        }
    }

    // ===== MODE =====

    /// Current operating mode
    pub fn mode(&self) -> OperatingMode {
        self.mode.peek().unwrap_or(OperatingMode::Failsafe)
    }

    /// Apply an explicit mode change
    ///
    /// Auto is entered without re-validating persisted data. Manual duties
    /// above 100 reject the whole request.
    pub fn request_mode(&mut self, request: ModeRequest<F>) -> ConfigResult<()> {
        match request {
            ModeRequest::Auto => {
                if !self.persisted_valid {
                    log_warn!("auto mode requested while persisted configuration is unverified");
                }
                self.mode.set(OperatingMode::Auto);
            }
            ModeRequest::Manual(duties) => {
                if let Some(&value) = duties.iter().find(|&&d| d > 100) {
                    return Err(ConfigError::DutyOutOfRange { value });
                }
                self.manual = duties;
                self.mode.set(OperatingMode::Manual);
            }
            ModeRequest::Failsafe => self.mode.set(OperatingMode::Failsafe),
        }
        log_info!("mode changed to {}", self.mode().as_char());
        Ok(())
    }

    /// True when the last startup loaded every record
    pub fn persisted_valid(&self) -> bool {
        self.persisted_valid
    }

    /// Per-fan duties used in Manual mode
    pub fn manual_duties(&self) -> &[u8; F] {
        &self.manual
    }

    // ===== TEMPERATURE WEIGHTS =====

    /// Weight vector of `fan`
    pub fn temp_weights(&self, fan: usize) -> ConfigResult<[f32; S]> {
        self.temps
            .weights(fan)
            .copied()
            .ok_or(ConfigError::FanOutOfRange { index: fan, count: F })
    }

    /// Replace the weight vector of `fan`
    pub fn set_temp_weights(&mut self, fan: usize, weights: [f32; S]) -> ConfigResult<()> {
        self.temps.set_weights(fan, weights)
    }

    /// Persist the weight vector of `fan`
    pub fn save_temp_weights<B: ByteStore>(&self, store: &mut ConfigStore<B, F, S, T, P>, fan: usize) -> StoreResult<()> {
        let weights = self
            .temps
            .weights(fan)
            .ok_or(StoreError::NoSuchRecord { index: fan })?;
        store.save_temp_weights(fan, weights)
    }

    /// Reload the weight vector of `fan`; untouched on failure
    pub fn load_temp_weights<B: ByteStore>(&mut self, store: &mut ConfigStore<B, F, S, T, P>, fan: usize) -> StoreResult<()> {
        let weights = store.load_temp_weights(fan)?;
        self.temps.install_weights(fan, weights);
        Ok(())
    }

    // ===== FILTER WEIGHTS =====

    /// Filter weight pair
    pub fn filter_weights(&self) -> FilterWeights {
        self.filter_weights
    }

    /// Replace the filter weight pair
    pub fn set_filter_weights(&mut self, weights: FilterWeights) {
        self.filter_weights = weights;
    }

    /// Persist the filter weight pair
    pub fn save_filter_weights<B: ByteStore>(&self, store: &mut ConfigStore<B, F, S, T, P>) -> StoreResult<()> {
        store.save_filter_weights(&self.filter_weights)
    }

    /// Reload the filter weight pair; untouched on failure
    pub fn load_filter_weights<B: ByteStore>(&mut self, store: &mut ConfigStore<B, F, S, T, P>) -> StoreResult<()> {
        self.filter_weights = store.load_filter_weights()?;
        Ok(())
    }

    // ===== MAPPING TABLE =====

    /// Mapping row of `fan` at temperature bucket `temp`
    pub fn mapping_row(&self, fan: usize, temp: usize) -> ConfigResult<[u8; P]> {
        if fan >= F {
            return Err(ConfigError::FanOutOfRange { index: fan, count: F });
        }
        self.table
            .row(fan, temp)
            .copied()
            .ok_or(ConfigError::InvalidGeometry { reason: "temperature bucket out of range" })
    }

    /// Replace a mapping row
    pub fn set_mapping_row(&mut self, fan: usize, temp: usize, row: [u8; P]) -> ConfigResult<()> {
        self.table.set_row(fan, temp, row)
    }

    /// Persist a mapping row
    pub fn save_mapping_row<B: ByteStore>(
        &self,
        store: &mut ConfigStore<B, F, S, T, P>,
        fan: usize,
        temp: usize,
    ) -> StoreResult<()> {
        let row = self
            .table
            .row(fan, temp)
            .ok_or(StoreError::NoSuchRecord { index: fan })?;
        store.save_mapping_row(fan, temp, row)
    }

    /// Reload a mapping row; untouched on failure
    pub fn load_mapping_row<B: ByteStore>(
        &mut self,
        store: &mut ConfigStore<B, F, S, T, P>,
        fan: usize,
        temp: usize,
    ) -> StoreResult<()> {
        let row = store.load_mapping_row(fan, temp)?;
        self.install_row(store.layout(), fan, temp, row)
    }

    // ===== QUERIES =====

    /// Calibration grid
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Dimensions for the host
    pub fn config_summary(&self) -> ConfigSummary {
        ConfigSummary {
            fans: F,
            sensors: S,
            pwm_step: self.geometry.pwm_step(),
            pwm_buckets: P,
            temp_min: self.geometry.temp_min(),
            temp_step: self.geometry.temp_step(),
            temp_max: self.geometry.temp_max(),
            temp_buckets: T,
        }
    }

    /// Last filtered reading of every sensor
    pub fn readings(&self) -> &[i16; S] {
        self.temps.readings()
    }

    /// Last rounded input duty
    pub fn duty_in(&self) -> u8 {
        self.duty_in
    }

    /// Last output duty of every fan
    pub fn outputs(&self) -> &[u8; F] {
        &self.outputs
    }

    /// The PWM input meter
    pub fn meter(&self) -> &DutyCycleMeter {
        &self.meter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RamStore;
    use crate::traits::InputLine;

    type Controller = ControllerState<2, 4, 8, 21>;

    struct Bench {
        edges: [u16; 5],
        high: bool,
    }

    impl InputLine for Bench {
        fn is_high(&mut self) -> bool {
            self.high
        }
    }

    impl CaptureDriver for Bench {
        fn arm(&mut self, session: &CaptureSession) {
            for t in self.edges {
                session.on_edge(t);
            }
        }
        fn disarm(&mut self) {}
    }

    struct Adc([u16; 4]);

    impl AnalogSensors for Adc {
        fn sample(&mut self, sensor: usize) -> u16 {
            self.0[sensor]
        }
    }

    struct Fans([u8; 2]);

    impl FanOutputs for Fans {
        fn set_duty(&mut self, fan: usize, duty: u8) {
            self.0[fan] = duty;
        }
    }

    fn bench() -> Bench {
        Bench { edges: [100, 1100, 1150, 1300, 2300], high: false }
    }

    #[test]
    fn rejects_mismatched_geometry() {
        let config = ControllerConfig::default().with_geometry(Geometry::new(20, 50, 5, 5).unwrap());
        assert!(Controller::new(config).is_err());
    }

    #[test]
    fn erased_store_starts_in_failsafe() {
        let mut store = ConfigStore::new(RamStore::<1024>::new()).unwrap();
        let mut c = Controller::new(ControllerConfig::default()).unwrap();
        let mut fans = Fans([0; 2]);
        let report = c.startup(&mut store, &mut fans);
        assert_eq!(report.mode, OperatingMode::Failsafe);
        assert_eq!(report.fault.map(|f| f.region), Some(Region::FilterWeights));
        assert_eq!(fans.0, [35, 35]);
        assert!(!c.persisted_valid());
    }

    #[test]
    fn invalid_mode_tag_falls_back_to_passthrough() {
        let mut c = Controller::new(ControllerConfig::default()).unwrap();
        c.set_filter_weights(FilterWeights::new(1.0, 1.0).unwrap());
        c.mode.set_raw(b'Z');
        let mut b = bench();
        let mut adc = Adc([355; 4]);
        let mut fans = Fans([0; 2]);
        let session = CaptureSession::new();
        let out = c.run_cycle(&session, &mut b, &mut adc, &mut fans);
        assert_eq!(out.mode, OperatingMode::Failsafe);
        assert_eq!(fans.0, [80, 80]);
        assert_eq!(c.mode(), OperatingMode::Failsafe);
    }

    #[test]
    fn auto_with_zero_weights_passes_through() {
        let mut c = Controller::new(ControllerConfig::default()).unwrap();
        c.set_filter_weights(FilterWeights::new(1.0, 1.0).unwrap());
        c.set_temp_weights(1, [1.0, 0.0, 0.0, 0.0]).unwrap();
        let mut b = bench();
        let mut adc = Adc([355; 4]);
        let mut fans = Fans([0; 2]);
        let session = CaptureSession::new();
        let out = c.run_cycle(&session, &mut b, &mut adc, &mut fans);
        assert_eq!(out.mode, OperatingMode::Auto);
        // fan 0 has no weights: input duty; fan 1 reads the flat default table
        assert_eq!(out.outputs, [80, 35]);
    }

    #[test]
    fn manual_request_validates_duties() {
        let mut c = Controller::new(ControllerConfig::default()).unwrap();
        assert_eq!(
            c.request_mode(ModeRequest::Manual([10, 101])),
            Err(ConfigError::DutyOutOfRange { value: 101 })
        );
        assert_eq!(c.mode(), OperatingMode::Auto);
        assert!(c.request_mode(ModeRequest::Manual([10, 90])).is_ok());
        assert_eq!(c.manual_duties(), &[10, 90]);
        assert_eq!(c.mode(), OperatingMode::Manual);
    }

    #[test]
    fn report_period_and_heartbeat() {
        let config = ControllerConfig::default().with_report_every(3);
        let mut c = Controller::new(config).unwrap();
        c.request_mode(ModeRequest::Failsafe).unwrap();
        let mut b = bench();
        let mut adc = Adc([355; 4]);
        let mut fans = Fans([0; 2]);
        let session = CaptureSession::new();

        let mut beats = [false; 6];
        let mut reports = 0;
        for beat in beats.iter_mut() {
            let out = c.run_cycle(&session, &mut b, &mut adc, &mut fans);
            *beat = out.heartbeat;
            if let Some(report) = out.report {
                assert_eq!(report.mode, OperatingMode::Failsafe);
                reports += 1;
            }
        }
        assert_eq!(reports, 2);
        assert_eq!(beats, [true, false, true, false, true, false]);
    }

    #[test]
    fn rejected_row_is_an_invalid_payload() {
        let mut c = Controller::new(ControllerConfig::default()).unwrap();
        let layout = StoreLayout::new(2, 4, 8, 21);
        let mut row = [60u8; 21];
        row[3] = 140;

        let err = c.install_row(&layout, 1, 2, row).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidPayload { address: 43 + 10 * 22, reason: "mapping row rejected by table" }
        );
        assert_eq!(c.mapping_row(1, 2), Ok([35; 21]));

        assert!(matches!(c.install_row(&layout, 0, 8, [60; 21]), Err(StoreError::InvalidPayload { .. })));
        assert_eq!(c.install_row(&layout, 1, 2, [60; 21]), Ok(()));
        assert_eq!(c.mapping_row(1, 2), Ok([60; 21]));
    }

    #[test]
    fn summary_matches_reference_grid() {
        let c = Controller::new(ControllerConfig::default()).unwrap();
        let s = c.config_summary();
        assert_eq!((s.fans, s.sensors, s.pwm_buckets, s.temp_buckets), (2, 4, 21, 8));
        assert_eq!((s.temp_min, s.temp_step, s.temp_max, s.pwm_step), (20, 5, 55, 5));
    }
}
