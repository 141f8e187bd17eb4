//! End-to-end tests of the serial console
//!
//! Bytes in, response lines out, against a real controller and RAM store.

use fanbridge_core::traits::FanOutputs;
use fanbridge_core::{ConfigStore, ControllerConfig, ControllerState, OperatingMode, RamStore};
use fanbridge_protocol::{write_banner, write_report, Command, Console};
use proptest::prelude::*;

type Controller = ControllerState<2, 4, 8, 21>;
type Store = ConfigStore<RamStore<1024>, 2, 4, 8, 21>;

struct NullFans;

impl FanOutputs for NullFans {
    fn set_duty(&mut self, _fan: usize, _duty: u8) {}
}

struct Bench {
    console: Console,
    controller: Controller,
    store: Store,
}

impl Bench {
    fn new() -> Self {
        Self {
            console: Console::new(),
            controller: Controller::new(ControllerConfig::default()).unwrap(),
            store: Store::new(RamStore::new()).unwrap(),
        }
    }

    /// Send one line, return every response line
    fn send(&mut self, line: &str) -> Vec<String> {
        let mut out = String::new();
        self.console
            .feed_all(line.as_bytes(), &mut self.controller, &mut self.store, &mut out)
            .unwrap();
        self.console
            .feed(b'\n', &mut self.controller, &mut self.store, &mut out)
            .unwrap();
        out.split_terminator("\r\n").map(str::to_owned).collect()
    }

    fn ok(&mut self, line: &str) {
        assert_eq!(self.send(line), vec!["OK".to_owned()], "command: {}", line);
    }
}

fn ramp_row_line(fan: usize, temp: i16, offset: u8) -> String {
    let values: Vec<String> = (0..21u8).map(|p| (p * 4 + offset).to_string()).collect();
    format!("SetPwmMap F{} T:{} {}", fan, temp, values.join(" "))
}

#[test]
fn banner_reports_erased_eeprom() {
    let mut bench = Bench::new();
    let report = bench.controller.startup(&mut bench.store, &mut NullFans);

    let mut out = String::new();
    write_banner(&mut out, &bench.controller, &report).unwrap();
    let lines: Vec<&str> = out.split_terminator("\r\n").collect();

    assert_eq!(lines[0], "FanBridge 1.0-RC2");
    assert_eq!(
        lines[1],
        "Fans:2 Temps:4 PWM_step:5 PWM_coeffs:21 Temp_min:20 Temp_step:5 Temp_max:55 Temp_coeffs:8"
    );
    assert_eq!(lines[2], "*E EEPROM checksum mismatch (PWM exp. filter). Using failsafe mode.");
}

#[test]
fn calibrate_save_and_reload_over_the_wire() {
    let mut bench = Bench::new();

    bench.ok("SetPwmFilt 0.1 0.05");
    bench.ok("SavePwmFilt");
    bench.ok("SetTempWeights F1 0 1 0 0");
    bench.ok("SetTempWeights F2 0 0 0.5 0.5");
    bench.ok("SaveTempWeights F1");
    bench.ok("SaveTempWeights F2");
    for fan in 1..=2 {
        for t in 0..8i16 {
            let temp = 20 + 5 * t;
            bench.ok(&ramp_row_line(fan, temp, t as u8));
            bench.ok(&format!("SavePwmMap F{} T:{}", fan, temp));
        }
    }

    // clobber in memory, then reload from the store
    bench.ok("SetTempWeights F2 1 1 1 1");
    bench.ok("LoadTempWeights F2");
    assert_eq!(bench.send("GetTempWeights F2"), vec!["F2 0.0000 0.0000 0.5000 0.5000"]);

    bench.ok("SetPwmFilt 1 1");
    bench.ok("LoadPwmFilt");
    assert_eq!(bench.send("GetPwmFilt"), vec!["0.1000 0.0500"]);

    // a fresh controller on the same store starts clean
    let mut controller = Controller::new(ControllerConfig::default()).unwrap();
    let report = controller.startup(&mut bench.store, &mut NullFans);
    assert!(report.is_clean());
    assert_eq!(controller.mode(), OperatingMode::Auto);
}

#[test]
fn map_requests_snap_to_the_grid() {
    let mut bench = Bench::new();
    bench.ok(&ramp_row_line(1, 35, 3));

    let reply = bench.send("GetPwmMap F1 T:37");
    assert!(reply[0].starts_with("F1 T:35 3 7 11 "), "{}", reply[0]);

    let reply = bench.send("GetPwmMap F1 T:90");
    assert!(reply[0].starts_with("F1 T:55 35 35 "), "{}", reply[0]);
}

#[test]
fn errors_use_wire_messages() {
    let mut bench = Bench::new();
    assert_eq!(bench.send(""), vec!["E No data"]);
    assert_eq!(bench.send("Fly"), vec!["E Syntax error"]);
    assert_eq!(bench.send("GetTempWeights X1"), vec!["E Syntax error (fan)"]);
    assert_eq!(bench.send("GetTempWeights F3"), vec!["E Wrong fan number"]);
    assert_eq!(bench.send("GetPwmFilt now"), vec!["E Syntax error (extra data/token)"]);
    assert_eq!(bench.send("SetTempWeights F1 0 0 0 0"), vec!["E Syntax error (temperature weight)"]);
    assert_eq!(bench.send("ModeManual F1:50 F2:101"), vec!["E Syntax error (PWM value)"]);
    assert_eq!(bench.send("LoadPwmMap F1 T:20"), vec!["E Loading PWM map"]);
}

#[test]
fn rejected_commands_change_nothing() {
    let mut bench = Bench::new();
    bench.ok("SetTempWeights F1 0 1 0 0");
    bench.send("SetTempWeights F1 0 1 0");
    bench.send("LoadTempWeights F1");
    assert_eq!(bench.send("GetTempWeights F1"), vec!["F1 0.0000 1.0000 0.0000 0.0000"]);
}

#[test]
fn mode_commands() {
    let mut bench = Bench::new();
    bench.ok("ModeManual F1:20 F2:30");
    assert_eq!(bench.controller.mode(), OperatingMode::Manual);
    assert_eq!(bench.controller.manual_duties(), &[20, 30]);
    bench.ok("ModeFailsafe");
    assert_eq!(bench.controller.mode(), OperatingMode::Failsafe);
    bench.ok("ModeAuto");
    assert_eq!(bench.controller.mode(), OperatingMode::Auto);
}

#[test]
fn overlong_line_is_dropped() {
    let mut bench = Bench::new();
    let long = format!("SetTempWeights F1 {}", "0.1 ".repeat(60));
    assert_eq!(bench.send(&long), vec!["E Buffer overflow"]);
    assert_eq!(bench.send("ModeAuto"), vec!["OK"]);
}

#[test]
fn report_line_from_controller() {
    let bench = Bench::new();
    let mut out = String::new();
    write_report(&mut out, &bench.controller.status_report()).unwrap();
    assert_eq!(out, "*A PWM1_in:0 T0_in:20 T1_in:20 T2_in:20 T3_in:20 F1_out:35 F2_out:35\r\n");
}

proptest! {
    #[test]
    fn parsing_never_panics(line in "[ -~]{0,80}") {
        let _ = Command::<2, 4, 21>::parse(&line);
    }

    #[test]
    fn manual_round_trip(a in 0u8..=100, b in 0u8..=100) {
        let line = format!("ModeManual F1:{} F2:{}", a, b);
        prop_assert_eq!(Command::<2, 4, 21>::parse(&line), Ok(Command::ModeManual([a, b])));
    }
}
