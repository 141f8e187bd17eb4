//! Bench Session Example
//!
//! A simulated board talking to a host: a blank EEPROM comes up in failsafe,
//! the host calibrates it over the console, switches to automatic mode and
//! watches the periodic report lines.
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run -p fanbridge-protocol --example bench_session
//! ```

use fanbridge_core::capture::CaptureSession;
use fanbridge_core::traits::{AnalogSensors, CaptureDriver, FanOutputs, InputLine};
use fanbridge_core::{ConfigStore, ControllerConfig, ReferenceController, RamStore};
use fanbridge_protocol::{write_banner, write_report, Console};

/// Mainboard PWM line: 25 kHz, active low
struct Mainboard {
    duty: u8,
}

impl InputLine for Mainboard {
    fn is_high(&mut self) -> bool {
        true
    }
}

impl CaptureDriver for Mainboard {
    fn arm(&mut self, session: &CaptureSession) {
        let period = 640u16;
        let low = (period as u32 * (100 - self.duty as u32) / 100) as u16;
        let start = 100u16;
        for t in [start, start + period, start + period + low, start + 2 * period + low, start + 3 * period + low] {
            session.on_edge(t);
        }
    }

    fn disarm(&mut self) {}
}

/// Sensors sitting at a warm, steady temperature
struct WarmCase;

impl AnalogSensors for WarmCase {
    fn sample(&mut self, sensor: usize) -> u16 {
        if sensor == 0 { 330 } else { 140 }
    }
}

struct Fans;

impl FanOutputs for Fans {
    fn set_duty(&mut self, _fan: usize, _duty: u8) {}
}

fn host(console: &mut Console, controller: &mut ReferenceController, store: &mut ConfigStore<RamStore<1024>, 2, 4, 8, 21>, line: &str) {
    let mut out = String::new();
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    console
        .feed_all(&bytes, controller, store, &mut out)
        .expect("writing to a String cannot fail");
    print!("> {}\n{}", line, out);
}

fn main() {
    println!("FanBridge Bench Session");
    println!("=======================\n");

    let mut store = ConfigStore::new(RamStore::<1024>::new()).expect("reference layout fits 1 KiB");
    let mut controller = ReferenceController::new(ControllerConfig::default()).expect("reference geometry");
    let mut console = Console::new();

    let report = controller.startup(&mut store, &mut Fans);
    let mut banner = String::new();
    write_banner(&mut banner, &controller, &report).expect("writing to a String cannot fail");
    print!("{}", banner);
    println!();

    // calibrate: fan 1 follows sensor 1, fan 2 averages sensors 2 and 3
    host(&mut console, &mut controller, &mut store, "SetPwmFilt 0.2 0.1");
    host(&mut console, &mut controller, &mut store, "SavePwmFilt");
    host(&mut console, &mut controller, &mut store, "SetTempWeights F1 0 1 0 0");
    host(&mut console, &mut controller, &mut store, "SetTempWeights F2 0 0 1 1");
    host(&mut console, &mut controller, &mut store, "SaveTempWeights F1");
    host(&mut console, &mut controller, &mut store, "SaveTempWeights F2");

    for fan in 1..=2 {
        for t in 0..8u8 {
            let temp = 20 + 5 * t;
            let row: Vec<String> = (0..21u8).map(|p| (p * 4 + 2 * t).min(100).to_string()).collect();
            let set = format!("SetPwmMap F{} T:{} {}", fan, temp, row.join(" "));
            let mut out = String::new();
            console
                .feed_all(set.as_bytes(), &mut controller, &mut store, &mut out)
                .and_then(|_| console.feed(b'\n', &mut controller, &mut store, &mut out))
                .expect("writing to a String cannot fail");
            let save = format!("SavePwmMap F{} T:{}", fan, temp);
            console
                .feed_all(save.as_bytes(), &mut controller, &mut store, &mut out)
                .and_then(|_| console.feed(b'\n', &mut controller, &mut store, &mut out))
                .expect("writing to a String cannot fail");
        }
    }
    println!("(mapping table written and saved)\n");

    host(&mut console, &mut controller, &mut store, "GetPwmMap F1 T:37");
    host(&mut console, &mut controller, &mut store, "ModeAuto");
    println!();

    let session = CaptureSession::new();
    let mut board = Mainboard { duty: 40 };
    for cycle in 0..210 {
        if cycle == 100 {
            board.duty = 70;
            println!("(mainboard raises its request to 70 %)");
        }
        let outcome = controller.run_cycle(&session, &mut board, &mut WarmCase, &mut Fans);
        if let Some(report) = outcome.report {
            let mut line = String::new();
            write_report(&mut line, &report).expect("writing to a String cannot fail");
            print!("{}", line);
        }
    }
}
