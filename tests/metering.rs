use std::cell::Cell;

use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
use hlw8012::{
    CalibrationError, ChipModel, Hlw8012, Hlw8012Config, Hlw8012Error, Line, MeasurementSink,
    PulseCounter, Readings, SamplingMode,
};

static COUNTER: PulseCounter = PulseCounter::new();

const TICK_US: u32 = 10_000_000;

/// Keeps every value it is given, in order.
#[derive(Default)]
struct Log {
    power: Vec<f32>,
    current: Vec<f32>,
    voltage: Vec<f32>,
    energy: Vec<f32>,
}

impl MeasurementSink for Log {
    fn publish_power(&mut self, watts: f32) {
        self.power.push(watts);
    }

    fn publish_current(&mut self, amps: f32) {
        self.current.push(amps);
    }

    fn publish_voltage(&mut self, volts: f32) {
        self.voltage.push(volts);
    }

    fn publish_energy(&mut self, watt_hours: f32) {
        self.energy.push(watt_hours);
    }
}

fn configure<SEL, CLK>(meter: &mut Hlw8012<'_, SEL, CLK>) -> Result<(), Hlw8012Error<SEL::Error>>
where
    SEL: embedded_hal::digital::OutputPin,
    CLK: hlw8012::MicrosClock,
{
    meter.set_model(ChipModel::Bl0937);
    meter.set_current_resistor(0.001)?;
    meter.set_voltage_divider(1535.36)?;
    meter.set_change_mode_every(3);
    meter.set_initial_mode(SamplingMode::Current);
    meter.setup()
}

#[test]
fn long_run_alternates_modes_and_accumulates_energy() {
    let now = Cell::new(0u32);
    let sel = PinMock::new(&[
        PinTransaction::set(State::Low),
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
        PinTransaction::set(State::High),
    ]);
    let mut meter = Hlw8012::new(&COUNTER, sel, || now.get(), Hlw8012Config::default());
    configure(&mut meter).unwrap();

    let mut log = Log::default();
    for _ in 0..14 {
        for _ in 0..300 {
            COUNTER.on_edge(Line::Cf);
        }
        for _ in 0..40 {
            COUNTER.on_edge(Line::Cf1);
        }
        now.set(now.get().wrapping_add(TICK_US));
        meter.update(&mut log).unwrap();
    }

    // Cycles 4, 8 and 12 switch modes; of the remaining eleven, two are warm-up.
    assert_eq!(log.power.len(), 9);
    assert_eq!(log.energy.len(), 9);
    // Current: cycles 3, 10 and 11; cycle 9 is a settle cycle.
    assert_eq!(log.current.len(), 3);
    // Voltage: cycles 6, 7 and 14; cycles 5 and 13 are settle cycles.
    assert_eq!(log.voltage.len(), 3);
    assert_eq!(meter.mode(), SamplingMode::Voltage);

    assert!(log.energy.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(log.energy.last().copied(), Some(meter.energy_wh()));

    let (mut sel, _) = meter.release();
    sel.done();
}

#[test]
fn bad_calibration_leaves_config_untouched() {
    let counter = PulseCounter::new();
    let sel = PinMock::new(&[] as &[PinTransaction]);
    let mut meter = Hlw8012::new(&counter, sel, || 0u32, Hlw8012Config::default());

    assert_eq!(
        meter.set_current_resistor(0.0),
        Err(CalibrationError::InvalidCurrentResistor)
    );
    assert_eq!(meter.config().calibration.current_resistor(), 0.001);

    let mut readings = Readings::default();
    readings.publish_power(1.0);
    readings.clear();
    assert!(readings.is_empty());

    let (mut sel, _) = meter.release();
    sel.done();
}
