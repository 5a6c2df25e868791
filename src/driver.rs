use embedded_hal::digital::{OutputPin, PinState};

use crate::calibration::{CalibrationError, CalibrationParams, ChipModel, Multipliers};
use crate::pulse::{Line, PulseCounter, PulseWindow};
use crate::sink::MeasurementSink;

/// Update cycles discarded after setup while both pulse windows fill up.
const WARMUP_TICKS: u8 = 2;

/// A free-running microsecond clock. Expected to wrap at `u32::MAX`.
pub trait MicrosClock {
    fn now_us(&self) -> u32;
}

impl<F> MicrosClock for F
where
    F: Fn() -> u32,
{
    fn now_us(&self) -> u32 {
        self()
    }
}

/// What the `CF1` line reports, selected by the `SEL` pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingMode {
    Current,
    Voltage,
}

impl SamplingMode {
    /// `SEL` level for this mode. High selects voltage.
    pub fn sel_level(self) -> PinState {
        match self {
            SamplingMode::Current => PinState::Low,
            SamplingMode::Voltage => PinState::High,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SamplingMode::Current => SamplingMode::Voltage,
            SamplingMode::Voltage => SamplingMode::Current,
        }
    }
}

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hlw8012Error<PIN> {
    /// Driving the `SEL` pin failed.
    Pin(PIN),
    Calibration(CalibrationError),
}

impl<PIN> From<CalibrationError> for Hlw8012Error<PIN> {
    fn from(err: CalibrationError) -> Self {
        Hlw8012Error::Calibration(err)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Hlw8012Config {
    /// The chip on the board
    pub model: ChipModel,
    /// Current sense resistance and voltage divider ratio
    pub calibration: CalibrationParams,
    /// Update cycles spent measuring one `CF1` quantity before switching to the other.
    /// 0 never switches.
    pub change_mode_every: u32,
    /// The `CF1` quantity measured after setup
    pub initial_mode: SamplingMode,
}

impl Default for Hlw8012Config {
    fn default() -> Self {
        Self {
            model: ChipModel::Hlw8012,
            calibration: CalibrationParams::default(),
            change_mode_every: 8,
            initial_mode: SamplingMode::Voltage,
        }
    }
}

pub struct Hlw8012<'a, SEL, CLK> {
    counter: &'a PulseCounter,
    sel: SEL,
    clock: CLK,
    config: Hlw8012Config,
    multipliers: Multipliers,
    recalc: bool,
    mode: SamplingMode,
    change_mode_at: u32,
    nth_value: u8,
    skip_next_cf1: bool,
    cf_window: PulseWindow,
    cf1_window: PulseWindow,
    /// Kept wider than the published value so small increments still register on a large total.
    energy_wh: f64,
}

impl<'a, SEL, CLK> Hlw8012<'a, SEL, CLK>
where
    SEL: OutputPin,
    CLK: MicrosClock,
{
    ///
    ///
    /// # Arguments
    ///
    /// * `counter`: The pulse counter fed by the `CF` and `CF1` rising-edge interrupts.
    /// * `sel`: The output pin wired to the chip's `SEL` input.
    /// * `clock`: The microsecond clock.
    /// * `config`: Chip model, calibration and mode switching settings.
    ///
    /// Nothing is touched until [`setup`](Self::setup) is called.
    pub fn new(counter: &'a PulseCounter, sel: SEL, clock: CLK, config: Hlw8012Config) -> Self {
        let now = clock.now_us();

        Self {
            counter,
            sel,
            clock,
            multipliers: Multipliers::default(),
            recalc: true,
            mode: config.initial_mode,
            change_mode_at: 0,
            nth_value: 0,
            skip_next_cf1: false,
            cf_window: PulseWindow::new(Line::Cf, now),
            cf1_window: PulseWindow::new(Line::Cf1, now),
            energy_wh: 0.0,
            config,
        }
    }

    /// Drives `SEL` to the configured initial mode, restarts both pulse windows and computes
    /// the multipliers. Safe to call again; the accumulated energy is kept.
    ///
    /// Attach the edge interrupts to the [`PulseCounter`] before calling this.
    pub fn setup(&mut self) -> Result<(), Hlw8012Error<SEL::Error>> {
        info!("Setting up {}", self.config.model.name());

        let mode = self.config.initial_mode;
        self.sel
            .set_state(mode.sel_level())
            .map_err(Hlw8012Error::Pin)?;
        self.mode = mode;

        self.counter.take(Line::Cf);
        self.cf_window.restart(self.clock.now_us());
        self.counter.take(Line::Cf1);
        self.cf1_window.restart(self.clock.now_us());

        self.change_mode_at = 0;
        self.nth_value = 0;
        self.skip_next_cf1 = false;
        self.recalculate_multipliers();
        self.log_config();

        Ok(())
    }

    pub fn log_config(&self) {
        info!(
            "{}: current resistor {} ohm, voltage divider {}, change mode every {}, mode {}",
            self.config.model.name(),
            self.config.calibration.current_resistor(),
            self.config.calibration.voltage_divider(),
            self.config.change_mode_every,
            self.mode,
        );
    }

    /// Runs one sampling cycle and hands the results to `sink`.
    ///
    /// Meant to be called at a fixed interval. A cycle that switches the `SEL` mode measures
    /// nothing, and the `CF1` reading of the cycle right after it is dropped while the chip
    /// settles. The first two measuring cycles after [`setup`](Self::setup) publish nothing.
    pub fn update<S: MeasurementSink>(
        &mut self,
        sink: &mut S,
    ) -> Result<(), Hlw8012Error<SEL::Error>> {
        if self.recalc {
            self.recalculate_multipliers();
        }

        if self.config.change_mode_every != 0 {
            let at = self.change_mode_at;
            self.change_mode_at = at.saturating_add(1);
            if at >= self.config.change_mode_every {
                return self.toggle_mode();
            }
        }

        let cf = self
            .cf_window
            .read_and_reset(self.counter, self.clock.now_us());
        let cf1 = self
            .cf1_window
            .read_and_reset(self.counter, self.clock.now_us());

        if self.nth_value < WARMUP_TICKS {
            self.nth_value += 1;
            return Ok(());
        }

        let cf_hz = cf.hz(self.clock.now_us());
        let cf1_hz = cf1.hz(self.clock.now_us());

        let power = self.multipliers.power_watts(cf_hz);
        sink.publish_power(power);

        if self.skip_next_cf1 {
            self.skip_next_cf1 = false;
            trace!("Dropping CF1 sample taken across a mode switch");
        } else {
            match self.mode {
                SamplingMode::Voltage => {
                    sink.publish_voltage(self.multipliers.voltage_volts(cf1_hz))
                }
                SamplingMode::Current => {
                    sink.publish_current(self.multipliers.current_amps(cf1_hz))
                }
            }
        }

        let delta_s = cf.elapsed_us(self.clock.now_us()) as f32 / 1_000_000.0;
        if let Some(total) = self.accumulate_energy(power, delta_s) {
            sink.publish_energy(total);
        }

        Ok(())
    }

    fn toggle_mode(&mut self) -> Result<(), Hlw8012Error<SEL::Error>> {
        let next = self.mode.toggled();
        self.sel
            .set_state(next.sel_level())
            .map_err(Hlw8012Error::Pin)?;

        debug!("CF1 now measuring {}", next);
        self.mode = next;
        self.change_mode_at = 0;
        self.skip_next_cf1 = true;
        Ok(())
    }

    fn recalculate_multipliers(&mut self) {
        self.multipliers = Multipliers::compute(self.config.model, &self.config.calibration);
        self.recalc = false;
        trace!("Multipliers: {}", self.multipliers);
    }

    fn accumulate_energy(&mut self, power: f32, delta_s: f32) -> Option<f32> {
        if delta_s > 0.0 && power >= 0.0 {
            self.energy_wh += f64::from(power) * f64::from(delta_s) / 3600.0;
            Some(self.energy_wh())
        } else {
            None
        }
    }

    pub fn set_model(&mut self, model: ChipModel) {
        self.config.model = model;
        self.recalc = true;
    }

    pub fn set_calibration(&mut self, calibration: CalibrationParams) {
        self.config.calibration = calibration;
        self.recalc = true;
    }

    pub fn set_current_resistor(&mut self, ohms: f32) -> Result<(), CalibrationError> {
        self.set_calibration(self.config.calibration.with_current_resistor(ohms)?);
        Ok(())
    }

    pub fn set_voltage_divider(&mut self, ratio: f32) -> Result<(), CalibrationError> {
        self.set_calibration(self.config.calibration.with_voltage_divider(ratio)?);
        Ok(())
    }

    pub fn set_change_mode_every(&mut self, cycles: u32) {
        self.config.change_mode_every = cycles;
    }

    /// Takes effect at the next [`setup`](Self::setup). Until then `CF1` keeps being read
    /// in the mode the `SEL` pin is actually driven to.
    pub fn set_initial_mode(&mut self, mode: SamplingMode) {
        self.config.initial_mode = mode;
    }

    /// The quantity `CF1` currently reports.
    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// The multipliers in use. Stale after a calibration change until the next update.
    pub fn multipliers(&self) -> Multipliers {
        self.multipliers
    }

    pub fn energy_wh(&self) -> f32 {
        self.energy_wh as f32
    }

    pub fn reset_energy(&mut self) {
        self.energy_wh = 0.0;
    }

    pub fn config(&self) -> &Hlw8012Config {
        &self.config
    }

    /// Gives back the `SEL` pin and the clock.
    pub fn release(self) -> (SEL, CLK) {
        (self.sel, self.clock)
    }
}

#[cfg(feature = "std")]
impl<PIN> std::fmt::Display for Hlw8012Error<PIN>
where
    PIN: std::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hlw8012Error::Pin(pin) => write!(f, "SEL pin error: {pin:?}"),
            Hlw8012Error::Calibration(err) => write!(f, "Invalid calibration: {err:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl<PIN> std::error::Error for Hlw8012Error<PIN>
where
    PIN: std::fmt::Debug,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
