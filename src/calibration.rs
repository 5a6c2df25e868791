//! Conversion of measured pulse frequencies into physical units.

/// Internal oscillator frequency of the HLW8012 and CSE7759.
const CLOCK_FREQ: f32 = 3_579_000.0;

const BL0937_VREF: f32 = 1.218;
const HLW8012_VREF: f32 = 2.43;

/// The supported chips.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipModel {
    Hlw8012,
    /// Electrically compatible with the HLW8012.
    Cse7759,
    Bl0937,
}

impl ChipModel {
    /// Internal reference voltage of the chip, in volts.
    pub fn reference_voltage(self) -> f32 {
        match self {
            ChipModel::Bl0937 => BL0937_VREF,
            ChipModel::Hlw8012 | ChipModel::Cse7759 => HLW8012_VREF,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChipModel::Hlw8012 => "HLW8012",
            ChipModel::Cse7759 => "CSE7759",
            ChipModel::Bl0937 => "BL0937",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The current sense resistance was not a finite value above zero.
    InvalidCurrentResistor,
    /// The voltage divider ratio was not a finite value above zero.
    InvalidVoltageDivider,
}

/// Physical constants of the measuring circuit around the chip.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationParams {
    current_resistor: f32,
    voltage_divider: f32,
}

impl CalibrationParams {
    ///
    ///
    /// # Arguments
    ///
    /// * `current_resistor`: The current sense (shunt) resistance in ohms.
    /// * `voltage_divider`: The ratio of the resistive divider feeding the voltage input.
    ///
    /// returns: Result<CalibrationParams, CalibrationError>
    pub fn new(current_resistor: f32, voltage_divider: f32) -> Result<Self, CalibrationError> {
        Ok(Self {
            current_resistor: check_positive(current_resistor)
                .ok_or(CalibrationError::InvalidCurrentResistor)?,
            voltage_divider: check_positive(voltage_divider)
                .ok_or(CalibrationError::InvalidVoltageDivider)?,
        })
    }

    pub fn current_resistor(&self) -> f32 {
        self.current_resistor
    }

    pub fn voltage_divider(&self) -> f32 {
        self.voltage_divider
    }

    pub(crate) fn with_current_resistor(self, ohms: f32) -> Result<Self, CalibrationError> {
        Self::new(ohms, self.voltage_divider)
    }

    pub(crate) fn with_voltage_divider(self, ratio: f32) -> Result<Self, CalibrationError> {
        Self::new(self.current_resistor, ratio)
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            current_resistor: 0.001,
            voltage_divider: 2351.0,
        }
    }
}

fn check_positive(value: f32) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Scale factors turning a pulse frequency in Hz into watts, amps and volts.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Multipliers {
    pub power: f32,
    pub current: f32,
    pub voltage: f32,
}

impl Multipliers {
    /// Derives all three multipliers for `model` wired with `params`.
    ///
    /// The BL0937 datasheet gives empirical denominators for each quantity, while the
    /// HLW8012 and CSE7759 scale against their internal clock.
    pub fn compute(model: ChipModel, params: &CalibrationParams) -> Self {
        let vref = model.reference_voltage();
        let resistor = params.current_resistor;
        let divider = params.voltage_divider;

        match model {
            ChipModel::Bl0937 => Self {
                power: vref * vref * divider / resistor / 1_750_000.0,
                current: vref / resistor / 95_000.0,
                voltage: vref * divider / 15_500.0,
            },
            ChipModel::Hlw8012 | ChipModel::Cse7759 => Self {
                power: vref * vref * divider / resistor * 64.0 / 24.0 / CLOCK_FREQ,
                current: vref / resistor * 512.0 / 24.0 / CLOCK_FREQ,
                voltage: vref * divider * 256.0 / CLOCK_FREQ,
            },
        }
    }

    pub fn power_watts(&self, hz: f32) -> f32 {
        hz * self.power
    }

    pub fn current_amps(&self, hz: f32) -> f32 {
        hz * self.current
    }

    pub fn voltage_volts(&self, hz: f32) -> f32 {
        hz * self.voltage
    }
}

/// Frequency of `count` pulses observed over `elapsed_us` microseconds. Zero if no time passed.
pub fn get_hz(count: u32, elapsed_us: u32) -> f32 {
    if elapsed_us > 0 {
        count as f32 * 1_000_000.0 / elapsed_us as f32
    } else {
        0.0
    }
}
