/// Receives the values produced by [`Hlw8012::update`](crate::Hlw8012::update).
///
/// Every method defaults to doing nothing, so a sink only implements the quantities it
/// cares about. `()` discards everything.
pub trait MeasurementSink {
    /// Active power in watts.
    fn publish_power(&mut self, _watts: f32) {}

    /// RMS current in amps.
    fn publish_current(&mut self, _amps: f32) {}

    /// RMS voltage in volts.
    fn publish_voltage(&mut self, _volts: f32) {}

    /// Energy accumulated since start (or the last reset) in watt-hours.
    fn publish_energy(&mut self, _watt_hours: f32) {}
}

impl MeasurementSink for () {}

impl<S: MeasurementSink + ?Sized> MeasurementSink for &mut S {
    fn publish_power(&mut self, watts: f32) {
        (**self).publish_power(watts)
    }

    fn publish_current(&mut self, amps: f32) {
        (**self).publish_current(amps)
    }

    fn publish_voltage(&mut self, volts: f32) {
        (**self).publish_voltage(volts)
    }

    fn publish_energy(&mut self, watt_hours: f32) {
        (**self).publish_energy(watt_hours)
    }
}

/// Remembers the most recent value published for each quantity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub power: Option<f32>,
    pub current: Option<f32>,
    pub voltage: Option<f32>,
    pub energy: Option<f32>,
}

impl Readings {
    /// Forgets all values, e.g. before the next update cycle.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl MeasurementSink for Readings {
    fn publish_power(&mut self, watts: f32) {
        self.power = Some(watts);
    }

    fn publish_current(&mut self, amps: f32) {
        self.current = Some(amps);
    }

    fn publish_voltage(&mut self, volts: f32) {
        self.voltage = Some(volts);
    }

    fn publish_energy(&mut self, watt_hours: f32) {
        self.energy = Some(watt_hours);
    }
}
