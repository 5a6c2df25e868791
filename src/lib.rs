//!
//! A platform-agnostic driver for the HLW8012 family of single-phase energy metering chips
//! (HLW8012, CSE7759 and BL0937). Built using embedded-hal.
//!
//! The chips report power on the `CF` line and, multiplexed by the `SEL` pin, either current or
//! voltage on the `CF1` line, each as a pulse train whose frequency is proportional to the
//! measured quantity. The driver counts those pulses from interrupt context through a lock-free
//! [`PulseCounter`] and converts them into watts, amps, volts and watt-hours on every
//! [`Hlw8012::update`] call.
//!
//! ```
//! use core::convert::Infallible;
//! use embedded_hal::digital::{ErrorType, OutputPin};
//! use hlw8012::{Hlw8012, Hlw8012Config, PulseCounter, Readings};
//!
//! struct SelPin;
//!
//! impl ErrorType for SelPin {
//!     type Error = Infallible;
//! }
//!
//! impl OutputPin for SelPin {
//!     fn set_low(&mut self) -> Result<(), Infallible> {
//!         Ok(())
//!     }
//!     fn set_high(&mut self) -> Result<(), Infallible> {
//!         Ok(())
//!     }
//! }
//!
//! static COUNTER: PulseCounter = PulseCounter::new();
//!
//! // From the CF and CF1 rising-edge interrupt handlers:
//! COUNTER.on_cf_edge();
//! COUNTER.on_cf1_edge();
//!
//! let mut meter = Hlw8012::new(&COUNTER, SelPin, || 0u32, Hlw8012Config::default());
//! meter.setup().unwrap();
//!
//! let mut readings = Readings::default();
//! meter.update(&mut readings).unwrap();
//! ```
//!

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod fmt;

pub mod calibration;
pub mod driver;
pub mod pulse;
pub mod sink;

pub use calibration::{get_hz, CalibrationError, CalibrationParams, ChipModel, Multipliers};
pub use driver::*;
pub use pulse::{Line, PulseCounter, PulseSample, PulseWindow};
pub use sink::{MeasurementSink, Readings};
