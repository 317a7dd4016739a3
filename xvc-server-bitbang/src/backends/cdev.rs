//! # GPIO Character Device Backend
//!
//! Portable backend for any Linux GPIO controller, using the GPIO character device
//! (`/dev/gpiochipN`). Every line update is an ioctl, which makes this backend a lot
//! slower than [`super::gpiomem`], but the three outputs change in one atomic kernel
//! operation.
//!
//! ## Example Usage
//!
//! ```ignore
//! use xvc_server_bitbang::{backends::cdev::CdevPins, engine::ShiftEngine, pins::PinMap};
//! use xvc_server::server::Builder;
//!
//! let pins = CdevPins::new("/dev/gpiochip0", PinMap::DEFAULT)?;
//! let mut server = Builder::new().build(ShiftEngine::new(pins));
//! server.listen("0.0.0.0:2542")?;
//! ```
use std::path::Path;

use gpiocdev::{
    Request,
    line::{Bias, Offset, Value, Values},
};

use crate::pins::{JtagPins, Lines, PinError, PinMap};

const CONSUMER: &str = "xvc-bitbang";

/// Output values for every `(high, low)` pair of line sets, see [`CdevPins::index`].
///
/// Lines in neither set are left out so that the request keeps their level.
fn value_table(pins: &PinMap) -> Vec<Values> {
    let mut values = Vec::with_capacity(64);
    for index in 0..64u8 {
        let high = Lines::from_bits_retain(index >> 3);
        let low = Lines::from_bits_retain(index & 0b111);
        let mut combination = Values::default();
        for gpio in pins.gpios(high) {
            combination.set(gpio, Value::Active);
        }
        for gpio in pins.gpios(low.difference(high)) {
            combination.set(gpio, Value::Inactive);
        }
        values.push(combination);
    }
    values
}

/// JTAG lines requested from a GPIO character device.
pub struct CdevPins {
    outputs: Request,
    input: Request,
    tdo: Offset,
    /// Output values for every `(high, low)` pair, see [`CdevPins::index`]
    values: Vec<Values>,
    error: Option<gpiocdev::Error>,
}

impl CdevPins {
    /// Requests the lines from `chip`, outputs first in the idle state.
    pub fn new(chip: impl AsRef<Path>, pins: PinMap) -> Result<CdevPins, PinError> {
        pins.validate()?;
        let chip = chip.as_ref();
        log::debug!("Requesting GPIO lines {} from {}", pins, chip.display());

        let outputs = Request::builder()
            .on_chip(chip)
            .with_consumer(CONSUMER)
            .with_lines(&pins.outputs())
            .as_output(Value::Inactive)
            .request()?;
        let input = Request::builder()
            .on_chip(chip)
            .with_consumer(CONSUMER)
            .with_line(pins.tdo)
            .as_input()
            .with_bias(Bias::PullUp)
            .request()?;

        let mut gpio = CdevPins {
            outputs,
            input,
            tdo: pins.tdo,
            values: value_table(&pins),
            error: None,
        };
        gpio.write(Lines::TMS, Lines::TCK | Lines::TDI);
        if let Some(err) = gpio.take_error() {
            return Err(err);
        }
        log::info!("GPIO lines requested from {}", chip.display());
        Ok(gpio)
    }

    #[inline(always)]
    fn index(high: Lines, low: Lines) -> usize {
        (usize::from(high.bits() & 0b111) << 3) | usize::from(low.bits() & 0b111)
    }

    fn record(&mut self, err: gpiocdev::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

impl JtagPins for CdevPins {
    fn write(&mut self, high: Lines, low: Lines) {
        if let Err(err) = self.outputs.set_values(&self.values[Self::index(high, low)]) {
            self.record(err);
        }
    }

    fn read_tdo(&mut self) -> bool {
        match self.input.value(self.tdo) {
            Ok(value) => value == Value::Active,
            Err(err) => {
                self.record(err);
                false
            }
        }
    }

    fn take_error(&mut self) -> Option<PinError> {
        self.error.take().map(PinError::from)
    }
}
