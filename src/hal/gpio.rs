//! GPIO HAL for tachometer inputs and locked-rotor outputs.
//!
//! ```text
//! fan TACH ───▶ input pin (no pull; the fan side pulls up)
//! output pin ─▶ UPS alarm input (pulled up on the UPS side)
//!               open-drain: high = released/float, low = driven
//! ```

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, InputOutput, PinDriver, Pull};
use esp_idf_svc::sys::EspError;

use crate::channel::ChannelIo;

/// One channel's pin pair.
pub struct OpenDrainChannel<'d> {
    input: PinDriver<'d, AnyIOPin, Input>,
    output: PinDriver<'d, AnyIOPin, InputOutput>,
}

impl<'d> OpenDrainChannel<'d> {
    /// Configure the pins. The output starts released (floating).
    pub fn new(input_pin: AnyIOPin, output_pin: AnyIOPin) -> Result<Self, EspError> {
        let mut input = PinDriver::input(input_pin)?;
        input.set_pull(Pull::Floating)?;

        let mut output = PinDriver::input_output_od(output_pin)?;
        output.set_pull(Pull::Floating)?;
        output.set_high()?;

        Ok(Self { input, output })
    }
}

impl ChannelIo for OpenDrainChannel<'_> {
    type Error = EspError;

    #[inline]
    fn read_input(&mut self) -> bool {
        self.input.is_high()
    }

    #[inline]
    fn float_output(&mut self) -> Result<(), EspError> {
        self.output.set_high()
    }

    #[inline]
    fn drive_output_low(&mut self) -> Result<(), EspError> {
        self.output.set_low()
    }
}
