//! Relay, buzzer and status outputs.

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};

use crate::config::RELAY_SETTLE;

/// Everything the control core switches besides the heater PWM line.
pub trait Outputs {
    /// Switch the high-current contactor feeding the heater.
    fn set_contactor(&mut self, energized: bool);

    fn set_buzzer(&mut self, on: bool);

    /// Block until the solid state relay has settled after a duty cycle change.
    fn settle(&mut self);

    /// Show a short status caption.
    fn status(&mut self, text: &str);
}

/// Heater relay driven from the time base interrupt.
pub struct PinHeater<PIN: OutputPin> {
    pin: PIN,
}

impl<PIN: OutputPin> PinHeater<PIN> {
    pub fn new(pin: PIN) -> Self {
        Self { pin }
    }

    #[inline]
    pub fn drive(&mut self, on: bool) {
        let res = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if res.is_err() {
            error!("heater pin");
        }
    }
}

/// [`Outputs`] on GPIO pins. The status text goes to the log.
pub struct PinOutputs<C, B, D> {
    contactor: C,
    buzzer: B,
    delay: D,
}

impl<C, B, D> PinOutputs<C, B, D>
where
    C: OutputPin,
    B: OutputPin,
    D: DelayMs<u32>,
{
    /// Takes the pins with everything switched off.
    pub fn new(mut contactor: C, mut buzzer: B, delay: D) -> Self {
        if contactor.set_low().is_err() || buzzer.set_low().is_err() {
            error!("output pins");
        }

        Self {
            contactor,
            buzzer,
            delay,
        }
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), P::Error> {
    if on {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl<C, B, D> Outputs for PinOutputs<C, B, D>
where
    C: OutputPin,
    B: OutputPin,
    D: DelayMs<u32>,
{
    fn set_contactor(&mut self, energized: bool) {
        if drive(&mut self.contactor, energized).is_err() {
            error!("contactor pin");
        }
    }

    fn set_buzzer(&mut self, on: bool) {
        if drive(&mut self.buzzer, on).is_err() {
            error!("buzzer pin");
        }
    }

    fn settle(&mut self) {
        self.delay.delay_ms(RELAY_SETTLE.to_millis());
    }

    fn status(&mut self, text: &str) {
        info!("status: {=str}", text);
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;

    #[derive(Default)]
    struct Pin(bool);

    impl OutputPin for &mut Pin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0 = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Delay(u32);

    impl DelayMs<u32> for &mut Delay {
        fn delay_ms(&mut self, ms: u32) {
            self.0 += ms;
        }
    }

    #[test]
    fn pins_start_off_and_follow_commands() {
        let (mut contactor, mut buzzer, mut delay) = (Pin(true), Pin(true), Delay::default());
        {
            let mut outputs = PinOutputs::new(&mut contactor, &mut buzzer, &mut delay);
            outputs.set_contactor(true);
            outputs.settle();
        }
        assert!(contactor.0);
        assert!(!buzzer.0);
        assert_eq!(delay.0, 25);
    }

    #[test]
    fn heater_follows_level() {
        let mut pin = Pin::default();
        {
            let mut heater = PinHeater::new(&mut pin);
            heater.drive(true);
        }
        assert!(pin.0);
    }
}
