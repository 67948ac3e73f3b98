//! Control laws that turn a temperature error into a heater duty cycle.

use crate::{
    config::{SOAK_TRIM_BIAS, SOAK_TRIM_THRESHOLD, TRIM_DIVISOR},
    time_base::DutyCycle,
};

pub mod pid;

/// Part of the reflow profile a control law is asked about.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Following the ramp from the preheat to the soak temperature
    Soak,
    /// Holding the reflow temperature
    Dwell,
}

pub trait ControlLaw {
    /// Duty cycle for one tick.
    ///
    /// `holding` is the power curve's duty cycle for the target temperature and `error` is the
    /// actual minus the expected temperature in quarter degrees.
    fn output(&mut self, phase: Phase, holding: DutyCycle, error: i16) -> DutyCycle;

    /// Forget any accumulated state. Called when a phase begins.
    fn reset(&mut self) {}
}

/// Power curve feed-forward with a proportional trim when the oven lags behind.
#[derive(Debug, Default, Copy, Clone)]
pub struct ProportionalTrim;

impl ControlLaw for ProportionalTrim {
    fn output(&mut self, phase: Phase, holding: DutyCycle, error: i16) -> DutyCycle {
        match phase {
            Phase::Soak if error < SOAK_TRIM_THRESHOLD => {
                let trim = (i32::from(error) - i32::from(SOAK_TRIM_BIAS)).abs();
                holding.offset(trim / i32::from(TRIM_DIVISOR))
            }
            Phase::Soak => holding,
            Phase::Dwell if error > 0 => DutyCycle::OFF,
            Phase::Dwell => holding
                .step_down()
                .offset(i32::from(error).abs() / i32::from(TRIM_DIVISOR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duty(v: u8) -> DutyCycle {
        DutyCycle::new(v).unwrap()
    }

    #[test]
    fn soak_adds_power_when_behind() {
        let mut law = ProportionalTrim;
        // |0 - 12| / 4 = 3
        assert_eq!(law.output(Phase::Soak, duty(8), 0), duty(11));
        // |-20 - 12| / 4 = 8
        assert_eq!(law.output(Phase::Soak, duty(8), -20), duty(16));
    }

    #[test]
    fn soak_pins_to_curve_when_ahead() {
        let mut law = ProportionalTrim;
        assert_eq!(law.output(Phase::Soak, duty(8), 8), duty(8));
        assert_eq!(law.output(Phase::Soak, duty(8), 100), duty(8));
    }

    #[test]
    fn dwell_holds_one_step_below_curve() {
        let mut law = ProportionalTrim;
        assert_eq!(law.output(Phase::Dwell, duty(12), 0), duty(11));
        assert_eq!(law.output(Phase::Dwell, duty(12), -8), duty(13));
    }

    #[test]
    fn dwell_cuts_power_above_target() {
        let mut law = ProportionalTrim;
        assert_eq!(law.output(Phase::Dwell, duty(12), 1), DutyCycle::OFF);
    }

    #[test]
    fn output_saturates() {
        let mut law = ProportionalTrim;
        assert_eq!(law.output(Phase::Soak, DutyCycle::FULL, -400), DutyCycle::FULL);
    }
}
