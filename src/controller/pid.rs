use num_traits::float::FloatCore;
use pid::Pid;

use super::{ControlLaw, Phase};
use crate::time_base::DutyCycle;

/// PID on the temperature error, added on top of the power curve's holding duty cycle.
///
/// Not used by default; build the oven with it to replace [`ProportionalTrim`](super::ProportionalTrim).
pub struct PidLaw {
    pid: Pid<f32>,
}

impl PidLaw {
    /// Gains are duty cycle steps per quarter degree.
    pub fn new(kp: impl Into<f32>, ki: impl Into<f32>, kd: impl Into<f32>) -> Self {
        const LIMIT: f32 = 20.0;

        // The error is fed in as the measurement, so the set point is zero
        let mut pid = Pid::new(0.0, LIMIT);
        pid.p(kp, LIMIT);
        pid.i(ki, LIMIT);
        pid.d(kd, LIMIT);

        Self { pid }
    }
}

impl Default for PidLaw {
    fn default() -> Self {
        Self::new(0.25, 0.01, 0.5)
    }
}

impl ControlLaw for PidLaw {
    fn output(&mut self, _phase: Phase, holding: DutyCycle, error: i16) -> DutyCycle {
        let output = self.pid.next_control_output(f32::from(error)).output;
        holding.offset(FloatCore::round(output) as i32)
    }

    fn reset(&mut self) {
        self.pid.reset_integral_term();
    }
}
