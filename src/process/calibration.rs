//! Oven calibration: builds the power curve one duty cycle step at a time.
//!
//! Each step boosts at full power until the oven is clearly heating, drops to the step's duty
//! cycle and waits for steady state. The temperature reached is recorded against that duty cycle.
//! Only temperatures reached while holding the step's duty cycle are ever recorded.

use core::fmt::Write;

use heapless::String;

use super::{Ctx, Flow, RunState};
use crate::{
    config::{
        BOOST_DELTA, BOOST_LIMIT_TICKS, CALIBRATION_STEPS, STEADY_GRACE_TICKS, STEADY_MIN_TICKS,
        STEADY_RUN, STEP_CEILING_TICKS,
    },
    outputs::Outputs,
    report::{self, Event},
    time_base::DutyCycle,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationStage {
    AwaitDoorClose,
    AwaitStart,
    /// Full power until the short delta shows brisk heating
    Boost,
    /// Holding the step's duty cycle until steady state
    Hold,
}

pub struct OvenCalibration {
    stage: CalibrationStage,
    step: u8,
}

impl OvenCalibration {
    pub const fn new() -> Self {
        Self {
            stage: CalibrationStage::AwaitDoorClose,
            step: 0,
        }
    }

    #[inline]
    pub const fn stage(&self) -> CalibrationStage {
        self.stage
    }

    /// Duty cycle step being calibrated, `1..=10`, or 0 before heating starts.
    #[inline]
    pub const fn step_index(&self) -> u8 {
        self.step
    }

    /// Two reported stages per duty cycle step, after the two waiting stages.
    pub const fn stage_number(&self) -> u8 {
        match self.stage {
            CalibrationStage::AwaitDoorClose => 0,
            CalibrationStage::AwaitStart => 1,
            CalibrationStage::Boost => self.step * 2,
            CalibrationStage::Hold => self.step * 2 + 1,
        }
    }

    fn enter(&mut self, stage: CalibrationStage) {
        debug!("calibration: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn begin_step<O: Outputs, H: Write>(&mut self, cx: &mut Ctx<'_, O, H>, step: u8) {
        self.step = step;
        *cx.run = RunState::default();
        cx.set_duty(DutyCycle::FULL);

        let mut caption = String::<16>::new();
        let duty = DutyCycle::saturating(i32::from(step));
        if write!(caption, "Calibrate {}%", duty.percent()).is_ok() {
            cx.outputs.status(&caption);
        }

        self.enter(CalibrationStage::Boost);
    }

    fn complete_step<O: Outputs, H: Write>(&mut self, cx: &mut Ctx<'_, O, H>) -> Flow {
        let duty = DutyCycle::saturating(i32::from(self.step));
        let temperature = cx.raw();
        info!(
            "calibration: {=u8}% holds {=u16} after {=u16} ticks",
            duty.percent(),
            temperature,
            cx.run.oven_counter
        );
        if cx.curve.record_point(duty, temperature).is_err() {
            warn!("calibration: power curve full");
        }

        if self.step >= CALIBRATION_STEPS {
            cx.power_down();
            cx.outputs.status("Calibrated");
            return Flow::Finished;
        }

        self.begin_step(cx, self.step + 1);
        Flow::Continue
    }

    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn step<O: Outputs, H: Write>(&mut self, cx: &mut Ctx<'_, O, H>) -> Flow {
        match self.stage {
            CalibrationStage::AwaitDoorClose => {
                cx.outputs.status("Close door");
                self.enter(CalibrationStage::AwaitStart);
            }
            CalibrationStage::AwaitStart => {
                if cx.enter {
                    info!("calibration: starting");
                    cx.send(|h| report::event(h, Event::OvenCalibration));
                    cx.curve.clear();
                    *cx.count = 0;
                    cx.energize();
                    self.begin_step(cx, 1);
                }
            }
            CalibrationStage::Boost => {
                cx.run.oven_counter = cx.run.oven_counter.saturating_add(1);
                let took_off = cx.reading.deltas.short > BOOST_DELTA;
                if took_off || cx.run.oven_counter >= BOOST_LIMIT_TICKS {
                    if !took_off {
                        warn!("calibration: boost never took off");
                    }
                    // The step ceiling keeps counting from the start of the boost
                    cx.set_duty(DutyCycle::saturating(i32::from(self.step)));
                    self.enter(CalibrationStage::Hold);
                }
            }
            CalibrationStage::Hold => {
                cx.run.oven_counter = cx.run.oven_counter.saturating_add(1);
                if steady_state(cx.run, cx.reading.deltas.long) {
                    return self.complete_step(cx);
                }
            }
        }

        Flow::Continue
    }
}

impl Default for OvenCalibration {
    fn default() -> Self {
        Self::new()
    }
}

/// Steady-state test for a calibration step, fed once per tick with `run.oven_counter` holding
/// the ticks since the step began.
///
/// Steady once the long delta has been exactly zero for [`STEADY_RUN`] ticks in a row, looked
/// for only after [`STEADY_MIN_TICKS`]. The first zero arms a deadline [`STEADY_GRACE_TICKS`]
/// later, and [`STEP_CEILING_TICKS`] ends the step regardless.
pub fn steady_state(run: &mut RunState, long: i16) -> bool {
    let elapsed = run.oven_counter;
    if elapsed >= STEP_CEILING_TICKS {
        return true;
    }
    if elapsed < STEADY_MIN_TICKS {
        return false;
    }

    if long == 0 {
        run.delta_count = run.delta_count.saturating_add(1);
        if !run.end_flag {
            run.end_flag = true;
            run.end_count = elapsed.saturating_add(STEADY_GRACE_TICKS);
        }
        if run.delta_count >= STEADY_RUN {
            return true;
        }
    } else {
        run.delta_count = 0;
    }

    run.end_flag && elapsed >= run.end_count
}
