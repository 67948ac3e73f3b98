//! Reflow profile state machine.
//!
//! Preheat at full power, cut power ahead of the preheat target using the short delta as a
//! predictor, follow a linear soak ramp, heat to the reflow temperature with the same predictive
//! cutoff, dwell, then sound the alarm and wait for the oven to cool.

use core::fmt::Write;

use super::{Ctx, Flow};
use crate::{
    config::{
        ALARM_TICKS, OVERSHOOT_SEED, OVERSHOOT_SEED_FACTOR, REFLOW_PREDICT_FIFTHS, SAFE_TO_OPEN,
        SEED_COUNT, SETTLE_DELTA,
    },
    controller::{ControlLaw, Phase},
    outputs::Outputs,
    profile::Profile,
    report,
    time_base::DutyCycle,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReflowStage {
    AwaitDoorClose,
    AwaitStart,
    Preheat,
    PreheatCutoffReached,
    SoakRamp,
    ReflowCutoffReached,
    SettleBeforeDwell,
    Dwell,
    CoolDownAlarm,
    AwaitCoolToSafe,
    Idle,
}

pub struct Reflow {
    stage: ReflowStage,
    profile: Profile,
    overshoot_ticks: u16,
    soak_start: u16,
    reflow_start: u16,
}

impl Reflow {
    /// `profile` is copied for the run and not reread.
    pub fn new(profile: Profile, seeds: &[u8; SEED_COUNT]) -> Self {
        Self {
            stage: ReflowStage::AwaitDoorClose,
            profile,
            overshoot_ticks: OVERSHOOT_SEED_FACTOR * u16::from(seeds[OVERSHOOT_SEED]),
            soak_start: 0,
            reflow_start: 0,
        }
    }

    #[inline]
    pub const fn stage(&self) -> ReflowStage {
        self.stage
    }

    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    fn enter(&mut self, stage: ReflowStage) {
        debug!("reflow: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Power curve duty cycle for `quarters`, or the profile's soak hint on an empty curve.
    fn holding<O, H>(&self, cx: &Ctx<'_, O, H>, quarters: u16) -> DutyCycle {
        if cx.curve.is_empty() {
            self.profile.soak_duty
        } else {
            cx.curve.lookup(quarters)
        }
    }

    /// Where the soak ramp should be `elapsed` ticks in.
    fn expected_soak(&self, elapsed: u16) -> i32 {
        let from = i32::from(self.profile.preheat_quarters());
        let to = i32::from(self.profile.soak_quarters());
        let span = i32::from(self.profile.soak_ticks());
        let elapsed = i32::from(elapsed).min(span);
        from + (to - from) * elapsed / span
    }

    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn step<O, H, L>(&mut self, cx: &mut Ctx<'_, O, H>, law: &mut L) -> Flow
    where
        O: Outputs,
        H: Write,
        L: ControlLaw,
    {
        let raw = cx.raw();
        let short = cx.reading.deltas.short;

        match self.stage {
            ReflowStage::AwaitDoorClose => {
                cx.outputs.status("Close door");
                self.enter(ReflowStage::AwaitStart);
            }
            ReflowStage::AwaitStart => {
                if cx.enter {
                    info!("reflow: starting {}", self.profile);
                    let profile = &self.profile;
                    cx.send(|h| report::run(h, profile));
                    cx.outputs.status("Preheat");
                    *cx.count = 0;
                    cx.energize();
                    cx.set_duty(DutyCycle::FULL);
                    self.enter(ReflowStage::Preheat);
                }
            }
            ReflowStage::Preheat => {
                let predicted = i32::from(raw) + i32::from(short);
                if predicted >= i32::from(self.profile.preheat_quarters()) {
                    let duty = self.holding(cx, self.profile.preheat_quarters()).step_down();
                    cx.set_duty(duty);
                    cx.outputs.status("Preheat cutoff");
                    cx.run.oven_counter = self.overshoot_ticks;
                    self.enter(ReflowStage::PreheatCutoffReached);
                }
            }
            ReflowStage::PreheatCutoffReached => {
                // Wait for the overshoot to peak before ramping
                cx.run.oven_counter = cx.run.oven_counter.saturating_sub(1);
                if short <= 0 || cx.run.oven_counter == 0 {
                    cx.outputs.status("Soak");
                    self.soak_start = *cx.count;
                    law.reset();
                    self.enter(ReflowStage::SoakRamp);
                }
            }
            ReflowStage::SoakRamp => {
                if raw >= self.profile.soak_quarters() {
                    cx.set_duty(DutyCycle::FULL);
                    cx.outputs.status("Reflow");
                    self.reflow_start = *cx.count;
                    self.enter(ReflowStage::ReflowCutoffReached);
                } else {
                    let elapsed = cx.count.wrapping_sub(self.soak_start);
                    let error = i32::from(raw) - self.expected_soak(elapsed);
                    let error = error.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
                    let holding = self.holding(cx, self.profile.soak_quarters());
                    *cx.error = error;
                    cx.set_duty(law.output(Phase::Soak, holding, error));
                }
            }
            ReflowStage::ReflowCutoffReached => {
                let predicted =
                    i32::from(raw) + i32::from(short) * REFLOW_PREDICT_FIFTHS / 5;
                if predicted >= i32::from(self.profile.reflow_quarters()) {
                    cx.set_duty(DutyCycle::OFF);
                    cx.outputs.status("Reflow cutoff");
                    self.enter(ReflowStage::SettleBeforeDwell);
                }
            }
            ReflowStage::SettleBeforeDwell => {
                if short <= SETTLE_DELTA {
                    cx.outputs.status("Dwell");
                    law.reset();
                    self.enter(ReflowStage::Dwell);
                }
            }
            ReflowStage::Dwell => {
                if cx.count.wrapping_sub(self.reflow_start) >= self.profile.reflow_duration {
                    cx.power_down();
                    cx.outputs.status("Open door");
                    cx.run.end_count = 0;
                    self.enter(ReflowStage::CoolDownAlarm);
                } else {
                    let error = i32::from(raw) - i32::from(self.profile.reflow_quarters());
                    let error = error.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
                    let holding = self.holding(cx, self.profile.reflow_quarters());
                    *cx.error = error;
                    cx.set_duty(law.output(Phase::Dwell, holding, error));
                }
            }
            ReflowStage::CoolDownAlarm => {
                if cx.run.end_count < ALARM_TICKS {
                    cx.outputs.set_buzzer(cx.run.end_count % 2 == 0);
                    cx.run.end_count += 1;
                } else {
                    cx.outputs.set_buzzer(false);
                    cx.outputs.status("Cooling");
                    self.enter(ReflowStage::AwaitCoolToSafe);
                }
            }
            ReflowStage::AwaitCoolToSafe => {
                if raw < SAFE_TO_OPEN {
                    info!("reflow: complete after {=u16} ticks", *cx.count);
                    self.enter(ReflowStage::Idle);
                    return Flow::Finished;
                }
            }
            ReflowStage::Idle => return Flow::Finished,
        }

        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::ProportionalTrim,
        storage::FACTORY_SEEDS,
        testing::{plant_curve, test_profile, Harness},
    };

    fn run_to<F: Fn(&Harness<ProportionalTrim>) -> bool>(h: &mut Harness<ProportionalTrim>, until: F) {
        for _ in 0..20_000 {
            if until(h) {
                return;
            }
            h.tick();
        }
        panic!("condition never reached");
    }

    #[test]
    fn visits_every_stage_once() {
        let mut h = Harness::new(ProportionalTrim);
        h.oven.start_reflow(test_profile()).unwrap();

        let mut seen = std::vec![ReflowStage::AwaitDoorClose];
        for _ in 0..20_000 {
            if h.oven.reflow_stage() == Some(ReflowStage::AwaitStart) {
                h.oven.press_enter();
            }
            h.tick();

            let duty = h.time_base.duty_cycle().get();
            assert!(duty <= 20);

            let stage = h.oven.reflow_stage().unwrap_or(ReflowStage::Idle);
            if seen.last() != Some(&stage) {
                seen.push(stage);
            }
            if stage == ReflowStage::Idle {
                break;
            }
        }

        assert_eq!(
            seen,
            [
                ReflowStage::AwaitDoorClose,
                ReflowStage::AwaitStart,
                ReflowStage::Preheat,
                ReflowStage::PreheatCutoffReached,
                ReflowStage::SoakRamp,
                ReflowStage::ReflowCutoffReached,
                ReflowStage::SettleBeforeDwell,
                ReflowStage::Dwell,
                ReflowStage::CoolDownAlarm,
                ReflowStage::AwaitCoolToSafe,
                ReflowStage::Idle,
            ]
        );
        assert_eq!(h.host.matches("=RUN,").count(), 1);
        assert_eq!(h.host.matches("=END").count(), 1);
        assert!(!h.outputs.contactor);
        assert!(!h.outputs.buzzer);
        assert_eq!(h.time_base.duty_cycle(), DutyCycle::OFF);
    }

    #[test]
    fn waits_for_start_button() {
        let mut h = Harness::new(ProportionalTrim);
        h.oven.start_reflow(test_profile()).unwrap();
        for _ in 0..50 {
            h.tick();
        }
        assert_eq!(h.oven.reflow_stage(), Some(ReflowStage::AwaitStart));
        assert!(!h.outputs.contactor);
        assert_eq!(h.time_base.duty_cycle(), DutyCycle::OFF);
    }

    #[test]
    fn preheat_cuts_power_before_target() {
        let mut h = Harness::new(ProportionalTrim);
        h.oven.start_reflow(test_profile()).unwrap();
        h.tick();
        h.oven.press_enter();
        h.tick();
        assert_eq!(h.oven.reflow_stage(), Some(ReflowStage::Preheat));
        assert_eq!(h.time_base.duty_cycle(), DutyCycle::FULL);
        assert!(h.outputs.contactor);

        run_to(&mut h, |h| {
            h.oven.reflow_stage() == Some(ReflowStage::PreheatCutoffReached)
        });

        // Predictive cutoff fires while the oven is still below the preheat temperature
        assert!(h.oven.reading().unwrap().raw() < test_profile().preheat_quarters());
        let holding = plant_curve().lookup(test_profile().preheat_quarters());
        assert_eq!(h.time_base.duty_cycle(), holding.step_down());
    }

    #[test]
    fn soak_follows_ramp() {
        let mut h = Harness::new(ProportionalTrim);
        h.oven.start_reflow(test_profile()).unwrap();
        h.tick();
        h.oven.press_enter();
        run_to(&mut h, |h| h.oven.reflow_stage() == Some(ReflowStage::SoakRamp));
        h.tick();

        // Soak drives at least the curve's holding duty for the soak temperature
        let holding = plant_curve().lookup(test_profile().soak_quarters());
        assert!(h.time_base.duty_cycle() >= holding);
    }

    #[test]
    fn expected_soak_is_linear_and_capped() {
        let reflow = Reflow::new(test_profile(), &FACTORY_SEEDS);
        let ticks = test_profile().soak_ticks();
        assert_eq!(reflow.expected_soak(0), 600);
        assert_eq!(reflow.expected_soak(ticks / 2), 660);
        assert_eq!(reflow.expected_soak(ticks), 720);
        assert_eq!(reflow.expected_soak(ticks * 3), 720);
    }

    #[test]
    fn abort_during_dwell() {
        let mut h = Harness::new(ProportionalTrim);
        let profile = Profile {
            reflow_duration: 10_000,
            ..test_profile()
        };
        h.oven.start_reflow(profile).unwrap();
        h.tick();
        h.oven.press_enter();
        run_to(&mut h, |h| h.oven.reflow_stage() == Some(ReflowStage::Dwell));

        assert!(h.oven.abort(&mut h.outputs, &mut h.host));

        assert_eq!(h.host.matches("=ABORT").count(), 1);
        assert!(h.oven.is_idle());
        assert_eq!(h.time_base.duty_cycle(), DutyCycle::OFF);
        assert!(!h.outputs.contactor);

        // A second abort has nothing to stop
        assert!(!h.oven.abort(&mut h.outputs, &mut h.host));
        assert_eq!(h.host.matches("=ABORT").count(), 1);
    }
}
