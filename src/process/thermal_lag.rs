//! Thermal-lag calibration.
//!
//! Heats at a fixed duty cycle, times the rise from 100 °C to 120 °C, cuts all power and measures
//! how far the oven coasts past 120 °C before it stops rising.

use core::fmt::Write;

use super::{Ctx, Flow};
use crate::{
    config::{LAG_DUTY, LAG_HIGH, LAG_LOW},
    outputs::Outputs,
    report::{self, Event},
    time_base::DutyCycle,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LagStage {
    AwaitDoorClose,
    AwaitStart,
    HeatToLow,
    HeatToHigh,
    Coast,
}

/// Outcome of a thermal-lag calibration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LagResult {
    /// Ticks from crossing 100 °C to crossing 120 °C.
    pub rise_ticks: u16,
    /// Quarter degrees the oven kept rising past 120 °C after power was cut.
    pub overshoot: u16,
}

pub struct ThermalLag {
    stage: LagStage,
    low_at: u16,
    rise_ticks: u16,
    peak: u16,
    result: Option<LagResult>,
}

impl ThermalLag {
    pub const fn new() -> Self {
        Self {
            stage: LagStage::AwaitDoorClose,
            low_at: 0,
            rise_ticks: 0,
            peak: 0,
            result: None,
        }
    }

    #[inline]
    pub const fn stage(&self) -> LagStage {
        self.stage
    }

    pub const fn result(&self) -> Option<LagResult> {
        self.result
    }

    fn enter(&mut self, stage: LagStage) {
        debug!("thermal lag: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    pub fn step<O: Outputs, H: Write>(&mut self, cx: &mut Ctx<'_, O, H>) -> Flow {
        let raw = cx.raw();

        match self.stage {
            LagStage::AwaitDoorClose => {
                cx.outputs.status("Close door");
                self.enter(LagStage::AwaitStart);
            }
            LagStage::AwaitStart => {
                if cx.enter {
                    info!("thermal lag: starting");
                    cx.send(|h| report::event(h, Event::LagCalibration));
                    cx.outputs.status("Heat to 120C");
                    *cx.count = 0;
                    cx.energize();
                    cx.set_duty(DutyCycle::saturating(i32::from(LAG_DUTY)));
                    self.enter(LagStage::HeatToLow);
                }
            }
            LagStage::HeatToLow => {
                if raw >= LAG_LOW {
                    self.low_at = *cx.count;
                    self.enter(LagStage::HeatToHigh);
                }
            }
            LagStage::HeatToHigh => {
                if raw >= LAG_HIGH {
                    self.rise_ticks = cx.count.wrapping_sub(self.low_at);
                    self.peak = raw;
                    cx.power_down();
                    cx.outputs.status("Coasting");
                    self.enter(LagStage::Coast);
                }
            }
            LagStage::Coast => {
                self.peak = self.peak.max(raw);
                if cx.reading.deltas.short <= 0 {
                    let result = LagResult {
                        rise_ticks: self.rise_ticks,
                        overshoot: self.peak.saturating_sub(LAG_HIGH),
                    };
                    info!("thermal lag: {}", result);
                    self.result = Some(result);
                    return Flow::Finished;
                }
            }
        }

        Flow::Continue
    }
}

impl Default for ThermalLag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{controller::ProportionalTrim, testing::Harness};

    #[test]
    fn measures_rise_and_overshoot() {
        let mut h = Harness::new(ProportionalTrim);
        h.oven.start_thermal_lag().unwrap();
        h.tick();
        h.oven.press_enter();
        h.tick();
        assert_eq!(h.host.matches("=O120").count(), 1);
        assert_eq!(h.time_base.duty_cycle().get(), LAG_DUTY);

        let mut ticks = 0;
        while !h.oven.is_idle() {
            h.tick();
            ticks += 1;
            assert!(ticks < 10_000);
        }

        let result = h.oven.last_lag().unwrap();
        assert!(result.rise_ticks > 0);
        assert_eq!(h.host.matches("=END").count(), 1);
        assert!(!h.outputs.contactor);
        assert_eq!(h.time_base.duty_cycle(), DutyCycle::OFF);
    }

    #[test]
    fn coasting_oven_reports_overshoot() {
        let mut h = Harness::new(ProportionalTrim);
        h.plant.set_lag(6);
        h.oven.start_thermal_lag().unwrap();
        h.tick();
        h.oven.press_enter();
        while !h.oven.is_idle() {
            h.tick();
        }
        assert!(h.oven.last_lag().unwrap().overshoot > 0);
    }
}
