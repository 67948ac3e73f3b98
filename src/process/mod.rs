//! The state machines that own the oven while a job runs.
//!
//! Exactly one [`Process`] is active at a time. The [`Oven`](crate::Oven) steps it once per tick
//! with a [`Ctx`] that lends it the actuators, the host link and the latest filter reading.

use core::fmt::Write;

use crate::{
    filter::Reading, outputs::Outputs, power_curve::PowerCurve, time_base::DutyCycle,
    time_base::TimeBase,
};

pub mod calibration;
pub mod reflow;
pub mod thermal_lag;

pub use self::{
    calibration::{CalibrationStage, OvenCalibration},
    reflow::{Reflow, ReflowStage},
    thermal_lag::{LagResult, LagStage, ThermalLag},
};

/// Scratch counters shared by all processes. Reset whenever a process starts.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunState {
    /// Deadline or elapsed-time counter, owned by the stage using it.
    pub oven_counter: u16,
    pub delta_count: u8,
    pub end_count: u16,
    pub end_flag: bool,
}

/// Result of one step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flow {
    Continue,
    /// The process completed and left the oven de-energized.
    Finished,
}

/// What a process may touch during one step.
pub struct Ctx<'a, O, H> {
    pub time_base: &'a TimeBase,
    pub outputs: &'a mut O,
    pub host: &'a mut H,
    pub curve: &'a mut PowerCurve,
    pub run: &'a mut RunState,
    /// Samples since the run started heating.
    pub count: &'a mut u16,
    pub reading: Reading,
    /// The start button was pressed since the last step.
    pub enter: bool,
    /// Control error to report on the next status line.
    pub error: &'a mut i16,
}

impl<O: Outputs, H: Write> Ctx<'_, O, H> {
    #[inline]
    pub fn set_duty(&mut self, duty: DutyCycle) {
        self.time_base.set_duty_cycle(duty);
    }

    #[inline]
    pub const fn raw(&self) -> u16 {
        self.reading.sample.raw()
    }

    /// Close the contactor and wait for it before the heater is switched.
    pub fn energize(&mut self) {
        self.outputs.set_contactor(true);
        self.outputs.settle();
    }

    /// Heater off, wait for the relay, then open the contactor.
    pub fn power_down(&mut self) {
        power_down(self.time_base, self.outputs);
    }

    /// Send one line to the host. A broken host link never stops the oven.
    pub fn send(&mut self, f: impl FnOnce(&mut H) -> core::fmt::Result) {
        send(self.host, f);
    }
}

pub(crate) fn power_down<O: Outputs>(time_base: &TimeBase, outputs: &mut O) {
    time_base.set_duty_cycle(DutyCycle::OFF);
    outputs.settle();
    outputs.set_contactor(false);
}

pub(crate) fn send<H: Write>(host: &mut H, f: impl FnOnce(&mut H) -> core::fmt::Result) {
    if f(host).is_err() {
        error!("host link write failed");
    }
}

/// The job currently in control of the oven.
pub enum Process {
    Idle,
    Reflow(Reflow),
    OvenCalibration(OvenCalibration),
    ThermalLag(ThermalLag),
}

impl Process {
    /// Stage number reported on the status line.
    pub const fn stage_number(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Reflow(p) => p.stage() as u8,
            Self::OvenCalibration(p) => p.stage_number(),
            Self::ThermalLag(p) => p.stage() as u8,
        }
    }

    #[inline]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
