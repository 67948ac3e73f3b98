//! Control core of a reflow-soldering oven.
//!
//! Everything in here is hardware independent: the board binary (`src/main.rs`) binds the
//! [`time_base::TimeBase`] to a timer interrupt and hands real peripherals to the
//! [`oven::Oven`] context, while the unit tests drive the same code with mocks.
#![cfg_attr(not(test), no_std)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::cast_possible_truncation)]

// Must stay first so the logging macros are visible in every module.
mod fmt;

pub mod config;
pub mod controller;
pub mod filter;
pub mod outputs;
pub mod oven;
pub mod panel;
pub mod power_curve;
pub mod process;
pub mod profile;
pub mod report;
pub mod storage;
pub mod terminal;
pub mod thermocouple;
pub mod time_base;

#[cfg(test)]
mod testing;

pub use self::{
    controller::{pid::PidLaw, ControlLaw, Phase, ProportionalTrim},
    oven::{Action, Job, Oven, StartError},
    power_curve::PowerCurve,
    profile::Profile,
    time_base::{DutyCycle, TimeBase},
};
