//! Test doubles shared by the unit tests: a first-order oven model, recording outputs and a
//! harness that wires them to an [`Oven`].

use std::collections::VecDeque;

use crate::{
    controller::ControlLaw,
    outputs::Outputs,
    oven::Oven,
    panel::Buttons,
    power_curve::PowerCurve,
    profile::Profile,
    storage::{ProfileStore, RomStore},
    thermocouple::{Sample, Thermocouple},
    time_base::{DutyCycle, TimeBase},
};

/// Quarter degrees per tick added by each duty cycle step.
const GAIN: f32 = 0.36;
/// Fraction of the excess over ambient lost per tick.
const LOSS: f32 = 0.004;
const AMBIENT: f32 = 100.0;

/// Oven whose steady state at duty cycle `d` is `AMBIENT + 90 * d` quarter degrees.
pub struct Plant {
    temperature: f32,
    stuck: Option<Sample>,
    /// Heat that has left the element but not reached the sensor yet.
    in_flight: VecDeque<f32>,
    lag: usize,
}

impl Plant {
    pub fn new() -> Self {
        Self {
            temperature: AMBIENT,
            stuck: None,
            in_flight: VecDeque::new(),
            lag: 0,
        }
    }

    /// A sensor that always reads `sample`.
    pub fn stuck(sample: Sample) -> Self {
        Self {
            stuck: Some(sample),
            ..Self::new()
        }
    }

    pub fn set_celsius(&mut self, celsius: u16) {
        self.temperature = f32::from(celsius) * 4.0;
    }

    /// Delay heater power by `ticks` before it shows up at the sensor.
    pub fn set_lag(&mut self, ticks: usize) {
        self.lag = ticks;
    }

    pub fn sample(&self) -> Sample {
        self.stuck
            .unwrap_or_else(|| Sample::from_raw(self.temperature.round() as u16))
    }

    pub fn advance(&mut self, duty: DutyCycle) {
        self.in_flight.push_back(f32::from(duty.get()) * GAIN);
        let heat = if self.in_flight.len() > self.lag {
            self.in_flight.pop_front().unwrap_or(0.0)
        } else {
            0.0
        };
        self.temperature += heat - LOSS * (self.temperature - AMBIENT);
    }
}

impl Thermocouple for Plant {
    type Error = core::convert::Infallible;

    fn read(&mut self) -> Result<Sample, Self::Error> {
        Ok(self.sample())
    }
}

#[derive(Debug, Default)]
pub struct MockOutputs {
    pub contactor: bool,
    pub buzzer: bool,
    /// Relay settle delays waited for.
    pub settles: usize,
    pub statuses: Vec<String>,
}

impl Outputs for MockOutputs {
    fn set_contactor(&mut self, energized: bool) {
        self.contactor = energized;
    }

    fn set_buzzer(&mut self, on: bool) {
        self.buzzer = on;
    }

    fn settle(&mut self) {
        self.settles += 1;
    }

    fn status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }
}

/// Steady-state table of [`Plant`] for every duty cycle step.
pub fn plant_curve() -> PowerCurve {
    let points: Vec<(u8, u16)> = (1..=20).map(|d| (d, 100 + 90 * u16::from(d))).collect();
    PowerCurve::from_points(&points)
}

/// A short leaded profile that the plant runs through in a few thousand ticks.
pub fn test_profile() -> Profile {
    Profile {
        name: "Test".try_into().unwrap(),
        preheat_temp: 150,
        soak_duty: DutyCycle::new(8).unwrap(),
        soak_ramp_rate: 1,
        soak_duration: 120,
        soak_temp: 180,
        reflow_duration: 60,
        reflow_temp: 215,
        calibrated: false,
        preheat_cutoff: 0,
        reflow_cutoff: 0,
    }
}

pub struct Harness<L: ControlLaw> {
    pub time_base: &'static TimeBase,
    pub oven: Oven<'static, L>,
    pub plant: Plant,
    pub outputs: MockOutputs,
    /// Everything sent to the host.
    pub host: String,
    pub store: RomStore,
}

impl<L: ControlLaw> Harness<L> {
    /// An idle oven at ambient, uncalibrated but loaded with [`plant_curve`].
    pub fn new(law: L) -> Self {
        let time_base: &'static TimeBase = Box::leak(Box::new(TimeBase::new()));
        let mut store = RomStore::new();
        store.save_power_curve(&plant_curve());
        store.set_calibrated(false);

        Self {
            time_base,
            oven: Oven::new(time_base, &store, law),
            plant: Plant::new(),
            outputs: MockOutputs::default(),
            host: String::new(),
            store,
        }
    }

    /// Run one oven tick, then let the plant respond to the heater for one tick.
    pub fn tick(&mut self) {
        self.oven.tick(
            &mut self.plant,
            &mut self.outputs,
            &mut self.host,
            &mut self.store,
        );
        let duty = if self.outputs.contactor {
            self.time_base.duty_cycle()
        } else {
            DutyCycle::OFF
        };
        self.plant.advance(duty);
    }

    pub fn poll(&mut self, buttons: Buttons) {
        self.oven.poll(
            buttons,
            &mut self.plant,
            &mut self.outputs,
            &mut self.host,
            &mut self.store,
        );
    }
}
