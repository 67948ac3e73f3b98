//! The oven: one filter, one power curve and at most one running process.
//!
//! [`Oven::tick`] is the body of the main loop. It samples the thermocouple, reports to the host,
//! enforces the fault and over-temperature interlocks and steps the active process. Peripherals
//! are borrowed per call so the same code runs against the board and against test doubles.

use core::fmt::Write;

use crate::{
    config::{BOOTLOADER_MARKER, GROSS_FAULT, MAX_PROFILES, OVER_TEMP_CEILING, SEED_COUNT},
    controller::{ControlLaw, ProportionalTrim},
    filter::{Reading, TemperatureFilter},
    outputs::Outputs,
    panel::Buttons,
    power_curve::PowerCurve,
    process::{
        self, Ctx, Flow, LagResult, OvenCalibration, Process, Reflow, ReflowStage, RunState,
        ThermalLag,
    },
    profile::Profile,
    report::{self, Event},
    storage::ProfileStore,
    terminal::Command,
    thermocouple::{Fault, Sample, Thermocouple},
    time_base::TimeBase,
};

/// A job the front panel can start.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Job {
    /// Reflow with the profile in this store slot.
    Reflow(usize),
    OvenCalibration,
    ThermalLag,
}

impl Job {
    /// The job after this one: every stored profile, then both calibrations.
    pub const fn next(self, profile_count: usize) -> Self {
        match self {
            Self::Reflow(i) if i + 1 < profile_count => Self::Reflow(i + 1),
            Self::Reflow(_) => Self::OvenCalibration,
            Self::OvenCalibration => Self::ThermalLag,
            Self::ThermalLag if profile_count > 0 => Self::Reflow(0),
            Self::ThermalLag => Self::OvenCalibration,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    /// Another process is running.
    Busy,
    /// The requested profile slot is empty.
    NoProfile,
}

impl StartError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "Oven busy",
            Self::NoProfile => "No such profile",
        }
    }
}

/// Something the board has to do on the oven's behalf.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Heater is off and the validity marker cleared. Reset into the bootloader.
    EnterBootloader,
}

pub struct Oven<'t, L: ControlLaw = ProportionalTrim> {
    time_base: &'t TimeBase,
    filter: TemperatureFilter,
    curve: PowerCurve,
    seeds: [u8; SEED_COUNT],
    process: Process,
    run: RunState,
    law: L,
    /// Sample counter reported on every status line.
    count: u16,
    pending_enter: bool,
    error: i16,
    reading: Option<Reading>,
    last_lag: Option<LagResult>,
    selected: Job,
}

impl<'t, L: ControlLaw> Oven<'t, L> {
    pub fn new<S: ProfileStore>(time_base: &'t TimeBase, store: &S, law: L) -> Self {
        let curve = store.load_power_curve();
        if !store.calibrated() {
            warn!("oven not calibrated");
        }
        debug!("power curve: {=usize} points", curve.len());

        Self {
            time_base,
            filter: TemperatureFilter::new(),
            curve,
            seeds: store.filter_seeds(),
            process: Process::Idle,
            run: RunState::default(),
            law,
            count: 0,
            pending_enter: false,
            error: 0,
            reading: None,
            last_lag: None,
            selected: if store.profile_count() > 0 {
                Job::Reflow(0)
            } else {
                Job::OvenCalibration
            },
        }
    }

    #[inline]
    pub const fn is_idle(&self) -> bool {
        self.process.is_idle()
    }

    /// Stage number as reported to the host.
    #[inline]
    pub const fn stage(&self) -> u8 {
        self.process.stage_number()
    }

    pub const fn reflow_stage(&self) -> Option<ReflowStage> {
        match &self.process {
            Process::Reflow(p) => Some(p.stage()),
            _ => None,
        }
    }

    pub const fn oven_calibration(&self) -> Option<&OvenCalibration> {
        match &self.process {
            Process::OvenCalibration(p) => Some(p),
            _ => None,
        }
    }

    pub const fn thermal_lag(&self) -> Option<&ThermalLag> {
        match &self.process {
            Process::ThermalLag(p) => Some(p),
            _ => None,
        }
    }

    pub const fn power_curve(&self) -> &PowerCurve {
        &self.curve
    }

    /// The most recent filter output.
    pub const fn reading(&self) -> Option<Reading> {
        self.reading
    }

    /// Result of the last completed thermal-lag calibration.
    pub const fn last_lag(&self) -> Option<LagResult> {
        self.last_lag
    }

    /// Job the Enter button starts while idle.
    pub const fn selected(&self) -> Job {
        self.selected
    }

    pub fn start<S: ProfileStore>(&mut self, job: Job, store: &S) -> Result<(), StartError> {
        match job {
            Job::Reflow(index) => {
                if !self.is_idle() {
                    return Err(StartError::Busy);
                }
                let profile = store.read_profile(index).ok_or(StartError::NoProfile)?;
                self.start_reflow(profile)
            }
            Job::OvenCalibration => self.start_oven_calibration(),
            Job::ThermalLag => self.start_thermal_lag(),
        }
    }

    pub fn start_reflow(&mut self, profile: Profile) -> Result<(), StartError> {
        let process = Process::Reflow(Reflow::new(profile, &self.seeds));
        self.begin(process)
    }

    pub fn start_oven_calibration(&mut self) -> Result<(), StartError> {
        self.begin(Process::OvenCalibration(OvenCalibration::new()))
    }

    pub fn start_thermal_lag(&mut self) -> Result<(), StartError> {
        self.begin(Process::ThermalLag(ThermalLag::new()))
    }

    fn begin(&mut self, process: Process) -> Result<(), StartError> {
        if !self.is_idle() {
            return Err(StartError::Busy);
        }

        self.process = process;
        self.run = RunState::default();
        self.error = 0;
        self.pending_enter = false;
        self.law.reset();
        info!("oven: job started");
        Ok(())
    }

    /// Latch an Enter press for the next step of the active process.
    pub fn press_enter(&mut self) {
        self.pending_enter = true;
    }

    /// Stop the active process immediately. Returns `false` if nothing was running.
    pub fn abort<O: Outputs, H: Write>(&mut self, outputs: &mut O, host: &mut H) -> bool {
        if self.is_idle() {
            return false;
        }

        warn!("oven: aborted in stage {=u8}", self.stage());
        process::power_down(self.time_base, outputs);
        outputs.set_buzzer(false);
        process::send(host, |h| report::event(h, Event::Abort));
        self.go_idle(outputs);
        true
    }

    fn go_idle<O: Outputs>(&mut self, outputs: &mut O) {
        self.process = Process::Idle;
        self.pending_enter = false;
        self.error = 0;
        outputs.status("Idle");
    }

    /// Whether `sample` must end the active process.
    fn tripped(&self, sample: Sample) -> bool {
        let raw = sample.raw();
        let ceiling = match self.process {
            Process::OvenCalibration(_) => GROSS_FAULT,
            _ => OVER_TEMP_CEILING,
        };
        raw > ceiling
    }

    /// One main loop tick.
    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn tick<T, O, H, S>(&mut self, sensor: &mut T, outputs: &mut O, host: &mut H, store: &mut S)
    where
        T: Thermocouple,
        O: Outputs,
        H: Write,
        S: ProfileStore,
    {
        let sample = sensor.read().unwrap_or_else(|_| {
            error!("thermocouple read failed");
            Sample::fault(Fault::OpenCircuit)
        });
        let reading = self.filter.push(sample);
        self.reading = Some(reading);

        let faulted = sample.is_fault();
        if let Some(fault) = sample.as_fault() {
            warn!("thermocouple fault: {}", fault);
            process::power_down(self.time_base, outputs);
        }

        let (stage, count, duty, error) = (
            self.stage(),
            self.count,
            self.time_base.duty_cycle(),
            self.error,
        );
        process::send(host, |h| report::tick(h, stage, count, &reading, duty, error));
        trace!("tick {=u16}: {=u16}", count, sample.raw());
        self.count = self.count.wrapping_add(1);

        if self.is_idle() {
            self.pending_enter = false;
            return;
        }

        if self.tripped(sample) {
            warn!("oven: interlock tripped at {=u16}", sample.raw());
            if !faulted {
                process::power_down(self.time_base, outputs);
            }
            outputs.set_buzzer(false);
            process::send(host, |h| report::event(h, Event::End));
            self.go_idle(outputs);
            return;
        }

        let mut cx = Ctx {
            time_base: self.time_base,
            outputs: &mut *outputs,
            host: &mut *host,
            curve: &mut self.curve,
            run: &mut self.run,
            count: &mut self.count,
            reading,
            enter: core::mem::take(&mut self.pending_enter),
            error: &mut self.error,
        };
        let flow = match &mut self.process {
            Process::Idle => Flow::Continue,
            Process::Reflow(p) => p.step(&mut cx, &mut self.law),
            Process::OvenCalibration(p) => p.step(&mut cx),
            Process::ThermalLag(p) => p.step(&mut cx),
        };

        if flow == Flow::Finished {
            self.finish(outputs, host, store);
        }
    }

    fn finish<O: Outputs, H: Write, S: ProfileStore>(
        &mut self,
        outputs: &mut O,
        host: &mut H,
        store: &mut S,
    ) {
        match &self.process {
            Process::OvenCalibration(_) => {
                store.save_power_curve(&self.curve);
                store.set_calibrated(true);
            }
            Process::ThermalLag(p) => self.last_lag = p.result(),
            Process::Idle | Process::Reflow(_) => {}
        }

        info!("oven: job finished");
        process::power_down(self.time_base, outputs);
        outputs.set_buzzer(false);
        process::send(host, |h| report::event(h, Event::End));
        self.go_idle(outputs);
    }

    /// Handle front panel presses, then run a tick if the time base produced one since the last
    /// call. Ticks that piled up in between are coalesced into one.
    pub fn poll<T, O, H, S>(
        &mut self,
        buttons: Buttons,
        sensor: &mut T,
        outputs: &mut O,
        host: &mut H,
        store: &mut S,
    ) where
        T: Thermocouple,
        O: Outputs,
        H: Write,
        S: ProfileStore,
    {
        if buttons.abort {
            self.abort(outputs, host);
        }

        if buttons.mode && self.is_idle() {
            self.selected = self.selected.next(store.profile_count());
            match self.selected {
                Job::Reflow(index) => match store.read_profile(index) {
                    Some(profile) => outputs.status(&profile.name),
                    None => outputs.status("No profile"),
                },
                Job::OvenCalibration => outputs.status("Calibrate oven"),
                Job::ThermalLag => outputs.status("Thermal lag"),
            }
        }

        if buttons.enter {
            if self.is_idle() {
                if let Err(e) = self.start(self.selected, store) {
                    warn!("oven: cannot start: {}", e.as_str());
                    outputs.status(e.as_str());
                }
            } else {
                self.press_enter();
            }
        }

        if self.time_base.take_tick() {
            self.tick(sensor, outputs, host, store);
        }
    }

    /// Execute one line received from the host.
    pub fn handle_line<O, H, S>(
        &mut self,
        line: &[u8],
        host: &mut H,
        store: &mut S,
        outputs: &mut O,
    ) -> Option<Action>
    where
        O: Outputs,
        H: Write,
        S: ProfileStore,
    {
        process::send(host, |h| {
            h.write_str("##")?;
            for &b in line {
                h.write_char(char::from(b))?;
            }
            h.write_str("##\n")
        });

        match Command::parse(line) {
            Some(Command::Boot) => {
                info!("entering bootloader");
                process::power_down(self.time_base, outputs);
                outputs.set_buzzer(false);
                if !self.is_idle() {
                    self.go_idle(outputs);
                }
                store.write_validity_marker(BOOTLOADER_MARKER);
                return Some(Action::EnterBootloader);
            }
            Some(Command::OvenSettings) => {
                let seeds = store.filter_seeds();
                let (calibrated, count) = (store.calibrated(), store.profile_count());
                process::send(host, |h| {
                    report::settings(h, calibrated, MAX_PROFILES, count, &seeds)
                });
            }
            Some(command) => debug!("ignoring {}", command),
            None => trace!("unknown command"),
        }

        None
    }
}
