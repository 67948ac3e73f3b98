//! Lines sent to the host.
//!
//! Every line is newline terminated. Numbers are plain decimal, temperatures are degrees with two
//! decimals.

use core::fmt::{self, Write};

use crate::{filter::Reading, profile::Profile, time_base::DutyCycle};

/// One-word event lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// An oven calibration started.
    OvenCalibration,
    /// A thermal-lag calibration started.
    LagCalibration,
    /// A run finished, normally or through the interlock.
    End,
    /// The user aborted a run.
    Abort,
}

impl Event {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OvenCalibration => "=OCAL",
            Self::LagCalibration => "=O120",
            Self::End => "=END",
            Self::Abort => "=ABORT",
        }
    }
}

pub fn event<W: Write>(w: &mut W, event: Event) -> fmt::Result {
    w.write_str(event.as_str())?;
    w.write_char('\n')
}

/// Announce the profile a run is about to use.
pub fn run<W: Write>(w: &mut W, profile: &Profile) -> fmt::Result {
    writeln!(
        w,
        "=RUN,{},{},{},{},{},{},{},{},{}",
        profile.name,
        profile.preheat_temp,
        profile.soak_duty.percent(),
        profile.soak_temp,
        profile.reflow_duration,
        profile.reflow_temp,
        u8::from(profile.calibrated),
        profile.preheat_cutoff,
        profile.reflow_cutoff,
    )
}

/// The per-tick status line.
///
/// A fault sample reports only the stage, the count and the fault text.
pub fn tick<W: Write>(
    w: &mut W,
    stage: u8,
    count: u16,
    reading: &Reading,
    duty: DutyCycle,
    error: i16,
) -> fmt::Result {
    if let Some(fault) = reading.sample.as_fault() {
        return writeln!(w, "{stage},{count},{}", fault.as_str());
    }

    let celsius = reading.sample.celsius();
    let d = reading.deltas;
    writeln!(
        w,
        "{stage},{count},{:3}.{:02},{},{},{},{},{},{error}",
        celsius.int().to_num::<u16>(),
        (celsius.frac() * 100).to_num::<u16>(),
        duty.get(),
        d.short,
        d.medium,
        d.long,
        d.rate,
    )
}

/// `=OGET` settings report.
pub fn settings<W: Write>(
    w: &mut W,
    calibrated: bool,
    max_profiles: usize,
    profile_count: usize,
    seeds: &[u8],
) -> fmt::Result {
    write!(
        w,
        "=OGET,{},{max_profiles},{profile_count}",
        u8::from(calibrated)
    )?;
    for seed in seeds {
        write!(w, ",{seed}")?;
    }
    w.write_char('\n')
}
