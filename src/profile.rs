//! Reflow profiles.

use heapless::String;

use crate::{config::PROFILE_NAME_LEN, time_base::DutyCycle};

/// Settings for one reflow run. Temperatures are whole degrees Celsius, durations are ticks.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Profile {
    pub name: String<PROFILE_NAME_LEN>,
    pub preheat_temp: u16,
    /// Duty cycle that roughly holds the soak temperature on an uncalibrated oven.
    pub soak_duty: DutyCycle,
    /// Quarter degrees per tick, used when no soak duration is given.
    pub soak_ramp_rate: u8,
    pub soak_duration: u16,
    pub soak_temp: u16,
    pub reflow_duration: u16,
    pub reflow_temp: u16,
    pub calibrated: bool,
    pub preheat_cutoff: u16,
    pub reflow_cutoff: u16,
}

impl Profile {
    /// Ticks the soak ramp should take from the preheat to the soak temperature.
    pub fn soak_ticks(&self) -> u16 {
        if self.soak_duration > 0 {
            return self.soak_duration;
        }

        let rise = self.soak_temp.saturating_sub(self.preheat_temp).saturating_mul(4);
        (rise / u16::from(self.soak_ramp_rate.max(1))).max(1)
    }

    // Quarter degree conversions saturate at `u16::MAX`

    #[inline]
    pub const fn preheat_quarters(&self) -> u16 {
        self.preheat_temp.saturating_mul(4)
    }

    #[inline]
    pub const fn soak_quarters(&self) -> u16 {
        self.soak_temp.saturating_mul(4)
    }

    #[inline]
    pub const fn reflow_quarters(&self) -> u16 {
        self.reflow_temp.saturating_mul(4)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Profile {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Profile {{ name: {=str}, preheat: {=u16}, soak: {=u16}, reflow: {=u16} }}",
            self.name.as_str(),
            self.preheat_temp,
            self.soak_temp,
            self.reflow_temp
        );
    }
}
