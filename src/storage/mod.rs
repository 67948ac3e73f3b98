//! Persistent settings: profiles, filter seeds, the calibrated flag and the power curve.

use heapless::{String, Vec};

use crate::{
    config::{MAX_PROFILES, SEED_COUNT},
    power_curve::PowerCurve,
    profile::Profile,
    time_base::DutyCycle,
};

/// Factory filter seed constants.
pub const FACTORY_SEEDS: [u8; SEED_COUNT] = [
    18, 14, 14, 15, 11, 10, 11, 11, 10, 12, 11, 12, 12, 11, 12, 13, 18, 15, 16, 16,
];

/// Factory power curve, `(duty cycle, quarter degrees)`, for an oven that was never calibrated.
pub const FACTORY_CURVE: [(u8, u16); 10] = [
    (1, 62 * 4),
    (2, 85 * 4),
    (3, 108 * 4),
    (4, 128 * 4),
    (5, 146 * 4),
    (6, 163 * 4),
    (7, 180 * 4),
    (8, 195 * 4),
    (9, 210 * 4),
    (10, 224 * 4),
];

pub trait ProfileStore {
    /// Profile in slot `index`, if that slot is populated.
    fn read_profile(&self, index: usize) -> Option<Profile>;

    fn profile_count(&self) -> usize;

    /// Whether the power curve came from a completed oven calibration.
    fn calibrated(&self) -> bool;

    fn set_calibrated(&mut self, calibrated: bool);

    fn filter_seeds(&self) -> [u8; SEED_COUNT];

    /// Overwrite the application validity marker checked by the bootloader.
    fn write_validity_marker(&mut self, value: u8);

    fn load_power_curve(&self) -> PowerCurve;

    fn save_power_curve(&mut self, curve: &PowerCurve);
}

/// Store held in RAM, initialised from factory data.
pub struct RomStore {
    profiles: Vec<Profile, MAX_PROFILES>,
    calibrated: bool,
    seeds: [u8; SEED_COUNT],
    curve: PowerCurve,
    validity_marker: u8,
}

impl RomStore {
    pub const VALID_APP: u8 = 0xBB;

    pub fn new() -> Self {
        let mut profiles = Vec::new();
        for profile in factory_profiles() {
            if profiles.push(profile).is_err() {
                break;
            }
        }

        Self {
            profiles,
            calibrated: true,
            seeds: FACTORY_SEEDS,
            curve: PowerCurve::from_points(&FACTORY_CURVE),
            validity_marker: Self::VALID_APP,
        }
    }

    /// Store a profile in the next free slot. Gives the profile back if the store is full.
    pub fn add_profile(&mut self, profile: Profile) -> Result<(), Profile> {
        self.profiles.push(profile)
    }

    pub const fn validity_marker(&self) -> u8 {
        self.validity_marker
    }
}

impl Default for RomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for RomStore {
    fn read_profile(&self, index: usize) -> Option<Profile> {
        self.profiles.get(index).cloned()
    }

    fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    fn calibrated(&self) -> bool {
        self.calibrated
    }

    fn set_calibrated(&mut self, calibrated: bool) {
        self.calibrated = calibrated;
    }

    fn filter_seeds(&self) -> [u8; SEED_COUNT] {
        self.seeds
    }

    fn write_validity_marker(&mut self, value: u8) {
        self.validity_marker = value;
    }

    fn load_power_curve(&self) -> PowerCurve {
        self.curve.clone()
    }

    fn save_power_curve(&mut self, curve: &PowerCurve) {
        self.curve = curve.clone();
    }
}

fn factory_profiles() -> [Profile; 2] {
    [
        // Leaded solder
        Profile {
            name: name("Default"),
            preheat_temp: 150,
            soak_duty: duty(8),
            soak_ramp_rate: 1,
            soak_duration: 180,
            soak_temp: 180,
            reflow_duration: 180,
            reflow_temp: 215,
            calibrated: true,
            preheat_cutoff: 131,
            reflow_cutoff: 206,
        },
        Profile {
            name: name("Leadfree"),
            preheat_temp: 150,
            soak_duty: duty(12),
            soak_ramp_rate: 1,
            soak_duration: 200,
            soak_temp: 200,
            reflow_duration: 240,
            reflow_temp: 255,
            calibrated: true,
            preheat_cutoff: 138,
            reflow_cutoff: 248,
        },
    ]
}

fn name(s: &str) -> String<{ crate::config::PROFILE_NAME_LEN }> {
    let mut name = String::new();
    for c in s.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

fn duty(value: u8) -> DutyCycle {
    DutyCycle::new(value).unwrap_or(DutyCycle::OFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_contents() {
        let store = RomStore::new();
        assert_eq!(store.profile_count(), 2);
        assert!(store.calibrated());
        assert_eq!(store.filter_seeds(), FACTORY_SEEDS);
        assert_eq!(store.read_profile(1).unwrap().name.as_str(), "Leadfree");
        assert!(store.read_profile(2).is_none());
        assert_eq!(store.load_power_curve().len(), FACTORY_CURVE.len());
    }

    #[test]
    fn saved_curve_is_loaded_back() {
        let mut store = RomStore::new();
        let curve = PowerCurve::from_points(&[(1, 200), (2, 300)]);
        store.save_power_curve(&curve);
        assert_eq!(store.load_power_curve(), curve);
    }

    #[test]
    fn store_holds_at_most_max_profiles() {
        let mut store = RomStore::new();
        let extra = store.read_profile(0).unwrap();
        for _ in store.profile_count()..MAX_PROFILES {
            assert!(store.add_profile(extra.clone()).is_ok());
        }
        assert!(store.add_profile(extra).is_err());
    }

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(name("A very long profile name").len(), 16);
    }
}
