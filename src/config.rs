//! Compile-time tuning of the oven.
//!
//! Temperatures are in the thermocouple's raw unit (quarter degrees Celsius) unless the name says
//! otherwise. Tick counts refer to the coarse tick of the [`TimeBase`](crate::TimeBase), roughly
//! half a second each.

use fugit::MillisDurationU32;
use static_assertions::const_assert;

/// Period of the time base interrupt.
pub const TIME_BASE_PERIOD: MillisDurationU32 = MillisDurationU32::from_ticks(50);
/// Interrupts per PWM carrier cycle. Also the largest duty cycle value.
pub const SLOTS_PER_CYCLE: u8 = 20;
/// Slot at which the mid-cycle tick is emitted.
pub const HALF_CYCLE_SLOT: u8 = SLOTS_PER_CYCLE / 2;

/// Time for the solid state relay to turn off before the contactor is opened.
pub const RELAY_SETTLE: MillisDurationU32 = MillisDurationU32::from_ticks(25);

/// Samples retained by the temperature filter.
pub const HISTORY_LEN: usize = 68;
/// Short-window deltas retained for the rate of change.
pub const DELTA_HISTORY_LEN: usize = 12;
/// Samples summed on each side of a windowed delta.
pub const WINDOW: usize = 4;
/// Look-back of the short window delta.
pub const SHORT_OFFSET: usize = 8;
/// Look-back of the medium window delta.
pub const MEDIUM_OFFSET: usize = 32;
/// Look-back of the long window delta.
pub const LONG_OFFSET: usize = 64;
/// Look-back of the rate of change over the short delta history.
pub const RATE_OFFSET: usize = 8;

const_assert!(LONG_OFFSET + WINDOW <= HISTORY_LEN);
const_assert!(MEDIUM_OFFSET < LONG_OFFSET);
const_assert!(SHORT_OFFSET < MEDIUM_OFFSET);
const_assert!(RATE_OFFSET + WINDOW <= DELTA_HISTORY_LEN);

/// Any sample above this trips the over-temperature interlock (270 °C).
pub const OVER_TEMP_CEILING: u16 = 1080;
/// Lower interlock ceiling while the oven calibration runs (250 °C).
pub const GROSS_FAULT: u16 = 1000;
/// The door may be opened once the oven is below this.
pub const SAFE_TO_OPEN: u16 = 150;

/// Short delta at or below which the oven has stopped rising after the reflow cutoff.
pub const SETTLE_DELTA: i16 = 32;
/// Soak errors at or above this pin the duty cycle to the power curve.
pub const SOAK_TRIM_THRESHOLD: i16 = 8;
/// Bias of the soak trim term.
pub const SOAK_TRIM_BIAS: i16 = 12;
/// Quarter degrees of error per duty cycle step in the trim terms.
pub const TRIM_DIVISOR: i16 = 4;
/// Scale applied to the short delta when predicting the reflow crossing, in fifths.
pub const REFLOW_PREDICT_FIFTHS: i32 = 4;
/// The overshoot wait after the preheat cutoff is this multiple of filter seed
/// [`OVERSHOOT_SEED`].
pub const OVERSHOOT_SEED_FACTOR: u16 = 3;
/// Filter seed used to size the overshoot wait.
pub const OVERSHOOT_SEED: usize = 9;
/// Length of the end of cycle buzzer pattern.
pub const ALARM_TICKS: u16 = 20;

/// Short delta that shows the oven is heating briskly during a calibration boost.
pub const BOOST_DELTA: i16 = 63;
/// Ticks of boosting after which a calibration step gives up on [`BOOST_DELTA`] and holds its
/// duty cycle anyway.
pub const BOOST_LIMIT_TICKS: u16 = 600;
/// Highest duty cycle step of the oven calibration (50%).
pub const CALIBRATION_STEPS: u8 = 10;
/// Consecutive zero long deltas that declare steady state.
pub const STEADY_RUN: u8 = 10;
/// Ticks into a calibration step before steady state is looked for.
pub const STEADY_MIN_TICKS: u16 = 600;
/// Extra ticks allowed after the long delta first reaches zero.
pub const STEADY_GRACE_TICKS: u16 = 600;
/// Hard limit on the length of a calibration step.
pub const STEP_CEILING_TICKS: u16 = 1800;

const_assert!(STEADY_MIN_TICKS < STEP_CEILING_TICKS);
const_assert!(BOOST_LIMIT_TICKS < STEP_CEILING_TICKS);
const_assert!(CALIBRATION_STEPS < SLOTS_PER_CYCLE);

/// Lower set point of the thermal-lag calibration (100 °C).
pub const LAG_LOW: u16 = 100 * 4;
/// Upper set point of the thermal-lag calibration (120 °C).
pub const LAG_HIGH: u16 = 120 * 4;
/// Duty cycle driven during the thermal-lag calibration (50%).
pub const LAG_DUTY: u8 = 10;

/// Number of profile slots in the store.
pub const MAX_PROFILES: usize = 16;
/// Longest profile name.
pub const PROFILE_NAME_LEN: usize = 16;
/// Number of filter seed constants in the store.
pub const SEED_COUNT: usize = 20;
/// Written over the validity marker to hand control to the bootloader.
pub const BOOTLOADER_MARKER: u8 = 0xFF;
