//! Fixed rate time base and duty-cycle actuator.
//!
//! The timer interrupt calls [`TimeBase::on_interrupt`] every
//! [`TIME_BASE_PERIOD`](crate::config::TIME_BASE_PERIOD) and drives the heater relay with the
//! level it returns. Twice per 20-slot cycle it raises the tick flag, which the main loop takes
//! with [`TimeBase::take_tick`]. The interrupt is the only writer of the slot counter and the tick
//! flag; the main loop is the only writer of the duty cycle.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::{HALF_CYCLE_SLOT, SLOTS_PER_CYCLE};

/// Heater duty cycle in 5% steps, `0..=20`.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCycle(u8);

impl DutyCycle {
    pub const OFF: Self = Self(0);
    pub const FULL: Self = Self(SLOTS_PER_CYCLE);

    /// Returns `None` if `value` is above [`DutyCycle::FULL`].
    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= SLOTS_PER_CYCLE {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Clamps any value into `0..=20`.
    #[inline]
    pub fn saturating(value: i32) -> Self {
        Self(value.clamp(0, i32::from(SLOTS_PER_CYCLE)) as u8)
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn percent(self) -> u8 {
        self.0 * 5
    }

    /// One step less power, stopping at off.
    #[inline]
    #[must_use]
    pub const fn step_down(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Adds `steps` (which may be negative) and clamps the result.
    #[inline]
    #[must_use]
    pub fn offset(self, steps: i32) -> Self {
        Self::saturating(i32::from(self.0) + steps)
    }
}

pub struct TimeBase {
    slot: AtomicU8,
    duty: AtomicU8,
    tick: AtomicBool,
}

impl TimeBase {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(0),
            duty: AtomicU8::new(0),
            tick: AtomicBool::new(false),
        }
    }

    /// Advance one slot. Returns whether the heater should be energized for this slot.
    ///
    /// Must only be called from the timer interrupt.
    #[inline]
    pub fn on_interrupt(&self) -> bool {
        let mut slot = self.slot.load(Ordering::Relaxed) + 1;

        if slot == HALF_CYCLE_SLOT {
            self.tick.store(true, Ordering::Release);
        }
        if slot >= SLOTS_PER_CYCLE {
            slot = 0;
            self.tick.store(true, Ordering::Release);
        }

        self.slot.store(slot, Ordering::Relaxed);
        self.level(slot)
    }

    /// Heater level for `slot`: on from the start of the cycle until the slot reaches the duty
    /// cycle.
    #[inline]
    fn level(&self, slot: u8) -> bool {
        slot < self.duty.load(Ordering::Relaxed)
    }

    /// Change the heater duty cycle. Takes effect at the next slot.
    ///
    /// This is the only way the heater output changes.
    #[inline]
    pub fn set_duty_cycle(&self, duty: DutyCycle) {
        if self.duty.swap(duty.get(), Ordering::Relaxed) != duty.get() {
            trace!("duty cycle: {=u8}", duty.get());
        }
    }

    #[inline]
    pub fn duty_cycle(&self) -> DutyCycle {
        DutyCycle(self.duty.load(Ordering::Relaxed))
    }

    /// Consume the tick flag. Ticks that arrive while the flag is already set are coalesced.
    #[inline]
    pub fn take_tick(&self) -> bool {
        self.tick.swap(false, Ordering::Acquire)
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}
