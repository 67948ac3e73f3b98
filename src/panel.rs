//! Front panel buttons.

use embedded_hal::digital::v2::InputPin;

/// Buttons that went down since the previous poll.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons {
    /// Confirm the door is closed, or start the selected job while idle.
    pub enter: bool,
    /// Abort the active run.
    pub abort: bool,
    /// Cycle the selected job while idle.
    pub mode: bool,
}

impl Buttons {
    pub const NONE: Self = Self {
        enter: false,
        abort: false,
        mode: false,
    };

    #[inline]
    pub const fn any(self) -> bool {
        self.enter || self.abort || self.mode
    }
}

/// Three active-low buttons with pull-ups. Reports press edges only.
pub struct Panel<E, A, M> {
    enter: E,
    abort: A,
    mode: M,
    held: Buttons,
}

impl<E, A, M> Panel<E, A, M>
where
    E: InputPin,
    A: InputPin,
    M: InputPin,
{
    pub const fn new(enter: E, abort: A, mode: M) -> Self {
        Self {
            enter,
            abort,
            mode,
            held: Buttons::NONE,
        }
    }

    /// Sample the buttons. A pin that cannot be read counts as released.
    pub fn poll(&mut self) -> Buttons {
        let now = Buttons {
            enter: self.enter.is_low().unwrap_or(false),
            abort: self.abort.is_low().unwrap_or(false),
            mode: self.mode.is_low().unwrap_or(false),
        };
        let pressed = Buttons {
            enter: now.enter && !self.held.enter,
            abort: now.abort && !self.held.abort,
            mode: now.mode && !self.held.mode,
        };
        self.held = now;

        if pressed.any() {
            trace!("panel: {}", pressed);
        }
        pressed
    }
}
