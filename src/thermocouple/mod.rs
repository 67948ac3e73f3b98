//! Thermocouple interface

pub mod max31855;

use fixed::types::U14F2;

pub use self::max31855::{Error, Max31855};

/// U14F2 is a fixed point number with 2 fractional bits and 14 integer bits.
/// This matches the thermocouple converter: a precision of 0.25 degrees Celsius & a range of
/// (0, 16384).
pub type Celsius = U14F2;

/// Reserved raw values reported in place of a temperature.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// No thermocouple connected
    OpenCircuit,
    /// Thermocouple shorted to ground
    ShortToGround,
    /// Thermocouple shorted to the supply
    ShortToSupply,
}

impl Fault {
    pub const fn raw(self) -> u16 {
        match self {
            Self::OpenCircuit => 65535,
            Self::ShortToGround => 65534,
            Self::ShortToSupply => 65533,
        }
    }

    /// Text shown and reported in place of the temperature.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenCircuit => "No TC",
            Self::ShortToGround => "SG Err",
            Self::ShortToSupply => "SV Err",
        }
    }
}

/// One thermocouple reading in quarter degrees Celsius, or a [`Fault`] code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample(u16);

impl Sample {
    /// Lowest raw value that encodes a fault.
    const FAULT_BASE: u16 = 65533;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn from_celsius(celsius: u16) -> Self {
        Self(celsius * 4)
    }

    #[inline]
    pub const fn fault(fault: Fault) -> Self {
        Self(fault.raw())
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn as_fault(self) -> Option<Fault> {
        match self.0 {
            65535 => Some(Fault::OpenCircuit),
            65534 => Some(Fault::ShortToGround),
            65533 => Some(Fault::ShortToSupply),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_fault(self) -> bool {
        self.0 >= Self::FAULT_BASE
    }

    /// Temperature in degrees Celsius. Meaningless for faults.
    #[inline]
    pub fn celsius(self) -> Celsius {
        Celsius::from_bits(self.0)
    }
}

pub trait Thermocouple {
    type Error;

    /// Read one sample.
    ///
    /// Sensor faults detected by the converter are not errors; they come back as fault
    /// [`Sample`]s. Errors are reserved for the bus itself.
    fn read(&mut self) -> Result<Sample, Self::Error>;
}
