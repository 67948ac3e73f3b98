//! Driver for the MAX31855 cold-junction compensated thermocouple converter.

use embedded_hal::{blocking::spi::Transfer, digital::v2::OutputPin};

use super::{Fault, Sample, Thermocouple};

/// Fault bits in the last byte of a conversion.
const OC: u8 = 1 << 0;
const SCG: u8 = 1 << 1;
const SCV: u8 = 1 << 2;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<S, P> {
    /// SPI transfer failed
    Spi(S),
    /// Chip select pin failed
    Pin(P),
}

impl<S, P> Error<S, P> {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spi(_) => "SPI error",
            Self::Pin(_) => "Chip select error",
        }
    }
}

pub struct Max31855<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> Max31855<SPI, CS>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
{
    pub const fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn read_frame(&mut self) -> Result<[u8; 4], Error<SPI::Error, CS::Error>> {
        let mut buf = [0u8; 4];

        self.cs.set_low().map_err(Error::Pin)?;
        let res = self.spi.transfer(&mut buf).map(|_| ());
        // Always release the chip, even if the transfer failed
        self.cs.set_high().map_err(Error::Pin)?;
        res.map_err(Error::Spi)?;

        Ok(buf)
    }
}

/// Decode a 32 bit conversion frame.
///
/// Negative thermocouple temperatures are clamped to zero; the oven never runs below ambient.
pub fn decode(frame: [u8; 4]) -> Sample {
    let status = frame[3];
    if status & OC != 0 {
        return Sample::fault(Fault::OpenCircuit);
    }
    if status & SCG != 0 {
        return Sample::fault(Fault::ShortToGround);
    }
    if status & SCV != 0 {
        return Sample::fault(Fault::ShortToSupply);
    }

    // 14 bit signed temperature in the top bits, 0.25 °C per LSB
    let raw = i16::from_be_bytes([frame[0], frame[1]]) >> 2;
    Sample::from_raw(raw.max(0).unsigned_abs())
}

impl<SPI, CS> Thermocouple for Max31855<SPI, CS>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
{
    type Error = Error<SPI::Error, CS::Error>;

    fn read(&mut self) -> Result<Sample, Self::Error> {
        self.read_frame().map(decode)
    }
}
