//! Temperature history and windowed deltas.
//!
//! Each delta is the sum of the [`WINDOW`] newest samples minus the sum of [`WINDOW`] samples
//! further back in the history. The sums are not scaled; thresholds elsewhere are expressed in
//! the same counts.

use heapless::HistoryBuffer;

use crate::{
    config::{
        DELTA_HISTORY_LEN, HISTORY_LEN, LONG_OFFSET, MEDIUM_OFFSET, RATE_OFFSET, SHORT_OFFSET,
        WINDOW,
    },
    thermocouple::Sample,
};

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deltas {
    pub short: i16,
    pub medium: i16,
    pub long: i16,
    /// Change of the short delta over its own history.
    pub rate: i16,
}

/// Filter output for one tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub sample: Sample,
    pub deltas: Deltas,
}

impl Reading {
    #[inline]
    pub const fn raw(&self) -> u16 {
        self.sample.raw()
    }
}

pub struct TemperatureFilter {
    history: HistoryBuffer<u16, HISTORY_LEN>,
    short_history: HistoryBuffer<i16, DELTA_HISTORY_LEN>,
    deltas: Deltas,
}

impl TemperatureFilter {
    pub const fn new() -> Self {
        Self {
            history: HistoryBuffer::new(),
            short_history: HistoryBuffer::new(),
            deltas: Deltas {
                short: 0,
                medium: 0,
                long: 0,
                rate: 0,
            },
        }
    }

    /// Add a sample and recompute the deltas.
    ///
    /// Fault samples are passed through without touching the history, so the deltas keep their
    /// last good values.
    pub fn push(&mut self, sample: Sample) -> Reading {
        if sample.is_fault() {
            return Reading {
                sample,
                deltas: self.deltas,
            };
        }

        let raw = sample.raw();
        let seeded = self.history.recent().is_some();
        if seeded {
            self.history.write(raw);
        } else {
            // Fill everything so the first deltas are zero instead of a jump from nothing
            self.history.clear_with(raw);
        }

        let short = window_delta(&self.history, SHORT_OFFSET);
        if seeded {
            self.short_history.write(short);
        } else {
            self.short_history.clear_with(short);
        }

        self.deltas = Deltas {
            short,
            medium: window_delta(&self.history, MEDIUM_OFFSET),
            long: window_delta(&self.history, LONG_OFFSET),
            rate: window_delta(&self.short_history, RATE_OFFSET),
        };

        Reading {
            sample,
            deltas: self.deltas,
        }
    }

    #[inline]
    pub const fn deltas(&self) -> Deltas {
        self.deltas
    }
}

impl Default for TemperatureFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first<T, const N: usize>(buf: &HistoryBuffer<T, N>) -> impl Iterator<Item = &T> {
    let (older, newer) = buf.as_slices();
    older.iter().chain(newer).rev()
}

fn window_delta<T: Copy + Into<i32>, const N: usize>(
    buf: &HistoryBuffer<T, N>,
    offset: usize,
) -> i16 {
    let sum = |skip: usize| {
        newest_first(buf)
            .skip(skip)
            .take(WINDOW)
            .map(|v| (*v).into())
            .sum::<i32>()
    };
    let delta = sum(0) - sum(offset);
    delta.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermocouple::Fault;

    #[test]
    fn first_sample_seeds_history() {
        let mut filter = TemperatureFilter::new();
        let reading = filter.push(Sample::from_raw(812));

        assert_eq!(filter.history.len(), HISTORY_LEN);
        assert!(filter.history.oldest_ordered().all(|v| *v == 812));
        assert_eq!(reading.deltas, Deltas::default());
    }

    #[test]
    fn steady_input_keeps_deltas_zero() {
        let mut filter = TemperatureFilter::new();
        for _ in 0..100 {
            assert_eq!(filter.push(Sample::from_raw(400)).deltas, Deltas::default());
        }
    }

    #[test]
    fn linear_ramp_deltas_scale_with_offset() {
        let mut filter = TemperatureFilter::new();
        let mut reading = filter.push(Sample::from_raw(100));
        for i in 1..=200u16 {
            reading = filter.push(Sample::from_raw(100 + i));
        }

        // One count per tick: each window is offset * WINDOW counts apart
        assert_eq!(reading.deltas.short, 32);
        assert_eq!(reading.deltas.medium, 128);
        assert_eq!(reading.deltas.long, 256);
        // Constant slope means the short delta no longer changes
        assert_eq!(reading.deltas.rate, 0);
    }

    #[test]
    fn rate_follows_acceleration() {
        let mut filter = TemperatureFilter::new();
        filter.push(Sample::from_raw(100));
        let mut temp = 100;
        let mut reading = filter.deltas();
        for step in 1..=40u16 {
            temp += step;
            reading = filter.push(Sample::from_raw(temp)).deltas;
        }
        assert!(reading.rate > 0);
    }

    #[test]
    fn windows_count_back_from_newest() {
        let mut filter = TemperatureFilter::new();
        filter.push(Sample::from_raw(0));
        for _ in 0..WINDOW {
            filter.push(Sample::from_raw(10));
        }

        let newest: Vec<u16> = newest_first(&filter.history).take(WINDOW + 1).copied().collect();
        assert_eq!(newest[..WINDOW], [10; WINDOW]);
        assert_eq!(newest[WINDOW], 0);
        assert_eq!(filter.deltas().short, 10 * WINDOW as i16);
    }

    #[test]
    fn faults_do_not_enter_history() {
        let mut filter = TemperatureFilter::new();
        filter.push(Sample::from_raw(500));
        filter.push(Sample::from_raw(504));
        let before = filter.deltas();

        let reading = filter.push(Sample::fault(Fault::OpenCircuit));

        assert_eq!(reading.sample.as_fault(), Some(Fault::OpenCircuit));
        assert_eq!(reading.deltas, before);
        assert_eq!(filter.history.recent(), Some(&504));
    }

    #[test]
    fn fault_before_first_sample_leaves_filter_unseeded() {
        let mut filter = TemperatureFilter::new();
        filter.push(Sample::fault(Fault::ShortToGround));
        assert_eq!(filter.history.len(), 0);

        filter.push(Sample::from_raw(300));
        assert_eq!(filter.history.len(), HISTORY_LEN);
        assert!(filter.history.oldest_ordered().all(|v| *v == 300));
    }
}
