//! Empirical duty cycle to steady-state temperature table.

use heapless::Vec;

use crate::{config::SLOTS_PER_CYCLE, time_base::DutyCycle};

/// One calibrated point: holding `duty` keeps the oven at `temperature` (quarter degrees).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurvePoint {
    pub duty: DutyCycle,
    pub temperature: u16,
}

/// Points in the order they were recorded. Calibration records them with rising duty cycle, so
/// temperatures are non-decreasing.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct PowerCurve {
    points: Vec<CurvePoint, { SLOTS_PER_CYCLE as usize }>,
}

impl PowerCurve {
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a curve from `(duty, temperature)` pairs, ignoring anything past capacity.
    pub fn from_points(points: &[(u8, u16)]) -> Self {
        let mut curve = Self::new();
        for &(duty, temperature) in points {
            let Some(duty) = DutyCycle::new(duty) else {
                continue;
            };
            if curve.record_point(duty, temperature).is_err() {
                break;
            }
        }
        curve
    }

    /// Append a point. Fails when the table already holds one point per duty cycle step.
    pub fn record_point(&mut self, duty: DutyCycle, temperature: u16) -> Result<(), CurvePoint> {
        self.points.push(CurvePoint { duty, temperature })
    }

    /// Smallest recorded duty cycle whose temperature reaches `target`.
    ///
    /// Full power if the target is above every point, off if nothing has been recorded.
    pub fn lookup(&self, target: u16) -> DutyCycle {
        if self.points.is_empty() {
            return DutyCycle::OFF;
        }

        self.points
            .iter()
            .find(|p| p.temperature >= target)
            .map_or(DutyCycle::FULL, |p| p.duty)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> PowerCurve {
        PowerCurve::from_points(&[(1, 240), (2, 340), (3, 430), (4, 520), (5, 600)])
    }

    #[test]
    fn finds_smallest_sufficient_duty() {
        let curve = curve();
        assert_eq!(curve.lookup(100).get(), 1);
        assert_eq!(curve.lookup(340).get(), 2);
        assert_eq!(curve.lookup(341).get(), 3);
        assert_eq!(curve.lookup(600).get(), 5);
    }

    #[test]
    fn above_table_is_full_power() {
        assert_eq!(curve().lookup(601), DutyCycle::FULL);
    }

    #[test]
    fn empty_table_is_off() {
        assert_eq!(PowerCurve::new().lookup(400), DutyCycle::OFF);
    }

    #[test]
    fn lookup_is_monotonic() {
        let curve = curve();
        let mut last = DutyCycle::OFF;
        for target in 200..=600 {
            let duty = curve.lookup(target);
            assert!(duty >= last, "target {target}");
            last = duty;
        }
    }

    #[test]
    fn capacity_is_one_point_per_step() {
        let mut curve = PowerCurve::new();
        for duty in 1..=20 {
            assert!(curve
                .record_point(DutyCycle::new(duty).unwrap(), u16::from(duty) * 50)
                .is_ok());
        }
        assert!(curve.record_point(DutyCycle::FULL, 2000).is_err());
        assert_eq!(curve.len(), 20);
    }
}
