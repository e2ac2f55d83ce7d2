//! Two-handle range selection over a fixed absolute bound.
//!
//! `absolute.min <= current.min <= current.max <= absolute.max` holds after
//! every call, including each step of an interactive drag. Handles never cross:
//! they stay at least `step` apart whenever the absolute bound is that wide.

use std::fmt;

use crate::catalog::range::{RangeBound, RangeFilter, RangeValue};

type ChangeListener<T> = Box<dyn FnMut(RangeBound<T>) + Send>;

pub struct DualRangeInput<T: RangeValue> {
    absolute: RangeBound<T>,
    current: RangeBound<T>,
    step: T,
    on_change: Option<ChangeListener<T>>,
}

impl<T: RangeValue> fmt::Debug for DualRangeInput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualRangeInput")
            .field("absolute", &self.absolute)
            .field("current", &self.current)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl<T: RangeValue> DualRangeInput<T> {
    /// Starts with both handles at the ends of `absolute`. A negative step is
    /// treated as zero.
    pub fn new(absolute: RangeBound<T>, step: T) -> Self {
        DualRangeInput {
            absolute,
            current: absolute,
            step: if step < T::ZERO { T::ZERO } else { step },
            on_change: None,
        }
    }

    /// Starts from a caller's filter, clamped into `absolute`.
    pub fn from_filter(absolute: RangeBound<T>, step: T, filter: &RangeFilter<T>) -> Self {
        let mut input = Self::new(absolute, step);
        let wanted = filter.resolve(&absolute);
        input.current = RangeBound::new(absolute.clamp(wanted.min()), absolute.clamp(wanted.max()));
        input
    }

    /// Called with the new pair after every adjustment.
    pub fn on_change(mut self, listener: impl FnMut(RangeBound<T>) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    pub fn absolute(&self) -> RangeBound<T> {
        self.absolute
    }

    pub fn value(&self) -> RangeBound<T> {
        self.current
    }

    pub fn is_full_range(&self) -> bool {
        self.current == self.absolute
    }

    /// The current selection as a filter for the catalog query.
    pub fn to_filter(&self) -> RangeFilter<T> {
        RangeFilter::spanning(self.current)
    }

    /// Moves the low handle. It stops at `absolute.min` and at `current.max - step`.
    pub fn set_min(&mut self, value: T) -> RangeBound<T> {
        if !value.as_f64().is_finite() {
            return self.current;
        }
        let ceiling = self.current.max() - self.step;
        let ceiling = if ceiling < self.absolute.min() { self.absolute.min() } else { ceiling };
        let min = if value < self.absolute.min() {
            self.absolute.min()
        } else if value > ceiling {
            ceiling
        } else {
            value
        };
        self.update(RangeBound::new(min, self.current.max()))
    }

    /// Moves the high handle. It stops at `absolute.max` and at `current.min + step`.
    pub fn set_max(&mut self, value: T) -> RangeBound<T> {
        if !value.as_f64().is_finite() {
            return self.current;
        }
        let floor = self.current.min() + self.step;
        let floor = if floor > self.absolute.max() { self.absolute.max() } else { floor };
        let max = if value > self.absolute.max() {
            self.absolute.max()
        } else if value < floor {
            floor
        } else {
            value
        };
        self.update(RangeBound::new(self.current.min(), max))
    }

    /// Sets both handles at once, e.g. from typed input. Inverted pairs are
    /// swapped and both ends are clamped into the absolute bound.
    pub fn set_range(&mut self, a: T, b: T) -> RangeBound<T> {
        if !a.as_f64().is_finite() || !b.as_f64().is_finite() {
            return self.current;
        }
        let wanted = RangeBound::new(a, b);
        self.update(RangeBound::new(self.absolute.clamp(wanted.min()), self.absolute.clamp(wanted.max())))
    }

    pub fn reset(&mut self) -> RangeBound<T> {
        self.update(self.absolute)
    }

    /// Replaces the absolute bound (fresh bounds snapshot). The selection is
    /// clamped into it without notifying the listener.
    pub fn set_bounds(&mut self, absolute: RangeBound<T>) {
        self.absolute = absolute;
        self.current = RangeBound::new(absolute.clamp(self.current.min()), absolute.clamp(self.current.max()));
    }

    /// Fractional track positions of the low and high handles, each in `[0, 1]`.
    /// A single-point bound puts both handles at 0.
    pub fn positions(&self) -> (f64, f64) {
        (self.position(self.current.min()), self.position(self.current.max()))
    }

    pub fn position(&self, value: T) -> f64 {
        if self.absolute.is_degenerate() {
            return 0.0;
        }
        let span = (self.absolute.max() - self.absolute.min()).as_f64();
        ((value - self.absolute.min()).as_f64() / span).clamp(0.0, 1.0)
    }

    fn update(&mut self, next: RangeBound<T>) -> RangeBound<T> {
        self.current = next;
        if let Some(listener) = self.on_change.as_mut() {
            listener(next);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn price_input() -> DualRangeInput<f64> {
        DualRangeInput::new(RangeBound::new(50_000.0, 1_000_000.0), 10_000.0)
    }

    #[test]
    fn min_handle_stops_one_step_below_max() {
        let mut input = price_input();
        input.set_max(300_000.0);
        let value = input.set_min(450_000.0);
        assert_eq!(value, RangeBound::new(290_000.0, 300_000.0));
    }

    #[test]
    fn max_handle_stops_one_step_above_min() {
        let mut input = price_input();
        input.set_min(400_000.0);
        let value = input.set_max(100_000.0);
        assert_eq!(value, RangeBound::new(400_000.0, 410_000.0));
    }

    #[test]
    fn handles_are_clamped_to_absolute_bound() {
        let mut input = price_input();
        assert_eq!(input.set_min(-5.0).min(), 50_000.0);
        assert_eq!(input.set_max(9_999_999.0).max(), 1_000_000.0);
        assert!(input.is_full_range());
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut input = price_input();
        input.set_min(f64::NAN);
        input.set_max(f64::INFINITY);
        assert!(input.is_full_range());
    }

    #[test]
    fn every_adjustment_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut input = DualRangeInput::new(RangeBound::new(2010, 2024), 1)
            .on_change(move |bound| sink.lock().unwrap().push((bound.min(), bound.max())));

        input.set_min(2015);
        input.set_max(2020);
        input.set_range(2023, 2012);
        input.reset();
        input.set_bounds(RangeBound::new(2012, 2022));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(2015, 2024), (2015, 2020), (2012, 2023), (2010, 2024)]
        );
        assert_eq!(input.value(), RangeBound::new(2012, 2022));
    }

    #[test]
    fn positions_follow_values() {
        let mut input = DualRangeInput::new(RangeBound::new(0_i64, 500_000), 1_000);
        input.set_range(125_000, 250_000);
        assert_eq!(input.positions(), (0.25, 0.5));
        assert_eq!(input.position(900_000), 1.0);
    }

    #[test]
    fn degenerate_bound_puts_both_handles_at_zero() {
        let input = DualRangeInput::new(RangeBound::point(2024), 1);
        assert_eq!(input.positions(), (0.0, 0.0));
    }

    #[test]
    fn starts_from_existing_filter() {
        let input = DualRangeInput::from_filter(
            RangeBound::new(85_000.0, 720_000.0),
            1_000.0,
            &RangeFilter::new(Some(10_000.0), Some(200_000.0)),
        );
        assert_eq!(input.value(), RangeBound::new(85_000.0, 200_000.0));
        assert_eq!(input.to_filter(), RangeFilter::new(Some(85_000.0), Some(200_000.0)));
    }

    #[derive(Debug, Clone)]
    enum Adjustment {
        Min(i64),
        Max(i64),
        Range(i64, i64),
        Reset,
        Bounds(i64, i64),
    }

    fn adjustment() -> impl Strategy<Value = Adjustment> {
        prop_oneof![
            (-100_000i64..700_000).prop_map(Adjustment::Min),
            (-100_000i64..700_000).prop_map(Adjustment::Max),
            (-100_000i64..700_000, -100_000i64..700_000).prop_map(|(a, b)| Adjustment::Range(a, b)),
            Just(Adjustment::Reset),
            (0i64..600_000, 0i64..600_000).prop_map(|(a, b)| Adjustment::Bounds(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn handles_never_cross(
            lo in 0i64..300_000,
            width in 0i64..300_000,
            step in 0i64..50_000,
            adjustments in prop::collection::vec(adjustment(), 1..40),
        ) {
            let mut input = DualRangeInput::new(RangeBound::new(lo, lo + width), step);
            for adjustment in adjustments {
                match adjustment {
                    Adjustment::Min(v) => { input.set_min(v); }
                    Adjustment::Max(v) => { input.set_max(v); }
                    Adjustment::Range(a, b) => { input.set_range(a, b); }
                    Adjustment::Reset => { input.reset(); }
                    Adjustment::Bounds(a, b) => input.set_bounds(RangeBound::new(a, b)),
                }
                let (absolute, current) = (input.absolute(), input.value());
                prop_assert!(absolute.min() <= current.min());
                prop_assert!(current.min() <= current.max());
                prop_assert!(current.max() <= absolute.max());
                let (low, high) = input.positions();
                prop_assert!((0.0..=1.0).contains(&low) && low <= high && high <= 1.0);
            }
        }
    }
}
