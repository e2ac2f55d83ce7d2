//! Inclusive numeric intervals used for price, year and mileage.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Numeric attribute types that can be bounded and slid over.
pub trait RangeValue:
    Copy + PartialOrd + PartialEq + Add<Output = Self> + Sub<Output = Self> + std::fmt::Debug
{
    const ZERO: Self;

    fn as_f64(self) -> f64;
}

macro_rules! impl_range_value {
    ($($t:ty),*) => {
        $(impl RangeValue for $t {
            const ZERO: Self = 0 as $t;

            fn as_f64(self) -> f64 {
                self as f64
            }
        })*
    };
}

impl_range_value!(i32, i64, f64);

/// An inclusive `[min, max]` interval. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBound<T> {
    min: T,
    max: T,
}

impl<T: RangeValue> RangeBound<T> {
    /// Builds a bound from two endpoints, swapping them if given inverted.
    pub fn new(a: T, b: T) -> Self {
        if a <= b {
            RangeBound { min: a, max: b }
        } else {
            RangeBound { min: b, max: a }
        }
    }

    pub fn point(value: T) -> Self {
        RangeBound { min: value, max: value }
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Grows the bound to include `value`.
    pub fn extend(self, value: T) -> Self {
        RangeBound {
            min: if value < self.min { value } else { self.min },
            max: if value > self.max { value } else { self.max },
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }
}

/// A possibly open-ended range filter as submitted by a caller.
///
/// Either side may be absent. When both are present they are kept ordered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeFilter<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: RangeValue> RangeFilter<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => RangeFilter { min: Some(hi), max: Some(lo) },
            _ => RangeFilter { min, max },
        }
    }

    pub fn unbounded() -> Self {
        RangeFilter { min: None, max: None }
    }

    pub fn spanning(bound: RangeBound<T>) -> Self {
        RangeFilter { min: Some(bound.min()), max: Some(bound.max()) }
    }

    /// True when this filter cannot narrow anything inside `bound`.
    pub fn spans(&self, bound: &RangeBound<T>) -> bool {
        self.min.is_none_or(|min| min == bound.min()) && self.max.is_none_or(|max| max == bound.max())
    }

    /// Resolves open ends against `bound` into a closed interval.
    pub fn resolve(&self, bound: &RangeBound<T>) -> RangeBound<T> {
        RangeBound::new(self.min.unwrap_or(bound.min()), self.max.unwrap_or(bound.max()))
    }
}
