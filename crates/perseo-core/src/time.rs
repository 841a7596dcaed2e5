//! Split-precision simulated time.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Simulated time split into an integer second count and a sub-second
/// remainder, mirroring the reference simulator's `{Seconds, Millis}` pair.
///
/// Keeping the fractional part separate from the (potentially large) integer
/// part avoids the precision loss a single `f64` millisecond counter would
/// suffer over long runs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timex {
    /// Whole seconds elapsed.
    pub whole_seconds: i64,
    /// Sub-second remainder, nominally in `[0, 1)` after normalization.
    pub sub_seconds: f64,
}

impl Timex {
    /// The origin of simulated time.
    pub const ZERO: Timex = Timex { whole_seconds: 0, sub_seconds: 0.0 };

    /// Builds a `Timex` from a millisecond count, normalizing the result.
    pub fn from_millis(ms: f64) -> Self {
        let seconds = ms / 1000.0;
        let whole = seconds.floor();
        Timex { whole_seconds: whole as i64, sub_seconds: seconds - whole }.normalized()
    }

    /// Returns the time as a single millisecond value.
    ///
    /// This loses precision for very large `whole_seconds`; prefer
    /// [`Timex::diff`] when comparing two close timestamps.
    pub fn as_millis(&self) -> f64 {
        (self.whole_seconds as f64 + self.sub_seconds) * 1000.0
    }

    /// Normalizes `sub_seconds` back into `[0, 1)`, carrying overflow into
    /// `whole_seconds`.
    pub fn normalized(mut self) -> Self {
        if self.sub_seconds >= 1.0 {
            let carry = self.sub_seconds.floor();
            self.whole_seconds += carry as i64;
            self.sub_seconds -= carry;
        } else if self.sub_seconds < 0.0 {
            let borrow = (-self.sub_seconds).ceil();
            self.whole_seconds -= borrow as i64;
            self.sub_seconds += borrow;
        }
        self
    }

    /// Advances this time by `delta_ms` milliseconds, returning a normalized result.
    pub fn advance_ms(self, delta_ms: f64) -> Self {
        let delta_seconds = delta_ms / 1000.0;
        Timex {
            whole_seconds: self.whole_seconds,
            sub_seconds: self.sub_seconds + delta_seconds,
        }
        .normalized()
    }

    /// Difference `self - other` expressed in milliseconds.
    ///
    /// Takes the fast path (subtracting only the sub-second parts) when the
    /// whole-second components already match, falling back to the composite
    /// subtraction otherwise.
    pub fn diff_ms(self, other: Timex) -> f64 {
        if self.whole_seconds == other.whole_seconds {
            (self.sub_seconds - other.sub_seconds) * 1000.0
        } else {
            ((self.whole_seconds - other.whole_seconds) as f64
                + (self.sub_seconds - other.sub_seconds))
                * 1000.0
        }
    }
}

impl Add<f64> for Timex {
    type Output = Timex;

    /// Adds a millisecond delta.
    fn add(self, delta_ms: f64) -> Timex {
        self.advance_ms(delta_ms)
    }
}

impl Eq for Timex {}

impl PartialOrd for Timex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.whole_seconds
            .cmp(&other.whole_seconds)
            .then_with(|| self.sub_seconds.partial_cmp(&other.sub_seconds).unwrap_or(Ordering::Equal))
    }
}

impl fmt::Display for Timex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}ms", self.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_overflowing_sub_seconds() {
        let t = Timex { whole_seconds: 3, sub_seconds: 1.25 }.normalized();
        assert_eq!(t.whole_seconds, 4);
        assert!((t.sub_seconds - 0.25).abs() < 1e-12);
    }

    #[test]
    fn diff_fast_path_matches_composite() {
        let a = Timex { whole_seconds: 5, sub_seconds: 0.7 };
        let b = Timex { whole_seconds: 5, sub_seconds: 0.2 };
        assert!((a.diff_ms(b) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn diff_across_second_boundary() {
        let a = Timex { whole_seconds: 2, sub_seconds: 0.1 };
        let b = Timex { whole_seconds: 1, sub_seconds: 0.9 };
        assert!((a.diff_ms(b) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Timex::from_millis(10.0);
        let b = Timex::from_millis(20.0);
        assert!(a < b);
    }

    #[test]
    fn advance_round_trips_through_millis() {
        let t = Timex::from_millis(1234.5).advance_ms(65.5);
        assert!((t.as_millis() - 1300.0).abs() < 1e-6);
    }

    proptest::proptest! {
        #[test]
        fn from_millis_round_trips_for_any_value(ms in -1.0e9f64..1.0e9) {
            let t = Timex::from_millis(ms);
            prop_assert!((t.as_millis() - ms).abs() < 1e-3);
        }

        #[test]
        fn normalized_sub_seconds_always_lands_in_unit_range(
            whole_seconds in -1_000_000i64..1_000_000,
            sub_seconds in -10.0f64..10.0,
        ) {
            let t = Timex { whole_seconds, sub_seconds }.normalized();
            prop_assert!(t.sub_seconds >= 0.0 && t.sub_seconds < 1.0);
        }

        #[test]
        fn diff_ms_is_antisymmetric(ms_a in -1.0e6f64..1.0e6, ms_b in -1.0e6f64..1.0e6) {
            let a = Timex::from_millis(ms_a);
            let b = Timex::from_millis(ms_b);
            prop_assert!((a.diff_ms(b) + b.diff_ms(a)).abs() < 1e-6);
        }
    }
}
