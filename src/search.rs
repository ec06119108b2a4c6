//! Generic inversion of monotone scalar functions.

use crate::params::BinarySearchParameters;

/// Invert a monotone function by bisection.
///
/// Returns an `x` such that `func(x)` is no more than `value`, when such
/// an `x` exists inside the search range. The result is guaranteed to be
/// within `params.tolerance` of the smallest such `x` for a
/// non-increasing `func`, or of the largest such `x` when `increasing`
/// is set. Returns `None` when no such `x` exists within the bounds.
///
/// In discrete mode the tolerance is forced to one and midpoints are
/// rounded down, so the search operates purely on integers.
pub fn inverse_monotone_function<F>(
    func: F,
    value: f64,
    params: &BinarySearchParameters,
    increasing: bool,
) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let mut lower_x = params.lower_bound;
    let mut upper_x = params.upper_bound;

    // True while x is on the near side of the crossing, i.e. the bracket
    // can still be tightened from below at x.
    let check = |func_value: f64| {
        if increasing {
            func_value <= value
        } else {
            func_value > value
        }
    };

    if increasing {
        if lower_x.is_finite() && func(lower_x) > value {
            return None;
        }
    } else if upper_x.is_finite() && func(upper_x) > value {
        return None;
    }

    if let Some(initial_guess) = params.initial_guess {
        let mut guess_x = initial_guess;
        while guess_x < upper_x && check(func(guess_x)) {
            lower_x = guess_x;
            guess_x *= 2.0;
        }
        upper_x = upper_x.min(guess_x);
    }

    let tolerance = if params.discrete { 1.0 } else { params.tolerance };

    while upper_x - lower_x > tolerance {
        let mid_x = if params.discrete {
            ((lower_x + upper_x) / 2.0).floor()
        } else {
            (lower_x + upper_x) / 2.0
        };
        if check(func(mid_x)) {
            lower_x = mid_x;
        } else {
            upper_x = mid_x;
        }
    }

    Some(if increasing { lower_x } else { upper_x })
}
