//! Immutable, validated parameter value objects.

use crate::error::{AccountingError, Result};

/// Default acceptable error on a binary search result.
pub const DEFAULT_BINARY_SEARCH_TOLERANCE: f64 = 1e-7;

/// The (epsilon, delta) guarantee of a differentially private mechanism.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifferentialPrivacyParameters {
    /// The epsilon in (epsilon, delta)-differential privacy.
    pub epsilon: f64,
    /// The delta in (epsilon, delta)-differential privacy.
    pub delta: f64,
}

impl DifferentialPrivacyParameters {
    /// Create validated privacy parameters.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self> {
        if epsilon.is_nan() || epsilon < 0.0 {
            return Err(AccountingError::invalid(format!(
                "epsilon must be non-negative: {epsilon}"
            )));
        }
        if !(0.0..=1.0).contains(&delta) {
            return Err(AccountingError::invalid(format!(
                "delta must be between 0 and 1: {delta}"
            )));
        }
        Ok(Self { epsilon, delta })
    }

    /// Create parameters for a pure (epsilon, 0)-DP guarantee.
    pub fn pure(epsilon: f64) -> Result<Self> {
        Self::new(epsilon, 0.0)
    }
}

/// Parameters controlling a monotone binary search.
///
/// Either bound may be infinite. An initial guess, when present, must lie
/// strictly inside the bounds; it lets the search cheaply tighten one
/// side of the bracket by exponential doubling before bisecting.
#[derive(Clone, Copy, Debug)]
pub struct BinarySearchParameters {
    /// Lower end of the search range.
    pub lower_bound: f64,
    /// Upper end of the search range.
    pub upper_bound: f64,
    /// Optional starting guess, strictly inside the bounds.
    pub initial_guess: Option<f64>,
    /// Acceptable error on the returned value.
    pub tolerance: f64,
    /// Whether the search runs over integers.
    pub discrete: bool,
}

impl BinarySearchParameters {
    /// Create search parameters over `[lower_bound, upper_bound]`.
    pub fn new(lower_bound: f64, upper_bound: f64) -> Result<Self> {
        if lower_bound.is_nan() || upper_bound.is_nan() || lower_bound >= upper_bound {
            return Err(AccountingError::invalid(format!(
                "search bounds must satisfy lower < upper: [{lower_bound}, {upper_bound}]"
            )));
        }
        Ok(Self {
            lower_bound,
            upper_bound,
            initial_guess: None,
            tolerance: DEFAULT_BINARY_SEARCH_TOLERANCE,
            discrete: false,
        })
    }

    /// Set an initial guess.
    pub fn with_initial_guess(mut self, initial_guess: f64) -> Result<Self> {
        if !(self.lower_bound < initial_guess && initial_guess < self.upper_bound) {
            return Err(AccountingError::invalid(format!(
                "initial guess must lie strictly inside the bounds: {initial_guess}"
            )));
        }
        self.initial_guess = Some(initial_guess);
        Ok(self)
    }

    /// Set the search tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(AccountingError::invalid(format!(
                "tolerance must be positive and finite: {tolerance}"
            )));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Restrict the search to integer values.
    pub fn discrete(mut self) -> Self {
        self.discrete = true;
        self
    }
}
