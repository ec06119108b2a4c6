//! Privacy loss distribution accounting for differential privacy.
//!
//! A privacy loss distribution (PLD) captures the full privacy behavior
//! of a mechanism, not just a single (epsilon, delta) pair: delta can be
//! read off for any epsilon and vice versa, and composing mechanisms
//! amounts to convolving their PLDs. This crate builds PLDs for common
//! additive noise mechanisms and randomized response, composes them via
//! FFT, and answers privacy parameter queries, with a choice between
//! pessimistic (provable upper bound) and optimistic (lower bound)
//! discretization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod convolve;
pub mod error;
pub mod mechanism;
pub mod params;
pub mod pld;
pub mod search;

pub use convolve::{convolve, from_dense, self_convolve, self_convolve_dense, to_dense};
pub use error::{AccountingError, Result};
pub use mechanism::{
    AdditiveNoisePrivacyLoss, DiscreteGaussianPrivacyLoss, DiscreteLaplacePrivacyLoss,
    GaussianPrivacyLoss, LaplacePrivacyLoss, TailPrivacyLossDistribution,
};
pub use params::{
    BinarySearchParameters, DifferentialPrivacyParameters, DEFAULT_BINARY_SEARCH_TOLERANCE,
};
pub use pld::{
    PrivacyLossDistribution, DEFAULT_LOG_MASS_TRUNCATION_BOUND, DEFAULT_TAIL_MASS_TRUNCATION,
    DEFAULT_VALUE_DISCRETIZATION_INTERVAL,
};
pub use search::inverse_monotone_function;

/// Common imports for privacy loss accounting.
pub mod prelude {
    pub use crate::{
        inverse_monotone_function, AccountingError, AdditiveNoisePrivacyLoss,
        BinarySearchParameters, DifferentialPrivacyParameters, DiscreteGaussianPrivacyLoss,
        DiscreteLaplacePrivacyLoss, GaussianPrivacyLoss, LaplacePrivacyLoss,
        PrivacyLossDistribution, TailPrivacyLossDistribution,
    };
}
