//! Privacy loss distributions and their composition.
//!
//! The privacy loss distribution (PLD) of two discrete distributions
//! mu_upper and mu_lower is the distribution of the privacy loss
//! ln(mu_upper(o) / mu_lower(o)) where o is sampled from mu_upper. The
//! epsilon-hockey stick divergence between the two distributions is read
//! off the PLD directly and equals the delta for which the corresponding
//! mechanism is (epsilon, delta)-differentially private, and composing
//! mechanisms reduces to convolving their PLDs.
//!
//! Losses are discretized to integer multiples of a fixed interval.
//! Rounding up (pessimistic) keeps every divergence computed from the
//! PLD an upper bound on the truth; rounding down (optimistic) gives a
//! best-effort lower bound. Mass with unbounded loss is tracked apart
//! from the discretized buckets as `infinity_mass`.

use std::collections::HashMap;
use std::hash::Hash;

use crate::convolve::{convolve, self_convolve};
use crate::error::{AccountingError, Result};
use crate::mechanism::{
    AdditiveNoisePrivacyLoss, DiscreteGaussianPrivacyLoss, DiscreteLaplacePrivacyLoss,
    GaussianPrivacyLoss, LaplacePrivacyLoss,
};
use crate::params::DifferentialPrivacyParameters;

/// Default interval between discretized privacy loss values.
pub const DEFAULT_VALUE_DISCRETIZATION_INTERVAL: f64 = 1e-4;

/// Default log-mass bound below which upper-distribution mass is
/// truncated when building a PLD.
pub const DEFAULT_LOG_MASS_TRUNCATION_BOUND: f64 = -50.0;

/// Default bound on the probability mass trimmed from the tails during
/// composition.
pub const DEFAULT_TAIL_MASS_TRUNCATION: f64 = 1e-15;

/// Round a privacy loss to a bucket index, upward when pessimistic and
/// downward when optimistic.
fn round_loss(loss: f64, value_discretization_interval: f64, pessimistic_estimate: bool) -> i64 {
    if pessimistic_estimate {
        (loss / value_discretization_interval).ceil() as i64
    } else {
        (loss / value_discretization_interval).floor() as i64
    }
}

/// A discretized privacy loss distribution.
///
/// Instances are immutable: composition and self-composition return new
/// distributions. The probability mass function is keyed by integer
/// bucket index; the privacy loss at bucket `i` is
/// `i * value_discretization_interval`.
#[derive(Clone, Debug)]
pub struct PrivacyLossDistribution {
    rounded_probability_mass_function: HashMap<i64, f64>,
    value_discretization_interval: f64,
    infinity_mass: f64,
    pessimistic_estimate: bool,
}

impl PrivacyLossDistribution {
    /// Assemble a distribution from already-rounded parts.
    pub fn new(
        rounded_probability_mass_function: HashMap<i64, f64>,
        value_discretization_interval: f64,
        infinity_mass: f64,
        pessimistic_estimate: bool,
    ) -> Result<Self> {
        if !value_discretization_interval.is_finite() || value_discretization_interval <= 0.0 {
            return Err(AccountingError::invalid(format!(
                "value_discretization_interval must be positive: {value_discretization_interval}"
            )));
        }
        if !(0.0..=1.0).contains(&infinity_mass) {
            return Err(AccountingError::invalid(format!(
                "infinity_mass must be between 0 and 1: {infinity_mass}"
            )));
        }
        Ok(Self {
            rounded_probability_mass_function,
            value_discretization_interval,
            infinity_mass,
            pessimistic_estimate,
        })
    }

    /// The PLD of an algorithm that leaks nothing: a single bucket at
    /// loss zero with mass one.
    pub fn identity(value_discretization_interval: f64) -> Result<Self> {
        Self::new(
            HashMap::from([(0, 1.0)]),
            value_discretization_interval,
            0.0,
            true,
        )
    }

    /// Build a PLD from the log probability mass functions of mu_lower
    /// and mu_upper.
    ///
    /// Outcomes carrying upper mass but no lower mass have unbounded
    /// privacy loss and contribute to `infinity_mass`. Outcomes whose
    /// upper log-mass is at most `log_mass_truncation_bound` are folded
    /// into `infinity_mass` when pessimistic and discarded when
    /// optimistic.
    pub fn from_two_probability_mass_functions<O: Eq + Hash>(
        log_pmf_lower: &HashMap<O, f64>,
        log_pmf_upper: &HashMap<O, f64>,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
        log_mass_truncation_bound: f64,
    ) -> Result<Self> {
        let mut infinity_mass = 0.0;
        for (outcome, &log_mass_upper) in log_pmf_upper {
            let log_mass_lower = log_pmf_lower
                .get(outcome)
                .copied()
                .unwrap_or(f64::NEG_INFINITY);
            if log_mass_lower == f64::NEG_INFINITY {
                infinity_mass += log_mass_upper.exp();
            }
        }

        let mut rounded_pmf: HashMap<i64, f64> = HashMap::new();
        for (outcome, &log_mass_lower) in log_pmf_lower {
            if log_mass_lower == f64::NEG_INFINITY {
                // Already accounted for in infinity_mass.
                continue;
            }
            let log_mass_upper = log_pmf_upper
                .get(outcome)
                .copied()
                .unwrap_or(f64::NEG_INFINITY);
            if log_mass_upper > log_mass_truncation_bound {
                let privacy_loss = log_mass_upper - log_mass_lower;
                let bucket = round_loss(
                    privacy_loss,
                    value_discretization_interval,
                    pessimistic_estimate,
                );
                *rounded_pmf.entry(bucket).or_insert(0.0) += log_mass_upper.exp();
            } else if pessimistic_estimate {
                infinity_mass += log_mass_upper.exp();
            }
        }

        Self::new(
            rounded_pmf,
            value_discretization_interval,
            infinity_mass,
            pessimistic_estimate,
        )
    }

    /// Build the PLD of an additive noise mechanism.
    ///
    /// The mechanism's tail description covers the noise values outside
    /// its truncation interval; the interior is discretized either over
    /// the integer grid (discrete noise) or by partitioning the interval
    /// at the points where the loss crosses consecutive multiples of the
    /// discretization interval (continuous noise).
    pub fn create_from_additive_noise<M: AdditiveNoisePrivacyLoss>(
        mechanism: &M,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
    ) -> Result<Self> {
        let tail = mechanism.privacy_loss_tail();

        let mut rounded_pmf: HashMap<i64, f64> = HashMap::new();
        let mut infinity_mass = 0.0;
        for &(privacy_loss, mass) in &tail.tail_probability_mass_function {
            if mass <= 0.0 {
                continue;
            }
            if privacy_loss.is_infinite() {
                infinity_mass += mass;
            } else {
                let bucket = round_loss(
                    privacy_loss,
                    value_discretization_interval,
                    pessimistic_estimate,
                );
                *rounded_pmf.entry(bucket).or_insert(0.0) += mass;
            }
        }

        if mechanism.discrete_noise() {
            let start = tail.lower_x_truncation.ceil() as i64 - 1;
            let end = tail.upper_x_truncation.floor() as i64;
            let xs: Vec<f64> = (start..=end).map(|x| x as f64).collect();
            let cdf_values = mechanism.noise_cdf(&xs);
            for (index, &x) in xs.iter().enumerate().skip(1) {
                let probability_mass = cdf_values[index] - cdf_values[index - 1];
                if probability_mass > 0.0 {
                    let bucket = round_loss(
                        mechanism.privacy_loss(x),
                        value_discretization_interval,
                        pessimistic_estimate,
                    );
                    *rounded_pmf.entry(bucket).or_insert(0.0) += probability_mass;
                }
            }
        } else {
            // Partition [lower_x_truncation, upper_x_truncation] at the
            // noise values where the loss drops by one full interval.
            // Every noise value in the k-th piece has loss within one
            // interval of k * value_discretization_interval, so the
            // piece's probability mass lands in a single bucket.
            let mut rounded_down_value = (mechanism.privacy_loss(tail.lower_x_truncation)
                / value_discretization_interval)
                .floor() as i64;
            let mut xs = vec![tail.lower_x_truncation];
            let mut buckets: Vec<i64> = Vec::new();
            let mut x = tail.lower_x_truncation;
            while x < tail.upper_x_truncation {
                x = mechanism
                    .inverse_privacy_loss(value_discretization_interval * rounded_down_value as f64)
                    .min(tail.upper_x_truncation);
                xs.push(x);
                buckets.push(if pessimistic_estimate {
                    rounded_down_value + 1
                } else {
                    rounded_down_value
                });
                rounded_down_value -= 1;
            }
            let cdf_values = mechanism.noise_cdf(&xs);
            for (index, &bucket) in buckets.iter().enumerate() {
                let probability_mass = cdf_values[index + 1] - cdf_values[index];
                if probability_mass > 0.0 {
                    *rounded_pmf.entry(bucket).or_insert(0.0) += probability_mass;
                }
            }
        }

        Self::new(
            rounded_pmf,
            value_discretization_interval,
            infinity_mass,
            pessimistic_estimate,
        )
    }

    /// Build the PLD of randomized response over `num_buckets` buckets.
    ///
    /// With probability `1 - noise_parameter` the input bucket is
    /// reported as-is; otherwise a bucket is drawn uniformly at random.
    pub fn from_randomized_response(
        noise_parameter: f64,
        num_buckets: u32,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
    ) -> Result<Self> {
        if !(noise_parameter > 0.0 && noise_parameter < 1.0) {
            return Err(AccountingError::invalid(format!(
                "noise_parameter must be strictly between 0 and 1: {noise_parameter}"
            )));
        }
        if num_buckets <= 1 {
            return Err(AccountingError::invalid(format!(
                "num_buckets must be strictly greater than 1: {num_buckets}"
            )));
        }

        // Pr[R(x) = x] and Pr[R(x') = x] for a changed input x'.
        let probability_output_equal_input =
            (1.0 - noise_parameter) + noise_parameter / num_buckets as f64;
        let probability_output_not_input = noise_parameter / num_buckets as f64;
        let loss = (probability_output_equal_input / probability_output_not_input).ln();

        let mut rounded_pmf: HashMap<i64, f64> = HashMap::new();
        // Observing the unchanged input, the changed input, or any other
        // bucket gives losses +loss, -loss, and zero respectively.
        *rounded_pmf
            .entry(round_loss(
                loss,
                value_discretization_interval,
                pessimistic_estimate,
            ))
            .or_insert(0.0) += probability_output_equal_input;
        *rounded_pmf
            .entry(round_loss(
                -loss,
                value_discretization_interval,
                pessimistic_estimate,
            ))
            .or_insert(0.0) += probability_output_not_input;
        if num_buckets > 2 {
            *rounded_pmf.entry(0).or_insert(0.0) +=
                probability_output_not_input * (num_buckets - 2) as f64;
        }

        Self::new(
            rounded_pmf,
            value_discretization_interval,
            0.0,
            pessimistic_estimate,
        )
    }

    /// Build the PLD of the Laplace mechanism.
    pub fn from_laplace_mechanism(
        parameter: f64,
        sensitivity: f64,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
    ) -> Result<Self> {
        let mechanism = LaplacePrivacyLoss::new(parameter, sensitivity)?;
        Self::create_from_additive_noise(
            &mechanism,
            pessimistic_estimate,
            value_discretization_interval,
        )
    }

    /// Build the PLD of the Gaussian mechanism.
    pub fn from_gaussian_mechanism(
        standard_deviation: f64,
        sensitivity: f64,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
        log_mass_truncation_bound: f64,
    ) -> Result<Self> {
        let mechanism = GaussianPrivacyLoss::new(
            standard_deviation,
            sensitivity,
            pessimistic_estimate,
            log_mass_truncation_bound,
        )?;
        Self::create_from_additive_noise(
            &mechanism,
            pessimistic_estimate,
            value_discretization_interval,
        )
    }

    /// Build the PLD of the discrete Laplace mechanism.
    pub fn from_discrete_laplace_mechanism(
        parameter: f64,
        sensitivity: i64,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
    ) -> Result<Self> {
        let mechanism = DiscreteLaplacePrivacyLoss::new(parameter, sensitivity)?;
        Self::create_from_additive_noise(
            &mechanism,
            pessimistic_estimate,
            value_discretization_interval,
        )
    }

    /// Build the PLD of the discrete Gaussian mechanism.
    ///
    /// When `truncation_bound` is not given, the noise support is cut
    /// where at most 1e-30 of mass lies outside.
    pub fn from_discrete_gaussian_mechanism(
        sigma: f64,
        sensitivity: i64,
        truncation_bound: Option<i64>,
        pessimistic_estimate: bool,
        value_discretization_interval: f64,
    ) -> Result<Self> {
        let mechanism = DiscreteGaussianPrivacyLoss::new(sigma, sensitivity, truncation_bound)?;
        Self::create_from_additive_noise(
            &mechanism,
            pessimistic_estimate,
            value_discretization_interval,
        )
    }

    /// Pessimistic PLD of any mechanism known to be (epsilon, delta)-DP:
    /// mass `delta` at infinite loss, and the remaining mass split
    /// between `+epsilon` and `-epsilon`.
    pub fn from_privacy_parameters(
        privacy_parameters: &DifferentialPrivacyParameters,
        value_discretization_interval: f64,
    ) -> Result<Self> {
        let epsilon = privacy_parameters.epsilon;
        let delta = privacy_parameters.delta;

        let mut rounded_pmf: HashMap<i64, f64> = HashMap::new();
        *rounded_pmf
            .entry((epsilon / value_discretization_interval).ceil() as i64)
            .or_insert(0.0) += (1.0 - delta) / (1.0 + (-epsilon).exp());
        *rounded_pmf
            .entry((-epsilon / value_discretization_interval).ceil() as i64)
            .or_insert(0.0) += (1.0 - delta) / (1.0 + epsilon.exp());

        Self::new(rounded_pmf, value_discretization_interval, delta, true)
    }

    /// The discretized probability mass function, keyed by bucket index.
    pub fn rounded_probability_mass_function(&self) -> &HashMap<i64, f64> {
        &self.rounded_probability_mass_function
    }

    /// The interval between discretized privacy loss values.
    pub fn value_discretization_interval(&self) -> f64 {
        self.value_discretization_interval
    }

    /// The probability mass with unbounded privacy loss.
    pub fn infinity_mass(&self) -> f64 {
        self.infinity_mass
    }

    /// Whether rounding and truncation keep divergences upper bounds.
    pub fn pessimistic_estimate(&self) -> bool {
        self.pessimistic_estimate
    }

    /// The epsilon-hockey stick divergence between mu_upper and
    /// mu_lower; the delta for which the mechanism is
    /// (epsilon, delta)-DP.
    pub fn get_delta_for_epsilon(&self, epsilon: f64) -> f64 {
        let mut divergence = self.infinity_mass;
        for (&bucket, &mass) in &self.rounded_probability_mass_function {
            let value = bucket as f64 * self.value_discretization_interval;
            if value > epsilon && mass > 0.0 {
                divergence += (1.0 - (epsilon - value).exp()) * mass;
            }
        }
        divergence
    }

    /// The smallest non-negative epsilon for which the hockey stick
    /// divergence is at most `delta`, or infinity when none exists.
    pub fn get_epsilon_for_delta(&self, delta: f64) -> f64 {
        if self.infinity_mass > delta {
            return f64::INFINITY;
        }

        let mut mass_upper = self.infinity_mass;
        let mut mass_lower = 0.0;

        let mut buckets: Vec<i64> = self
            .rounded_probability_mass_function
            .keys()
            .copied()
            .collect();
        buckets.sort_unstable();

        for &bucket in buckets.iter().rev() {
            let value = bucket as f64 * self.value_discretization_interval;

            if mass_upper > delta
                && mass_lower > 0.0
                && ((mass_upper - delta) / mass_lower).ln() >= value
            {
                // The answer is at least `value`; buckets below cannot
                // lower it any further.
                break;
            }

            let mass = self.rounded_probability_mass_function[&bucket];
            mass_upper += mass;
            mass_lower += (-value).exp() * mass;

            if mass_upper >= delta && mass_lower == 0.0 {
                // exp(-value) underflowed to zero, so the bucket value
                // itself is the tightest claim available.
                return value.max(0.0);
            }
        }

        if mass_upper <= mass_lower + delta {
            0.0
        } else {
            ((mass_upper - delta) / mass_lower).ln()
        }
    }

    /// Compose with another PLD.
    ///
    /// Both distributions must share the discretization interval and the
    /// estimate type. The mass functions are convolved with tails
    /// trimmed by up to `tail_mass_truncation`; under a pessimistic
    /// estimate the trimmed mass is folded into `infinity_mass` so that
    /// the result stays an upper bound.
    pub fn compose(&self, other: &Self, tail_mass_truncation: f64) -> Result<Self> {
        if self.value_discretization_interval != other.value_discretization_interval {
            return Err(AccountingError::incompatible(format!(
                "discretization intervals differ: {} vs {}",
                self.value_discretization_interval, other.value_discretization_interval
            )));
        }
        if self.pessimistic_estimate != other.pessimistic_estimate {
            return Err(AccountingError::incompatible(
                "one distribution is pessimistic and the other optimistic",
            ));
        }

        let rounded_probability_mass_function = convolve(
            &self.rounded_probability_mass_function,
            &other.rounded_probability_mass_function,
            tail_mass_truncation,
        );

        // Probability that at least one of the two losses is infinite.
        let mut infinity_mass =
            self.infinity_mass + other.infinity_mass - self.infinity_mass * other.infinity_mass;
        if self.pessimistic_estimate {
            infinity_mass += tail_mass_truncation;
        }

        Ok(Self {
            rounded_probability_mass_function,
            value_discretization_interval: self.value_discretization_interval,
            infinity_mass,
            pessimistic_estimate: self.pessimistic_estimate,
        })
    }

    /// Compose the PLD with itself `num_times` times.
    ///
    /// The mass function is self-convolved exactly; only floating-point
    /// error is incurred.
    pub fn self_compose(&self, num_times: u32) -> Self {
        assert!(num_times >= 1, "num_times must be at least 1");

        let rounded_probability_mass_function = self_convolve(
            &self.rounded_probability_mass_function,
            num_times as usize,
        );
        let infinity_mass = 1.0 - (1.0 - self.infinity_mass).powi(num_times as i32);

        Self {
            rounded_probability_mass_function,
            value_discretization_interval: self.value_discretization_interval,
            infinity_mass,
            pessimistic_estimate: self.pessimistic_estimate,
        }
    }
}
