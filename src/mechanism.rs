//! Additive-noise mechanisms and their privacy loss descriptions.
//!
//! An additive noise mechanism outputs the true value of a scalar
//! function plus noise drawn from a fixed distribution. Writing mu_upper
//! for the noise distribution and mu_lower for the same distribution
//! shifted by the sensitivity, the privacy loss at a noise value x is
//! ln(mu_upper(x) / mu_lower(x)), a deterministic non-increasing
//! function of x. Each implementation here exposes the pieces needed to
//! discretize that loss into a privacy loss distribution.

use statrs::distribution::{ContinuousCDF, Laplace, Normal};

use crate::error::{AccountingError, Result};

/// Tail behavior of a privacy loss outside a truncation interval.
#[derive(Clone, Debug)]
pub struct TailPrivacyLossDistribution {
    /// Noise values below this point are covered by the tail entries.
    pub lower_x_truncation: f64,
    /// Noise values above this point are covered by the tail entries.
    pub upper_x_truncation: f64,
    /// `(privacy_loss, mass)` pairs accounting for the tails; a loss of
    /// `f64::INFINITY` marks mass with unbounded privacy loss.
    pub tail_probability_mass_function: Vec<(f64, f64)>,
}

/// Privacy loss description of an additive noise mechanism.
///
/// `privacy_loss` must be non-increasing in the noise value, and
/// `inverse_privacy_loss(loss)` must return the largest x at which the
/// privacy loss is at least `loss` (positive or negative infinity when
/// every or no x qualifies).
pub trait AdditiveNoisePrivacyLoss {
    /// Privacy loss at noise value `x`.
    fn privacy_loss(&self, x: f64) -> f64;

    /// The largest `x` whose privacy loss is at least `privacy_loss`.
    fn inverse_privacy_loss(&self, privacy_loss: f64) -> f64;

    /// CDF of the noise distribution, evaluated at each point of `xs`.
    fn noise_cdf(&self, xs: &[f64]) -> Vec<f64>;

    /// Whether the noise is integer-valued.
    fn discrete_noise(&self) -> bool;

    /// Tail description outside the truncation interval.
    fn privacy_loss_tail(&self) -> TailPrivacyLossDistribution;
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AccountingError::invalid(format!(
            "{name} must be positive and finite: {value}"
        )))
    }
}

/// Privacy loss of the Laplace mechanism with noise `Lap(0, parameter)`.
#[derive(Clone, Debug)]
pub struct LaplacePrivacyLoss {
    parameter: f64,
    sensitivity: f64,
    laplace: Laplace,
}

impl LaplacePrivacyLoss {
    /// Create the privacy loss of a Laplace mechanism.
    pub fn new(parameter: f64, sensitivity: f64) -> Result<Self> {
        check_positive("parameter", parameter)?;
        check_positive("sensitivity", sensitivity)?;
        let laplace = Laplace::new(0.0, parameter)
            .map_err(|e| AccountingError::invalid(format!("laplace noise: {e}")))?;
        Ok(Self {
            parameter,
            sensitivity,
            laplace,
        })
    }
}

impl AdditiveNoisePrivacyLoss for LaplacePrivacyLoss {
    fn privacy_loss(&self, x: f64) -> f64 {
        ((x - self.sensitivity).abs() - x.abs()) / self.parameter
    }

    fn inverse_privacy_loss(&self, privacy_loss: f64) -> f64 {
        let bound = self.sensitivity / self.parameter;
        if privacy_loss > bound {
            return f64::NEG_INFINITY;
        }
        if privacy_loss <= -bound {
            return f64::INFINITY;
        }
        0.5 * (self.sensitivity - privacy_loss * self.parameter)
    }

    fn noise_cdf(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.laplace.cdf(x)).collect()
    }

    fn discrete_noise(&self) -> bool {
        false
    }

    fn privacy_loss_tail(&self) -> TailPrivacyLossDistribution {
        // The loss is constant outside [0, sensitivity], so both tails
        // are exact point masses.
        let bound = self.sensitivity / self.parameter;
        TailPrivacyLossDistribution {
            lower_x_truncation: 0.0,
            upper_x_truncation: self.sensitivity,
            tail_probability_mass_function: vec![
                (bound, self.laplace.cdf(0.0)),
                (-bound, 1.0 - self.laplace.cdf(self.sensitivity)),
            ],
        }
    }
}

/// Privacy loss of the Gaussian mechanism with noise `N(0, sd^2)`.
#[derive(Clone, Debug)]
pub struct GaussianPrivacyLoss {
    sensitivity: f64,
    pessimistic_estimate: bool,
    log_mass_truncation_bound: f64,
    normal: Normal,
    variance: f64,
}

impl GaussianPrivacyLoss {
    /// Create the privacy loss of a Gaussian mechanism.
    ///
    /// `log_mass_truncation_bound` is the natural log of the total noise
    /// mass that may be pushed into the tails; it must be non-positive.
    pub fn new(
        standard_deviation: f64,
        sensitivity: f64,
        pessimistic_estimate: bool,
        log_mass_truncation_bound: f64,
    ) -> Result<Self> {
        check_positive("standard_deviation", standard_deviation)?;
        check_positive("sensitivity", sensitivity)?;
        if log_mass_truncation_bound > 0.0 {
            return Err(AccountingError::invalid(format!(
                "log_mass_truncation_bound must be non-positive: {log_mass_truncation_bound}"
            )));
        }
        let normal = Normal::new(0.0, standard_deviation)
            .map_err(|e| AccountingError::invalid(format!("gaussian noise: {e}")))?;
        Ok(Self {
            sensitivity,
            pessimistic_estimate,
            log_mass_truncation_bound,
            normal,
            variance: standard_deviation * standard_deviation,
        })
    }
}

impl AdditiveNoisePrivacyLoss for GaussianPrivacyLoss {
    fn privacy_loss(&self, x: f64) -> f64 {
        self.sensitivity * (0.5 * self.sensitivity - x) / self.variance
    }

    fn inverse_privacy_loss(&self, privacy_loss: f64) -> f64 {
        0.5 * self.sensitivity - privacy_loss * self.variance / self.sensitivity
    }

    fn noise_cdf(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.normal.cdf(x)).collect()
    }

    fn discrete_noise(&self) -> bool {
        false
    }

    fn privacy_loss_tail(&self) -> TailPrivacyLossDistribution {
        let tail_mass = 0.5 * self.log_mass_truncation_bound.exp();
        let lower_x_truncation = self.normal.inverse_cdf(tail_mass);
        let upper_x_truncation = -lower_x_truncation;

        let mut tail_pmf = Vec::new();
        if self.pessimistic_estimate {
            // The low tail carries losses above the truncated range;
            // rounding it up means treating it as infinite. The high
            // tail is rounded up to its boundary loss.
            tail_pmf.push((f64::INFINITY, self.normal.cdf(lower_x_truncation)));
            tail_pmf.push((
                self.privacy_loss(upper_x_truncation),
                1.0 - self.normal.cdf(upper_x_truncation),
            ));
        } else {
            // Rounding down maps the low tail to its boundary loss and
            // discards the high tail entirely.
            tail_pmf.push((
                self.privacy_loss(lower_x_truncation),
                self.normal.cdf(lower_x_truncation),
            ));
        }

        TailPrivacyLossDistribution {
            lower_x_truncation,
            upper_x_truncation,
            tail_probability_mass_function: tail_pmf,
        }
    }
}

/// Privacy loss of the discrete Laplace mechanism, whose integer noise
/// has mass proportional to `exp(-parameter * |x|)`.
#[derive(Clone, Debug)]
pub struct DiscreteLaplacePrivacyLoss {
    parameter: f64,
    sensitivity: i64,
}

impl DiscreteLaplacePrivacyLoss {
    /// Create the privacy loss of a discrete Laplace mechanism.
    pub fn new(parameter: f64, sensitivity: i64) -> Result<Self> {
        check_positive("parameter", parameter)?;
        if sensitivity < 1 {
            return Err(AccountingError::invalid(format!(
                "sensitivity must be a positive integer: {sensitivity}"
            )));
        }
        Ok(Self {
            parameter,
            sensitivity,
        })
    }

    fn cdf(&self, x: f64) -> f64 {
        let k = x.floor();
        let t = (-self.parameter).exp();
        if k < 0.0 {
            (self.parameter * k).exp() / (1.0 + t)
        } else {
            1.0 - (-self.parameter * (k + 1.0)).exp() / (1.0 + t)
        }
    }
}

impl AdditiveNoisePrivacyLoss for DiscreteLaplacePrivacyLoss {
    fn privacy_loss(&self, x: f64) -> f64 {
        let s = self.sensitivity as f64;
        self.parameter * ((x - s).abs() - x.abs())
    }

    fn inverse_privacy_loss(&self, privacy_loss: f64) -> f64 {
        let s = self.sensitivity as f64;
        let bound = self.parameter * s;
        if privacy_loss > bound {
            return f64::NEG_INFINITY;
        }
        if privacy_loss <= -bound {
            return f64::INFINITY;
        }
        (0.5 * (s - privacy_loss / self.parameter)).floor()
    }

    fn noise_cdf(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.cdf(x)).collect()
    }

    fn discrete_noise(&self) -> bool {
        true
    }

    fn privacy_loss_tail(&self) -> TailPrivacyLossDistribution {
        // The loss is constant at +-parameter*sensitivity outside
        // [1, sensitivity - 1], so both tails are exact point masses.
        let s = self.sensitivity as f64;
        let bound = self.parameter * s;
        TailPrivacyLossDistribution {
            lower_x_truncation: 1.0,
            upper_x_truncation: s - 1.0,
            tail_probability_mass_function: vec![
                (bound, self.cdf(0.0)),
                (-bound, 1.0 - self.cdf(s - 1.0)),
            ],
        }
    }
}

/// Privacy loss of the discrete Gaussian mechanism, whose integer noise
/// has mass proportional to `exp(-x^2 / (2 sigma^2))` truncated to
/// `[-truncation_bound, truncation_bound]`.
#[derive(Clone, Debug)]
pub struct DiscreteGaussianPrivacyLoss {
    sigma: f64,
    sensitivity: i64,
    truncation_bound: i64,
    cumulative_mass: Vec<f64>,
}

impl DiscreteGaussianPrivacyLoss {
    /// Create the privacy loss of a discrete Gaussian mechanism.
    ///
    /// When `truncation_bound` is not given, it is chosen so that the
    /// noise mass outside the kept range is at most 1e-30.
    pub fn new(sigma: f64, sensitivity: i64, truncation_bound: Option<i64>) -> Result<Self> {
        check_positive("sigma", sigma)?;
        if sensitivity < 1 {
            return Err(AccountingError::invalid(format!(
                "sensitivity must be a positive integer: {sensitivity}"
            )));
        }
        // exp(-11.6^2 / 2) < 1e-29, so 11.6 sigma leaves under 1e-30
        // of mass outside the bound.
        let truncation_bound = truncation_bound.unwrap_or_else(|| (11.6 * sigma).ceil() as i64);
        if truncation_bound < sensitivity {
            return Err(AccountingError::invalid(format!(
                "truncation_bound must be at least the sensitivity: \
                 {truncation_bound} < {sensitivity}"
            )));
        }

        let masses: Vec<f64> = (-truncation_bound..=truncation_bound)
            .map(|x| (-(x as f64) * (x as f64) / (2.0 * sigma * sigma)).exp())
            .collect();
        let total: f64 = masses.iter().sum();
        let mut cumulative_mass = Vec::with_capacity(masses.len());
        let mut acc = 0.0;
        for mass in masses {
            acc += mass / total;
            cumulative_mass.push(acc);
        }

        Ok(Self {
            sigma,
            sensitivity,
            truncation_bound,
            cumulative_mass,
        })
    }

    /// The truncation bound in use (the default when none was given).
    pub fn truncation_bound(&self) -> i64 {
        self.truncation_bound
    }

    fn cdf(&self, x: f64) -> f64 {
        let bound = self.truncation_bound as f64;
        if x < -bound {
            return 0.0;
        }
        if x >= bound {
            return 1.0;
        }
        let index = (x.floor() as i64 + self.truncation_bound) as usize;
        self.cumulative_mass[index]
    }
}

impl AdditiveNoisePrivacyLoss for DiscreteGaussianPrivacyLoss {
    fn privacy_loss(&self, x: f64) -> f64 {
        let s = self.sensitivity as f64;
        if x < s - self.truncation_bound as f64 {
            // The shifted distribution has no support here.
            return f64::INFINITY;
        }
        s * (0.5 * s - x) / (self.sigma * self.sigma)
    }

    fn inverse_privacy_loss(&self, privacy_loss: f64) -> f64 {
        let s = self.sensitivity as f64;
        (0.5 * s - privacy_loss * self.sigma * self.sigma / s).floor()
    }

    fn noise_cdf(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.cdf(x)).collect()
    }

    fn discrete_noise(&self) -> bool {
        true
    }

    fn privacy_loss_tail(&self) -> TailPrivacyLossDistribution {
        let s = self.sensitivity as f64;
        let bound = self.truncation_bound as f64;
        TailPrivacyLossDistribution {
            lower_x_truncation: s - bound,
            upper_x_truncation: bound,
            tail_probability_mass_function: vec![(f64::INFINITY, self.cdf(s - bound - 1.0))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn laplace_privacy_loss_is_piecewise_linear() {
        let loss = LaplacePrivacyLoss::new(1.0, 1.0).expect("valid params");
        assert_close(loss.privacy_loss(-1.0), 1.0);
        assert_close(loss.privacy_loss(0.0), 1.0);
        assert_close(loss.privacy_loss(0.5), 0.0);
        assert_close(loss.privacy_loss(1.0), -1.0);
        assert_close(loss.privacy_loss(2.0), -1.0);
    }

    #[test]
    fn laplace_inverse_privacy_loss() {
        let loss = LaplacePrivacyLoss::new(2.0, 1.0).expect("valid params");
        assert_close(loss.inverse_privacy_loss(0.0), 0.5);
        assert_close(loss.inverse_privacy_loss(0.25), 0.25);
        assert_eq!(loss.inverse_privacy_loss(0.6), f64::NEG_INFINITY);
        assert_eq!(loss.inverse_privacy_loss(-0.5), f64::INFINITY);
    }

    #[test]
    fn laplace_tail_is_exact() {
        let loss = LaplacePrivacyLoss::new(1.0, 1.0).expect("valid params");
        let tail = loss.privacy_loss_tail();
        assert_close(tail.lower_x_truncation, 0.0);
        assert_close(tail.upper_x_truncation, 1.0);
        assert_close(tail.tail_probability_mass_function[0].0, 1.0);
        assert_close(tail.tail_probability_mass_function[0].1, 0.5);
        assert_close(tail.tail_probability_mass_function[1].0, -1.0);
        assert_close(
            tail.tail_probability_mass_function[1].1,
            0.5 * (-1.0f64).exp(),
        );
    }

    #[test]
    fn gaussian_privacy_loss_is_linear() {
        let loss = GaussianPrivacyLoss::new(1.0, 1.0, true, -50.0).expect("valid params");
        assert_close(loss.privacy_loss(0.0), 0.5);
        assert_close(loss.privacy_loss(0.5), 0.0);
        assert_close(loss.inverse_privacy_loss(0.5), 0.0);
        assert_close(loss.inverse_privacy_loss(-1.5), 2.0);
    }

    #[test]
    fn gaussian_tail_mass_matches_truncation_bound() {
        let loss = GaussianPrivacyLoss::new(1.0, 1.0, true, -50.0).expect("valid params");
        let tail = loss.privacy_loss_tail();
        assert!(tail.lower_x_truncation < 0.0);
        assert_close(tail.upper_x_truncation, -tail.lower_x_truncation);
        let (infinite_loss, mass) = tail.tail_probability_mass_function[0];
        assert_eq!(infinite_loss, f64::INFINITY);
        assert!((mass - 0.5 * (-50.0f64).exp()).abs() < 1e-25);
    }

    #[test]
    fn gaussian_optimistic_tail_has_single_entry() {
        let loss = GaussianPrivacyLoss::new(1.0, 1.0, false, -50.0).expect("valid params");
        let tail = loss.privacy_loss_tail();
        assert_eq!(tail.tail_probability_mass_function.len(), 1);
        assert!(tail.tail_probability_mass_function[0].0.is_finite());
    }

    #[test]
    fn discrete_laplace_cdf_closed_form() {
        let loss = DiscreteLaplacePrivacyLoss::new(1.0, 1).expect("valid params");
        let t = (-1.0f64).exp();
        assert_close(loss.cdf(0.0), 1.0 / (1.0 + t));
        assert_close(loss.cdf(-1.0), t / (1.0 + t));
        // P(X = 0) follows from consecutive CDF values.
        assert_close(loss.cdf(0.0) - loss.cdf(-1.0), (1.0 - t) / (1.0 + t));
        // The CDF is a step function between integers.
        assert_close(loss.cdf(0.7), loss.cdf(0.0));
    }

    #[test]
    fn discrete_laplace_privacy_loss_values() {
        let loss = DiscreteLaplacePrivacyLoss::new(0.5, 2).expect("valid params");
        assert_close(loss.privacy_loss(0.0), 1.0);
        assert_close(loss.privacy_loss(1.0), 0.0);
        assert_close(loss.privacy_loss(2.0), -1.0);
        assert_close(loss.inverse_privacy_loss(0.0), 1.0);
    }

    #[test]
    fn discrete_gaussian_mass_table_is_normalized() {
        let loss = DiscreteGaussianPrivacyLoss::new(1.0, 1, Some(2)).expect("valid params");
        assert_close(loss.cdf(2.0), 1.0);
        assert_close(loss.cdf(-3.0), 0.0);
        // Symmetry of the noise: P(X <= -1) = P(X >= 1).
        assert_close(loss.cdf(-1.0), 1.0 - loss.cdf(0.0));
    }

    #[test]
    fn discrete_gaussian_loss_is_infinite_below_shifted_support() {
        let loss = DiscreteGaussianPrivacyLoss::new(1.0, 1, Some(2)).expect("valid params");
        assert_eq!(loss.privacy_loss(-2.0), f64::INFINITY);
        assert_close(loss.privacy_loss(-1.0), 1.5);
        let tail = loss.privacy_loss_tail();
        assert_close(tail.lower_x_truncation, -1.0);
        assert_close(tail.upper_x_truncation, 2.0);
    }

    #[test]
    fn discrete_gaussian_default_truncation_bound() {
        let loss = DiscreteGaussianPrivacyLoss::new(2.0, 1, None).expect("valid params");
        assert_eq!(loss.truncation_bound(), 24);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(LaplacePrivacyLoss::new(0.0, 1.0).is_err());
        assert!(LaplacePrivacyLoss::new(1.0, -1.0).is_err());
        assert!(GaussianPrivacyLoss::new(-1.0, 1.0, true, -50.0).is_err());
        assert!(GaussianPrivacyLoss::new(1.0, 1.0, true, 1.0).is_err());
        assert!(DiscreteLaplacePrivacyLoss::new(1.0, 0).is_err());
        assert!(DiscreteGaussianPrivacyLoss::new(1.0, 3, Some(2)).is_err());
    }
}
