//! Sparse/dense probability-mass conversion and FFT-based convolution.
//!
//! Probability mass functions over privacy loss buckets are kept as
//! sparse integer-keyed maps. Convolution packs them into dense arrays,
//! multiplies in the frequency domain, and unpacks the result with
//! symmetric tail trimming. After a few compositions the dense arrays
//! span thousands of buckets, so the transform-based product is the only
//! affordable route.

use std::collections::HashMap;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Pack an integer-keyed probability mass function into a dense array.
///
/// Returns the minimum key as the offset, together with a contiguous
/// array where index `k` holds the mass at key `offset + k` (zero for
/// absent keys).
///
/// # Panics
///
/// Panics when `pmf` is empty; an empty mass function is a precondition
/// violation, not a recoverable condition.
pub fn to_dense(pmf: &HashMap<i64, f64>) -> (i64, Vec<f64>) {
    assert!(!pmf.is_empty(), "probability mass function must not be empty");

    let (offset, max_key) = pmf
        .keys()
        .fold((i64::MAX, i64::MIN), |(lo, hi), &key| {
            (lo.min(key), hi.max(key))
        });

    let mut values = vec![0.0_f64; (max_key - offset + 1) as usize];
    for (&key, &mass) in pmf {
        values[(key - offset) as usize] = mass;
    }
    (offset, values)
}

/// Unpack a dense array into a sparse mapping, trimming the tails.
///
/// Walking inward from each end, mass is accumulated until it exceeds
/// `tail_mass_truncation / 2`; entries outside the two stopping points
/// are dropped, so at most half of the truncation budget is lost per
/// side. Non-positive entries are never retained.
pub fn from_dense(values: &[f64], offset: i64, tail_mass_truncation: f64) -> HashMap<i64, f64> {
    let half_budget = tail_mass_truncation / 2.0;

    let mut lower_index = 0usize;
    let mut lower_mass = 0.0;
    while lower_index < values.len() {
        lower_mass += values[lower_index];
        if lower_mass > half_budget {
            break;
        }
        lower_index += 1;
    }

    let mut upper_index = values.len() as i64 - 1;
    let mut upper_mass = 0.0;
    while upper_index >= 0 {
        upper_mass += values[upper_index as usize];
        if upper_mass > half_budget {
            break;
        }
        upper_index -= 1;
    }

    let mut pmf = HashMap::new();
    if upper_index >= lower_index as i64 {
        for index in lower_index..=upper_index as usize {
            if values[index] > 0.0 {
                pmf.insert(index as i64 + offset, values[index]);
            }
        }
    }
    pmf
}

/// Full linear convolution of two dense arrays via FFT.
fn fft_convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    let output_len = a.len() + b.len() - 1;
    let size = output_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);
    let ifft = planner.plan_fft_inverse(size);

    let mut fa = vec![Complex::new(0.0, 0.0); size];
    let mut fb = vec![Complex::new(0.0, 0.0); size];
    for (slot, &val) in fa.iter_mut().zip(a.iter()) {
        slot.re = val;
    }
    for (slot, &val) in fb.iter_mut().zip(b.iter()) {
        slot.re = val;
    }
    fft.process(&mut fa);
    fft.process(&mut fb);
    for (fa_i, fb_i) in fa.iter_mut().zip(fb.iter()) {
        *fa_i *= *fb_i;
    }
    ifft.process(&mut fa);

    let scale = 1.0 / size as f64;
    fa.iter().take(output_len).map(|c| c.re * scale).collect()
}

/// Convolve two integer-keyed probability mass functions.
///
/// The mass at key `k` of the result is the sum over all `k1 + k2 = k`
/// of `pmf1[k1] * pmf2[k2]`. The tails of the result may be trimmed by
/// up to `tail_mass_truncation` in total.
pub fn convolve(
    pmf1: &HashMap<i64, f64>,
    pmf2: &HashMap<i64, f64>,
    tail_mass_truncation: f64,
) -> HashMap<i64, f64> {
    let (offset1, dense1) = to_dense(pmf1);
    let (offset2, dense2) = to_dense(pmf2);
    let result = fft_convolve(&dense1, &dense2);
    from_dense(&result, offset1 + offset2, tail_mass_truncation)
}

/// Convolve a dense array with itself `num_times` times.
///
/// The transform is raised elementwise to the `num_times`-th power, so
/// the cost is one forward/inverse transform pair regardless of
/// `num_times`. The small imaginary residue left by floating-point
/// round-off is discarded, and the output is truncated to the exact
/// length `num_times * (len - 1) + 1`.
pub fn self_convolve_dense(values: &[f64], num_times: usize) -> Vec<f64> {
    assert!(!values.is_empty(), "input array must not be empty");
    assert!(num_times >= 1, "num_times must be at least 1");

    let output_len = num_times * (values.len() - 1) + 1;
    let size = output_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);
    let ifft = planner.plan_fft_inverse(size);

    let mut buf = vec![Complex::new(0.0, 0.0); size];
    for (slot, &val) in buf.iter_mut().zip(values.iter()) {
        slot.re = val;
    }
    fft.process(&mut buf);
    for slot in buf.iter_mut() {
        *slot = slot.powu(num_times as u32);
    }
    ifft.process(&mut buf);

    let scale = 1.0 / size as f64;
    buf.iter().take(output_len).map(|c| c.re * scale).collect()
}

/// Convolve an integer-keyed probability mass function with itself
/// `num_times` times.
///
/// The resulting offset is `num_times` times the input offset. No tail
/// trimming is applied; this path is exact up to floating-point error.
pub fn self_convolve(pmf: &HashMap<i64, f64>, num_times: usize) -> HashMap<i64, f64> {
    let (offset, dense) = to_dense(pmf);
    from_dense(
        &self_convolve_dense(&dense, num_times),
        offset * num_times as i64,
        0.0,
    )
}
