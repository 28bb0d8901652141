/*!
Statistical accumulators and maximum-likelihood estimators.

These are pure functions over the counters the stepper owns: the stationary
correlation seeded by the from-initial-to-current counts, the coherence time
integrated from it, the count-frequency histogram, and the batch MLEs for
transition probabilities and holding times.
*/

use crate::linalg::{self, DMatrix};
use serde_derive::Serialize;
use std::fmt;

/// The Gaussian-mixture estimator.
pub mod em;

pub use self::em::{fit_mixture, MixtureComponent};

/// Builds the zero-mean integer labeling used as the correlation variate:
/// `[0, +1, -1, +2, -2, ...]` for odd `K`, `[+1, -1, +2, -2, ...]` for even.
pub fn zero_mean_labels(states: usize) -> Vec<i32> {
    let mut map = Vec::with_capacity(states);
    if states % 2 == 1 {
        map.push(0);
    }
    let mut magnitude = 1;
    while map.len() < states {
        map.push(magnitude);
        if map.len() < states {
            map.push(-magnitude);
        }
        magnitude += 1;
    }
    map
}

/// The stationary correlation statistic at the current step:
/// `sum_ij map[i] map[j] N0[i][j] / samples`, or one before any member has
/// been observed.
pub fn stat_corr(map: &[i32], n0: &DMatrix<f64>, samples: f64) -> f64 {
    if samples <= 0.0 {
        return 1.0;
    }
    let mut cor = 0.0;
    for (i, &mi) in map.iter().enumerate() {
        for (j, &mj) in map.iter().enumerate() {
            cor += (mi as f64) * (mj as f64) * n0[(i, j)] / samples;
        }
    }
    cor
}

/// Integrated coherence time
/// `Tc = (dt / (2 gamma[0])) * sum |gamma[tau]| (1 - tau/T)`.
pub fn coherence_time(gamma: &[f64], dt: f64) -> f64 {
    if gamma.is_empty() || gamma[0] == 0.0 {
        return 0.0;
    }
    let t_len = gamma.len() as f64;
    let weighted: f64 = gamma
        .iter()
        .enumerate()
        .map(|(tau, g)| g.abs() * (1.0 - (tau as f64) / t_len))
        .sum();
    dt / (2.0 * gamma[0]) * weighted
}

/// Count-frequency histogram: `F[m]` is the number of members whose
/// accumulated count floors to `m`. Length `floor(max) + 1`.
pub fn count_frequencies(counts: &[f64]) -> Vec<u64> {
    if counts.is_empty() {
        return Vec::new();
    }
    let top = crate::utils::max(counts);
    let mut freq = vec![0u64; (top.floor() as usize) + 1];
    for &c in counts {
        if c >= 0.0 {
            freq[c.floor() as usize] += 1;
        }
    }
    freq
}

/// Normalizes a frequency histogram into probabilities.
pub fn count_probabilities(freq: &[u64]) -> Vec<f64> {
    let total: u64 = freq.iter().sum();
    if total == 0 {
        return vec![0.0; freq.len()];
    }
    freq.iter().map(|&f| (f as f64) / (total as f64)).collect()
}

/// Holding-time MLE: accumulated holding over jump count per `(from, to)`.
/// The diagonal is zero, as is any cell without observations.
pub fn holding_time_mle(cum_h: &DMatrix<f64>, cum_n: &DMatrix<f64>) -> DMatrix<f64> {
    let k = cum_h.nrows();
    let mut mle = linalg::zeros(k, k);
    for i in 0..k {
        for j in 0..k {
            if i != j && cum_n[(i, j)] > 0.0 {
                mle[(i, j)] = cum_h[(i, j)] / cum_n[(i, j)];
            }
        }
    }
    mle
}

/// Transition-probability MLE: each row of the one-step counts normalized
/// by its sum. A row with no observed jumps degrades to zeros.
pub fn transition_mle(n1: &DMatrix<f64>) -> DMatrix<f64> {
    let k = n1.nrows();
    let mut mle = linalg::zeros(k, k);
    for i in 0..k {
        let total: f64 = n1.row(i).iter().sum();
        if total > 0.0 {
            for j in 0..k {
                mle[(i, j)] = n1[(i, j)] / total;
            }
        }
    }
    mle
}

/// Relative error of the estimated `P[0][0]` against the declared one, or
/// zero when no comparison is possible.
pub fn relative_error(mle: &DMatrix<f64>, p: &DMatrix<f64>) -> f64 {
    if p.nrows() == 0 || mle.nrows() == 0 || p[(0, 0)] == 0.0 {
        return 0.0;
    }
    (mle[(0, 0)] - p[(0, 0)]).abs() / p[(0, 0)]
}

/// The end-of-run statistics block.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub mle_holding_times: Vec<Vec<f64>>,
    pub rel_error: f64,
    pub count_freq: Vec<u64>,
    pub mle_em_probs: Vec<MixtureComponent>,
    pub mle_tr_probs: Vec<Vec<f64>>,
    pub tr_counts: Vec<Vec<f64>>,
    pub mean_count: f64,
    pub coherence_time: f64,
    pub coherence_intervals: f64,
    pub correlation_0lag: f64,
    pub mean_intensity: f64,
    pub degeneracy_param: f64,
    pub snr: f64,
}

impl RunStats {
    /// Derives the summary scalars from the elapsed window `T` and the mean
    /// accumulated count `Kbar`: the number of coherence intervals
    /// `M = T/Tc`, the degeneracy `delta = Kbar/M` and the signal-to-noise
    /// ratio `sqrt(Kbar / (1 + delta))`.
    pub fn summarize(kbar: f64, elapsed: f64, tc: f64) -> (f64, f64, f64, f64) {
        let intervals = if tc > 0.0 { elapsed / tc } else { 0.0 };
        let degeneracy = if intervals > 0.0 { kbar / intervals } else { 0.0 };
        let snr = (kbar / (1.0 + degeneracy)).sqrt();
        let intensity = if elapsed > 0.0 { kbar / elapsed } else { 0.0 };
        (intervals, degeneracy, snr, intensity)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "mean count          {:.4}", self.mean_count)?;
        writeln!(f, "mean intensity      {:.4}", self.mean_intensity)?;
        writeln!(f, "coherence time      {:.4}", self.coherence_time)?;
        writeln!(f, "coherence intervals {:.4}", self.coherence_intervals)?;
        writeln!(f, "degeneracy          {:.4}", self.degeneracy_param)?;
        writeln!(f, "snr                 {:.4}", self.snr)?;
        write!(f, "relative error      {:.4}", self.rel_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::from_rows;

    #[test]
    fn labels_are_zero_mean() {
        for k in 1..8 {
            let map = zero_mean_labels(k);
            assert_eq!(map.len(), k);
            assert_eq!(map.iter().sum::<i32>(), 0);
        }
        assert_eq!(zero_mean_labels(5), vec![0, 1, -1, 2, -2]);
        assert_eq!(zero_mean_labels(4), vec![1, -1, 2, -2]);
    }

    #[test]
    fn stat_corr_before_any_sample() {
        let n0 = from_rows(&[vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
        assert_eq!(stat_corr(&[1, -1], &n0, 0.0), 1.0);
    }

    #[test]
    fn perfectly_correlated_ensemble() {
        // All members started in 0 and still sit in 0.
        let n0 = from_rows(&[vec![10.0, 0.0], vec![0.0, 0.0]]).unwrap();
        assert_eq!(stat_corr(&[1, -1], &n0, 10.0), 1.0);
    }

    #[test]
    fn histogram_length_tracks_max() {
        let freq = count_frequencies(&[0.0, 1.2, 3.9, 3.0]);
        assert_eq!(freq.len(), 4);
        assert_eq!(freq, vec![1, 1, 0, 2]);
    }

    #[test]
    fn transition_mle_rows_sum_to_one() {
        let n1 = from_rows(&[vec![30.0, 10.0], vec![0.0, 0.0]]).unwrap();
        let mle = transition_mle(&n1);
        assert!((mle[(0, 0)] - 0.75).abs() < 1e-12);
        // No observations from state 1: the row degrades to zeros.
        assert_eq!(mle[(1, 0)], 0.0);
        assert_eq!(mle[(1, 1)], 0.0);
    }

    #[test]
    fn holding_mle_skips_empty_cells() {
        let cum_h = from_rows(&[vec![0.0, 6.0], vec![0.0, 0.0]]).unwrap();
        let cum_n = from_rows(&[vec![0.0, 3.0], vec![0.0, 0.0]]).unwrap();
        let mle = holding_time_mle(&cum_h, &cum_n);
        assert_eq!(mle[(0, 1)], 2.0);
        assert_eq!(mle[(1, 0)], 0.0);
    }
}
