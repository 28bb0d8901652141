use crate::linalg::{self, DMatrix, DVector};

/// Smallest determinant magnitude for which the recurrence system is
/// considered regular. Below this the process is declared non-ergodic.
pub const ERGODICITY_EPSILON: f64 = 1e-3;

/// The output of the mean-recurrence solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    /// Mean recurrence times: `h[(i, j)]` is the expected time to first
    /// reach state `j` starting from state `i`.
    pub h: DMatrix<f64>,
    /// Equilibrium state probabilities, `eq_probs[k] = 1 / h[(k, k)]`.
    pub eq_probs: DVector<f64>,
    /// Whether the chain admits a unique equilibrium. When false, `h` is a
    /// zero matrix and `eq_probs` falls back to the uniform distribution.
    pub ergodic: bool,
}

impl Recurrence {
    fn degenerate(states: usize) -> Self {
        Self {
            h: linalg::zeros(states, states),
            eq_probs: DVector::from_element(states, 1.0 / (states as f64)),
            ergodic: false,
        }
    }
}

/// Computes the mean-recurrence matrix `H` and the equilibrium distribution
/// of the provided one-step transition matrix.
///
/// The solver partitions `P`, derives the equilibrium row vector `w` from
/// the subsystem `w_k = -P_u (P_k - I)^{-1}`, builds the fundamental matrix
/// `Z = (I - P + W)^{-1}` where every row of `W` equals `w`, and reads the
/// recurrence times off `Z`. A singular subsystem means the chain is not
/// ergodic: the solver warns and degrades to a zero `H`.
pub fn mean_recurrence(p: &DMatrix<f64>) -> Recurrence {
    let k = p.nrows();
    if k == 0 {
        return Recurrence {
            h: linalg::zeros(0, 0),
            eq_probs: DVector::zeros(0),
            ergodic: false,
        };
    }
    if k == 1 {
        return Recurrence {
            h: linalg::ones(1, 1),
            eq_probs: DVector::from_element(1, 1.0),
            ergodic: true,
        };
    }

    // Partition P with its top-left scalar pivot: P_u is the first row less
    // the pivot, P_k the lower-right (K-1)x(K-1) block.
    let others: Vec<usize> = (1..k).collect();
    let p_u = linalg::submatrix(p, &[0], &others);
    let p_k = linalg::submatrix(p, &others, &others);

    let a = &p_k - linalg::eye(k - 1);
    let det_a = linalg::det(&a);
    if det_a.abs() < ERGODICITY_EPSILON {
        warn!(
            "non-ergodic process: |det(P_k - I)| = {:.3e} < {:.0e}, mean recurrence zeroed",
            det_a.abs(),
            ERGODICITY_EPSILON
        );
        return Recurrence::degenerate(k);
    }

    let a_inv = match linalg::inv(&a) {
        Some(inv) => inv,
        None => {
            warn!("non-ergodic process: recurrence subsystem is singular");
            return Recurrence::degenerate(k);
        }
    };

    // w = [1, -P_u A^{-1}], renormalized to sum 1.
    let w_k = -(&p_u * &a_inv);
    let mut w = DVector::zeros(k);
    w[0] = 1.0;
    for j in 1..k {
        w[j] = w_k[(0, j - 1)];
    }
    let total: f64 = w.iter().sum();
    w /= total;

    // Fundamental matrix Z = (I - P + W)^{-1}, W has every row equal to w.
    let mut w_mat = linalg::zeros(k, k);
    for i in 0..k {
        for j in 0..k {
            w_mat[(i, j)] = w[j];
        }
    }
    let z = match linalg::inv(&(linalg::eye(k) - p + &w_mat)) {
        Some(z) => z,
        None => {
            warn!("non-ergodic process: fundamental matrix is singular");
            return Recurrence::degenerate(k);
        }
    };

    let mut h = linalg::zeros(k, k);
    for i in 0..k {
        for j in 0..k {
            h[(i, j)] = if i == j {
                1.0 / w[j]
            } else {
                (z[(j, j)] - z[(i, j)]) / w[j]
            };
        }
    }

    let eq_probs = DVector::from_iterator(k, (0..k).map(|i| 1.0 / h[(i, i)]));
    Recurrence {
        h,
        eq_probs,
        ergodic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::from_rows;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_state_chain() {
        let p = from_rows(&[vec![1.0]]).unwrap();
        let rec = mean_recurrence(&p);
        assert!(rec.ergodic);
        assert_eq!(rec.h[(0, 0)], 1.0);
        assert_eq!(rec.eq_probs[0], 1.0);
    }

    #[test]
    fn symmetric_two_state_chain() {
        let p = from_rows(&[vec![0.5, 0.5], vec![0.5, 0.5]]).unwrap();
        let rec = mean_recurrence(&p);
        assert!(rec.ergodic);
        assert_abs_diff_eq!(rec.eq_probs[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(rec.h[(0, 0)], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rec.h[(1, 1)], 2.0, epsilon = 1e-12);
    }
}
