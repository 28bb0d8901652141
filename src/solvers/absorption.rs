use crate::linalg::{self, DMatrix, DVector};

/// First-absorption quantities for the transient states of a chain.
///
/// Empty when the chain has no absorbing state or no transient state.
#[derive(Debug, Clone, PartialEq)]
pub struct Absorption {
    /// Expected time to absorption from each transient state.
    pub times: DVector<f64>,
    /// Probability of ending in each absorbing state, one row per transient
    /// state. Rows sum to one.
    pub probs: DMatrix<f64>,
    /// One-based labels of the absorbing states, for downstream consumption.
    /// The engine itself indexes states from zero.
    pub states: Vec<usize>,
}

impl Absorption {
    /// An empty result, used when the transient/absorbing partition is trivial.
    pub fn none() -> Self {
        Self {
            times: DVector::zeros(0),
            probs: linalg::zeros(0, 0),
            states: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Computes expected first-absorption times and destination probabilities.
///
/// A state `k` is absorbing when `P[k][k] = 1`. With `Q` the transient
/// submatrix and `R` the transient-to-absorbing block, the fundamental
/// matrix is `N = (I - Q)^{-1}`, the absorption times `N 1` and the
/// destination probabilities `N R`.
pub fn first_absorption(p: &DMatrix<f64>) -> Absorption {
    let k = p.nrows();
    let absorbing: Vec<usize> = (0..k).filter(|&i| (p[(i, i)] - 1.0).abs() < 1e-12).collect();
    let transient: Vec<usize> = (0..k).filter(|i| !absorbing.contains(i)).collect();

    if absorbing.is_empty() || transient.is_empty() {
        return Absorption::none();
    }

    let q = linalg::submatrix(p, &transient, &transient);
    let r = linalg::submatrix(p, &transient, &absorbing);

    let n = match linalg::inv(&(linalg::eye(transient.len()) - q)) {
        Some(n) => n,
        None => {
            warn!("absorption system is singular, returning empty result");
            return Absorption::none();
        }
    };

    let times = &n * DVector::from_element(transient.len(), 1.0);
    let probs = &n * r;

    Absorption {
        times,
        probs,
        states: absorbing.iter().map(|&i| i + 1).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::from_rows;

    #[test]
    fn no_absorbing_state() {
        let p = from_rows(&[vec![0.5, 0.5], vec![0.5, 0.5]]).unwrap();
        assert!(first_absorption(&p).is_empty());
    }

    #[test]
    fn all_states_absorbing() {
        let p = from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert!(first_absorption(&p).is_empty());
    }
}
