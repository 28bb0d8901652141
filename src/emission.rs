/*!
Observation emission.

Each discrete state owns a multivariate normal generator. When the state
grid is given as tensor dimensions, the generator means sit at the grid
centres and the covariances are built from a random lower-triangular factor
scaled by the user weights.
*/

use crate::errors::EngineError;
use crate::linalg::{self, DMatrix, DVector};
use crate::utils;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// A multivariate normal sampler backed by the Cholesky factor of its
/// covariance.
#[derive(Debug, Clone)]
pub struct MvNormal {
    pub mu: DVector<f64>,
    lower: DMatrix<f64>,
}

impl MvNormal {
    /// Builds a sampler from a mean vector and covariance matrix.
    ///
    /// A covariance that is only semi-definite gets its diagonal jittered a
    /// few times before the construction is abandoned.
    pub fn new(mu: DVector<f64>, sigma: DMatrix<f64>) -> Result<Self, EngineError> {
        let dim = mu.len();
        if sigma.nrows() != dim || sigma.ncols() != dim {
            return Err(EngineError::Config(format!(
                "covariance is {}x{} but the mean has {} components",
                sigma.nrows(),
                sigma.ncols(),
                dim
            )));
        }
        let mut jitter = 1e-9;
        let mut candidate = sigma;
        for _ in 0..4 {
            if let Some(chol) = candidate.clone().cholesky() {
                return Ok(Self {
                    mu,
                    lower: chol.l(),
                });
            }
            for i in 0..dim {
                candidate[(i, i)] += jitter;
            }
            jitter *= 100.0;
        }
        Err(EngineError::Numeric(
            "covariance is not positive definite".to_string(),
        ))
    }

    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// Draws one observation: `mu + L z` with `z` standard normal.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let dim = self.dim();
        let z = DVector::from_iterator(dim, (0..dim).map(|_| StandardNormal.sample(rng)));
        &self.mu + &self.lower * z
    }
}

/// The per-state emission generators.
#[derive(Debug, Clone)]
pub struct EmissionModel {
    /// Tensor dimensions of the state grid, empty when the model was built
    /// from explicit moments.
    pub dims: Vec<usize>,
    gens: Vec<MvNormal>,
}

impl EmissionModel {
    /// Builds the model from grid dimensions and per-axis weights.
    ///
    /// The state grid is the Cartesian product `[0,dims[0]) x ...`; the mean
    /// of state `k` is its grid point offset to the cell centre, and its
    /// covariance is `(L L^T)` elementwise-scaled by `w w^T`, where `L` is a
    /// random lower-triangular matrix with entries in `[0, 1)`.
    pub fn from_dims<R: Rng>(
        dims: &[usize],
        weights: &[f64],
        rng: &mut R,
    ) -> Result<Self, EngineError> {
        if dims.is_empty() {
            return Err(EngineError::Config("emission dims are empty".to_string()));
        }
        if weights.len() != dims.len() {
            return Err(EngineError::Config(format!(
                "{} emission weights for {} grid dimensions",
                weights.len(),
                dims.len()
            )));
        }
        let rank = dims.len();
        let grid = utils::permutations(dims);
        let mut gens = Vec::with_capacity(grid.len());
        for point in &grid {
            let mu = DVector::from_iterator(rank, point.iter().map(|&d| d as f64 + 0.5));
            let mut lower = linalg::zeros(rank, rank);
            for i in 0..rank {
                for j in 0..=i {
                    lower[(i, j)] = rng.gen::<f64>();
                }
            }
            let base = &lower * lower.transpose();
            let mut sigma = linalg::zeros(rank, rank);
            for i in 0..rank {
                for j in 0..rank {
                    sigma[(i, j)] = base[(i, j)] * weights[i] * weights[j];
                }
            }
            gens.push(MvNormal::new(mu, sigma)?);
        }
        Ok(Self {
            dims: dims.to_vec(),
            gens,
        })
    }

    /// Builds the model from explicit per-state means and covariances.
    pub fn from_moments(
        mu: &[Vec<f64>],
        sigma: &[Vec<Vec<f64>>],
    ) -> Result<Self, EngineError> {
        if mu.len() != sigma.len() {
            return Err(EngineError::Config(format!(
                "{} emission means for {} covariances",
                mu.len(),
                sigma.len()
            )));
        }
        let mut gens = Vec::with_capacity(mu.len());
        for (m, s) in mu.iter().zip(sigma.iter()) {
            let mean = DVector::from_vec(m.clone());
            let covar = linalg::from_rows(s).ok_or_else(|| {
                EngineError::Config("ragged emission covariance".to_string())
            })?;
            gens.push(MvNormal::new(mean, covar)?);
        }
        Ok(Self {
            dims: Vec::new(),
            gens,
        })
    }

    /// Number of states covered by the generators.
    pub fn states(&self) -> usize {
        self.gens.len()
    }

    /// Draws an observation for the provided state, or `None` if the state
    /// is outside the grid.
    pub fn sample<R: Rng>(&self, state: usize, rng: &mut R) -> Option<Vec<f64>> {
        self.gens
            .get(state)
            .map(|gen| gen.sample(rng).iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sample_mean_tracks_mu() {
        let mut rng = StdRng::seed_from_u64(7);
        let mu = DVector::from_vec(vec![1.0, -2.0]);
        let sigma = linalg::from_rows(&[vec![0.5, 0.1], vec![0.1, 0.3]]).unwrap();
        let mvn = MvNormal::new(mu, sigma).unwrap();
        let n = 20_000;
        let mut acc = DVector::zeros(2);
        for _ in 0..n {
            acc += mvn.sample(&mut rng);
        }
        acc /= n as f64;
        assert!((acc[0] - 1.0).abs() < 0.05);
        assert!((acc[1] + 2.0).abs() < 0.05);
    }

    #[test]
    fn grid_model_covers_product_space() {
        let mut rng = StdRng::seed_from_u64(11);
        let model = EmissionModel::from_dims(&[2, 3], &[1.0, 1.0], &mut rng).unwrap();
        assert_eq!(model.states(), 6);
        let obs = model.sample(4, &mut rng).unwrap();
        assert_eq!(obs.len(), 2);
        assert!(model.sample(6, &mut rng).is_none());
    }

    #[test]
    fn rejects_mismatched_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(EmissionModel::from_dims(&[2, 2], &[1.0], &mut rng).is_err());
    }
}
