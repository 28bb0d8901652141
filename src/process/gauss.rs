use crate::errors::EngineError;
use crate::utils::exp_dev;
use num::complex::Complex64;
use rand::Rng;
use std::f64::consts::PI;

/// The spectral Gaussian intensity kernel.
///
/// Draws an expected event count per sample interval from a
/// Karhunen-Loeve expansion: random complex coefficients over the provided
/// eigenvalues, projected onto the eigenvector components at the current
/// time index.
#[derive(Debug, Clone)]
pub struct GaussKernel {
    /// Eigenvalues of the intensity covariance.
    values: Vec<f64>,
    /// Eigenvectors, one per eigenvalue, sampled on the time grid.
    vectors: Vec<Vec<f64>>,
    /// Reference eigenvalue used to scale the coefficient means.
    reference: f64,
    /// Temporal dimension: past it the kernel returns the plain mean.
    dim: usize,
    /// Expected event count over the whole window.
    mean: f64,
}

impl GaussKernel {
    pub fn new(
        values: Vec<f64>,
        vectors: Vec<Vec<f64>>,
        reference: f64,
        dim: usize,
        mean: f64,
    ) -> Result<Self, EngineError> {
        if values.len() != vectors.len() {
            return Err(EngineError::Config(format!(
                "{} eigenvalues for {} eigenvectors",
                values.len(),
                vectors.len()
            )));
        }
        if reference == 0.0 {
            return Err(EngineError::Config(
                "reference eigenvalue must be nonzero".to_string(),
            ));
        }
        if let Some(short) = vectors.iter().find(|v| v.len() < dim) {
            return Err(EngineError::Config(format!(
                "eigenvector of length {} does not cover the {}-sample window",
                short.len(),
                dim
            )));
        }
        Ok(Self {
            values,
            vectors,
            reference,
            dim,
            mean,
        })
    }

    /// Expected event count in the sample interval at step index `s`.
    pub fn next_value<R: Rng>(&self, s: usize, dt: f64, rng: &mut R) -> f64 {
        if s >= self.dim {
            return self.mean;
        }
        let mut a = Complex64::new(0.0, 0.0);
        for (n, &value) in self.values.iter().enumerate() {
            let magnitude = exp_dev(rng, self.mean * value / self.reference).sqrt();
            let phase = PI * rng.gen::<f64>();
            let b = Complex64::from_polar(magnitude, phase);
            a += b * self.vectors[n][s];
        }
        a.norm_sqr() * dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn returns_mean_past_window() {
        let kernel =
            GaussKernel::new(vec![1.0], vec![vec![1.0, 1.0]], 1.0, 2, 40.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(kernel.next_value(2, 0.1, &mut rng), 40.0);
        assert_eq!(kernel.next_value(100, 0.1, &mut rng), 40.0);
    }

    #[test]
    fn intensity_is_nonnegative() {
        let kernel = GaussKernel::new(
            vec![2.0, 0.5],
            vec![vec![0.7, 0.3, 0.1], vec![0.1, 0.5, 0.9]],
            2.0,
            3,
            10.0,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        for s in 0..3 {
            assert!(kernel.next_value(s, 0.05, &mut rng) >= 0.0);
        }
    }

    #[test]
    fn rejects_short_eigenvectors() {
        assert!(GaussKernel::new(vec![1.0], vec![vec![1.0]], 1.0, 4, 1.0).is_err());
    }
}
