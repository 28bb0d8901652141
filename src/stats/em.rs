/*!
Expectation-maximization for a Gaussian mixture over the accumulated
observation list. Estimates one component per discrete state.
*/

use crate::errors::EngineError;
use crate::linalg::{self, DMatrix, DVector};
use serde_derive::Serialize;
use std::f64::consts::PI;

/// One fitted mixture component.
#[derive(Debug, Clone, Serialize)]
pub struct MixtureComponent {
    pub weight: f64,
    pub mu: Vec<f64>,
    pub sigma: Vec<Vec<f64>>,
}

/// Density of a multivariate normal at `x`, or zero if the covariance is
/// singular beyond repair.
fn gaussian_pdf(x: &DVector<f64>, mu: &DVector<f64>, sigma: &DMatrix<f64>) -> f64 {
    let dim = mu.len() as f64;
    let det = linalg::det(sigma);
    if det <= 0.0 {
        return 0.0;
    }
    let inv = match linalg::inv(sigma) {
        Some(inv) => inv,
        None => return 0.0,
    };
    let delta = x - mu;
    let quad = (delta.transpose() * inv * &delta)[(0, 0)];
    ((2.0 * PI).powf(dim) * det).sqrt().recip() * (-0.5 * quad).exp()
}

/// Fits a `components`-part Gaussian mixture to the observation list.
///
/// Means initialize on evenly spaced observations, covariances on the
/// pooled diagonal variance, and the estimate runs a bounded number of
/// EM sweeps with an early exit once the log-likelihood settles.
pub fn fit_mixture(
    observations: &[Vec<f64>],
    components: usize,
    max_sweeps: usize,
) -> Result<Vec<MixtureComponent>, EngineError> {
    if components == 0 {
        return Err(EngineError::Numeric(
            "mixture needs at least one component".to_string(),
        ));
    }
    if observations.len() < components {
        return Err(EngineError::Numeric(format!(
            "{} observations cannot support {} components",
            observations.len(),
            components
        )));
    }
    let dim = observations[0].len();
    if dim == 0 || observations.iter().any(|o| o.len() != dim) {
        return Err(EngineError::Config(
            "ragged observation list".to_string(),
        ));
    }

    let data: Vec<DVector<f64>> = observations
        .iter()
        .map(|o| DVector::from_vec(o.clone()))
        .collect();
    let count = data.len();

    // Pooled diagonal variance seeds every covariance.
    let mut grand = DVector::zeros(dim);
    for x in &data {
        grand += x;
    }
    grand /= count as f64;
    let mut pooled = DVector::from_element(dim, 1e-6);
    for x in &data {
        for d in 0..dim {
            pooled[d] += (x[d] - grand[d]).powi(2) / (count as f64);
        }
    }

    let mut weights = vec![1.0 / (components as f64); components];
    // Seed the means on mid-quantile observations along the first
    // coordinate, so distinct modes start under distinct components.
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| {
        data[a][0]
            .partial_cmp(&data[b][0])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut means: Vec<DVector<f64>> = (0..components)
        .map(|k| data[order[(2 * k + 1) * count / (2 * components)]].clone())
        .collect();
    let mut covars: Vec<DMatrix<f64>> = (0..components)
        .map(|_| {
            let mut c = linalg::zeros(dim, dim);
            for d in 0..dim {
                c[(d, d)] = pooled[d];
            }
            c
        })
        .collect();

    let mut resp = vec![vec![0.0f64; components]; count];
    let mut prev_ll = std::f64::NEG_INFINITY;

    for sweep in 0..max_sweeps {
        // E-step: responsibilities.
        let mut ll = 0.0;
        for (i, x) in data.iter().enumerate() {
            let mut total = 0.0;
            for k in 0..components {
                let p = weights[k] * gaussian_pdf(x, &means[k], &covars[k]);
                resp[i][k] = p;
                total += p;
            }
            if total <= 0.0 {
                // The point is unexplained by every component; spread it.
                for r in resp[i].iter_mut() {
                    *r = 1.0 / (components as f64);
                }
                total = std::f64::MIN_POSITIVE;
            } else {
                for r in resp[i].iter_mut() {
                    *r /= total;
                }
            }
            ll += total.ln();
        }

        // M-step: weights, means, covariances.
        for k in 0..components {
            let nk: f64 = resp.iter().map(|r| r[k]).sum();
            if nk <= 0.0 {
                continue;
            }
            weights[k] = nk / (count as f64);
            let mut mu = DVector::zeros(dim);
            for (i, x) in data.iter().enumerate() {
                mu += x * resp[i][k];
            }
            mu /= nk;
            let mut cov = linalg::zeros(dim, dim);
            for (i, x) in data.iter().enumerate() {
                let delta = x - &mu;
                cov += (&delta * delta.transpose()) * resp[i][k];
            }
            cov /= nk;
            // Keep the covariance invertible.
            for d in 0..dim {
                cov[(d, d)] += 1e-9;
            }
            means[k] = mu;
            covars[k] = cov;
        }

        if (ll - prev_ll).abs() < 1e-9 * ll.abs().max(1.0) {
            debug!("mixture converged after {} sweeps", sweep + 1);
            break;
        }
        prev_ll = ll;
    }

    Ok((0..components)
        .map(|k| MixtureComponent {
            weight: weights[k],
            mu: means[k].iter().cloned().collect(),
            sigma: linalg::to_rows(&covars[k]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_separated_clusters() {
        // Two tight 1-D clusters around 0 and 10.
        let mut obs = Vec::new();
        for i in 0..50 {
            obs.push(vec![(i % 5) as f64 * 0.01]);
            obs.push(vec![10.0 + (i % 5) as f64 * 0.01]);
        }
        let mix = fit_mixture(&obs, 2, 100).unwrap();
        let mut centres: Vec<f64> = mix.iter().map(|c| c.mu[0]).collect();
        centres.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(centres[0] < 1.0, "low centre at {}", centres[0]);
        assert!(centres[1] > 9.0, "high centre at {}", centres[1]);
        let total_weight: f64 = mix.iter().map(|c| c.weight).sum();
        assert!((total_weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_observations() {
        assert!(fit_mixture(&[vec![1.0]], 2, 10).is_err());
    }
}
