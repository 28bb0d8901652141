use super::draw_from_cumulative;
use crate::config::Tables;
use crate::errors::EngineError;
use crate::utils::mixed_radix_index;
use rand::Rng;

/// The Bayesian-network kernel.
///
/// Members play the role of network nodes. State proposals come off the
/// cumulative transition rows and are accepted by a Metropolis-Hastings
/// test against the equilibrium distribution. After every step the stepper
/// hands the ensemble snapshot back so the Dirichlet posteriors of each
/// node's conditional table can be refreshed.
#[derive(Debug, Clone)]
pub struct BayesKernel {
    /// Parent set of each node, as member indices.
    net: Vec<Vec<usize>>,
    /// Dirichlet prior pseudo-counts, per node, parent configuration, state.
    alpha: Vec<Vec<Vec<f64>>>,
    /// Observed joint counts, same shape as `alpha`.
    count: Vec<Vec<Vec<f64>>>,
    /// Posterior means `(count + alpha) / (sum count + sum alpha)`.
    theta: Vec<Vec<Vec<f64>>>,
    states: usize,
}

impl BayesKernel {
    /// Allocates the conditional tables: node `n` owns one row per
    /// configuration of its parents, i.e. `K^(|net[n]|)` rows of `K` cells.
    pub fn new(
        net: Vec<Vec<usize>>,
        states: usize,
        members: usize,
        prior: f64,
    ) -> Result<Self, EngineError> {
        if net.len() != members {
            return Err(EngineError::Config(format!(
                "bayes net lists {} nodes for {} members",
                net.len(),
                members
            )));
        }
        if states == 0 {
            return Err(EngineError::Config(
                "bayes process needs at least one state".to_string(),
            ));
        }
        for (n, parents) in net.iter().enumerate() {
            if let Some(&bad) = parents.iter().find(|&&p| p >= members) {
                return Err(EngineError::Config(format!(
                    "node {} lists parent {} out of {} members",
                    n, bad, members
                )));
            }
        }
        let mut alpha = Vec::with_capacity(net.len());
        for parents in &net {
            let configs = states.pow(parents.len() as u32);
            alpha.push(vec![vec![prior; states]; configs]);
        }
        let count: Vec<Vec<Vec<f64>>> = alpha
            .iter()
            .map(|node| vec![vec![0.0; states]; node.len()])
            .collect();
        let theta = count.clone();
        let mut me = Self {
            net,
            alpha,
            count,
            theta,
            states,
        };
        me.refresh_theta();
        Ok(me)
    }

    pub fn next_state<R: Rng>(&self, tables: &Tables, from: usize, rng: &mut R) -> usize {
        let k = tables.states;
        let row: Vec<f64> = (0..k).map(|j| tables.cum_p[(from, j)]).collect();
        let to = draw_from_cumulative(&row, rng);
        if to == from {
            return from;
        }
        let pi_from = tables.eq_probs[from];
        let forward = tables.cum_p[(from, to)];
        if pi_from <= 0.0 || forward <= 0.0 {
            return to;
        }
        let ratio = (tables.eq_probs[to] / pi_from) * (tables.cum_p[(to, from)] / forward);
        let accept = ratio.min(1.0);
        if rng.gen::<f64>() <= accept {
            to
        } else {
            from
        }
    }

    /// Folds the ensemble snapshot into the joint counts and recomputes the
    /// posterior means.
    pub fn observe(&mut self, states: &[usize], occupancy: &[Vec<f64>]) {
        for node in 0..self.net.len() {
            let digits: Vec<usize> = self.net[node].iter().map(|&p| states[p]).collect();
            let radix = vec![self.states; digits.len()];
            let cfg = mixed_radix_index(&digits, &radix);
            for k in 0..self.states {
                self.count[node][cfg][k] += occupancy[node][k];
            }
            let total: f64 = (0..self.states)
                .map(|k| self.count[node][cfg][k] + self.alpha[node][cfg][k])
                .sum();
            for k in 0..self.states {
                self.theta[node][cfg][k] =
                    (self.count[node][cfg][k] + self.alpha[node][cfg][k]) / total;
            }
        }
    }

    fn refresh_theta(&mut self) {
        for node in 0..self.net.len() {
            for cfg in 0..self.count[node].len() {
                let total: f64 = (0..self.states)
                    .map(|k| self.count[node][cfg][k] + self.alpha[node][cfg][k])
                    .sum();
                for k in 0..self.states {
                    self.theta[node][cfg][k] =
                        (self.count[node][cfg][k] + self.alpha[node][cfg][k]) / total;
                }
            }
        }
    }

    /// Posterior mean table of the provided node.
    pub fn theta(&self, node: usize) -> &[Vec<f64>] {
        &self.theta[node]
    }

    pub fn parents(&self, node: usize) -> &[usize] {
        &self.net[node]
    }
}
