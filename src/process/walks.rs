use crate::errors::EngineError;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// The Brownian walk kernel.
///
/// Each member carries an independent random walk of `M` increments per
/// unit time; the member value is the walk rescaled by `1/sqrt(M)`, so its
/// variance grows linearly with `t`.
#[derive(Debug, Clone)]
pub struct WienerKernel {
    steps_per_unit: usize,
    /// Increments already folded into each member's walk.
    counts: Vec<usize>,
}

impl WienerKernel {
    pub fn new(steps_per_unit: usize, members: usize) -> Result<Self, EngineError> {
        if steps_per_unit == 0 {
            return Err(EngineError::Config(
                "wiener walk needs at least one increment per unit time".to_string(),
            ));
        }
        Ok(Self {
            steps_per_unit,
            counts: vec![0; members],
        })
    }

    /// Tops the member's walk up to `floor(M t)` standard normal increments
    /// and returns the rescaled value.
    pub fn next_value<R: Rng>(&mut self, member: usize, walk: &mut f64, t: f64, rng: &mut R) -> f64 {
        let m = self.steps_per_unit as f64;
        let target = (m * t).floor() as usize;
        while self.counts[member] < target {
            let z: f64 = StandardNormal.sample(rng);
            *walk += z;
            self.counts[member] += 1;
        }
        *walk / m.sqrt()
    }
}

/// The Ornstein-Uhlenbeck walk kernel.
///
/// Realized as a time-changed Brownian motion: each member drives its own
/// walk, records the path history, and reads it back at the exponentially
/// stretched index `floor(exp(2 theta t) - 1)`.
#[derive(Debug, Clone)]
pub struct OrnsteinKernel {
    theta: f64,
    /// Stationary amplitude `sigma / sqrt(2 theta)`.
    amplitude: f64,
    inner: WienerKernel,
    /// Per-member walk values, in raw increment units.
    walks: Vec<f64>,
    /// Per-member Brownian path history, one entry per draw.
    history: Vec<Vec<f64>>,
}

impl OrnsteinKernel {
    pub fn new(
        theta: f64,
        sigma: f64,
        steps_per_unit: usize,
        members: usize,
    ) -> Result<Self, EngineError> {
        if theta <= 0.0 {
            return Err(EngineError::Config(
                "ornstein reversion rate must be positive".to_string(),
            ));
        }
        Ok(Self {
            theta,
            amplitude: sigma / (2.0 * theta).sqrt(),
            inner: WienerKernel::new(steps_per_unit, members)?,
            walks: vec![0.0; members],
            history: vec![Vec::new(); members],
        })
    }

    pub fn next_value<R: Rng>(&mut self, member: usize, walk: &mut f64, t: f64, rng: &mut R) -> f64 {
        let brownian = self
            .inner
            .next_value(member, &mut self.walks[member], t, rng);
        *walk = self.walks[member];
        self.history[member].push(brownian);
        let stretched = ((2.0 * self.theta * t).exp() - 1.0).floor();
        let w = if stretched >= 0.0 {
            self.history[member]
                .get(stretched as usize)
                .copied()
                .unwrap_or(0.0)
        } else {
            0.0
        };
        self.amplitude * (-self.theta * t).exp() * w
    }
}
