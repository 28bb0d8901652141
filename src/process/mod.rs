/*!
The process kernels.

Each supported random process is one variant of the [`Kernel`] sum. A
categorical kernel draws the next state of a member given its current state
and the resolved tables; a stateless kernel draws the member's next value.
The stepper dispatches on the variant once per member per step.
*/

use crate::config::Tables;
use rand::Rng;

/// The finite-state Markov chain kernel.
pub mod markov;

/// The holding-time driven jump kernel.
pub mod gillespie;

/// The Bayesian-network kernel with Dirichlet conditional updates.
pub mod bayes;

/// The spectral (Karhunen-Loeve) Gaussian intensity kernel.
pub mod gauss;

/// The Wiener and Ornstein-Uhlenbeck walk kernels.
pub mod walks;

pub use self::bayes::BayesKernel;
pub use self::gauss::GaussKernel;
pub use self::gillespie::GillespieKernel;
pub use self::markov::MarkovKernel;
pub use self::walks::{OrnsteinKernel, WienerKernel};

/// Inverse-CDF draw over one row of cumulative masses: the smallest index
/// whose cumulant exceeds the uniform deviate, clamped to the last state.
pub(crate) fn draw_from_cumulative<R: Rng>(row: &[f64], rng: &mut R) -> usize {
    let u = rng.gen::<f64>();
    for (j, &c) in row.iter().enumerate() {
        if c > u {
            return j;
        }
    }
    row.len().saturating_sub(1)
}

/// A tagged sum over the supported process variants.
#[derive(Debug, Clone)]
pub enum Kernel {
    Markov(MarkovKernel),
    Gillespie(GillespieKernel),
    Bayes(BayesKernel),
    Gauss(GaussKernel),
    Wiener(WienerKernel),
    Ornstein(OrnsteinKernel),
}

impl Kernel {
    /// Whether this variant draws values instead of discrete states.
    pub fn is_stateless(&self) -> bool {
        matches!(
            self,
            Kernel::Gauss(_) | Kernel::Wiener(_) | Kernel::Ornstein(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Markov(_) => "markov",
            Kernel::Gillespie(_) => "gillespie",
            Kernel::Bayes(_) => "bayes",
            Kernel::Gauss(_) => "gauss",
            Kernel::Wiener(_) => "wiener",
            Kernel::Ornstein(_) => "ornstein",
        }
    }

    /// Draws the next state of a categorical member.
    ///
    /// Panics if called on a stateless variant; the resolver never pairs a
    /// stateless kernel with a categorical stepper.
    pub fn next_state<R: Rng>(
        &mut self,
        tables: &Tables,
        from: usize,
        rng: &mut R,
    ) -> usize {
        match self {
            Kernel::Markov(k) => k.next_state(tables, from, rng),
            Kernel::Gillespie(k) => k.next_state(tables, from, rng),
            Kernel::Bayes(k) => k.next_state(tables, from, rng),
            _ => panic!("{} kernel cannot draw discrete states", self.name()),
        }
    }

    /// Draws the next value of a stateless member at step `s`, time `t`.
    ///
    /// `walk` is the member's cumulative Wiener walk, mutated in place.
    pub fn next_value<R: Rng>(
        &mut self,
        member: usize,
        walk: &mut f64,
        s: usize,
        t: f64,
        dt: f64,
        rng: &mut R,
    ) -> f64 {
        match self {
            Kernel::Gauss(k) => k.next_value(s, dt, rng),
            Kernel::Wiener(k) => k.next_value(member, walk, t, rng),
            Kernel::Ornstein(k) => k.next_value(member, walk, t, rng),
            _ => panic!("{} kernel cannot draw values", self.name()),
        }
    }

    /// Refreshes the Bayesian posterior from the current ensemble snapshot.
    /// A no-op for every other variant.
    pub fn observe(&mut self, states: &[usize], occupancy: &[Vec<f64>]) {
        if let Kernel::Bayes(k) = self {
            k.observe(states, occupancy);
        }
    }
}
