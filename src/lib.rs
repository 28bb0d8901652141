/*! # stochast
A stochastic process simulation and inference engine.

`stochast` advances an ensemble of `N` independent sample paths of a random
process over a discrete time grid, accumulating transition counts, holding
times, autocorrelation and count frequencies, and emitting a time-ordered
event stream to a downstream sink. Run in reverse (learning mode), it
consumes an externally supplied event stream and produces maximum-likelihood
estimates of the generator that would have produced it.

Supported processes: finite-state Markov chains, Bayesian networks with
Dirichlet conditional updates, Gillespie-style inhomogeneous jumps, a
spectral (Karhunen–Loève) Gaussian intensity, Wiener walks and
Ornstein–Uhlenbeck walks.
*/

#[macro_use]
extern crate log;

extern crate nalgebra as na;

/// Provides all the errors of this crate.
pub mod errors;

/// Numeric utilities: exponential deviates, cumulative sums, reductions and
/// the mixed-radix permutation generator.
pub mod utils;

/// A thin adapter over the matrix package used by the solvers.
pub mod linalg;

/// Mean-recurrence and first-absorption solvers.
pub mod solvers;

/// The process kernels: one variant per supported random process.
pub mod process;

/// Resolution of user options into the canonical internal tables.
pub mod config;

/// Observation emission: the state grid and its multivariate normal samplers.
pub mod emission;

/// Statistical accumulators and maximum-likelihood estimators.
pub mod stats;

/// The ensemble stepper which advances all members in lockstep.
pub mod ensemble;

/// The pipeline driver, event model, recorder and sinks.
pub mod pipeline;

pub use crate::errors::EngineError;
pub use crate::pipeline::Engine;
