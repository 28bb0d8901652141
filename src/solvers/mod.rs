/// Derives the equilibrium distribution and the mean-recurrence matrix from
/// a transition matrix, with an ergodicity test.
pub mod recurrence;

/// Partitions states into transient and absorbing and computes expected
/// absorption times and destination probabilities.
pub mod absorption;

pub use self::absorption::{first_absorption, Absorption};
pub use self::recurrence::{mean_recurrence, Recurrence};
