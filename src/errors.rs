use std::error::Error;
use std::fmt;

/// Stores the different kinds of engine errors.
///
/// Configuration errors are fatal and returned before any step is taken.
/// Solver and estimator degradations are surfaced as warnings or `error`
/// events and never abort a run.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The provided options could not be resolved into a canonical process
    /// (row-sum violation, dimension mismatch, unknown selector).
    Config(String),
    /// The transition matrix does not admit a unique equilibrium distribution.
    NonErgodic,
    /// A division by zero or singular matrix was encountered in an estimator.
    Numeric(String),
    /// The downstream consumer refused an event.
    Sink(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::Config(msg) => write!(f, "configuration error: {}", msg),
            EngineError::NonErgodic => write!(
                f,
                "process is not ergodic: the recurrence system is singular"
            ),
            EngineError::Numeric(msg) => write!(f, "numeric error: {}", msg),
            EngineError::Sink(msg) => write!(f, "event sink error: {}", msg),
        }
    }
}

impl Error for EngineError {}
