/*!
Resolution of user options into the canonical internal shape.

Whatever form the process is declared in (rate amplitudes, triangular
probabilities, a dense matrix, a sparse row dictionary, a network, or a
stateless walk), the resolver normalizes it into the [`Tables`] every other
component consumes: the transition matrix and its cumulative rows, the mean
recurrence table, the equilibrium distribution, the absorption partition,
the correlation labeling, the symbol map and the emission generators.
*/

use crate::emission::EmissionModel;
use crate::errors::EngineError;
use crate::linalg::{self, DMatrix, DVector};
use crate::process::{
    BayesKernel, GaussKernel, GillespieKernel, Kernel, MarkovKernel, OrnsteinKernel,
    WienerKernel,
};
use crate::solvers::{first_absorption, mean_recurrence, Absorption};
use crate::stats;
use crate::utils::mixed_radix_index;
use rand::Rng;
use std::collections::HashMap;

/// State symbol handling.
pub mod symbols;

pub use self::symbols::{SymbolSpec, Symbols};

/// Row sums of a declared transition matrix must land within this tolerance
/// of one; accepted rows are then renormalized exactly.
pub const ROW_SUM_TOLERANCE: f64 = 1e-3;

/// The process declaration, exactly one per engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessSpec {
    /// `(K^2 - K)/2` jump-rate amplitudes, normalized to probabilities and
    /// then treated as the upper-triangular case.
    Alpha(Vec<f64>),
    /// Upper-triangular transition probabilities, mirrored to the lower
    /// triangle; the diagonal closes each row to one.
    UpperTriangular(Vec<f64>),
    /// A dense `K x K` transition matrix, accepted as-is.
    Dense(Vec<Vec<f64>>),
    /// A sparse row dictionary. Composite keys such as `"0,1"` are
    /// mixed-radix indices (least significant digit first) over the
    /// emission grid dimensions.
    Sparse {
        states: usize,
        rows: HashMap<String, HashMap<String, f64>>,
    },
    /// A Bayesian network layered over a dense chain: `net[n]` lists the
    /// parent members of node `n`, `prior` is the uniform Dirichlet
    /// pseudo-count.
    Bayes {
        tr: Vec<Vec<f64>>,
        net: Vec<Vec<usize>>,
        prior: f64,
    },
    /// Holding-time driven jumps over `states` states.
    Gillespie { states: usize },
    /// The spectral Gaussian intensity (stateless).
    Gauss {
        values: Vec<f64>,
        vectors: Vec<Vec<f64>>,
        reference: f64,
        dim: usize,
        mean: f64,
    },
    /// The Brownian walk (stateless).
    Wiener { steps_per_unit: usize },
    /// The Ornstein-Uhlenbeck walk (stateless).
    Ornstein {
        theta: f64,
        sigma: f64,
        steps_per_unit: usize,
    },
}

impl ProcessSpec {
    pub fn is_stateless(&self) -> bool {
        matches!(
            self,
            ProcessSpec::Gauss { .. } | ProcessSpec::Wiener { .. } | ProcessSpec::Ornstein { .. }
        )
    }
}

/// The observation-mixing declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum EmissionSpec {
    /// Grid dimensions plus per-axis weights; means and covariances are
    /// derived on the grid.
    Dims { dims: Vec<usize>, weights: Vec<f64> },
    /// Explicit per-state means and covariances.
    Moments {
        mu: Vec<Vec<f64>>,
        sigma: Vec<Vec<Vec<f64>>>,
    },
}

/// Field names used when ingesting external observation records.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldKeys {
    pub n: String,
    pub u: String,
    pub k: String,
    pub x: String,
    pub y: String,
    pub z: String,
    pub t: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            n: "n".to_string(),
            u: "u".to_string(),
            k: "k".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            z: "z".to_string(),
            t: "t".to_string(),
        }
    }
}

/// The full option set consumed when building an engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ensemble size.
    pub members: usize,
    /// Number of discrete time steps of a generative run.
    pub steps: usize,
    /// Time increment per step.
    pub dt: f64,
    /// Continuous-time jump-holding policy.
    pub ctmode: bool,
    /// Emit a batch report every `batch` steps; zero disables.
    pub batch: usize,
    /// The process declaration.
    pub process: ProcessSpec,
    /// State labels.
    pub symbols: Option<SymbolSpec>,
    /// Off-diagonal jump rates, used for the holding draws in
    /// continuous-time mode.
    pub rates: Option<Vec<Vec<f64>>>,
    /// Observation mixing.
    pub emission: Option<EmissionSpec>,
    /// Field names of external observation records.
    pub keys: FieldKeys,
}

impl EngineConfig {
    pub fn new(process: ProcessSpec) -> Self {
        Self {
            members: 1,
            steps: 0,
            dt: 1.0,
            ctmode: false,
            batch: 0,
            process,
            symbols: None,
            rates: None,
            emission: None,
            keys: FieldKeys::default(),
        }
    }
}

/// The canonical pre-computed tables every component consumes.
#[derive(Debug, Clone)]
pub struct Tables {
    /// Number of discrete states; zero for stateless processes.
    pub states: usize,
    /// One-step transition matrix, rows summing to one.
    pub p: DMatrix<f64>,
    /// Row-wise cumulative of `p`, for inverse-CDF sampling.
    pub cum_p: DMatrix<f64>,
    /// Mean recurrence per `(from, to)`. The diagonal is overwritten with
    /// the latest holding draw in continuous-time mode.
    pub rt: DMatrix<f64>,
    /// Equilibrium state probabilities.
    pub eq_probs: DVector<f64>,
    /// Whether the recurrence solver found a unique equilibrium.
    pub ergodic: bool,
    /// First-absorption partition.
    pub absorption: Absorption,
    /// Off-diagonal jump rates, continuous-time mode only.
    pub rates: Option<DMatrix<f64>>,
    /// Zero-mean integer label per state, the variate of the
    /// autocorrelation statistic.
    pub corr_map: Vec<i32>,
    /// Label-to-index mapping.
    pub symbols: Symbols,
    /// Per-state observation generators.
    pub emission: Option<EmissionModel>,
}

impl Tables {
    pub fn stateless(&self) -> bool {
        self.states == 0
    }

    /// Exports the resolved transition matrix as nested rows, suitable for
    /// feeding back through [`ProcessSpec::Dense`].
    pub fn transition_matrix(&self) -> Vec<Vec<f64>> {
        linalg::to_rows(&self.p)
    }

    fn stateless_tables() -> Self {
        Self {
            states: 0,
            p: linalg::zeros(0, 0),
            cum_p: linalg::zeros(0, 0),
            rt: linalg::zeros(0, 0),
            eq_probs: DVector::zeros(0),
            ergodic: false,
            absorption: Absorption::none(),
            rates: None,
            corr_map: Vec::new(),
            symbols: Symbols::identity(0),
            emission: None,
        }
    }
}

/// Resolves the configuration into the canonical tables and the process
/// kernel. Fails fast on any inconsistency; nothing is stepped before this
/// returns.
pub fn resolve<R: Rng>(
    cfg: &EngineConfig,
    rng: &mut R,
) -> Result<(Tables, Kernel), EngineError> {
    if cfg.members == 0 {
        return Err(EngineError::Config("ensemble needs at least one member".to_string()));
    }
    if cfg.dt <= 0.0 {
        return Err(EngineError::Config(format!(
            "time increment must be positive, got {}",
            cfg.dt
        )));
    }

    if cfg.process.is_stateless() {
        if cfg.symbols.is_some() {
            return Err(EngineError::Config(
                "stateless processes take no state symbols".to_string(),
            ));
        }
        if cfg.emission.is_some() {
            return Err(EngineError::Config(
                "stateless processes take no emission model".to_string(),
            ));
        }
        let kernel = match &cfg.process {
            ProcessSpec::Gauss {
                values,
                vectors,
                reference,
                dim,
                mean,
            } => Kernel::Gauss(GaussKernel::new(
                values.clone(),
                vectors.clone(),
                *reference,
                *dim,
                *mean,
            )?),
            ProcessSpec::Wiener { steps_per_unit } => {
                Kernel::Wiener(WienerKernel::new(*steps_per_unit, cfg.members)?)
            }
            ProcessSpec::Ornstein {
                theta,
                sigma,
                steps_per_unit,
            } => Kernel::Ornstein(OrnsteinKernel::new(
                *theta,
                *sigma,
                *steps_per_unit,
                cfg.members,
            )?),
            _ => unreachable!(),
        };
        info!("resolved stateless {} process", kernel.name());
        return Ok((Tables::stateless_tables(), kernel));
    }

    // Categorical processes: obtain P, then derive everything from it.
    let grid_dims: Vec<usize> = match &cfg.emission {
        Some(EmissionSpec::Dims { dims, .. }) => dims.clone(),
        _ => Vec::new(),
    };

    let (p, kernel) = match &cfg.process {
        ProcessSpec::Alpha(amplitudes) => {
            let total: f64 = amplitudes.iter().sum();
            if total <= 0.0 {
                return Err(EngineError::Config(
                    "jump-rate amplitudes must have a positive sum".to_string(),
                ));
            }
            let probs: Vec<f64> = amplitudes.iter().map(|a| a / total).collect();
            (p_from_upper(&probs)?, Kernel::Markov(MarkovKernel))
        }
        ProcessSpec::UpperTriangular(tri) => (p_from_upper(tri)?, Kernel::Markov(MarkovKernel)),
        ProcessSpec::Dense(rows) => (p_from_dense(rows)?, Kernel::Markov(MarkovKernel)),
        ProcessSpec::Sparse { states, rows } => (
            p_from_sparse(*states, rows, &grid_dims)?,
            Kernel::Markov(MarkovKernel),
        ),
        ProcessSpec::Bayes { tr, net, prior } => {
            let p = p_from_dense(tr)?;
            let kernel = BayesKernel::new(net.clone(), p.nrows(), cfg.members, *prior)?;
            (p, Kernel::Bayes(kernel))
        }
        ProcessSpec::Gillespie { states } => {
            if *states < 2 {
                return Err(EngineError::Config(
                    "gillespie process needs at least two states".to_string(),
                ));
            }
            // Jump-rate-only declaration: uniform off-diagonal proposal.
            let k = *states;
            let mut p = linalg::zeros(k, k);
            let off = 1.0 / ((k - 1) as f64);
            for i in 0..k {
                for j in 0..k {
                    if i != j {
                        p[(i, j)] = off;
                    }
                }
            }
            (p, Kernel::Gillespie(GillespieKernel))
        }
        _ => unreachable!(),
    };

    let mut p = p;
    let k = p.nrows();
    validate_rows(&mut p)?;

    let mut cum_p = p.clone();
    for i in 0..k {
        let mut acc = 0.0;
        for j in 0..k {
            acc += cum_p[(i, j)];
            cum_p[(i, j)] = acc;
        }
        // Close the row exactly so inverse-CDF draws can never fall past it.
        cum_p[(i, k - 1)] = 1.0;
    }

    let recurrence = mean_recurrence(&p);
    if !recurrence.ergodic {
        warn!("equilibrium defaulted to uniform, mean recurrence zeroed");
    }
    let absorption = first_absorption(&p);
    if !absorption.is_empty() {
        info!(
            "chain has {} absorbing state(s): {:?}",
            absorption.states.len(),
            absorption.states
        );
    }

    let rates = match &cfg.rates {
        None => None,
        Some(rows) => {
            let a = linalg::from_rows(rows)
                .ok_or_else(|| EngineError::Config("ragged jump-rate matrix".to_string()))?;
            if a.nrows() != k || a.ncols() != k {
                return Err(EngineError::Config(format!(
                    "jump-rate matrix is {}x{} for {} states",
                    a.nrows(),
                    a.ncols(),
                    k
                )));
            }
            Some(a)
        }
    };

    let emission = match &cfg.emission {
        None => None,
        Some(EmissionSpec::Dims { dims, weights }) => {
            let model = EmissionModel::from_dims(dims, weights, rng)?;
            if model.states() != k {
                return Err(EngineError::Config(format!(
                    "emission grid covers {} states but the process has {}",
                    model.states(),
                    k
                )));
            }
            Some(model)
        }
        Some(EmissionSpec::Moments { mu, sigma }) => {
            let model = EmissionModel::from_moments(mu, sigma)?;
            if model.states() != k {
                return Err(EngineError::Config(format!(
                    "{} emission generators for {} states",
                    model.states(),
                    k
                )));
            }
            Some(model)
        }
    };

    let tables = Tables {
        states: k,
        rt: recurrence.h.clone(),
        eq_probs: recurrence.eq_probs,
        ergodic: recurrence.ergodic,
        absorption,
        rates,
        corr_map: stats::zero_mean_labels(k),
        symbols: Symbols::resolve(cfg.symbols.as_ref(), k)?,
        emission,
        p,
        cum_p,
    };
    info!(
        "resolved {} process with {} states over {} members",
        kernel.name(),
        k,
        cfg.members
    );
    Ok((tables, kernel))
}

/// Recovers `K` from the length of an upper-triangular probability list.
fn states_from_pairs(n: usize) -> Result<usize, EngineError> {
    let k = ((1.0 + ((1 + 8 * n) as f64).sqrt()) / 2.0).round() as usize;
    if k < 2 || k * (k - 1) / 2 != n {
        return Err(EngineError::Config(format!(
            "{} upper-triangular entries do not form a square matrix",
            n
        )));
    }
    Ok(k)
}

fn p_from_upper(tri: &[f64]) -> Result<DMatrix<f64>, EngineError> {
    let k = states_from_pairs(tri.len())?;
    let mut p = linalg::zeros(k, k);
    let mut idx = 0;
    for i in 0..k {
        for j in (i + 1)..k {
            p[(i, j)] = tri[idx];
            p[(j, i)] = tri[idx];
            idx += 1;
        }
    }
    close_diagonal(&mut p)?;
    Ok(p)
}

fn p_from_dense(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, EngineError> {
    let p = linalg::from_rows(rows)
        .ok_or_else(|| EngineError::Config("ragged transition matrix".to_string()))?;
    if p.nrows() == 0 || p.nrows() != p.ncols() {
        return Err(EngineError::Config(format!(
            "transition matrix is {}x{}, expected square",
            p.nrows(),
            p.ncols()
        )));
    }
    Ok(p)
}

fn p_from_sparse(
    states: usize,
    rows: &HashMap<String, HashMap<String, f64>>,
    dims: &[usize],
) -> Result<DMatrix<f64>, EngineError> {
    if states == 0 {
        return Err(EngineError::Config("sparse process has zero states".to_string()));
    }
    if !dims.is_empty() {
        let product: usize = dims.iter().product();
        if product != states {
            return Err(EngineError::Config(format!(
                "emission grid of {} cells indexes {} states",
                product, states
            )));
        }
    }
    let mut p = linalg::zeros(states, states);
    for (from_key, row) in rows {
        let from = parse_state_key(from_key, dims, states)?;
        for (to_key, &prob) in row {
            let to = parse_state_key(to_key, dims, states)?;
            if !(0.0..=1.0).contains(&prob) {
                return Err(EngineError::Config(format!(
                    "transition probability {} out of [0, 1]",
                    prob
                )));
            }
            p[(from, to)] = prob;
        }
    }
    close_diagonal(&mut p)?;
    Ok(p)
}

/// Parses `"i"` or a composite `"i,j,..."` key into a state index. A
/// composite key is a mixed-radix number, least significant digit first,
/// over the emission grid dimensions; its arity must match the grid rank.
fn parse_state_key(key: &str, dims: &[usize], states: usize) -> Result<usize, EngineError> {
    let parts: Vec<&str> = key.split(',').map(str::trim).collect();
    let index = if parts.len() == 1 {
        parts[0]
            .parse::<usize>()
            .map_err(|_| EngineError::Config(format!("bad state key `{}`", key)))?
    } else {
        if parts.len() != dims.len() {
            return Err(EngineError::Config(format!(
                "state key `{}` has rank {} but the grid has rank {}",
                key,
                parts.len(),
                dims.len()
            )));
        }
        let mut digits = Vec::with_capacity(parts.len());
        for (d, part) in parts.iter().enumerate() {
            let digit = part
                .parse::<usize>()
                .map_err(|_| EngineError::Config(format!("bad state key `{}`", key)))?;
            if digit >= dims[d] {
                return Err(EngineError::Config(format!(
                    "state key `{}` exceeds grid dimension {}",
                    key, dims[d]
                )));
            }
            digits.push(digit);
        }
        mixed_radix_index(&digits, dims)
    };
    if index >= states {
        return Err(EngineError::Config(format!(
            "state key `{}` indexes past {} states",
            key, states
        )));
    }
    Ok(index)
}

/// Sets each diagonal entry to close its row to one.
fn close_diagonal(p: &mut DMatrix<f64>) -> Result<(), EngineError> {
    let k = p.nrows();
    for i in 0..k {
        let off: f64 = (0..k).filter(|&j| j != i).map(|j| p[(i, j)]).sum();
        if off > 1.0 + ROW_SUM_TOLERANCE {
            return Err(EngineError::Config(format!(
                "row {} off-diagonal mass {} exceeds one",
                i, off
            )));
        }
        p[(i, i)] = (1.0 - off).max(0.0);
    }
    Ok(())
}

/// Checks each row sums to one within tolerance, then renormalizes exactly.
fn validate_rows(p: &mut DMatrix<f64>) -> Result<(), EngineError> {
    let k = p.ncols();
    for i in 0..p.nrows() {
        let sum: f64 = p.row(i).iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(EngineError::Config(format!(
                "transition row {} sums to {}, expected 1",
                i, sum
            )));
        }
        for j in 0..k {
            p[(i, j)] /= sum;
        }
    }
    Ok(())
}
