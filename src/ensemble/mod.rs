/*!
The ensemble stepper.

Owns every per-member and per-`(from, to)` accumulator and advances all `N`
members in lockstep, one call per time step. In learning mode the same
counters are fed from an external, time-ordered event stream instead of
from the kernels.
*/

use crate::config::Tables;
use crate::linalg::{self, DMatrix};
use crate::pipeline::feed::LearnEvent;
use crate::process::Kernel;
use crate::stats;
use crate::utils::exp_dev;
use rand::Rng;

/// One member jump, as reported to the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct JumpRecord {
    /// Ensemble index of the member that jumped.
    pub index: usize,
    /// State the member jumped into.
    pub state: usize,
    /// Holding time drawn for the jump; zero in discrete-time mode.
    pub hold: f64,
    /// Observation emitted at the destination state, if a generator exists.
    pub obs: Option<Vec<f64>>,
}

/// What one step produced.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Stationary correlation recorded at the top of the step.
    pub gamma: f64,
    /// Cumulative walk of the first member, for stateless traces.
    pub walk: f64,
    /// Jumps in ascending ensemble order.
    pub jumps: Vec<JumpRecord>,
}

/// All per-member and per-transition accumulators of one engine instance.
#[derive(Debug, Clone)]
pub struct Ensemble {
    pub members: usize,
    /// Current state of each member (categorical processes).
    pub u: Vec<usize>,
    /// State of each member at `t = 0`.
    pub u0: Vec<usize>,
    /// Previous-step states, scratch for the counter updates.
    u1: Vec<usize>,
    /// Current value of each member (stateless processes).
    pub uval: Vec<f64>,
    /// Next scheduled jump time (continuous-time) or last event time
    /// (learning) per member.
    pub uh: Vec<f64>,
    /// Accumulated jump count (categorical) or accumulated value
    /// (stateless) per member.
    pub uk: Vec<f64>,
    /// Occupation counts: steps member `n` has been observed in state `k`.
    pub un: Vec<Vec<f64>>,
    /// Cumulative Wiener walk per member.
    pub uw: Vec<f64>,
    /// From-initial-to-current transition counts across the ensemble.
    pub n0: DMatrix<f64>,
    /// One-step from-to transition counts this run.
    pub n1: DMatrix<f64>,
    /// Accumulated holding time per `(from, to)`.
    pub cum_h: DMatrix<f64>,
    /// Jump counts per `(from, to)`.
    pub cum_n: DMatrix<f64>,
    /// Correlation statistic per generative step.
    pub gamma: Vec<f64>,
    /// Cumulative member-observation count behind the correlation.
    samples: f64,
    /// Total jumps this run.
    pub jumps: u64,
    warned_hidden: bool,
}

impl Ensemble {
    /// Allocates the accumulators and draws the initial states off the
    /// equilibrium distribution.
    pub fn new<R: Rng>(members: usize, tables: &Tables, rng: &mut R) -> Self {
        let k = tables.states;
        let mut u0 = vec![0usize; members];
        if k > 0 {
            let mut cum = Vec::with_capacity(k);
            let mut acc = 0.0;
            for i in 0..k {
                acc += tables.eq_probs[i];
                cum.push(acc);
            }
            for slot in u0.iter_mut() {
                let draw = rng.gen::<f64>() * acc;
                *slot = cum
                    .iter()
                    .position(|&c| c > draw)
                    .unwrap_or(k - 1);
            }
        }
        Self {
            members,
            u: u0.clone(),
            u0,
            u1: vec![0; members],
            uval: vec![0.0; members],
            uh: vec![0.0; members],
            uk: vec![0.0; members],
            un: vec![vec![0.0; k]; members],
            uw: vec![0.0; members],
            n0: linalg::zeros(k, k),
            n1: linalg::zeros(k, k),
            cum_h: linalg::zeros(k, k),
            cum_n: linalg::zeros(k, k),
            gamma: Vec::new(),
            samples: 0.0,
            jumps: 0,
            warned_hidden: false,
        }
    }

    /// Cumulative member-observation count behind the correlation statistic.
    pub fn samples(&self) -> f64 {
        self.samples
    }

    /// Advances every member by one generative step at time `t` (step
    /// index `s`) and returns the step report.
    pub fn step_generative<R: Rng>(
        &mut self,
        tables: &mut Tables,
        kernel: &mut Kernel,
        s: usize,
        t: f64,
        dt: f64,
        ctmode: bool,
        rng: &mut R,
    ) -> StepReport {
        if kernel.is_stateless() {
            self.step_stateless(kernel, s, t, dt, rng)
        } else {
            self.step_categorical(tables, kernel, t, ctmode, rng)
        }
    }

    fn step_categorical<R: Rng>(
        &mut self,
        tables: &mut Tables,
        kernel: &mut Kernel,
        t: f64,
        ctmode: bool,
        rng: &mut R,
    ) -> StepReport {
        let gamma = stats::stat_corr(&tables.corr_map, &self.n0, self.samples);
        self.gamma.push(gamma);
        self.samples += self.members as f64;

        self.u1.copy_from_slice(&self.u);

        let mut jumps = Vec::new();
        for n in 0..self.members {
            let from = self.u[n];
            let to = kernel.next_state(tables, from, rng);
            if from == to {
                continue;
            }
            let held = if ctmode { t - self.uh[n] } else { 0.0 };
            let hold = if ctmode {
                match &tables.rates {
                    Some(a) if a[(from, to)] > 0.0 => exp_dev(rng, 1.0 / a[(from, to)]),
                    _ => 0.0,
                }
            } else {
                0.0
            };
            self.cum_h[(from, to)] += held;
            self.cum_n[(from, to)] += 1.0;
            if ctmode && hold > 0.0 {
                tables.rt[(from, from)] = hold;
            }
            self.u[n] = to;
            self.uk[n] += 1.0;
            self.uh[n] = t + hold;
            self.jumps += 1;
            let obs = tables
                .emission
                .as_ref()
                .and_then(|model| model.sample(to, rng));
            jumps.push(JumpRecord {
                index: n,
                state: to,
                hold,
                obs,
            });
        }

        for n in 0..self.members {
            self.n0[(self.u0[n], self.u[n])] += 1.0;
            self.n1[(self.u1[n], self.u[n])] += 1.0;
            self.un[n][self.u[n]] += 1.0;
        }

        kernel.observe(&self.u, &self.un);

        StepReport {
            gamma,
            walk: self.uw.first().copied().unwrap_or(0.0),
            jumps,
        }
    }

    fn step_stateless<R: Rng>(
        &mut self,
        kernel: &mut Kernel,
        s: usize,
        t: f64,
        dt: f64,
        rng: &mut R,
    ) -> StepReport {
        for n in 0..self.members {
            let value = kernel.next_value(n, &mut self.uw[n], s, t, dt, rng);
            self.uval[n] = value;
            self.uk[n] += value;
        }
        StepReport {
            // No categorical samples exist, so the correlation sits at one.
            gamma: 1.0,
            walk: self.uw.first().copied().unwrap_or(0.0),
            jumps: Vec::new(),
        }
    }

    /// Folds a batch of time-ordered external events into the accumulators
    /// (learning mode) and returns the matching jump records, each tagged
    /// with its event time.
    pub fn ingest(
        &mut self,
        tables: &Tables,
        stateless: bool,
        batch: &[LearnEvent],
        obslist: &mut Vec<Vec<f64>>,
    ) -> Vec<(f64, JumpRecord)> {
        let mut records = Vec::with_capacity(batch.len());
        for ev in batch {
            if ev.n >= self.members {
                warn!("event indexes member {} of {}, dropped", ev.n, self.members);
                continue;
            }
            if stateless {
                let value: f64 = ev.state.parse().unwrap_or(0.0);
                self.uval[ev.n] += value;
                continue;
            }
            let from = self.u[ev.n];
            let to = match tables.symbols.index_of(&ev.state) {
                Some(to) => to,
                None => {
                    if !self.warned_hidden {
                        warn!("symbol `{}` is not declared, mapped to state 0", ev.state);
                        self.warned_hidden = true;
                    }
                    0
                }
            };
            self.cum_h[(from, to)] += ev.t - self.uh[ev.n];
            self.cum_n[(from, to)] += 1.0;
            self.n1[(from, to)] += 1.0;
            self.uk[ev.n] += 1.0;
            self.u[ev.n] = to;
            self.uh[ev.n] = ev.t;
            self.jumps += 1;
            let obs = vec![ev.x, ev.y, ev.z];
            obslist.push(obs.clone());
            records.push((
                ev.t,
                JumpRecord {
                    index: ev.n,
                    state: to,
                    hold: 0.0,
                    obs: Some(obs),
                },
            ));
        }
        records
    }
}
