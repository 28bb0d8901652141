use super::events::{Event, EventBody};
use super::feed::ObservationFeed;
use super::recorder::Recorder;
use super::{EventFilter, EventSink};
use crate::config::{resolve, EngineConfig, Tables};
use crate::ensemble::Ensemble;
use crate::errors::EngineError;
use crate::linalg;
use crate::process::Kernel;
use crate::stats::{self, RunStats};
use crate::utils::avg;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;

/// How many expectation-maximization sweeps the emission estimator runs.
const EM_SWEEPS: usize = 100;

/// One engine instance: the resolved tables, the process kernel, the
/// ensemble accumulators and the recorder, advanced over the discrete time
/// grid `t = 0, dt, 2 dt, ...`.
///
/// Instances are independent; several may run on parallel threads with no
/// shared mutable state.
pub struct Engine {
    pub tables: Tables,
    kernel: Kernel,
    pub ensemble: Ensemble,
    steps: usize,
    dt: f64,
    batch: usize,
    ctmode: bool,
    recorder: Recorder,
    rng: StdRng,
    t: f64,
    s: usize,
    halt: bool,
    /// Observations accumulated for the emission estimator.
    pub obslist: Vec<Vec<f64>>,
}

impl Engine {
    /// Builds an engine with an entropy-seeded generator.
    pub fn try_from_config(cfg: &EngineConfig) -> Result<Self, EngineError> {
        Self::build(cfg, StdRng::from_entropy())
    }

    /// Builds an engine with a fixed seed, for reproducible runs.
    pub fn with_seed(cfg: &EngineConfig, seed: u64) -> Result<Self, EngineError> {
        Self::build(cfg, StdRng::seed_from_u64(seed))
    }

    fn build(cfg: &EngineConfig, mut rng: StdRng) -> Result<Self, EngineError> {
        let (tables, kernel) = resolve(cfg, &mut rng)?;
        let ensemble = Ensemble::new(cfg.members, &tables, &mut rng);
        Ok(Self {
            tables,
            kernel,
            ensemble,
            steps: cfg.steps,
            dt: cfg.dt,
            batch: cfg.batch,
            ctmode: cfg.ctmode,
            recorder: Recorder::new(),
            rng,
            t: 0.0,
            s: 0,
            halt: false,
            obslist: Vec::new(),
        })
    }

    /// Installs the user event filter.
    pub fn set_filter(&mut self, filter: Box<dyn EventFilter>) {
        self.recorder.set_filter(filter);
    }

    /// Current time on the grid.
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Completed steps.
    pub fn step_count(&self) -> usize {
        self.s
    }

    /// Signals the driver to stop pulling work and wrap up.
    pub fn halt(&mut self) {
        self.halt = true;
    }

    fn config_event(&self) -> Event {
        let ab = &self.tables.absorption;
        Event::new(
            self.t,
            EventBody::Config {
                process: self.kernel.name().to_string(),
                states: self.tables.states,
                members: self.ensemble.members,
                steps: self.steps,
                dt: self.dt,
                ctmode: self.ctmode,
                batch: self.batch,
                symbols: self.tables.symbols.names().to_vec(),
                tr_probs: linalg::to_rows(&self.tables.p),
                eq_probs: self.tables.eq_probs.iter().cloned().collect(),
                mean_recurrence: linalg::to_rows(&self.tables.rt),
                absorb_times: ab.times.iter().cloned().collect(),
                absorb_probs: linalg::to_rows(&ab.probs),
                absorb_states: ab.states.clone(),
            },
        )
    }

    /// Advances one generative step and returns its events: jumps in
    /// ascending ensemble order, the step record, then a batch report when
    /// one falls due. All events of the step carry the same time tag.
    fn advance(&mut self) -> Vec<Event> {
        let report = self.ensemble.step_generative(
            &mut self.tables,
            &mut self.kernel,
            self.s,
            self.t,
            self.dt,
            self.ctmode,
            &mut self.rng,
        );
        let step_t = self.t;
        let mut events = Vec::with_capacity(report.jumps.len() + 2);
        for jump in report.jumps {
            if let Some(obs) = &jump.obs {
                self.obslist.push(obs.clone());
            }
            events.push(Event::new(
                step_t,
                EventBody::Jump {
                    index: jump.index,
                    state: jump.state,
                    hold: jump.hold,
                    obs: jump.obs,
                },
            ));
        }
        events.push(Event::new(
            step_t,
            EventBody::Step {
                s: self.s,
                gamma: report.gamma,
                walk: report.walk,
            },
        ));
        self.t += self.dt;
        self.s += 1;
        if self.batch > 0 && self.s % self.batch == 1 {
            events.push(self.batch_event());
        }
        events
    }

    fn batch_event(&self) -> Event {
        let count_freq = stats::count_frequencies(&self.ensemble.uk);
        let count_prob = stats::count_probabilities(&count_freq);
        let mle = stats::transition_mle(&self.ensemble.n1);
        Event::new(
            self.t,
            EventBody::Batch {
                s: self.s,
                rel_error: stats::relative_error(&mle, &self.tables.p),
                mle_em_events: self.obslist.len(),
                mle_tr_probs: linalg::to_rows(&mle),
                stat_corr: stats::stat_corr(
                    &self.tables.corr_map,
                    &self.ensemble.n0,
                    self.ensemble.samples(),
                ),
                count_freq,
                count_prob,
            },
        )
    }

    /// Computes the end-of-run statistics block.
    pub fn run_stats(&self) -> RunStats {
        let tc = stats::coherence_time(&self.ensemble.gamma, self.dt);
        let kbar = avg(&self.ensemble.uk);
        let (intervals, degeneracy, snr, intensity) = RunStats::summarize(kbar, self.t, tc);
        let mle = stats::transition_mle(&self.ensemble.n1);
        RunStats {
            mle_holding_times: linalg::to_rows(&stats::holding_time_mle(
                &self.ensemble.cum_h,
                &self.ensemble.cum_n,
            )),
            rel_error: stats::relative_error(&mle, &self.tables.p),
            count_freq: stats::count_frequencies(&self.ensemble.uk),
            mle_em_probs: Vec::new(),
            mle_tr_probs: linalg::to_rows(&mle),
            tr_counts: linalg::to_rows(&self.ensemble.cum_n),
            mean_count: kbar,
            coherence_time: tc,
            coherence_intervals: intervals,
            correlation_0lag: self.ensemble.gamma.first().copied().unwrap_or(1.0),
            mean_intensity: intensity,
            degeneracy_param: degeneracy,
            snr,
        }
    }

    /// Builds the terminal events: the emission estimate runs here, and a
    /// failure degrades to an empty mixture behind an `error` event.
    fn end_events(&mut self) -> Vec<Event> {
        let mut stats_block = self.run_stats();
        let mut events = Vec::with_capacity(2);
        if !self.obslist.is_empty() && self.tables.states > 0 {
            match stats::fit_mixture(&self.obslist, self.tables.states, EM_SWEEPS) {
                Ok(mix) => stats_block.mle_em_probs = mix,
                Err(e) => {
                    warn!("emission estimate degraded: {}", e);
                    events.push(Event::new(
                        self.t,
                        EventBody::Error {
                            error: e.to_string(),
                        },
                    ));
                }
            }
        }
        events.push(Event::new(
            self.t,
            EventBody::End { stats: stats_block },
        ));
        events
    }

    /// Runs the generative loop synchronously: a `config` event, `steps`
    /// steps, then the `end` report, all delivered through the sink.
    pub fn run<S: EventSink>(&mut self, sink: &mut S) -> Result<(), EngineError> {
        info!(
            "running {} generative steps of dt={} over {} members",
            self.steps, self.dt, self.ensemble.members
        );
        let config = self.config_event();
        self.recorder.record(sink, config);
        while self.s < self.steps && !self.halt {
            for event in self.advance() {
                self.recorder.record(sink, event);
            }
        }
        for event in self.end_events() {
            self.recorder.record(sink, event);
        }
        info!(
            "run complete: {} events pushed, {} dropped",
            self.recorder.pushed, self.recorder.dropped
        );
        Ok(())
    }

    /// Runs learning mode: pulls time-ordered batches off the feed until it
    /// is exhausted or the engine is halted, folding each batch into the
    /// accumulators, then emits the `end` report with the final estimates.
    pub fn learn<F, S>(&mut self, feed: &mut F, sink: &mut S) -> Result<(), EngineError>
    where
        F: ObservationFeed,
        S: EventSink,
    {
        let stateless = self.kernel.is_stateless();
        info!("learning over {} members", self.ensemble.members);
        let config = self.config_event();
        self.recorder.record(sink, config);
        while !self.halt {
            let batch = match feed.next_batch() {
                Some(batch) if !batch.is_empty() => batch,
                _ => break,
            };
            let records =
                self.ensemble
                    .ingest(&self.tables, stateless, &batch, &mut self.obslist);
            for (event_t, jump) in records {
                self.recorder.record(
                    sink,
                    Event::new(
                        event_t,
                        EventBody::Jump {
                            index: jump.index,
                            state: jump.state,
                            hold: jump.hold,
                            obs: jump.obs,
                        },
                    ),
                );
            }
            // Each ingested batch advances the learning clock by one step.
            if let Some(last) = batch.last() {
                self.t = last.t;
            }
            let step = Event::new(
                self.t,
                EventBody::Step {
                    s: self.s,
                    gamma: 1.0,
                    walk: 0.0,
                },
            );
            self.recorder.record(sink, step);
            self.s += 1;
            if self.batch > 0 && self.s % self.batch == 1 {
                let report = self.batch_event();
                self.recorder.record(sink, report);
            }
        }
        for event in self.end_events() {
            self.recorder.record(sink, event);
        }
        Ok(())
    }

    /// Turns the engine into a pull-driven event stream: each demand runs
    /// at most one step.
    pub fn stream(self) -> EventStream {
        EventStream {
            engine: self,
            pending: VecDeque::new(),
            stage: Stage::Config,
        }
    }
}

enum Stage {
    Config,
    Running,
    Ending,
    Done,
}

/// The asynchronous pipe: a pull-driven iterator over the generative run.
/// One step of work happens per demand; events within a step drain in
/// order before the next step runs.
pub struct EventStream {
    engine: Engine,
    pending: VecDeque<Event>,
    stage: Stage,
}

impl EventStream {
    /// Read access to the underlying engine, e.g. for end-of-stream stats.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Iterator for EventStream {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            match self.stage {
                Stage::Config => {
                    self.stage = Stage::Running;
                    let event = self.engine.config_event();
                    if self.engine.recorder.accepts(&event) {
                        self.pending.push_back(event);
                    }
                }
                Stage::Running => {
                    if self.engine.s >= self.engine.steps || self.engine.halt {
                        self.stage = Stage::Ending;
                    } else {
                        for event in self.engine.advance() {
                            if self.engine.recorder.accepts(&event) {
                                self.pending.push_back(event);
                            }
                        }
                    }
                }
                Stage::Ending => {
                    self.stage = Stage::Done;
                    for event in self.engine.end_events() {
                        if self.engine.recorder.accepts(&event) {
                            self.pending.push_back(event);
                        }
                    }
                }
                Stage::Done => return None,
            }
        }
    }
}
