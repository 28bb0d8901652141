use crate::stats::RunStats;
use serde_derive::Serialize;

/// One outgoing event: its time tag plus the classified payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub t: f64,
    #[serde(flatten)]
    pub body: EventBody,
}

impl Event {
    pub fn new(t: f64, body: EventBody) -> Self {
        Self { t, body }
    }

    /// The classification tag of this event.
    pub fn kind(&self) -> &'static str {
        match self.body {
            EventBody::Config { .. } => "config",
            EventBody::Step { .. } => "step",
            EventBody::Jump { .. } => "jump",
            EventBody::Batch { .. } => "batch",
            EventBody::End { .. } => "end",
            EventBody::Error { .. } => "error",
        }
    }
}

/// The event payloads, tagged by kind on serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum EventBody {
    /// Emitted once, after the configuration resolves.
    Config {
        process: String,
        states: usize,
        members: usize,
        steps: usize,
        dt: f64,
        ctmode: bool,
        batch: usize,
        symbols: Vec<String>,
        tr_probs: Vec<Vec<f64>>,
        eq_probs: Vec<f64>,
        mean_recurrence: Vec<Vec<f64>>,
        absorb_times: Vec<f64>,
        absorb_probs: Vec<Vec<f64>>,
        absorb_states: Vec<usize>,
    },
    /// Emitted at every step.
    Step { s: usize, gamma: f64, walk: f64 },
    /// Emitted for every member jump.
    Jump {
        index: usize,
        state: usize,
        hold: f64,
        obs: Option<Vec<f64>>,
    },
    /// Emitted every `batch` steps when batch reporting is enabled.
    Batch {
        s: usize,
        count_freq: Vec<u64>,
        count_prob: Vec<f64>,
        rel_error: f64,
        mle_em_events: usize,
        mle_tr_probs: Vec<Vec<f64>>,
        stat_corr: f64,
    },
    /// Emitted once at the end of a run.
    End { stats: RunStats },
    /// Emitted when a recoverable fault degrades a derived quantity.
    Error { error: String },
}
