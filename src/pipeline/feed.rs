use crate::config::FieldKeys;
use crate::errors::EngineError;
use std::io::Read;

/// One externally supplied, time-ordered observation event.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnEvent {
    /// Ensemble index of the member the event belongs to.
    pub n: usize,
    /// State symbol (categorical) or a numeric value (stateless).
    pub state: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Event time; batches must be non-decreasing in `t`.
    pub t: f64,
}

impl LearnEvent {
    pub fn new(n: usize, state: &str, t: f64) -> Self {
        Self {
            n,
            state: state.to_string(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            t,
        }
    }

    pub fn with_obs(mut self, x: f64, y: f64, z: f64) -> Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }
}

/// Pulls the next batch of time-ordered events for the learning driver.
/// `None` signals the end of the feed.
pub trait ObservationFeed {
    fn next_batch(&mut self) -> Option<Vec<LearnEvent>>;
}

/// Feeds a pre-collected event list in fixed-size batches.
pub struct SliceFeed {
    events: Vec<LearnEvent>,
    cursor: usize,
    batch_size: usize,
}

impl SliceFeed {
    pub fn new(events: Vec<LearnEvent>, batch_size: usize) -> Self {
        Self {
            events,
            cursor: 0,
            batch_size: batch_size.max(1),
        }
    }
}

impl ObservationFeed for SliceFeed {
    fn next_batch(&mut self) -> Option<Vec<LearnEvent>> {
        if self.cursor >= self.events.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.events.len());
        let batch = self.events[self.cursor..end].to_vec();
        self.cursor = end;
        Some(batch)
    }
}

/// Reads observation events from CSV records, resolving the columns through
/// the configured field keys. Missing observation columns default to zero.
pub fn read_events<R: Read>(reader: R, keys: &FieldKeys) -> Result<Vec<LearnEvent>, EngineError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| EngineError::Config(format!("unreadable event headers: {}", e)))?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let n_col = col(&keys.n)
        .ok_or_else(|| EngineError::Config(format!("event records lack a `{}` column", keys.n)))?;
    // The state may arrive under either the state key or the count key.
    let state_col = col(&keys.u).or_else(|| col(&keys.k)).ok_or_else(|| {
        EngineError::Config(format!(
            "event records lack a `{}` or `{}` column",
            keys.u, keys.k
        ))
    })?;
    let t_col = col(&keys.t)
        .ok_or_else(|| EngineError::Config(format!("event records lack a `{}` column", keys.t)))?;
    let x_col = col(&keys.x);
    let y_col = col(&keys.y);
    let z_col = col(&keys.z);

    let float_at = |record: &csv::StringRecord, idx: Option<usize>| -> f64 {
        idx.and_then(|i| record.get(i))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0)
    };

    let mut events = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| EngineError::Config(format!("bad event record: {}", e)))?;
        let n = record
            .get(n_col)
            .and_then(|v| v.parse::<usize>().ok())
            .ok_or_else(|| EngineError::Config("bad member index in event record".to_string()))?;
        let state = record.get(state_col).unwrap_or("").to_string();
        let t = float_at(&record, Some(t_col));
        events.push(LearnEvent {
            n,
            state,
            x: float_at(&record, x_col),
            y: float_at(&record, y_col),
            z: float_at(&record, z_col),
            t,
        });
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_feed_batches() {
        let events: Vec<LearnEvent> = (0..5)
            .map(|i| LearnEvent::new(i, "0", i as f64))
            .collect();
        let mut feed = SliceFeed::new(events, 2);
        assert_eq!(feed.next_batch().unwrap().len(), 2);
        assert_eq!(feed.next_batch().unwrap().len(), 2);
        assert_eq!(feed.next_batch().unwrap().len(), 1);
        assert!(feed.next_batch().is_none());
    }

    #[test]
    fn csv_events_resolve_keys() {
        let data = "n,u,x,y,z,t\n0,up,1.5,0.0,0.0,0.25\n1,down,,,,0.5\n";
        let keys = FieldKeys::default();
        let events = read_events(data.as_bytes(), &keys).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].state, "up");
        assert_eq!(events[0].x, 1.5);
        assert_eq!(events[1].t, 0.5);
        assert_eq!(events[1].x, 0.0);
    }
}
