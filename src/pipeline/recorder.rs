use super::{Event, EventFilter, EventSink, PassAll};

/// Classifies outgoing events, defers to the user filter and forwards the
/// survivors to the sink. A refusing sink is logged once and counted; the
/// run itself continues.
pub struct Recorder {
    filter: Box<dyn EventFilter>,
    /// Events delivered to the sink.
    pub pushed: usize,
    /// Events the filter declined.
    pub dropped: usize,
    sink_failed: bool,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            filter: Box::new(PassAll),
            pushed: 0,
            dropped: 0,
            sink_failed: false,
        }
    }

    pub fn with_filter(filter: Box<dyn EventFilter>) -> Self {
        Self {
            filter,
            pushed: 0,
            dropped: 0,
            sink_failed: false,
        }
    }

    pub fn set_filter(&mut self, filter: Box<dyn EventFilter>) {
        self.filter = filter;
    }

    /// Whether the filter lets this event through.
    pub fn accepts(&self, event: &Event) -> bool {
        self.filter.accept(event)
    }

    /// Filters and forwards one event.
    pub fn record<S: EventSink>(&mut self, sink: &mut S, event: Event) {
        if !self.filter.accept(&event) {
            self.dropped += 1;
            return;
        }
        let kind = event.kind();
        match sink.push(event) {
            Ok(()) => self.pushed += 1,
            Err(e) => {
                if !self.sink_failed {
                    error!("sink refused a {} event: {}", kind, e);
                    self.sink_failed = true;
                }
                self.dropped += 1;
            }
        }
    }
}
