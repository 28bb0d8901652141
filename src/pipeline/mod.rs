/*!
The pipeline driver and its event plumbing.

The engine is the producer in both pipe modes: the synchronous driver runs
the whole generative loop and delivers events through a sink, while the
pull-driven [`EventStream`] advances exactly one step per demand. Learning
mode replaces the sink with an [`ObservationFeed`](feed::ObservationFeed)
that hands time-ordered batches back to the stepper.
*/

use crate::errors::EngineError;
use std::sync::mpsc::Sender;

/// The outgoing event model.
pub mod events;

/// External observation feeds for learning mode.
pub mod feed;

/// The recorder which classifies and filters outgoing events.
pub mod recorder;

/// The engine driver and the pull-driven event stream.
pub mod driver;

pub use self::driver::{Engine, EventStream};
pub use self::events::{Event, EventBody};
pub use self::feed::{LearnEvent, ObservationFeed, SliceFeed};
pub use self::recorder::Recorder;

/// A downstream consumer of events. The engine retains no reference to a
/// pushed event.
pub trait EventSink {
    fn push(&mut self, event: Event) -> Result<(), EngineError>;
}

/// The canonical synchronous sink: an in-memory event list.
impl EventSink for Vec<Event> {
    fn push(&mut self, event: Event) -> Result<(), EngineError> {
        Vec::push(self, event);
        Ok(())
    }
}

/// A sink backed by a channel sender, for consumers on another thread.
pub struct ChannelSink {
    tx: Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn push(&mut self, event: Event) -> Result<(), EngineError> {
        self.tx
            .send(event)
            .map_err(|e| EngineError::Sink(e.to_string()))
    }
}

/// Decides whether an outgoing event reaches the sink.
pub trait EventFilter: Send {
    fn accept(&self, event: &Event) -> bool;
}

/// The default filter: everything goes through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassAll;

impl EventFilter for PassAll {
    fn accept(&self, _event: &Event) -> bool {
        true
    }
}

impl<F> EventFilter for F
where
    F: Fn(&Event) -> bool + Send,
{
    fn accept(&self, event: &Event) -> bool {
        self(event)
    }
}
