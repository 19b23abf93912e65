use crate::playback::consumer::DroppedConsumer;
use crate::playback::PlaybackState;
use std::sync::mpsc::{self, Receiver, Sender};

/// Notifications published by the playback engine
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StateChanged { from: PlaybackState, to: PlaybackState },
    /// A consumer failed and was removed from the registry
    ConsumerDropped(DroppedConsumer),
    /// The step iterator ran out of windows; playback paused
    EndOfData { sim_time: f64 },
}

/// Fan-out of events to any number of subscribers
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Sender<PlaybackEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver to every live subscriber, forgetting the ones that hung up
    pub fn emit(&mut self, event: PlaybackEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
