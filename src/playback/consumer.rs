use crate::core::Window;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Everything a consumer sees on one tick
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Tick number since playback started from stop
    pub tick: u64,
    /// Simulated time after this tick, in seconds
    pub sim_time: f64,
    /// Samples covered by this tick
    pub window: &'a Window<'a>,
    pub sample_rate: u32,
}

impl Frame<'_> {
    /// Time of the first sample in the window, in seconds
    pub fn window_time(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.window.start() as f64 / self.sample_rate as f64
        }
    }
}

/// A rendering or logging target driven by playback.
///
/// Only `on_step` is required. Returning an error (or panicking) from any hook
/// removes the consumer from the engine for good.
pub trait StepConsumer {
    fn name(&self) -> &str {
        "consumer"
    }

    /// Called when playback starts from stop at `start` seconds
    fn on_start(&mut self, _start: f64) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_step(&mut self, frame: &Frame<'_>) -> anyhow::Result<()>;

    /// Return to the initial blank state
    fn on_reset(&mut self) {}
}

/// Adapts a closure into a [`StepConsumer`]
pub struct FnConsumer<F> {
    name: String,
    f: F,
}

impl<F> FnConsumer<F>
where
    F: FnMut(&Frame<'_>) -> anyhow::Result<()>,
{
    pub fn new(name: &str, f: F) -> Self {
        Self { name: name.to_string(), f }
    }
}

impl<F> StepConsumer for FnConsumer<F>
where
    F: FnMut(&Frame<'_>) -> anyhow::Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_step(&mut self, frame: &Frame<'_>) -> anyhow::Result<()> {
        (self.f)(frame)
    }
}

/// Handle returned on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A consumer removed after it failed
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedConsumer {
    pub id: ConsumerId,
    pub name: String,
    pub reason: String,
}

struct Entry {
    id: ConsumerId,
    consumer: Box<dyn StepConsumer>,
}

/// Ordered collection of consumers, invoked in registration order
#[derive(Default)]
pub struct ConsumerRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, consumer: Box<dyn StepConsumer>) -> ConsumerId {
        self.next_id += 1;
        let id = ConsumerId(self.next_id);
        self.entries.push(Entry { id, consumer });
        id
    }

    /// Remove a consumer; false if it was not registered
    pub fn unregister(&mut self, id: ConsumerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in invocation order
    pub fn ids(&self) -> Vec<ConsumerId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    /// Run `on_start` on every consumer, dropping the ones that fail
    pub fn start_all(&mut self, start: f64) -> Vec<DroppedConsumer> {
        self.invoke_all(|consumer| consumer.on_start(start))
    }

    /// Run `on_step` on every consumer, dropping the ones that fail
    pub fn dispatch(&mut self, frame: &Frame<'_>) -> Vec<DroppedConsumer> {
        self.invoke_all(|consumer| consumer.on_step(frame))
    }

    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            if panic::catch_unwind(AssertUnwindSafe(|| entry.consumer.on_reset())).is_err() {
                tracing::warn!("Consumer {} panicked during reset", entry.id);
            }
        }
    }

    fn invoke_all<H>(&mut self, mut hook: H) -> Vec<DroppedConsumer>
    where
        H: FnMut(&mut Box<dyn StepConsumer>) -> anyhow::Result<()>,
    {
        let mut dropped = Vec::new();

        self.entries.retain_mut(|entry| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook(&mut entry.consumer)));
            let reason = match outcome {
                Ok(Ok(())) => return true,
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => panic_message(payload),
            };
            dropped.push(DroppedConsumer {
                id: entry.id,
                name: entry.consumer.name().to_string(),
                reason,
            });
            false
        });

        dropped
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
