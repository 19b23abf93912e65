use crate::core::Dataset;
use crate::playback::consumer::{ConsumerId, ConsumerRegistry, DroppedConsumer, FnConsumer, Frame, StepConsumer};
use crate::playback::driver::{Driver, Tick};
use crate::playback::error::{PlaybackError, PlaybackResult, RangeFault};
use crate::playback::events::{EventBus, PlaybackEvent};
use crate::playback::iterator::StepIterator;
use crate::playback::{check_delay, PlaybackConfig, PlaybackState};
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long `run_until_idle` waits for a tick before re-checking the state
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Guards second-to-index conversion against values like 2.3 * 10 = 22.999...
const INDEX_EPSILON: f64 = 1e-9;

/// Playback controller for a sample dataset
///
/// Owns the step cursor, the simulated clock and the consumer registry. A
/// driver thread paces the ticks while the engine's owner handles them by
/// calling [`pump`](Self::pump) or [`wait_for_tick`](Self::wait_for_tick)
/// from its own event loop, so consumers always run on the owning thread.
pub struct PlaybackEngine<D: Dataset> {
    dataset: D,
    config: PlaybackConfig,
    state: PlaybackState,
    cursor: Option<StepIterator>,
    sim_time: f64,
    sim_origin: f64,
    session_ticks: u64,
    ticks: u64,
    expected_seq: u64,
    driver: Option<Driver>,
    consumers: ConsumerRegistry,
    events: EventBus,
}

impl<D: Dataset> PlaybackEngine<D> {
    pub fn new(dataset: D) -> Self {
        Self::with_config(dataset, PlaybackConfig::default())
    }

    pub fn with_config(dataset: D, config: PlaybackConfig) -> Self {
        Self {
            dataset,
            config,
            state: PlaybackState::Stopped,
            cursor: None,
            sim_time: 0.0,
            sim_origin: 0.0,
            session_ticks: 0,
            ticks: 0,
            expected_seq: 1,
            driver: None,
            consumers: ConsumerRegistry::new(),
            events: EventBus::new(),
        }
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Swap in a new dataset. Playback is stopped first.
    pub fn replace_dataset(&mut self, dataset: D) -> D {
        self.stop();
        std::mem::replace(&mut self.dataset, dataset)
    }

    /// Get current playback state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Current simulated time in seconds
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Ticks handled since playback last started from stop
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Index of the next window, if a playback range is active
    pub fn position(&self) -> Option<usize> {
        self.cursor.as_ref().map(StepIterator::position)
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    /// Get current playback speed
    pub fn speed(&self) -> f64 {
        self.config.speed()
    }

    /// Simulated seconds covered by each tick. Takes effect on the next play.
    pub fn set_sim_delay(&mut self, seconds: f64) -> PlaybackResult<()> {
        self.ensure_idle("change sim_delay")?;
        self.config.sim_delay = check_delay("sim_delay", seconds)?;
        Ok(())
    }

    /// Wall-clock seconds each tick should take. Takes effect on the next play.
    pub fn set_rt_delay(&mut self, seconds: f64) -> PlaybackResult<()> {
        self.ensure_idle("change rt_delay")?;
        self.config.rt_delay = check_delay("rt_delay", seconds)?;
        Ok(())
    }

    pub fn set_config(&mut self, config: PlaybackConfig) -> PlaybackResult<()> {
        self.ensure_idle("change the playback config")?;
        self.config = PlaybackConfig::new(config.sim_delay, config.rt_delay)?;
        Ok(())
    }

    pub fn register_consumer<C: StepConsumer + 'static>(&mut self, consumer: C) -> ConsumerId {
        let id = self.consumers.register(Box::new(consumer));
        debug!("Registered consumer {}", id);
        id
    }

    /// Register a closure as a consumer
    pub fn register_fn<F>(&mut self, name: &str, f: F) -> ConsumerId
    where
        F: FnMut(&Frame<'_>) -> anyhow::Result<()> + 'static,
    {
        self.register_consumer(FnConsumer::new(name, f))
    }

    pub fn unregister_consumer(&mut self, id: ConsumerId) -> bool {
        self.consumers.unregister(id)
    }

    pub fn consumer_ids(&self) -> Vec<ConsumerId> {
        self.consumers.ids()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Receive state changes, end-of-data and dropped-consumer notifications
    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        let rx = self.events.subscribe();
        debug!("Event subscribers: {}", self.events.subscriber_count());
        rx
    }

    /// Start playback over `[start, stop)` seconds, or resume when paused.
    ///
    /// When paused the range arguments are ignored and playback continues
    /// from where it left off.
    pub fn play(&mut self, start: f64, stop: f64) -> PlaybackResult<()> {
        match self.state {
            PlaybackState::Playing => {
                debug!("Play requested while already playing");
                return Ok(());
            }
            PlaybackState::Paused => return self.resume(),
            PlaybackState::Stopped => {}
        }

        if !start.is_finite() || !stop.is_finite() || start < 0.0 || stop < 0.0 {
            return Err(PlaybackError::InvalidRange {
                start: seconds_to_index(start, self.dataset.sample_rate()),
                stop: seconds_to_index(stop, self.dataset.sample_rate()),
                fault: RangeFault::BadTime,
            });
        }

        let sample_rate = self.dataset.sample_rate();
        let step = self.config.step_size(sample_rate)?;
        let rt_delay = self.config.rt_duration()?;
        let first = seconds_to_index(start, sample_rate);
        let last = seconds_to_index(stop, sample_rate);

        let cursor = StepIterator::new(first, last, step, self.dataset.len()).map_err(|e| {
            warn!("Rejected playback range {:.3}s..{:.3}s: {}", start, stop, e);
            e
        })?;

        if cursor.peek().is_none() {
            warn!(
                "Playback range {:.3}s..{:.3}s is shorter than one step of {:.3} samples",
                start, stop, step
            );
            return Err(PlaybackError::InvalidRange {
                start: first,
                stop: last,
                fault: RangeFault::TooClose,
            });
        }

        let driver = Driver::spawn(rt_delay)?;

        self.cursor = Some(cursor);
        self.sim_time = start;
        self.sim_origin = start;
        self.session_ticks = 0;
        self.ticks = 0;

        let dropped = self.consumers.start_all(start);
        report_dropped(&mut self.events, dropped);

        self.begin_session(driver);
        info!(
            "Starting playback {:.3}s..{:.3}s (step {:.3} samples, speed {:.2}x)",
            start,
            stop,
            step,
            self.config.speed()
        );
        Ok(())
    }

    /// Continue a paused playback
    pub fn resume(&mut self) -> PlaybackResult<()> {
        if self.state != PlaybackState::Paused {
            return Err(PlaybackError::InvalidState { op: "resume", state: self.state });
        }

        let step = self.config.step_size(self.dataset.sample_rate())?;
        let rt_delay = self.config.rt_duration()?;
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(PlaybackError::InvalidState { op: "resume", state: self.state });
        };

        cursor.set_step(step)?;
        if cursor.is_exhausted() {
            debug!("Resume requested at end of data");
            return Err(PlaybackError::Exhausted);
        }

        let driver = Driver::spawn(rt_delay)?;
        self.sim_origin = self.sim_time;
        self.session_ticks = 0;
        self.begin_session(driver);
        info!("Resuming playback at {:.3}s", self.sim_time);
        Ok(())
    }

    /// Pause playback, keeping position. Blocks until the driver thread exits.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        self.teardown();
        self.set_state(PlaybackState::Paused);
        info!("Playback paused at {:.3}s", self.sim_time);
    }

    /// Stop playback and reset position and consumers
    pub fn stop(&mut self) {
        self.teardown();

        self.cursor = None;
        self.sim_time = 0.0;
        self.sim_origin = 0.0;
        self.session_ticks = 0;
        self.ticks = 0;
        self.consumers.reset_all();

        if self.state != PlaybackState::Stopped {
            self.set_state(PlaybackState::Stopped);
            info!("Playback stopped");
        }
    }

    /// Handle every tick the driver has posted so far. Never blocks.
    pub fn pump(&mut self) -> PlaybackResult<usize> {
        let mut handled = 0;
        while let Some(tick) = self.driver.as_ref().and_then(Driver::try_tick) {
            self.handle_tick(tick)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Wait up to `timeout` for the next tick and handle it
    pub fn wait_for_tick(&mut self, timeout: Duration) -> PlaybackResult<bool> {
        let Some(tick) = self.driver.as_ref().and_then(|driver| driver.wait_tick(timeout)) else {
            return Ok(false);
        };
        self.handle_tick(tick)?;
        Ok(true)
    }

    /// Handle ticks on the calling thread until playback pauses or stops.
    ///
    /// Returns the number of ticks handled.
    pub fn run_until_idle(&mut self) -> PlaybackResult<u64> {
        let before = self.ticks;
        while self.is_playing() {
            self.wait_for_tick(IDLE_POLL)?;
        }
        Ok(self.ticks.saturating_sub(before))
    }

    fn handle_tick(&mut self, tick: Tick) -> PlaybackResult<()> {
        let Some(handshake) = self.driver.as_ref().map(Driver::handshake) else {
            return Ok(());
        };

        // The driver takes the previous permit before posting, so a stray
        // permit or a skipped number means two ticks overlapped.
        if tick.seq != self.expected_seq || handshake.try_acquire(1) {
            let expected = self.expected_seq;
            error!("Tick {} started before tick {} was released", tick.seq, expected);
            self.stop();
            return Err(PlaybackError::ConcurrencyViolation { expected, got: tick.seq });
        }
        self.expected_seq += 1;

        self.step();

        handshake.release(1);
        Ok(())
    }

    fn step(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            self.end_of_data();
            return;
        };

        let failure = match cursor.next_window(&self.dataset) {
            Ok(window) => {
                self.session_ticks += 1;
                self.ticks += 1;
                self.sim_time = self.sim_origin + self.session_ticks as f64 * self.config.sim_delay;

                debug!(
                    "Tick {} at {:.3}s (samples {}..{})",
                    self.ticks,
                    self.sim_time,
                    window.start(),
                    window.start() + window.len()
                );

                let frame = Frame {
                    tick: self.ticks,
                    sim_time: self.sim_time,
                    window: &window,
                    sample_rate: self.dataset.sample_rate(),
                };
                let dropped = self.consumers.dispatch(&frame);
                report_dropped(&mut self.events, dropped);
                None
            }
            Err(e) => Some(e),
        };

        match failure {
            None => {}
            Some(PlaybackError::Exhausted) => self.end_of_data(),
            Some(e) => {
                warn!("Failed to read window, pausing: {}", e);
                self.pause();
            }
        }
    }

    fn end_of_data(&mut self) {
        info!("End of data reached at {:.3}s after {} ticks", self.sim_time, self.ticks);
        self.events.emit(PlaybackEvent::EndOfData { sim_time: self.sim_time });
        self.pause();
    }

    fn begin_session(&mut self, driver: Driver) {
        self.driver = Some(driver);
        self.expected_seq = 1;
        self.set_state(PlaybackState::Playing);
    }

    fn teardown(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.shutdown();
        }
    }

    fn set_state(&mut self, to: PlaybackState) {
        let from = self.state;
        if from != to {
            self.state = to;
            self.events.emit(PlaybackEvent::StateChanged { from, to });
        }
    }

    fn ensure_idle(&self, op: &'static str) -> PlaybackResult<()> {
        if self.is_playing() {
            Err(PlaybackError::InvalidState { op, state: self.state })
        } else {
            Ok(())
        }
    }
}

fn seconds_to_index(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64 + INDEX_EPSILON).floor() as usize
}

fn report_dropped(events: &mut EventBus, dropped: Vec<DroppedConsumer>) {
    for consumer in dropped {
        warn!("Removed {}", PlaybackError::from(consumer.clone()));
        events.emit(PlaybackEvent::ConsumerDropped(consumer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SampleTable;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(2);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Seen {
        tick: u64,
        sim_time: f64,
        window_start: usize,
    }

    fn table(len: usize, sample_rate: u32) -> SampleTable {
        let channels = vec!["O1".to_string(), "O2".to_string()];
        let mut table =
            SampleTable::from_rows(channels, sample_rate, (0..len).map(|i| [i as f64, 0.5])).unwrap();
        table.set_window_size(32);
        table
    }

    fn engine(len: usize, sample_rate: u32, sim_delay: f64) -> PlaybackEngine<SampleTable> {
        let config = PlaybackConfig::new(sim_delay, 0.001).unwrap();
        PlaybackEngine::with_config(table(len, sample_rate), config)
    }

    fn record(engine: &mut PlaybackEngine<SampleTable>) -> Rc<RefCell<Vec<Seen>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        engine.register_fn("recorder", move |frame: &Frame<'_>| {
            sink.borrow_mut().push(Seen {
                tick: frame.tick,
                sim_time: frame.sim_time,
                window_start: frame.window.start(),
            });
            Ok(())
        });
        seen
    }

    fn handle_ticks(engine: &mut PlaybackEngine<SampleTable>, count: usize) {
        let mut handled = 0;
        while handled < count {
            assert!(engine.wait_for_tick(WAIT).unwrap(), "driver stalled");
            handled += 1;
        }
    }

    #[test]
    fn test_plays_every_window_then_pauses() {
        let mut engine = engine(1280, 128, 0.125);
        let seen = record(&mut engine);
        let events = engine.subscribe();

        engine.play(0.0, 10.0).unwrap();
        assert_eq!(engine.state(), PlaybackState::Playing);

        assert_eq!(engine.run_until_idle().unwrap(), 80);
        assert_eq!(engine.state(), PlaybackState::Paused);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 80);
        for (n, entry) in seen.iter().enumerate() {
            assert_eq!(entry.tick, n as u64 + 1);
            assert_eq!(entry.window_start, n * 16);
            assert_eq!(entry.sim_time, (n + 1) as f64 * 0.125);
        }
        assert_eq!(engine.sim_time(), 10.0);

        let received: Vec<PlaybackEvent> = events.try_iter().collect();
        assert!(received.contains(&PlaybackEvent::EndOfData { sim_time: 10.0 }));
        assert_eq!(
            received.last(),
            Some(&PlaybackEvent::StateChanged {
                from: PlaybackState::Playing,
                to: PlaybackState::Paused,
            })
        );
    }

    #[test]
    fn test_sim_time_counts_from_start() {
        let mut engine = engine(1000, 100, 0.1);
        let seen = record(&mut engine);

        engine.play(2.0, 3.0).unwrap();
        engine.run_until_idle().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 10);
        assert_eq!(seen[0].window_start, 200);
        for (n, entry) in seen.iter().enumerate() {
            assert_eq!(entry.sim_time, 2.0 + (n + 1) as f64 * 0.1);
        }
    }

    #[test]
    fn test_fractional_step_tracks_sim_time() {
        // 0.1s at 128 Hz is 12.8 samples per tick
        let mut engine = engine(1280, 128, 0.1);
        let seen = record(&mut engine);

        engine.play(0.0, 10.0).unwrap();
        assert_eq!(engine.run_until_idle().unwrap(), 100);
        assert!((engine.sim_time() - 10.0).abs() < 1e-9);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 100);
        for entry in seen.iter() {
            let window_end = entry.window_start as f64 / 128.0 + 0.1;
            assert!(
                (entry.sim_time - window_end).abs() < 1.0 / 128.0,
                "tick {} at {}s plays samples from {}",
                entry.tick,
                entry.sim_time,
                entry.window_start
            );
        }
        assert_eq!(seen[99].window_start, 1267);
    }

    #[test]
    fn test_huge_sim_delay_is_too_close() {
        let mut engine = engine(1280, 128, 0.125);
        engine.set_sim_delay(1e30).unwrap();

        assert!(matches!(
            engine.play(1.0, 2.0),
            Err(PlaybackError::InvalidRange { fault: RangeFault::TooClose, .. })
        ));
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_overlapping_tick_stops_playback() {
        let mut engine = engine(1280, 128, 0.125);
        let seen = record(&mut engine);
        engine.play(0.0, 10.0).unwrap();

        let tick = engine.driver.as_ref().unwrap().wait_tick(WAIT).unwrap();
        engine.handle_tick(tick).unwrap();
        assert_eq!(seen.borrow().len(), 1);

        // the same tick delivered again overlaps the one already handled
        let result = engine.handle_tick(tick);
        assert!(matches!(
            result,
            Err(PlaybackError::ConcurrencyViolation { expected: 2, got: 1 })
        ));
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.position(), None);
        assert!(engine.driver.is_none());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_range_too_close() {
        let mut engine = engine(1280, 128, 0.125);
        let result = engine.play(1.0, 1.1);
        assert!(matches!(
            result,
            Err(PlaybackError::InvalidRange { fault: RangeFault::TooClose, .. })
        ));
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.position(), None);
    }

    #[test]
    fn test_invalid_ranges_stay_stopped() {
        let mut engine = engine(1280, 128, 0.125);

        assert!(matches!(
            engine.play(0.0, 20.0),
            Err(PlaybackError::InvalidRange { fault: RangeFault::OutOfBounds { len: 1280 }, .. })
        ));
        assert!(matches!(
            engine.play(5.0, 5.0),
            Err(PlaybackError::InvalidRange { fault: RangeFault::Inverted, .. })
        ));
        assert!(matches!(
            engine.play(-1.0, 5.0),
            Err(PlaybackError::InvalidRange { fault: RangeFault::BadTime, .. })
        ));
        assert!(matches!(
            engine.play(0.0, f64::NAN),
            Err(PlaybackError::InvalidRange { fault: RangeFault::BadTime, .. })
        ));
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_pause_and_resume_without_gaps() {
        let mut engine = engine(1280, 128, 0.125);
        let seen = record(&mut engine);

        engine.play(0.0, 10.0).unwrap();
        handle_ticks(&mut engine, 5);
        engine.pause();

        assert_eq!(engine.state(), PlaybackState::Paused);
        assert_eq!(engine.sim_time(), 0.625);
        assert_eq!(engine.position(), Some(80));

        // nothing runs while paused
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.pump().unwrap(), 0);
        assert_eq!(seen.borrow().len(), 5);

        // the range is ignored when resuming
        engine.play(3.0, 4.0).unwrap();
        engine.run_until_idle().unwrap();

        let starts: Vec<usize> = seen.borrow().iter().map(|s| s.window_start).collect();
        assert_eq!(starts, (0..80).map(|n| n * 16).collect::<Vec<_>>());
        assert_eq!(engine.sim_time(), 10.0);
        assert_eq!(engine.ticks(), 80);
    }

    #[test]
    fn test_resume_at_end_of_data() {
        let mut engine = engine(256, 128, 0.125);
        engine.play(0.0, 1.0).unwrap();
        engine.run_until_idle().unwrap();

        assert!(matches!(engine.play(0.0, 1.0), Err(PlaybackError::Exhausted)));
        assert_eq!(engine.state(), PlaybackState::Paused);

        engine.stop();
        engine.play(0.0, 1.0).unwrap();
        assert_eq!(engine.run_until_idle().unwrap(), 8);
    }

    #[test]
    fn test_stop_resets_from_playing_and_paused() {
        struct Resettable {
            steps: Rc<RefCell<u32>>,
            resets: Rc<RefCell<u32>>,
        }

        impl StepConsumer for Resettable {
            fn on_step(&mut self, _frame: &Frame<'_>) -> anyhow::Result<()> {
                *self.steps.borrow_mut() += 1;
                Ok(())
            }

            fn on_reset(&mut self) {
                *self.resets.borrow_mut() += 1;
            }
        }

        let steps = Rc::new(RefCell::new(0));
        let resets = Rc::new(RefCell::new(0));
        let mut engine = engine(1280, 128, 0.125);
        engine.register_consumer(Resettable { steps: steps.clone(), resets: resets.clone() });

        engine.play(0.0, 10.0).unwrap();
        handle_ticks(&mut engine, 3);
        engine.stop();

        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.sim_time(), 0.0);
        assert_eq!(engine.position(), None);
        assert_eq!(*resets.borrow(), 1);

        engine.play(1.0, 10.0).unwrap();
        handle_ticks(&mut engine, 2);
        engine.pause();
        engine.stop();

        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.sim_time(), 0.0);
        assert_eq!(engine.position(), None);
        assert_eq!(*resets.borrow(), 2);
        assert_eq!(*steps.borrow(), 5);
    }

    #[test]
    fn test_failing_consumer_is_removed() {
        let mut engine = engine(640, 128, 0.125);
        let events = engine.subscribe();
        let seen = record(&mut engine);
        let bad = engine.register_fn("broken-plot", |_frame: &Frame<'_>| {
            anyhow::bail!("window was closed")
        });
        let first = engine.consumer_ids()[0];

        engine.play(0.0, 5.0).unwrap();
        handle_ticks(&mut engine, 1);
        assert_eq!(engine.consumer_ids(), vec![first]);

        engine.run_until_idle().unwrap();
        assert_eq!(seen.borrow().len(), 40);

        let dropped: Vec<DroppedConsumer> = events
            .try_iter()
            .filter_map(|event| match event {
                PlaybackEvent::ConsumerDropped(consumer) => Some(consumer),
                _ => None,
            })
            .collect();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, bad);
        assert_eq!(dropped[0].reason, "window was closed");
    }

    #[test]
    fn test_unregister_consumer() {
        let mut engine = engine(640, 128, 0.125);
        let seen = record(&mut engine);
        let id = engine.consumer_ids()[0];

        assert!(engine.unregister_consumer(id));
        assert!(!engine.unregister_consumer(id));

        engine.play(0.0, 1.0).unwrap();
        engine.run_until_idle().unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(engine.ticks(), 8);
    }

    #[test]
    fn test_wall_clock_pacing() {
        // speed 1.0: 10 ticks of 20ms each
        let config = PlaybackConfig::new(0.02, 0.02).unwrap();
        let mut engine = PlaybackEngine::with_config(table(100, 100), config);

        let started = Instant::now();
        engine.play(0.0, 0.2).unwrap();
        assert_eq!(engine.run_until_idle().unwrap(), 10);
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(180), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_delays_locked_while_playing() {
        let mut engine = engine(1280, 128, 0.125);
        engine.play(0.0, 10.0).unwrap();

        assert!(matches!(
            engine.set_sim_delay(0.25),
            Err(PlaybackError::InvalidState { state: PlaybackState::Playing, .. })
        ));
        assert!(engine.set_rt_delay(0.5).is_err());

        engine.pause();
        engine.set_sim_delay(0.25).unwrap();
        assert!(engine.set_rt_delay(0.0).is_err());
        assert_eq!(engine.config().sim_delay, 0.25);
    }

    #[test]
    fn test_resume_uses_new_sim_delay() {
        let mut engine = engine(1280, 128, 0.125);
        let seen = record(&mut engine);

        engine.play(0.0, 10.0).unwrap();
        handle_ticks(&mut engine, 2);
        engine.pause();

        engine.set_sim_delay(0.25).unwrap();
        engine.resume().unwrap();
        handle_ticks(&mut engine, 2);
        engine.stop();

        let seen = seen.borrow();
        let starts: Vec<usize> = seen.iter().map(|s| s.window_start).collect();
        assert_eq!(starts, vec![0, 16, 32, 64]);
        assert_eq!(seen[3].sim_time, 0.75);
    }

    #[test]
    fn test_play_while_playing_is_ignored() {
        let mut engine = engine(1280, 128, 0.125);
        engine.play(0.0, 10.0).unwrap();
        handle_ticks(&mut engine, 1);
        engine.play(5.0, 10.0).unwrap();
        handle_ticks(&mut engine, 1);
        assert_eq!(engine.position(), Some(32));
        engine.stop();
    }

    #[test]
    fn test_replace_dataset_stops_playback() {
        let mut engine = engine(1280, 128, 0.125);
        engine.play(0.0, 10.0).unwrap();

        let old = engine.replace_dataset(table(64, 32));
        assert_eq!(old.len(), 1280);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.dataset().len(), 64);
    }

    #[test]
    fn test_seconds_to_index() {
        assert_eq!(seconds_to_index(2.3, 10), 23);
        assert_eq!(seconds_to_index(10.0, 128), 1280);
        assert_eq!(seconds_to_index(0.05, 128), 6);
    }
}
