use crate::playback::handshake::Handshake;
use crate::playback::error::PlaybackError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Step event posted by the driver once per tick
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// 1-based tick number within the driver session
    pub seq: u64,
    /// Wall-clock instant before which the next tick will not start
    pub deadline: Instant,
}

/// Paced loop run on the driver thread
///
/// Each iteration posts a [`Tick`], waits for the handler to hand the permit
/// back, then sleeps out whatever is left of `rt_delay`.
pub struct PacedLoop {
    rt_delay: Duration,
    running: Arc<AtomicBool>,
    handshake: Arc<Handshake>,
    ticks: Sender<Tick>,
}

impl PacedLoop {
    pub fn new(rt_delay: Duration, handshake: Arc<Handshake>, ticks: Sender<Tick>) -> Self {
        Self {
            rt_delay,
            running: Arc::new(AtomicBool::new(true)),
            handshake,
            ticks,
        }
    }

    /// Flag that ends the loop after its current iteration once cleared
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn run(self) {
        let mut seq = 0u64;

        while self.running.load(Ordering::Acquire) {
            let deadline = Instant::now() + self.rt_delay;
            seq += 1;

            if self.ticks.send(Tick { seq, deadline }).is_err() {
                debug!("Tick receiver gone, driver exiting after {} ticks", seq - 1);
                break;
            }

            self.handshake.acquire(1);

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }

            thread::yield_now();
        }

        debug!("Paced loop finished after {} ticks", seq);
    }
}

/// A running driver thread together with the state it shares with the host
pub struct Driver {
    running: Arc<AtomicBool>,
    handshake: Arc<Handshake>,
    ticks: Receiver<Tick>,
    handle: Option<JoinHandle<()>>,
}

impl Driver {
    /// Start a fresh handshake, paced loop and worker thread
    pub fn spawn(rt_delay: Duration) -> Result<Self, PlaybackError> {
        let handshake = Arc::new(Handshake::new());
        let (tx, rx) = mpsc::channel();
        let paced = PacedLoop::new(rt_delay, handshake.clone(), tx);
        let running = paced.running_flag();

        let handle = thread::Builder::new()
            .name("veegs-driver".to_string())
            .spawn(move || paced.run())
            .map_err(PlaybackError::WorkerSpawn)?;

        debug!("Driver thread started (rt_delay: {:?})", rt_delay);

        Ok(Self {
            running,
            handshake,
            ticks: rx,
            handle: Some(handle),
        })
    }

    pub fn handshake(&self) -> Arc<Handshake> {
        self.handshake.clone()
    }

    /// Next pending tick, if one has been posted
    pub fn try_tick(&self) -> Option<Tick> {
        self.ticks.try_recv().ok()
    }

    /// Wait up to `timeout` for the next tick
    pub fn wait_tick(&self, timeout: Duration) -> Option<Tick> {
        match self.ticks.recv_timeout(timeout) {
            Ok(tick) => Some(tick),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop the loop and block until the worker thread has exited
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        // The flag must be cleared before the permit is handed out, otherwise the
        // loop could take the permit, start another tick and wait forever.
        self.running.store(false, Ordering::Release);
        self.handshake.release(1);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Driver thread panicked");
            }
            debug!("Driver thread joined");
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
