use crate::core::{Dataset, Window};
use crate::playback::error::{PlaybackError, PlaybackResult, RangeFault};
use std::iter::FusedIterator;

/// Absorbs rounding in fractional step arithmetic, e.g. 100 * 12.8 samples
const STEP_EPSILON: f64 = 1e-6;

/// Forward-only cursor over window start indices
///
/// The step is measured in samples and may be fractional. Window `n` starts at
/// `floor(origin + n * step)`, so the position never drifts from the
/// simulated clock. Windows are yielded while a whole step still fits before
/// `stop`, so `[start, stop)` produces `floor((stop - start) / step)` windows.
#[derive(Debug, Clone, PartialEq)]
pub struct StepIterator {
    start: usize,
    stop: usize,
    step: f64,
    /// Exact sample position the current step size was adopted at
    origin: f64,
    /// Windows taken since `origin`
    taken: u64,
}

impl StepIterator {
    /// Validate `[start, stop)` against a dataset of `len` samples
    pub fn new(start: usize, stop: usize, step: f64, len: usize) -> PlaybackResult<Self> {
        let fault = if !valid_step(step) {
            Some(RangeFault::StepTooSmall)
        } else if start >= stop {
            Some(RangeFault::Inverted)
        } else if stop > len {
            Some(RangeFault::OutOfBounds { len })
        } else {
            None
        };

        if let Some(fault) = fault {
            return Err(PlaybackError::InvalidRange { start, stop, fault });
        }

        Ok(Self {
            start,
            stop,
            step,
            origin: start as f64,
            taken: 0,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        self.stop
    }

    /// Samples advanced per window
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Index the next window will start at
    pub fn position(&self) -> usize {
        (self.exact_position() + STEP_EPSILON).floor() as usize
    }

    /// Start of the next window without consuming it
    pub fn peek(&self) -> Option<usize> {
        let end = self.origin + (self.taken + 1) as f64 * self.step;
        (end <= self.stop as f64 + STEP_EPSILON).then(|| self.position())
    }

    pub fn is_exhausted(&self) -> bool {
        self.peek().is_none()
    }

    /// Windows left before the stop boundary
    pub fn remaining(&self) -> usize {
        let left = (self.stop as f64 - self.exact_position()) / self.step;
        (left + STEP_EPSILON).floor().max(0.0) as usize
    }

    /// Change the step size, keeping the current position
    pub fn set_step(&mut self, step: f64) -> PlaybackResult<()> {
        if !valid_step(step) {
            return Err(PlaybackError::InvalidRange {
                start: Self::position(self),
                stop: self.stop,
                fault: RangeFault::StepTooSmall,
            });
        }
        self.origin = self.exact_position();
        self.taken = 0;
        self.step = step;
        Ok(())
    }

    /// Advance and borrow the matching window from `dataset`.
    ///
    /// Returns [`PlaybackError::Exhausted`] once the stop boundary is reached.
    pub fn next_window<'d, D: Dataset + ?Sized>(&mut self, dataset: &'d D) -> PlaybackResult<Window<'d>> {
        let start = self.next().ok_or(PlaybackError::Exhausted)?;
        Ok(dataset.window(start)?)
    }

    fn exact_position(&self) -> f64 {
        self.origin + self.taken as f64 * self.step
    }
}

fn valid_step(step: f64) -> bool {
    step.is_finite() && step >= 1.0
}

impl Iterator for StepIterator {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.peek()?;
        self.taken += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StepIterator {}

impl FusedIterator for StepIterator {}
