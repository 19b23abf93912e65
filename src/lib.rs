//! Paced playback of multichannel sample recordings.
//!
//! A [`PlaybackEngine`](playback::PlaybackEngine) steps through a
//! [`Dataset`](core::Dataset) in fixed simulated-time increments while a driver
//! thread keeps the ticks in step with the wall clock, handing each window to
//! the registered rendering or logging consumers.

pub mod core;
pub mod input;
pub mod output;
pub mod playback;
pub mod settings;
