//! Audio resource adapter.
//!
//! - `clip`: PCM → WAV encoding and the cached playable clip
//! - `clock`: headless backend that plays clips against the tokio clock
//!
//! The synchronizer only sees [`AudioResource`] and [`AudioBackend`]; it never
//! touches a device API directly, so tests drive it with fakes.

use std::sync::Arc;
use std::time::Duration;

use crate::failure::Failure;

mod clip;
mod clock;

pub use clip::NarrationClip;
pub use clock::{ClockedBackend, ClockedResource};

/// Notifications emitted by an attached resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioNotification {
    Progress {
        position: Duration,
        duration: Duration,
    },
    Finished,
}

/// Callback registered on a resource. Cleared by [`AudioResource::detach`].
pub type AudioListener = Arc<dyn Fn(AudioNotification) + Send + Sync>;

/// A playable, in-memory audio clip.
pub trait AudioResource: Send {
    /// Starts or resumes playback from the current position.
    ///
    /// # Errors
    /// Returns an error if the backend cannot start output.
    fn play(&mut self) -> Result<(), Failure>;

    /// Stops advancing; the position is kept.
    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    fn duration(&self) -> Duration;

    fn position(&self) -> Duration;

    /// Replaces the notification listener.
    fn attach_listener(&mut self, listener: AudioListener);

    /// Stops playback and drops the listener; no notification fires afterwards.
    fn detach(&mut self);
}

/// Turns a decoded clip into a playable resource.
pub trait AudioBackend: Send {
    /// # Errors
    /// Returns [`crate::failure::FailureKind::DecodeError`] if the clip cannot be played.
    fn open(&mut self, clip: &NarrationClip) -> Result<Box<dyn AudioResource>, Failure>;
}
