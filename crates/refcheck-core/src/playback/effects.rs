//! Playback effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes:
//! audio resource calls and task spawning. The reducer itself never touches
//! the network, the audio backend or a timer.

use std::time::Duration;

use super::state::FetchTicket;
use crate::audio::NarrationClip;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEffect {
    /// Fetch narration for `slide_index`; reply with `NarrationReady { ticket }`.
    FetchNarration {
        ticket: FetchTicket,
        slide_index: usize,
    },
    /// Open `clip`, apply the mute flag, attach a listener tagged with
    /// `ticket`, and start it when `autoplay` is set.
    AttachAudio {
        ticket: FetchTicket,
        clip: NarrationClip,
        muted: bool,
        autoplay: bool,
    },
    /// Stop and release the attached resource, if any.
    DetachAudio,
    PauseAudio,
    ResumeAudio,
    SetMuted {
        muted: bool,
    },
    /// Reply with `DwellElapsed { ticket }` after `after`.
    StartDwell {
        ticket: FetchTicket,
        after: Duration,
    },
    CancelDwell,
}
