use std::time::Duration;

use super::state::FetchTicket;
use crate::audio::NarrationClip;

/// Inputs to the reducer: user intents and async completions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Start from the first slide
    Begin,
    TogglePause,
    /// Jump back to the first slide and play
    Restart,
    ToggleMute,
    /// Skip to the next slide as if its narration had finished
    Advance,

    /// The fetch issued with `ticket` completed; `None` means play silently.
    NarrationReady {
        ticket: FetchTicket,
        clip: Option<NarrationClip>,
    },
    /// The clip could not be opened or started.
    AudioUnavailable { ticket: FetchTicket },
    AudioProgress {
        ticket: FetchTicket,
        position: Duration,
        duration: Duration,
    },
    AudioFinished { ticket: FetchTicket },
    /// A silent slide's dwell timer ran out.
    DwellElapsed { ticket: FetchTicket },
}

impl PlaybackEvent {
    /// Ticket of a completion event; `None` for user intents.
    pub fn ticket(&self) -> Option<FetchTicket> {
        match self {
            Self::Begin | Self::TogglePause | Self::Restart | Self::ToggleMute | Self::Advance => {
                None
            }
            Self::NarrationReady { ticket, .. }
            | Self::AudioUnavailable { ticket }
            | Self::AudioProgress { ticket, .. }
            | Self::AudioFinished { ticket }
            | Self::DwellElapsed { ticket } => Some(*ticket),
        }
    }
}
