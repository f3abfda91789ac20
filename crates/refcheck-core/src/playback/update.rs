//! Playback reducer.
//!
//! All state transitions happen here. The synchronizer calls
//! `update(state, event)` and executes the returned effects; nothing in this
//! file performs I/O.

use std::time::Duration;

use super::effects::PlaybackEffect;
use super::events::PlaybackEvent;
use super::state::{FetchTicket, NarrationSlot, Phase, PlaybackState};
use crate::audio::NarrationClip;

/// Applies `event` to `state` and returns the effects to run.
pub fn update(state: &mut PlaybackState, event: PlaybackEvent) -> Vec<PlaybackEffect> {
    if let Some(ticket) = event.ticket()
        && ticket != state.ticket
    {
        tracing::debug!(
            stale = ticket.0,
            current = state.ticket.0,
            "discarding stale playback event"
        );
        return vec![];
    }

    match event {
        PlaybackEvent::Begin => match state.phase {
            Phase::Idle => start_from_first(state),
            _ => vec![],
        },
        PlaybackEvent::TogglePause => toggle_pause(state),
        PlaybackEvent::Restart => start_from_first(state),
        PlaybackEvent::ToggleMute => {
            state.is_muted = !state.is_muted;
            match state.narration {
                NarrationSlot::Attached(_) => vec![PlaybackEffect::SetMuted {
                    muted: state.is_muted,
                }],
                _ => vec![],
            }
        }
        PlaybackEvent::Advance => match state.phase {
            Phase::Loading | Phase::Playing | Phase::Paused => advance(state),
            Phase::Idle | Phase::Finished => vec![],
        },
        PlaybackEvent::NarrationReady { ticket, clip } => {
            if state.phase != Phase::Loading {
                return vec![];
            }
            match clip {
                Some(clip) => attach(state, ticket, clip),
                None => go_silent(state),
            }
        }
        PlaybackEvent::AudioUnavailable { ticket } => match state.narration {
            NarrationSlot::Attached(attached) if attached == ticket => {
                let mut effects = vec![PlaybackEffect::DetachAudio];
                effects.extend(go_silent(state));
                effects
            }
            NarrationSlot::None if state.phase == Phase::Loading => go_silent(state),
            _ => vec![],
        },
        PlaybackEvent::AudioProgress {
            ticket,
            position,
            duration,
        } => {
            if state.narration == NarrationSlot::Attached(ticket) {
                state.position = position;
                state.duration = duration;
            }
            vec![]
        }
        PlaybackEvent::AudioFinished { ticket } => {
            if state.narration == NarrationSlot::Attached(ticket) && state.phase == Phase::Playing {
                state.position = state.duration;
                advance(state)
            } else {
                vec![]
            }
        }
        PlaybackEvent::DwellElapsed { .. } => {
            if state.narration == NarrationSlot::Silent && state.phase == Phase::Playing {
                advance(state)
            } else {
                vec![]
            }
        }
    }
}

fn start_from_first(state: &mut PlaybackState) -> Vec<PlaybackEffect> {
    let mut effects = leave_slide(state);
    state.is_playing = true;
    effects.extend(enter_slide(state, 0));
    effects
}

fn toggle_pause(state: &mut PlaybackState) -> Vec<PlaybackEffect> {
    match state.phase {
        Phase::Idle => start_from_first(state),
        Phase::Finished => vec![],
        Phase::Loading => {
            // The fetch stays in flight; the flag decides whether the clip
            // autoplays once it lands.
            state.is_playing = !state.is_playing;
            vec![]
        }
        Phase::Playing => {
            state.is_playing = false;
            state.phase = Phase::Paused;
            match state.narration {
                NarrationSlot::Attached(_) => vec![PlaybackEffect::PauseAudio],
                NarrationSlot::Silent => vec![PlaybackEffect::CancelDwell],
                NarrationSlot::None => vec![],
            }
        }
        Phase::Paused => {
            state.is_playing = true;
            state.phase = Phase::Playing;
            match state.narration {
                NarrationSlot::Attached(_) => vec![PlaybackEffect::ResumeAudio],
                NarrationSlot::Silent => {
                    // Re-arm with a fresh ticket so a timer that fired before
                    // the pause cannot advance the slide early.
                    state.ticket = state.ticket.next();
                    start_dwell(state)
                }
                NarrationSlot::None => vec![],
            }
        }
    }
}

/// Moves past the current slide: to the next one, or to `Finished`.
fn advance(state: &mut PlaybackState) -> Vec<PlaybackEffect> {
    let mut effects = leave_slide(state);
    if state.is_last_slide() {
        state.phase = Phase::Finished;
        state.is_playing = false;
        state.ticket = state.ticket.next();
    } else {
        effects.extend(enter_slide(state, state.current_slide + 1));
    }
    effects
}

/// Releases whatever drives the current slide.
fn leave_slide(state: &mut PlaybackState) -> Vec<PlaybackEffect> {
    let effects = match state.narration {
        NarrationSlot::Attached(_) => vec![PlaybackEffect::DetachAudio],
        NarrationSlot::Silent => vec![PlaybackEffect::CancelDwell],
        NarrationSlot::None => vec![],
    };
    state.narration = NarrationSlot::None;
    effects
}

fn enter_slide(state: &mut PlaybackState, index: usize) -> Vec<PlaybackEffect> {
    state.current_slide = index.min(state.slide_count - 1);
    state.position = Duration::ZERO;
    state.duration = Duration::ZERO;
    state.narration = NarrationSlot::None;
    state.phase = Phase::Loading;
    state.ticket = state.ticket.next();

    vec![PlaybackEffect::FetchNarration {
        ticket: state.ticket,
        slide_index: state.current_slide,
    }]
}

fn attach(state: &mut PlaybackState, ticket: FetchTicket, clip: NarrationClip) -> Vec<PlaybackEffect> {
    state.narration = NarrationSlot::Attached(ticket);
    state.position = Duration::ZERO;
    state.duration = clip.duration();
    state.phase = if state.is_playing {
        Phase::Playing
    } else {
        Phase::Paused
    };

    vec![
        PlaybackEffect::DetachAudio,
        PlaybackEffect::AttachAudio {
            ticket,
            clip,
            muted: state.is_muted,
            autoplay: state.is_playing,
        },
    ]
}

fn go_silent(state: &mut PlaybackState) -> Vec<PlaybackEffect> {
    state.narration = NarrationSlot::Silent;
    state.position = Duration::ZERO;
    state.duration = Duration::ZERO;
    state.phase = if state.is_playing {
        Phase::Playing
    } else {
        Phase::Paused
    };

    if state.is_playing {
        start_dwell(state)
    } else {
        vec![]
    }
}

fn start_dwell(state: &PlaybackState) -> Vec<PlaybackEffect> {
    state
        .silent_dwell
        .map(|after| PlaybackEffect::StartDwell {
            ticket: state.ticket,
            after,
        })
        .into_iter()
        .collect()
}
