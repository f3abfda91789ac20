//! Playback runtime.
//!
//! Owns the state, the deck and the single attached audio resource. Events go
//! through `update`, and the returned effects are executed here. Async work
//! (narration fetches, dwell timers, audio notifications) reports back over
//! one unbounded inbox channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::effects::PlaybackEffect;
use super::events::PlaybackEvent;
use super::state::{FetchTicket, Phase, PlaybackState};
use super::update;
use crate::audio::{AudioBackend, AudioListener, AudioNotification, AudioResource, NarrationClip};
use crate::narration::NarrationFetcher;
use crate::providers::SpeechSynthesizer;
use crate::slides::{Deck, Slide};

struct AttachedAudio {
    ticket: FetchTicket,
    resource: Box<dyn AudioResource>,
}

/// Drives a deck through the playback state machine.
pub struct Synchronizer<S, B> {
    state: PlaybackState,
    deck: Arc<Deck>,
    fetcher: Arc<NarrationFetcher<S>>,
    backend: B,
    audio: Option<AttachedAudio>,
    dwell: Option<CancellationToken>,
    inbox_tx: mpsc::UnboundedSender<PlaybackEvent>,
    inbox_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
}

impl<S, B> Synchronizer<S, B>
where
    S: SpeechSynthesizer + 'static,
    B: AudioBackend,
{
    pub fn new(
        deck: Deck,
        fetcher: Arc<NarrationFetcher<S>>,
        backend: B,
        silent_dwell: Option<Duration>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            state: PlaybackState::new(deck.len(), silent_dwell),
            deck: Arc::new(deck),
            fetcher,
            backend,
            audio: None,
            dwell: None,
            inbox_tx,
            inbox_rx,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Copy of the current state, with the live position of the attached clip.
    pub fn snapshot(&self) -> PlaybackState {
        let mut snapshot = self.state.clone();
        if let Some(audio) = &self.audio
            && audio.ticket == self.state.ticket()
        {
            snapshot.position = audio.resource.position();
        }
        snapshot
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.deck.get(self.state.current_slide())
    }

    pub fn fetcher(&self) -> &NarrationFetcher<S> {
        &self.fetcher
    }

    pub fn is_finished(&self) -> bool {
        self.state.phase() == Phase::Finished
    }

    /// Runs one event through the reducer and executes its effects.
    pub fn dispatch(&mut self, event: PlaybackEvent) {
        let effects = update::update(&mut self.state, event);
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Waits for the next completion from a spawned task or the audio resource.
    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        self.inbox_rx.recv().await
    }

    /// Dispatches every event already queued, without waiting.
    /// Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }

    /// Dispatches completions until the last slide finishes.
    ///
    /// With the dwell fallback disabled and no narration this never returns
    /// unless something else dispatches `Advance`.
    pub async fn run_until_finished(&mut self) {
        while !self.is_finished() {
            match self.next_event().await {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }
    }

    fn execute_effect(&mut self, effect: PlaybackEffect) {
        match effect {
            PlaybackEffect::FetchNarration {
                ticket,
                slide_index,
            } => self.spawn_fetch(ticket, slide_index),
            PlaybackEffect::AttachAudio {
                ticket,
                clip,
                muted,
                autoplay,
            } => self.attach_audio(ticket, &clip, muted, autoplay),
            PlaybackEffect::DetachAudio => {
                if let Some(mut audio) = self.audio.take() {
                    audio.resource.detach();
                }
            }
            PlaybackEffect::PauseAudio => {
                if let Some(audio) = self.audio.as_mut() {
                    audio.resource.pause();
                }
            }
            PlaybackEffect::ResumeAudio => {
                if let Some(audio) = self.audio.as_mut()
                    && let Err(failure) = audio.resource.play()
                {
                    tracing::warn!("failed to resume narration: {failure}");
                    let _ = self.inbox_tx.send(PlaybackEvent::AudioUnavailable {
                        ticket: audio.ticket,
                    });
                }
            }
            PlaybackEffect::SetMuted { muted } => {
                if let Some(audio) = self.audio.as_mut() {
                    audio.resource.set_muted(muted);
                }
            }
            PlaybackEffect::StartDwell { ticket, after } => self.start_dwell(ticket, after),
            PlaybackEffect::CancelDwell => {
                if let Some(token) = self.dwell.take() {
                    token.cancel();
                }
            }
        }
    }

    fn spawn_fetch(&self, ticket: FetchTicket, slide_index: usize) {
        let fetcher = Arc::clone(&self.fetcher);
        let deck = Arc::clone(&self.deck);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let clip = match deck.get(slide_index) {
                Some(slide) => fetcher.fetch(&slide.script, slide_index).await,
                None => None,
            };
            let _ = tx.send(PlaybackEvent::NarrationReady { ticket, clip });
        });
    }

    fn attach_audio(&mut self, ticket: FetchTicket, clip: &NarrationClip, muted: bool, autoplay: bool) {
        if let Some(mut previous) = self.audio.take() {
            previous.resource.detach();
        }

        let mut resource = match self.backend.open(clip) {
            Ok(resource) => resource,
            Err(failure) => {
                tracing::warn!(kind = %failure.kind, "cannot open narration: {failure}");
                let _ = self.inbox_tx.send(PlaybackEvent::AudioUnavailable { ticket });
                return;
            }
        };

        resource.set_muted(muted);
        resource.attach_listener(audio_listener(self.inbox_tx.clone(), ticket));
        if autoplay && let Err(failure) = resource.play() {
            tracing::warn!(kind = %failure.kind, "cannot start narration: {failure}");
            resource.detach();
            let _ = self.inbox_tx.send(PlaybackEvent::AudioUnavailable { ticket });
            return;
        }

        self.audio = Some(AttachedAudio { ticket, resource });
    }

    fn start_dwell(&mut self, ticket: FetchTicket, after: Duration) {
        if let Some(previous) = self.dwell.take() {
            previous.cancel();
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(after) => {
                    let _ = tx.send(PlaybackEvent::DwellElapsed { ticket });
                }
            }
        });
        self.dwell = Some(token);
    }
}

impl<S, B> Drop for Synchronizer<S, B> {
    fn drop(&mut self) {
        if let Some(token) = self.dwell.take() {
            token.cancel();
        }
        if let Some(mut audio) = self.audio.take() {
            audio.resource.detach();
        }
    }
}

/// Forwards resource notifications into the inbox, tagged with `ticket`.
fn audio_listener(tx: mpsc::UnboundedSender<PlaybackEvent>, ticket: FetchTicket) -> AudioListener {
    Arc::new(move |notification| {
        let event = match notification {
            AudioNotification::Progress { position, duration } => PlaybackEvent::AudioProgress {
                ticket,
                position,
                duration,
            },
            AudioNotification::Finished => PlaybackEvent::AudioFinished { ticket },
        };
        let _ = tx.send(event);
    })
}
