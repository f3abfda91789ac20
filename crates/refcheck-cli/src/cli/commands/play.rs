//! Headless deck playback driven from stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{io, thread};

use anyhow::Result;
use refcheck_core::audio::{AudioBackend, ClockedBackend};
use refcheck_core::config::Config;
use refcheck_core::interrupt::{self, InterruptedError};
use refcheck_core::narration::NarrationFetcher;
use refcheck_core::playback::{NarrationSlot, Phase, PlaybackEvent, Synchronizer};
use refcheck_core::providers::SpeechSynthesizer;
use tokio::sync::mpsc;

use super::{gemini_client, load_deck};

#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Overrides `narration.enabled`
    pub narration: Option<bool>,
    pub muted: bool,
    /// Overrides `narration.silent_dwell_ms`
    pub dwell_ms: Option<u64>,
    pub deck: Option<PathBuf>,
}

/// Single-key controls read line by line from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Restart,
    Mute,
    Next,
    Quit,
}

impl Control {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Self::Pause),
            "r" | "restart" => Some(Self::Restart),
            "m" | "mute" => Some(Self::Mute),
            "n" | "next" => Some(Self::Next),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }

    fn event(self) -> Option<PlaybackEvent> {
        match self {
            Self::Pause => Some(PlaybackEvent::TogglePause),
            Self::Restart => Some(PlaybackEvent::Restart),
            Self::Mute => Some(PlaybackEvent::ToggleMute),
            Self::Next => Some(PlaybackEvent::Advance),
            Self::Quit => None,
        }
    }
}

pub async fn run(options: &PlayOptions, config: &Config) -> Result<()> {
    let deck = load_deck(options.deck.as_deref())?;
    let enabled = options.narration.unwrap_or(config.narration.enabled);
    let fetcher = NarrationFetcher::new(gemini_client(config)?, enabled, config.retry.policy())
        .with_default_sample_rate(config.narration.sample_rate);
    if enabled && !fetcher.is_available() {
        tracing::warn!("No Gemini API key configured; slides will play without narration");
    }

    let dwell = match options.dwell_ms {
        Some(ms) => (ms > 0).then(|| Duration::from_millis(ms)),
        None => config.narration.silent_dwell(),
    };

    let mut sync = Synchronizer::new(deck, Arc::new(fetcher), ClockedBackend::default(), dwell);
    let mut view = View::default();
    if options.muted {
        sync.dispatch(PlaybackEvent::ToggleMute);
    }
    sync.dispatch(PlaybackEvent::Begin);
    view.render(&sync);

    let mut controls = spawn_control_reader();
    let mut controls_open = true;

    while !sync.is_finished() {
        tokio::select! {
            event = sync.next_event() => match event {
                Some(event) => sync.dispatch(event),
                None => break,
            },
            line = controls.recv(), if controls_open => match line {
                Some(line) => match Control::parse(&line) {
                    Some(Control::Quit) => {
                        println!("Stopped at slide {}", sync.state().slide_label());
                        return Ok(());
                    }
                    Some(control) => {
                        if let Some(event) = control.event() {
                            sync.dispatch(event);
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("Unknown control {:?} (p, r, m, n, q)", line.trim()),
                },
                None => controls_open = false,
            },
            () = interrupt::wait_for_interrupt() => return Err(InterruptedError.into()),
        }
        view.render(&sync);

        // Without stdin nothing can resume a pause or advance a silent slide.
        if !controls_open && sync.state().needs_input() {
            println!(
                "Controls closed; stopped at slide {}",
                sync.state().slide_label()
            );
            return Ok(());
        }
    }

    println!("Presentation finished");
    Ok(())
}

/// Reads stdin on a plain thread so a pending read never blocks shutdown.
fn spawn_control_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Prints what changed since the last render.
#[derive(Default)]
struct View {
    slide: Option<usize>,
    phase: Option<Phase>,
    muted: bool,
}

impl View {
    fn render<S, B>(&mut self, sync: &Synchronizer<S, B>)
    where
        S: SpeechSynthesizer + 'static,
        B: AudioBackend,
    {
        let state = sync.snapshot();
        let phase = state.phase();
        let slide_index = state.current_slide();
        let same_slide = self.slide == Some(slide_index);

        if phase == Phase::Loading
            && (self.phase != Some(Phase::Loading) || !same_slide)
            && let Some(slide) = sync.current_slide()
        {
            println!();
            println!("[{}] {}", state.slide_label(), slide.title);
            if !slide.subtitle.is_empty() {
                println!("    {}", slide.subtitle);
            }
            for bullet in &slide.bullets {
                println!("    - {bullet}");
            }
            println!("    \"{}\"", slide.script);
        }

        if self.phase != Some(phase) {
            match (self.phase, phase) {
                (Some(Phase::Loading), Phase::Playing | Phase::Paused) => {
                    match state.narration() {
                        NarrationSlot::Attached(_) => {
                            println!("    (narration {})", state.time_label());
                        }
                        NarrationSlot::Silent | NarrationSlot::None => {
                            println!("    (no narration)");
                        }
                    }
                    if phase == Phase::Paused {
                        println!("Paused");
                    }
                }
                (Some(Phase::Playing), Phase::Paused) => {
                    println!("Paused at {}", state.time_label());
                }
                (Some(Phase::Paused), Phase::Playing) => println!("Resumed"),
                _ => {}
            }
        }

        if state.is_muted() != self.muted {
            println!("{}", if state.is_muted() { "Muted" } else { "Unmuted" });
        }

        self.slide = Some(slide_index);
        self.phase = Some(phase);
        self.muted = state.is_muted();
    }
}
