use std::time::Duration;

/// Generation counter for narration requests.
///
/// Every move onto a slide issues a new ticket. Completions carrying an older
/// ticket belong to a slide the user already left and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FetchTicket(pub u64);

impl FetchTicket {
    pub(super) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing started yet
    #[default]
    Idle,
    /// Waiting for the current slide's narration
    Loading,
    Playing,
    Paused,
    /// Last slide completed
    Finished,
}

/// What is driving the current slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrationSlot {
    /// Not resolved yet (idle, loading, finished)
    #[default]
    None,
    /// No audio: the slide advances on the dwell timer or manually
    Silent,
    /// A resource is attached; its notifications carry this ticket
    Attached(FetchTicket),
}

/// Presentation state. Owned by the synchronizer and changed only by
/// [`super::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub(super) slide_count: usize,
    pub(super) current_slide: usize,
    pub(super) is_playing: bool,
    pub(super) is_muted: bool,
    pub(super) position: Duration,
    pub(super) duration: Duration,
    pub(super) phase: Phase,
    pub(super) narration: NarrationSlot,
    pub(super) ticket: FetchTicket,
    pub(super) silent_dwell: Option<Duration>,
}

impl PlaybackState {
    /// `silent_dwell` is how long a slide without audio stays up; `None`
    /// means such slides wait for a manual advance.
    pub fn new(slide_count: usize, silent_dwell: Option<Duration>) -> Self {
        Self {
            slide_count: slide_count.max(1),
            current_slide: 0,
            is_playing: false,
            is_muted: false,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            phase: Phase::Idle,
            narration: NarrationSlot::None,
            ticket: FetchTicket::default(),
            silent_dwell: silent_dwell.filter(|d| !d.is_zero()),
        }
    }

    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    pub fn current_slide(&self) -> usize {
        self.current_slide
    }

    pub fn is_last_slide(&self) -> bool {
        self.current_slide + 1 >= self.slide_count
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn narration(&self) -> NarrationSlot {
        self.narration
    }

    pub fn ticket(&self) -> FetchTicket {
        self.ticket
    }

    pub fn silent_dwell(&self) -> Option<Duration> {
        self.silent_dwell
    }

    /// True when only a user control can move playback forward: paused, or
    /// a silent slide with the dwell fallback off.
    pub fn needs_input(&self) -> bool {
        match self.phase {
            Phase::Paused => true,
            Phase::Playing => {
                self.narration == NarrationSlot::Silent && self.silent_dwell.is_none()
            }
            Phase::Idle | Phase::Loading | Phase::Finished => false,
        }
    }

    /// `"3 / 7"`
    pub fn slide_label(&self) -> String {
        format!("{} / {}", self.current_slide + 1, self.slide_count)
    }

    /// `"0:12 / 0:31"`
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position),
            format_clock(self.duration)
        )
    }

    /// Fraction of the current clip played, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

fn format_clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
