use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{AudioBackend, AudioListener, AudioNotification, AudioResource, NarrationClip};
use crate::failure::Failure;

/// Progress granularity of the headless clock.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Headless backend: "plays" a clip by advancing its position on the tokio
/// clock. Used by the terminal front end, where no sound device is assumed.
#[derive(Debug, Clone, Copy)]
pub struct ClockedBackend {
    tick: Duration,
}

impl ClockedBackend {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
        }
    }
}

impl Default for ClockedBackend {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl AudioBackend for ClockedBackend {
    fn open(&mut self, clip: &NarrationClip) -> Result<Box<dyn AudioResource>, Failure> {
        let duration = clip.duration();
        if duration.is_zero() {
            return Err(Failure::decode("Clip has zero duration"));
        }
        Ok(Box::new(ClockedResource::new(duration, self.tick)))
    }
}

struct Shared {
    position: Duration,
    listener: Option<AudioListener>,
}

/// A clip being played against the tokio clock.
pub struct ClockedResource {
    duration: Duration,
    tick: Duration,
    muted: bool,
    shared: Arc<Mutex<Shared>>,
    ticker: Option<CancellationToken>,
}

impl ClockedResource {
    pub fn new(duration: Duration, tick: Duration) -> Self {
        Self {
            duration,
            tick,
            muted: false,
            shared: Arc::new(Mutex::new(Shared {
                position: Duration::ZERO,
                listener: None,
            })),
            ticker: None,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AudioResource for ClockedResource {
    fn play(&mut self) -> Result<(), Failure> {
        let handle = Handle::try_current()
            .map_err(|e| Failure::transient(format!("Audio clock needs a tokio runtime: {e}")))?;

        let at_end = {
            let mut shared = lock(&self.shared);
            let at_end = shared.position >= self.duration;
            if at_end {
                shared.position = Duration::ZERO;
            }
            at_end
        };
        if self.ticker.is_some() && !at_end {
            return Ok(());
        }
        self.stop_ticker();

        let token = CancellationToken::new();
        handle.spawn(run_ticker(
            Arc::clone(&self.shared),
            self.duration,
            self.tick,
            token.clone(),
        ));
        self.ticker = Some(token);
        Ok(())
    }

    fn pause(&mut self) {
        self.stop_ticker();
    }

    fn seek(&mut self, position: Duration) {
        lock(&self.shared).position = position.min(self.duration);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn position(&self) -> Duration {
        lock(&self.shared).position
    }

    fn attach_listener(&mut self, listener: AudioListener) {
        lock(&self.shared).listener = Some(listener);
    }

    fn detach(&mut self) {
        self.stop_ticker();
        lock(&self.shared).listener = None;
    }
}

impl Drop for ClockedResource {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// Advances the position once per tick until the end or cancellation.
///
/// Notifications are delivered while holding the lock and after checking the
/// token, so nothing fires once `detach` has returned.
async fn run_ticker(
    shared: Arc<Mutex<Shared>>,
    duration: Duration,
    tick: Duration,
    token: CancellationToken,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => return,
            _ = interval.tick() => {}
        }

        let mut state = lock(&shared);
        if token.is_cancelled() {
            return;
        }
        state.position = (state.position + tick).min(duration);
        let position = state.position;
        let finished = position >= duration;

        if let Some(listener) = state.listener.as_ref() {
            listener(AudioNotification::Progress { position, duration });
            if finished {
                listener(AudioNotification::Finished);
            }
        }
        if finished {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_listener() -> (AudioListener, Arc<Mutex<Vec<AudioNotification>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: AudioListener = Arc::new(move |n| sink.lock().unwrap().push(n));
        (listener, seen)
    }

    fn finished_count(seen: &Mutex<Vec<AudioNotification>>) -> usize {
        seen.lock()
            .unwrap()
            .iter()
            .filter(|n| matches!(n, AudioNotification::Finished))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn plays_to_the_end_and_finishes_once() {
        let mut resource = ClockedResource::new(Duration::from_secs(1), DEFAULT_TICK);
        let (listener, seen) = recording_listener();
        resource.attach_listener(listener);

        resource.play().unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(resource.position(), Duration::from_secs(1));
        assert_eq!(finished_count(&seen), 1);
        let progress = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| matches!(n, AudioNotification::Progress { .. }))
            .count();
        assert_eq!(progress, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_keeps_position() {
        let mut resource = ClockedResource::new(Duration::from_secs(2), DEFAULT_TICK);
        let (listener, seen) = recording_listener();
        resource.attach_listener(listener);

        resource.play().unwrap();
        tokio::time::sleep(Duration::from_millis(550)).await;
        resource.pause();
        let paused_at = resource.position();
        assert!(paused_at >= Duration::from_millis(400));
        assert!(paused_at <= Duration::from_millis(500));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(resource.position(), paused_at);
        assert_eq!(finished_count(&seen), 0);

        resource.play().unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(finished_count(&seen), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn detached_resource_never_notifies() {
        let mut resource = ClockedResource::new(Duration::from_millis(300), DEFAULT_TICK);
        let (listener, seen) = recording_listener();
        resource.attach_listener(listener);

        resource.play().unwrap();
        resource.detach();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(seen.lock().unwrap().is_empty());
        assert!(!resource.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn replay_after_end_restarts_from_zero() {
        let mut resource = ClockedResource::new(Duration::from_millis(200), DEFAULT_TICK);
        resource.play().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(resource.position(), Duration::from_millis(200));

        resource.play().unwrap();
        assert_eq!(resource.position(), Duration::ZERO);
    }

    #[test]
    fn backend_reports_clip_duration() {
        let clip = NarrationClip::from_pcm16(&vec![0_u8; 24_000], 24_000).unwrap();
        let mut backend = ClockedBackend::default();
        let mut resource = backend.open(&clip).unwrap();

        assert_eq!(resource.duration(), Duration::from_millis(500));
        resource.set_muted(true);
        assert!(resource.is_muted());
    }
}
