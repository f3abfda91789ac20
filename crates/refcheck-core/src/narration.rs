//! Narration fetcher: synthesizes a slide's script at most once per run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::audio::NarrationClip;
use crate::config::{Config, NarrationConfig};
use crate::failure::Failure;
use crate::providers::SpeechSynthesizer;
use crate::remote::RetryPolicy;

/// Fetches and caches narration clips keyed by slide index.
///
/// The cache is append-only: once a slide has a clip, every later request is
/// served from memory without a network call. Each slide has one slot, so a
/// request that arrives while the same slide is being synthesized waits for
/// that call instead of issuing its own.
pub struct NarrationFetcher<S> {
    synthesizer: S,
    enabled: bool,
    retry: RetryPolicy,
    default_sample_rate: u32,
    cache: Mutex<HashMap<usize, Arc<OnceCell<NarrationClip>>>>,
}

impl<S: SpeechSynthesizer> NarrationFetcher<S> {
    pub fn new(synthesizer: S, enabled: bool, retry: RetryPolicy) -> Self {
        Self {
            synthesizer,
            enabled,
            retry,
            default_sample_rate: NarrationConfig::DEFAULT_SAMPLE_RATE,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(synthesizer: S, config: &Config) -> Self {
        Self::new(
            synthesizer,
            config.narration.enabled,
            config.retry.policy(),
        )
        .with_default_sample_rate(config.narration.sample_rate)
    }

    /// Sample rate used when the endpoint does not report one.
    #[must_use]
    pub fn with_default_sample_rate(mut self, sample_rate: u32) -> Self {
        if sample_rate > 0 {
            self.default_sample_rate = sample_rate;
        }
        self
    }

    /// Whether narration is switched on in configuration.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether [`Self::fetch`] can reach the network at all.
    pub fn is_available(&self) -> bool {
        self.enabled && self.synthesizer.has_credential()
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    fn cached(&self, slide_index: usize) -> Option<NarrationClip> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slide_index)
            .and_then(|slot| slot.get().cloned())
    }

    fn slot(&self, slide_index: usize) -> Arc<OnceCell<NarrationClip>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(slide_index).or_default())
    }

    /// Returns the clip for `slide_index`, or `None` when the slide should
    /// play silently. Never fails: problems are logged and degrade to `None`.
    pub async fn fetch(&self, script: &str, slide_index: usize) -> Option<NarrationClip> {
        if let Some(clip) = self.cached(slide_index) {
            return Some(clip);
        }
        if !self.enabled {
            tracing::debug!(slide = slide_index, "narration disabled");
            return None;
        }
        if !self.synthesizer.has_credential() {
            tracing::debug!(slide = slide_index, "no API key, narration skipped");
            return None;
        }

        match self.synthesize(script, slide_index).await {
            Ok(clip) => Some(clip),
            Err(failure) => {
                tracing::warn!(
                    slide = slide_index,
                    kind = %failure.kind,
                    "narration unavailable: {failure}"
                );
                None
            }
        }
    }

    /// Like [`Self::fetch`] but reports why no clip is available. Ignores the
    /// `enabled` switch, for explicit one-off exports.
    ///
    /// # Errors
    /// Returns the terminal failure, or `MissingCredential` without a call.
    pub async fn try_fetch(
        &self,
        script: &str,
        slide_index: usize,
    ) -> Result<NarrationClip, Failure> {
        if let Some(clip) = self.cached(slide_index) {
            return Ok(clip);
        }
        if !self.synthesizer.has_credential() {
            return Err(Failure::missing_credential());
        }
        self.synthesize(script, slide_index).await
    }

    /// Fills the slide's slot. Concurrent callers for one slide share a single
    /// call; a failed call leaves the slot empty for the next request.
    async fn synthesize(&self, script: &str, slide_index: usize) -> Result<NarrationClip, Failure> {
        let slot = self.slot(slide_index);
        let clip = slot
            .get_or_try_init(|| async {
                let payload = self
                    .retry
                    .call("narration", || self.synthesizer.synthesize_speech(script))
                    .await?;

                let sample_rate = payload.sample_rate.unwrap_or(self.default_sample_rate);
                let clip = NarrationClip::from_pcm16(&payload.pcm, sample_rate)?;
                tracing::debug!(
                    slide = slide_index,
                    duration_ms = clip.duration().as_millis() as u64,
                    "narration cached"
                );
                Ok::<_, Failure>(clip)
            })
            .await?;
        Ok(clip.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use futures_util::FutureExt;
    use futures_util::future::BoxFuture;

    use super::*;
    use crate::failure::FailureKind;
    use crate::providers::SpeechPayload;

    struct FakeSpeech {
        credential: bool,
        failures_before_success: u32,
        failure_kind: FailureKind,
        pcm: Vec<u8>,
        calls: Arc<AtomicU32>,
    }

    impl FakeSpeech {
        fn ok() -> Self {
            Self {
                credential: true,
                failures_before_success: 0,
                failure_kind: FailureKind::TransientServiceError,
                pcm: vec![0; 4_800],
                calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    impl SpeechSynthesizer for FakeSpeech {
        fn has_credential(&self) -> bool {
            self.credential
        }

        fn synthesize_speech<'a>(
            &'a self,
            _text: &'a str,
        ) -> BoxFuture<'a, Result<SpeechPayload, Failure>> {
            async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= self.failures_before_success {
                    return Err(Failure::new(self.failure_kind, format!("fail {n}")));
                }
                Ok(SpeechPayload {
                    pcm: self.pcm.clone(),
                    sample_rate: None,
                })
            }
            .boxed()
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn same_slide_twice_calls_once() {
        let speech = FakeSpeech::ok();
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        let first = fetcher.fetch("hello", 0).await.unwrap();
        let second = fetcher.fetch("hello", 0).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.cached_len(), 1);
        assert_eq!(first.duration(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn disabled_fetcher_makes_no_calls() {
        let speech = FakeSpeech::ok();
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, false, fast_retry());

        assert!(fetcher.fetch("hello", 0).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!fetcher.is_available());
    }

    #[tokio::test]
    async fn missing_credential_makes_no_calls() {
        let speech = FakeSpeech {
            credential: false,
            ..FakeSpeech::ok()
        };
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        assert!(fetcher.fetch("hello", 3).await.is_none());
        let failure = fetcher.try_fetch("hello", 3).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::MissingCredential);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let speech = FakeSpeech {
            failures_before_success: 2,
            ..FakeSpeech::ok()
        };
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        assert!(fetcher.fetch("hello", 1).await.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_degrade_to_silence() {
        let speech = FakeSpeech {
            failures_before_success: u32::MAX,
            ..FakeSpeech::ok()
        };
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        assert!(fetcher.fetch("hello", 1).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[tokio::test]
    async fn undecodable_audio_is_not_cached() {
        let speech = FakeSpeech {
            pcm: vec![1, 2, 3],
            ..FakeSpeech::ok()
        };
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        let failure = fetcher.try_fetch("hello", 0).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::DecodeError);
        assert_eq!(fetcher.cached_len(), 0);
    }

    #[tokio::test]
    async fn concurrent_fetches_of_one_slide_share_a_call() {
        let speech = FakeSpeech::ok();
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        let (first, second) = tokio::join!(fetcher.fetch("hello", 0), fetcher.fetch("hello", 0));

        assert_eq!(first, second);
        assert!(first.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.cached_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_slot_is_retried_by_the_next_request() {
        let speech = FakeSpeech {
            failures_before_success: 5,
            ..FakeSpeech::ok()
        };
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, true, fast_retry());

        assert!(fetcher.fetch("hello", 2).await.is_none());
        assert_eq!(fetcher.cached_len(), 0);
        assert!(fetcher.fetch("hello", 2).await.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(fetcher.cached_len(), 1);
    }

    #[tokio::test]
    async fn try_fetch_ignores_the_enabled_switch() {
        let speech = FakeSpeech::ok();
        let calls = Arc::clone(&speech.calls);
        let fetcher = NarrationFetcher::new(speech, false, fast_retry());

        assert!(fetcher.try_fetch("hello", 0).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!fetcher.is_enabled());
    }
}
