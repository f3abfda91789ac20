//! Generative-AI collaborators.
//!
//! The narration fetcher and the advisory client depend on the narrow traits
//! below; each call performs exactly one network attempt; retrying is the
//! caller's job (see [`crate::remote::RetryPolicy`]).

use futures_util::future::BoxFuture;

use crate::failure::Failure;

pub mod gemini;

/// Raw synthesized speech: 16-bit little-endian mono PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechPayload {
    pub pcm: Vec<u8>,
    /// Sample rate reported by the endpoint, if any
    pub sample_rate: Option<u32>,
}

/// Text generation endpoint.
pub trait TextGenerator: Send + Sync {
    /// Whether a credential is configured. Without one no call is attempted.
    fn has_credential(&self) -> bool;

    fn generate_text<'a>(
        &'a self,
        system: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, Failure>>;
}

/// Speech synthesis endpoint.
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether a credential is configured. Without one no call is attempted.
    fn has_credential(&self) -> bool;

    fn synthesize_speech<'a>(&'a self, text: &'a str)
    -> BoxFuture<'a, Result<SpeechPayload, Failure>>;
}
