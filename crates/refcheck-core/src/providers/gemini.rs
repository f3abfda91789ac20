//! Gemini API key provider (Generative Language API).

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use minijinja::context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};

use super::{SpeechPayload, SpeechSynthesizer, TextGenerator};
use crate::config::GeminiSettings;
use crate::failure::{Failure, FailureKind};
use crate::prompts;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
const BASE_URL_ENV_VAR: &str = "GEMINI_BASE_URL";

/// Standard User-Agent header for refcheck API requests.
pub const USER_AGENT: &str = concat!("refcheck/", env!("CARGO_PKG_VERSION"));

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub speech_model: String,
    pub voice: String,
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Creates a config from settings and environment.
    ///
    /// Authentication resolution order:
    /// 1. `api_key` in `[gemini]` (from config file)
    /// 2. `GEMINI_API_KEY` environment variable
    ///
    /// A missing key is not an error: callers degrade instead of failing.
    ///
    /// Base URL resolution order: `GEMINI_BASE_URL` > config > default.
    ///
    /// # Errors
    /// Returns an error if a configured base URL is not a valid URL, or the
    /// API key cannot be sent as an HTTP header.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self> {
        let api_key = resolve_api_key(settings.api_key.as_deref(), API_KEY_ENV_VAR);
        if let Some(key) = api_key.as_deref() {
            HeaderValue::from_str(key)
                .map_err(|e| anyhow!("Invalid Gemini API key: {e} (check for stray characters)"))?;
        }
        let base_url = resolve_base_url(settings.base_url.as_deref(), BASE_URL_ENV_VAR)?;

        Ok(Self {
            api_key,
            base_url,
            text_model: settings.text_model.clone(),
            speech_model: settings.speech_model.clone(),
            voice: settings.voice.clone(),
            timeout: settings.timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Resolves an API key with precedence: config > env. Blank values count as unset.
fn resolve_api_key(config_api_key: Option<&str>, env_var: &str) -> Option<String> {
    let non_blank = |key: &str| {
        let trimmed = key.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    config_api_key
        .and_then(non_blank)
        .or_else(|| std::env::var(env_var).ok().as_deref().and_then(non_blank))
}

/// Resolves a base URL with precedence: env > config > default.
fn resolve_base_url(config_base_url: Option<&str>, env_var: &str) -> Result<String> {
    let candidates = [std::env::var(env_var).ok(), config_base_url.map(str::to_string)];

    for candidate in candidates.into_iter().flatten() {
        let trimmed = candidate.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            url::Url::parse(trimmed)
                .with_context(|| format!("Invalid Gemini base URL: {trimmed}"))?;
            return Ok(trimmed.to_string());
        }
    }

    Ok(DEFAULT_BASE_URL.to_string())
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Sends one `generateContent` request and returns the parsed JSON body.
    async fn generate_content(&self, model: &str, request: &Value) -> Result<Value, Failure> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(Failure::missing_credential)?;
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);

        let response = self
            .http
            .post(url)
            .headers(build_headers(api_key)?)
            .json(request)
            .send()
            .await
            .map_err(|e| Failure::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Failure::from_reqwest(&e))?;
        if !status.is_success() {
            return Err(Failure::http_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| Failure {
            details: Some(body.clone()),
            ..Failure::malformed(format!("Failed to parse Gemini response JSON: {e}"))
        })
    }

    /// Generates free text for `prompt` under a system instruction.
    ///
    /// # Errors
    /// Returns a classified [`Failure`] for transport, status, or shape problems.
    pub async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, Failure> {
        let request = build_text_request(system, prompt);
        let value = self
            .generate_content(&self.config.text_model, &request)
            .await?;
        parse_text_response(&value)
    }

    /// Synthesizes narration audio for `script`.
    ///
    /// # Errors
    /// Returns a classified [`Failure`] for transport, status, or shape problems.
    pub async fn synthesize_speech(&self, script: &str) -> Result<SpeechPayload, Failure> {
        let request = build_speech_request(script, &self.config.voice)?;
        let value = self
            .generate_content(&self.config.speech_model, &request)
            .await?;
        parse_speech_response(&value)
    }
}

impl TextGenerator for GeminiClient {
    fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn generate_text<'a>(
        &'a self,
        system: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, Failure>> {
        GeminiClient::generate_text(self, system, prompt).boxed()
    }
}

impl SpeechSynthesizer for GeminiClient {
    fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn synthesize_speech<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, Result<SpeechPayload, Failure>> {
        GeminiClient::synthesize_speech(self, text).boxed()
    }
}

fn build_text_request(system: &str, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }],
        "systemInstruction": {
            "parts": [{ "text": system }]
        }
    })
}

fn build_speech_request(script: &str, voice: &str) -> Result<Value, Failure> {
    let prompt = prompts::render(prompts::NARRATION_PROMPT_TEMPLATE, context! { script => script })
        .map_err(|e| Failure::malformed(format!("Failed to render narration prompt: {e}")))?;

    Ok(json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice }
                }
            }
        }
    }))
}

fn candidate_parts(value: &Value) -> &[Value] {
    value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn parse_text_response(value: &Value) -> Result<String, Failure> {
    let text: String = candidate_parts(value)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(Failure {
            details: Some(value.to_string()),
            ..Failure::malformed("Gemini response contains no text")
        });
    }
    Ok(text)
}

fn parse_speech_response(value: &Value) -> Result<SpeechPayload, Failure> {
    let inline_data = candidate_parts(value)
        .iter()
        .find_map(|part| part.get("inlineData").or_else(|| part.get("inline_data")))
        .ok_or_else(|| Failure::malformed("Gemini speech response is missing inlineData"))?;

    let data_b64 = inline_data
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| Failure::malformed("Gemini speech response is missing inlineData.data"))?;

    let pcm = base64::engine::general_purpose::STANDARD
        .decode(data_b64)
        .map_err(|e| Failure::malformed(format!("Failed to decode base64 audio data: {e}")))?;

    let sample_rate = inline_data
        .get("mimeType")
        .or_else(|| inline_data.get("mime_type"))
        .and_then(Value::as_str)
        .and_then(sample_rate_from_mime);

    Ok(SpeechPayload { pcm, sample_rate })
}

/// Extracts `rate=` from a mime type such as `audio/L16;codec=pcm;rate=24000`.
fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}

/// An unusable key counts as no credential: it is never sent or retried.
fn build_headers(api_key: &str) -> Result<HeaderMap, Failure> {
    let key = HeaderValue::from_str(api_key).map_err(|e| {
        Failure::new(
            FailureKind::MissingCredential,
            format!("API key is not a valid header value: {e}"),
        )
    })?;

    let mut headers = HeaderMap::new();
    headers.insert("x-goog-api-key", key);
    headers.insert("accept", HeaderValue::from_static("application/json"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_carries_system_instruction() {
        let request = build_text_request("be an expert", "hello");
        assert_eq!(request["contents"][0]["parts"][0]["text"], json!("hello"));
        assert_eq!(
            request["systemInstruction"]["parts"][0]["text"],
            json!("be an expert")
        );
    }

    #[test]
    fn speech_request_asks_for_audio_with_voice() {
        let request = build_speech_request("Welcome.", "Kore").unwrap();
        assert_eq!(
            request["generationConfig"]["responseModalities"],
            json!(["AUDIO"])
        );
        assert_eq!(
            request["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            json!("Kore")
        );
        assert_eq!(
            request["contents"][0]["parts"][0]["text"],
            json!("Say naturally and professionally: Welcome.")
        );
    }

    #[test]
    fn parse_text_response_joins_parts() {
        let value = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello, " }, { "text": "world." }] }
            }]
        });
        assert_eq!(parse_text_response(&value).unwrap(), "Hello, world.");
    }

    #[test]
    fn parse_text_response_without_text_is_malformed() {
        let value = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let failure = parse_text_response(&value).unwrap_err();
        assert_eq!(failure.kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn parse_speech_response_decodes_pcm_and_rate() {
        let value = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "audio/L16;codec=pcm;rate=16000",
                            "data": "AQIDBA=="
                        }
                    }]
                }
            }]
        });

        let payload = parse_speech_response(&value).unwrap();
        assert_eq!(payload.pcm, vec![1, 2, 3, 4]);
        assert_eq!(payload.sample_rate, Some(16_000));
    }

    #[test]
    fn parse_speech_response_rejects_bad_base64() {
        let value = json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "data": "***" } }] }
            }]
        });
        let failure = parse_speech_response(&value).unwrap_err();
        assert_eq!(failure.kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn sample_rate_is_optional_in_mime() {
        assert_eq!(sample_rate_from_mime("audio/L16;codec=pcm"), None);
        assert_eq!(sample_rate_from_mime("audio/L16; rate=24000"), Some(24_000));
    }

    #[test]
    fn config_api_key_wins_and_blank_counts_as_unset() {
        assert_eq!(
            resolve_api_key(Some("  from-config "), "REFCHECK_TEST_UNSET_KEY_VAR"),
            Some("from-config".to_string())
        );
        assert_eq!(
            resolve_api_key(Some("   "), "REFCHECK_TEST_UNSET_KEY_VAR"),
            None
        );
    }

    #[test]
    fn base_url_is_validated_and_trimmed() {
        assert_eq!(
            resolve_base_url(Some("http://localhost:8080/"), "REFCHECK_TEST_UNSET_URL_VAR")
                .unwrap(),
            "http://localhost:8080"
        );
        assert!(resolve_base_url(Some("not a url"), "REFCHECK_TEST_UNSET_URL_VAR").is_err());
        assert_eq!(
            resolve_base_url(None, "REFCHECK_TEST_UNSET_URL_VAR").unwrap(),
            DEFAULT_BASE_URL
        );
    }

    #[tokio::test]
    async fn missing_key_fails_fast_without_request() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            text_model: "m".to_string(),
            speech_model: "s".to_string(),
            voice: "Kore".to_string(),
            timeout: None,
        })
        .unwrap();

        let failure = client.generate_text("sys", "hi").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::MissingCredential);
    }

    #[test]
    fn api_key_that_is_not_a_header_value_is_rejected() {
        let settings = GeminiSettings {
            api_key: Some("abc\ndef".to_string()),
            ..GeminiSettings::default()
        };
        let err = GeminiConfig::from_settings(&settings).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid Gemini API key"));
    }

    #[tokio::test]
    async fn unusable_key_fails_without_request() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: Some("abc\ndef".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            text_model: "m".to_string(),
            speech_model: "s".to_string(),
            voice: "Kore".to_string(),
            timeout: None,
        })
        .unwrap();

        let failure = client.generate_text("sys", "hi").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::MissingCredential);
        assert!(!failure.kind.is_retryable());
    }
}
