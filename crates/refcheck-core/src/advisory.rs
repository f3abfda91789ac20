//! Advisory query client: one free-text question in, one answer out.
//!
//! Failures never escape as errors. They become answer text, and the answer
//! carries the [`FailureKind`] so a caller can tell a bad key from an outage.

use std::fmt;
use std::str::FromStr;

use minijinja::context;

use crate::config::Config;
use crate::failure::{Failure, FailureKind};
use crate::prompts::{self, ANALYZE_PROMPT_TEMPLATE, GENERATE_PROMPT_TEMPLATE, SYSTEM_PROMPT};
use crate::providers::TextGenerator;
use crate::remote::RetryPolicy;

pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "No API key is configured. Set GEMINI_API_KEY or gemini.api_key in config.toml.";
pub const NOT_FOUND_MESSAGE: &str =
    "The model could not be found. Check the configured model name and that the API key can use it.";
pub const AUTHENTICATION_MESSAGE: &str =
    "API key authentication failed. Check that the API key is valid.";
pub const AUTHORIZATION_MESSAGE: &str =
    "The API key does not have permission for this request. Check the key's permissions.";

/// How the user's text is turned into a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvisoryMode {
    /// Legal-risk analysis of a described scenario
    #[default]
    Analyze,
    /// Safe reference-check questions for a job role
    Generate,
    /// The text is sent as-is
    FreeChat,
}

impl AdvisoryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Generate => "generate",
            Self::FreeChat => "chat",
        }
    }
}

impl fmt::Display for AdvisoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvisoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analyze" => Ok(Self::Analyze),
            "generate" => Ok(Self::Generate),
            "chat" => Ok(Self::FreeChat),
            other => Err(format!(
                "unknown advisory mode '{other}' (expected analyze, generate or chat)"
            )),
        }
    }
}

/// Text shown to the user for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryAnswer {
    pub text: String,
    /// Set when `text` is a failure message rather than a model answer
    pub failure: Option<FailureKind>,
}

impl AdvisoryAnswer {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    fn from_failure(failure: &Failure) -> Self {
        let text = match failure.kind {
            FailureKind::MissingCredential => MISSING_CREDENTIAL_MESSAGE.to_string(),
            FailureKind::ResourceNotFound => NOT_FOUND_MESSAGE.to_string(),
            FailureKind::AuthenticationFailed => AUTHENTICATION_MESSAGE.to_string(),
            FailureKind::AuthorizationDenied => AUTHORIZATION_MESSAGE.to_string(),
            _ => format!("An error occurred: {}", failure.message),
        };
        Self {
            text,
            failure: Some(failure.kind),
        }
    }
}

/// Sends advisory prompts through a [`TextGenerator`] with retry.
pub struct AdvisoryClient<G> {
    generator: G,
    retry: RetryPolicy,
    system_prompt: String,
}

impl<G: TextGenerator> AdvisoryClient<G> {
    pub fn new(generator: G, retry: RetryPolicy) -> Self {
        Self {
            generator,
            retry,
            system_prompt: SYSTEM_PROMPT.trim().to_string(),
        }
    }

    pub fn from_config(generator: G, config: &Config) -> Self {
        let client = Self::new(generator, config.retry.policy());
        match config.advisory.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => client.with_system_prompt(prompt),
            _ => client,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answers one query.
    ///
    /// Returns `None` for blank input; no request is made in that case.
    pub async fn query(&self, mode: AdvisoryMode, user_text: &str) -> Option<AdvisoryAnswer> {
        if user_text.trim().is_empty() {
            return None;
        }
        if !self.generator.has_credential() {
            return Some(AdvisoryAnswer::from_failure(&Failure::missing_credential()));
        }

        let prompt = match build_prompt(mode, user_text) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(%mode, "failed to render advisory prompt: {e}");
                return Some(AdvisoryAnswer::from_failure(&Failure::malformed(format!(
                    "Prompt could not be built: {e}"
                ))));
            }
        };

        let result = self
            .retry
            .call("advisory", || {
                self.generator.generate_text(&self.system_prompt, &prompt)
            })
            .await;

        Some(match result {
            Ok(text) => AdvisoryAnswer {
                text,
                failure: None,
            },
            Err(failure) => AdvisoryAnswer::from_failure(&failure),
        })
    }
}

/// Turns the user's text into the prompt for `mode`.
///
/// # Errors
/// Returns an error if a template fails to render.
pub fn build_prompt(mode: AdvisoryMode, user_text: &str) -> Result<String, minijinja::Error> {
    let template = match mode {
        AdvisoryMode::Analyze => ANALYZE_PROMPT_TEMPLATE,
        AdvisoryMode::Generate => GENERATE_PROMPT_TEMPLATE,
        AdvisoryMode::FreeChat => return Ok(user_text.to_string()),
    };
    prompts::render(template, context! { user_text => user_text })
}
