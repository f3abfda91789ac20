//! CLI command handlers.

use std::future::Future;
use std::path::Path;

use anyhow::Result;
use refcheck_core::config::Config;
use refcheck_core::interrupt::{self, InterruptedError};
use refcheck_core::providers::gemini::{GeminiClient, GeminiConfig};
use refcheck_core::slides::Deck;

pub mod ask;
pub mod config;
pub mod narrate;
pub mod play;
pub mod slides;

/// Loads the deck at `path`, or the built-in one.
fn load_deck(path: Option<&Path>) -> Result<Deck> {
    path.map_or_else(|| Ok(Deck::builtin()), Deck::load_from)
}

fn gemini_client(config: &Config) -> Result<GeminiClient> {
    GeminiClient::new(GeminiConfig::from_settings(&config.gemini)?)
}

/// Runs `fut` unless Ctrl+C arrives first.
async fn until_interrupted<F: Future>(fut: F) -> Result<F::Output> {
    tokio::select! {
        output = fut => Ok(output),
        () = interrupt::wait_for_interrupt() => Err(InterruptedError.into()),
    }
}
