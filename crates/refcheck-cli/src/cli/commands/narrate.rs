use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use refcheck_core::config::Config;
use refcheck_core::narration::NarrationFetcher;

use super::{gemini_client, load_deck, until_interrupted};

/// Synthesizes one slide's narration and writes it as a WAV file.
///
/// Runs regardless of `narration.enabled`: asking for a file is explicit.
pub async fn run(slide_number: usize, out: &Path, deck: Option<&Path>, config: &Config) -> Result<()> {
    let deck = load_deck(deck)?;
    let slide = slide_number
        .checked_sub(1)
        .and_then(|index| deck.get(index))
        .with_context(|| {
            format!(
                "Slide {slide_number} does not exist (the deck has {} slides)",
                deck.len()
            )
        })?;

    let fetcher = NarrationFetcher::from_config(gemini_client(config)?, config);
    let clip = until_interrupted(fetcher.try_fetch(&slide.script, slide.index))
        .await?
        .with_context(|| format!("Narration unavailable for slide {slide_number}"))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(out, clip.wav_bytes())
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Wrote slide {slide_number} narration ({:.1}s, {} Hz) to {}",
        clip.duration().as_secs_f64(),
        clip.sample_rate(),
        out.display()
    );
    Ok(())
}
