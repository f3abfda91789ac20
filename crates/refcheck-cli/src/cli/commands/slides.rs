use std::path::Path;

use anyhow::Result;

use super::load_deck;

pub fn list(deck: Option<&Path>) -> Result<()> {
    let deck = load_deck(deck)?;
    let total = deck.len();

    for slide in &deck {
        println!("[{} / {}] {}", slide.index + 1, total, slide.title);
        if !slide.subtitle.is_empty() {
            println!("    {}", slide.subtitle);
        }
        for bullet in &slide.bullets {
            println!("    - {bullet}");
        }
    }
    Ok(())
}
