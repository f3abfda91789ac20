//! Playback synchronizer.
//!
//! - `state`: presentation state and progress readouts
//! - `events`: user intents and async completions
//! - `effects`: commands the reducer hands to the runtime
//! - `update`: the pure reducer
//! - `runtime`: [`Synchronizer`], which executes effects and owns the audio

mod effects;
mod events;
mod runtime;
mod state;
mod update;

pub use effects::PlaybackEffect;
pub use events::PlaybackEvent;
pub use runtime::Synchronizer;
pub use state::{FetchTicket, NarrationSlot, Phase, PlaybackState};
pub use update::update;
