//! Core refcheck library (playback engine, remote calls, narration, advisory).

pub mod advisory;
pub mod audio;
pub mod config;
pub mod failure;
pub mod interrupt;
pub mod logging;
pub mod narration;
pub mod playback;
pub mod prompts;
pub mod providers;
pub mod remote;
pub mod slides;
