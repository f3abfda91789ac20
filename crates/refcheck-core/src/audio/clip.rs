use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::failure::Failure;

/// Narration audio ready to hand to an [`super::AudioBackend`].
///
/// Holds a canonical RIFF/WAVE container (mono, 16-bit PCM). Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationClip {
    wav: Arc<[u8]>,
    sample_rate: u32,
    sample_count: u32,
}

impl NarrationClip {
    pub const CHANNELS: u16 = 1;
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Wraps raw 16-bit little-endian mono PCM in a WAV container.
    ///
    /// # Errors
    /// Returns a decode failure for an empty buffer, an odd byte count, or a
    /// zero sample rate.
    pub fn from_pcm16(pcm: &[u8], sample_rate: u32) -> Result<Self, Failure> {
        if sample_rate == 0 {
            return Err(Failure::decode("Sample rate must be positive"));
        }
        if pcm.is_empty() {
            return Err(Failure::decode("Audio payload contains no samples"));
        }
        if pcm.len() % 2 != 0 {
            return Err(Failure::decode(format!(
                "16-bit PCM needs an even byte count, got {}",
                pcm.len()
            )));
        }

        let spec = WavSpec {
            channels: Self::CHANNELS,
            sample_rate,
            bits_per_sample: Self::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + pcm.len()));
        {
            let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_failure)?;
            for pair in pcm.chunks_exact(2) {
                writer
                    .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                    .map_err(wav_failure)?;
            }
            writer.finalize().map_err(wav_failure)?;
        }

        Ok(Self {
            wav: cursor.into_inner().into(),
            sample_rate,
            sample_count: (pcm.len() / 2) as u32,
        })
    }

    pub fn wav_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.sample_count) / f64::from(self.sample_rate))
    }
}

fn wav_failure(e: hound::Error) -> Failure {
    Failure::decode(format!("Failed to encode WAV: {e}"))
}
