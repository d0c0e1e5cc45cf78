//! Raw PCM narration payload decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;

use crate::error::{ComforterError, Result};

/// Decoded mono (or interleaved) float samples ready for an output device.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Samples in `[-1.0, 1.0)`, interleaved when `channels > 1`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    /// Number of sample frames (`samples / channels`).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Playback duration at the buffer's sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Convert 16-bit little-endian signed PCM bytes to floats.
///
/// Each sample is divided by 32768. A trailing odd byte is ignored.
pub fn pcm16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect()
}

/// Decode a base64 narration payload into a playable buffer.
///
/// # Errors
///
/// Returns [`ComforterError::DecodeFailed`] for invalid base64 or a payload
/// with no complete samples.
pub fn decode_payload(payload: &str, sample_rate: u32, channels: u16) -> Result<PcmBuffer> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ComforterError::DecodeFailed(format!("narration is not valid base64: {e}")))?;
    if bytes.len() < 2 {
        return Err(ComforterError::DecodeFailed(
            "narration payload holds no audio samples".to_owned(),
        ));
    }
    Ok(PcmBuffer {
        samples: pcm16le_to_f32(&bytes),
        sample_rate,
        channels: channels.max(1),
    })
}
