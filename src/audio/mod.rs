//! Narration audio: PCM decoding, the output seam and playback control.

#[cfg(feature = "speaker")]
pub mod cpal_output;
pub mod pcm;
pub mod playback;
pub mod session;

pub use pcm::{PcmBuffer, decode_payload};
pub use playback::{AudioPlaybackEngine, PlaybackState};
pub use session::{AudioOutput, AudioOutputFactory, AudioSession, CompletionHook};
