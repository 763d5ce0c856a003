//! Voice output
//!
//! Remote TTS synthesis and interruptible speaker playback used by the
//! narration engine.

mod playback;
mod tts;

pub use playback::{AudioPlayback, PlaybackEnd};
pub use tts::TextToSpeech;
