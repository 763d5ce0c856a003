//! `VisionSpeak` - photograph a document, recognize it remotely, read it aloud
//!
//! This library provides the capture-to-speech pipeline:
//! - Capture decoding and orientation tags
//! - Image normalization (upright, size-bounded)
//! - Remote OCR over multipart HTTP
//! - Narration playback state machine over a speech engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌───────────────────┐
//! │ CapturedImage│──▶│ ImageNormalizer│──▶│ RecognitionClient │── async ──┐
//! └──────────────┘   └────────────────┘   └───────────────────┘           │
//!                                                                         ▼
//!                    ┌────────────────────┐   ┌─────────────────────────────┐
//!                    │ NarrationController│◀──│ PipelineCoordinator (runs)  │
//!                    └─────────┬──────────┘   └─────────────────────────────┘
//!                              ▼
//!                        SpeechEngine
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod narration;
pub mod normalize;
pub mod pipeline;
pub mod recognition;
pub mod voice;

pub use capture::{CapturedImage, Orientation};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use narration::{
    ConsoleSpeech, NarrationController, NarrationState, Playback, SpeechEngine, SynthesizedSpeech,
};
pub use normalize::{ImageNormalizer, NormalizedImage, normalize};
pub use pipeline::{InProgress, PipelineCoordinator, RunId, RunOutcome};
pub use recognition::{RecognitionClient, Recognizer};
