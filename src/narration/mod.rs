//! Narration of recognized text
//!
//! [`NarrationController`] owns the last recognized text and the playback
//! state machine, and is the only writer of [`NarrationState`]. Commands map
//! onto a [`SpeechEngine`] with flush semantics: every `play` restarts the
//! current text from the beginning.
//!
//! ```text
//!            play / repeat (text non-empty)
//!   Idle ───────────────────────────────▶ Speaking
//!    ▲  ◀──────── settle (engine idle) ──────┘ │
//!    │                                         │ stop / pause
//!    │                                         ▼
//!    └──────────────── (stays) ──────────── Stopped ── play / repeat ─▶ Speaking
//! ```

mod engine;

pub use engine::{ConsoleSpeech, SynthesizedSpeech};

use crate::{Error, Result};

/// Host speech engine boundary
///
/// Both triggers are synchronous; audio runs in the background.
pub trait SpeechEngine: Send {
    /// Start speaking `text`, discarding queued audio first when `flush_queue_first`
    fn speak(&mut self, text: &str, flush_queue_first: bool);

    /// Halt any in-progress audio immediately
    fn stop(&mut self);

    /// Whether an utterance is still playing
    fn is_speaking(&self) -> bool;

    /// Engine name for logging
    fn name(&self) -> &'static str;
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    #[default]
    Idle,
    Speaking,
    Stopped,
}

/// Text and playback state for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrationState {
    last_text: String,
    playback: Playback,
}

impl NarrationState {
    #[must_use]
    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    #[must_use]
    pub const fn playback(&self) -> Playback {
        self.playback
    }
}

/// Turns commands and recognition results into speech-engine actions
pub struct NarrationController {
    state: NarrationState,
    engine: Box<dyn SpeechEngine>,
}

impl NarrationController {
    /// Create a controller with empty text in `Idle`
    #[must_use]
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        tracing::debug!(engine = engine.name(), "narration controller created");
        Self {
            state: NarrationState::default(),
            engine,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &NarrationState {
        &self.state
    }

    #[must_use]
    pub fn last_text(&self) -> &str {
        self.state.last_text()
    }

    #[must_use]
    pub const fn playback(&self) -> Playback {
        self.state.playback
    }

    /// Replace the stored text without touching playback
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.state.last_text = text.into();
    }

    /// Speak the stored text from the start
    ///
    /// # Errors
    ///
    /// Returns `NothingToNarrate` if no text is stored; state is left unchanged
    pub fn play(&mut self) -> Result<()> {
        if self.state.last_text.is_empty() {
            tracing::debug!("play requested with no text");
            return Err(Error::NothingToNarrate);
        }

        self.engine.speak(&self.state.last_text, true);
        self.state.playback = Playback::Speaking;
        tracing::debug!(chars = self.state.last_text.chars().count(), "narration started");
        Ok(())
    }

    /// Replay the stored text from the start
    ///
    /// Identical to [`play`](Self::play).
    ///
    /// # Errors
    ///
    /// Returns `NothingToNarrate` if no text is stored
    pub fn repeat(&mut self) -> Result<()> {
        self.play()
    }

    /// Halt audio; idempotent
    pub fn stop(&mut self) {
        self.engine.stop();
        if self.state.playback == Playback::Speaking {
            self.state.playback = Playback::Stopped;
            tracing::debug!("narration stopped");
        }
    }

    /// There is no resumable playback; pausing stops
    pub fn pause(&mut self) {
        self.stop();
    }

    /// Move `Speaking` to `Idle` once the engine has finished the utterance
    pub fn settle(&mut self) -> Playback {
        if self.state.playback == Playback::Speaking && !self.engine.is_speaking() {
            self.state.playback = Playback::Idle;
            tracing::debug!("narration finished");
        }
        self.state.playback
    }
}

impl Drop for NarrationController {
    fn drop(&mut self) {
        self.engine.stop();
    }
}
