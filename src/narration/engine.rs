//! Speech engines

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use super::SpeechEngine;
use crate::voice::{AudioPlayback, PlaybackEnd, TextToSpeech};

/// One utterance in flight
struct Utterance {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Utterance {
    fn cancel(&self) {
        self.stop.store(true, Ordering::Release);
        self.task.abort();
    }
}

/// Remote TTS synthesis played on the default output device
///
/// `speak` must be called from within a Tokio runtime.
pub struct SynthesizedSpeech {
    tts: Arc<TextToSpeech>,
    playback: AudioPlayback,
    current: Option<Utterance>,
}

impl SynthesizedSpeech {
    #[must_use]
    pub fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self {
            tts: Arc::new(tts),
            playback,
            current: None,
        }
    }
}

impl SpeechEngine for SynthesizedSpeech {
    fn speak(&mut self, text: &str, flush_queue_first: bool) {
        let previous = self.current.take();
        if flush_queue_first
            && let Some(previous) = &previous
        {
            previous.cancel();
        }

        let stop = Arc::new(AtomicBool::new(false));
        let tts = Arc::clone(&self.tts);
        let playback = self.playback.clone();
        let text = text.to_string();
        let task_stop = Arc::clone(&stop);

        let task = tokio::spawn(async move {
            // Queue behind the previous utterance unless it was flushed
            if let Some(previous) = previous.filter(|_| !flush_queue_first) {
                let _ = previous.task.await;
            }

            let audio = match tts.synthesize(&text).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::error!(error = %e, "speech synthesis failed");
                    return;
                }
            };
            if task_stop.load(Ordering::Acquire) {
                return;
            }

            let played = tokio::task::spawn_blocking(move || {
                playback.play_mp3_blocking(&audio, &task_stop)
            })
            .await;

            match played {
                Ok(Ok(PlaybackEnd::Finished)) => tracing::debug!("utterance finished"),
                Ok(Ok(PlaybackEnd::Interrupted)) => tracing::debug!("utterance interrupted"),
                Ok(Err(e)) => tracing::error!(error = %e, "audio playback failed"),
                Err(e) => tracing::error!(error = %e, "playback task failed"),
            }
        });

        self.current = Some(Utterance { stop, task });
    }

    fn stop(&mut self) {
        if let Some(current) = self.current.take() {
            current.cancel();
        }
    }

    fn is_speaking(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|u| !u.task.is_finished())
    }

    fn name(&self) -> &'static str {
        "synthesized"
    }
}

/// Headless engine that prints utterances instead of playing them
#[derive(Debug, Default)]
pub struct ConsoleSpeech {
    spoken: usize,
}

impl ConsoleSpeech {
    #[must_use]
    pub const fn new() -> Self {
        Self { spoken: 0 }
    }

    /// Number of utterances printed so far
    #[must_use]
    pub const fn spoken(&self) -> usize {
        self.spoken
    }
}

impl SpeechEngine for ConsoleSpeech {
    fn speak(&mut self, text: &str, _flush_queue_first: bool) {
        self.spoken += 1;
        tracing::info!(chars = text.chars().count(), "speaking (console)");
        println!("[narration] {text}");
    }

    fn stop(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
