//! Capture-to-narration pipeline
//!
//! A run normalizes a capture synchronously, then hands the request to a
//! spawned task and returns immediately. Completions travel back over a
//! channel and are applied on the caller's control flow by
//! [`PipelineCoordinator::next_outcome`], so narration state is only ever
//! touched from one place.
//!
//! Overlapping runs follow a last-started-wins policy: starting a run
//! supersedes every run before it, and a superseded run's completion is
//! discarded when it arrives. In-flight requests are not aborted.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::capture::CapturedImage;
use crate::narration::NarrationController;
use crate::normalize::ImageNormalizer;
use crate::recognition::Recognizer;
use crate::{Error, Result};

/// Identifier of one pipeline run, increasing in start order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u64);

impl RunId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Returned as soon as a run's request has been issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InProgress {
    pub run: RunId,
    /// Normalized width sent to the recognizer
    pub width: u32,
    /// Normalized height sent to the recognizer
    pub height: u32,
}

/// Terminal result of a run
#[derive(Debug)]
pub enum RunOutcome {
    /// Text was recognized and stored; `autoplay` is false when the text was empty
    Recognized {
        run: RunId,
        text: String,
        autoplay: bool,
    },
    /// Recognition failed; narration state is untouched
    Failed { run: RunId, error: Error },
    /// A later run was started before this one completed; result discarded
    Superseded { run: RunId },
}

impl RunOutcome {
    #[must_use]
    pub const fn run(&self) -> RunId {
        match self {
            Self::Recognized { run, .. } | Self::Failed { run, .. } | Self::Superseded { run } => {
                *run
            }
        }
    }
}

/// Completion delivered from a request task
struct Completion {
    run: RunId,
    result: Result<String>,
}

/// The latest started run
struct ActiveRun {
    run: RunId,
    token: CancellationToken,
}

/// Wires normalization, recognition, and narration together
pub struct PipelineCoordinator {
    normalizer: ImageNormalizer,
    recognizer: Arc<dyn Recognizer>,
    narration: NarrationController,
    session: CancellationToken,
    active: Option<ActiveRun>,
    next_run: u64,
    pending: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl PipelineCoordinator {
    /// Create a coordinator; must be used from within a Tokio runtime
    #[must_use]
    pub fn new(
        normalizer: ImageNormalizer,
        recognizer: Arc<dyn Recognizer>,
        narration: NarrationController,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            normalizer,
            recognizer,
            narration,
            session: CancellationToken::new(),
            active: None,
            next_run: 1,
            pending: 0,
            completions_tx,
            completions_rx,
        }
    }

    #[must_use]
    pub const fn narration(&self) -> &NarrationController {
        &self.narration
    }

    /// Narration commands (speak, pause, repeat, stop) go through here
    pub const fn narration_mut(&mut self) -> &mut NarrationController {
        &mut self.narration
    }

    /// Run whose completion would currently be applied
    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|a| a.run)
    }

    /// Whether any issued request has not yet been delivered
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending > 0
    }

    /// Start a run for `image`
    ///
    /// Normalizes synchronously, then issues the recognition request on a
    /// background task and returns without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` if the capture cannot be normalized; no request
    /// is issued and in-flight runs are not superseded
    pub fn start_run(&mut self, image: CapturedImage) -> Result<InProgress> {
        let normalized = self.normalizer.normalize(image).map_err(|e| {
            tracing::warn!(error = %e, "capture rejected");
            e
        })?;

        let run = RunId(self.next_run);
        self.next_run += 1;

        if let Some(previous) = self.active.take() {
            tracing::debug!(%run, superseded = %previous.run, "superseding in-flight run");
            previous.token.cancel();
        }

        let token = self.session.child_token();
        self.active = Some(ActiveRun {
            run,
            token: token.clone(),
        });

        let status = InProgress {
            run,
            width: normalized.width(),
            height: normalized.height(),
        };

        let recognizer = Arc::clone(&self.recognizer);
        let session = self.session.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            // A panicking recognizer still yields exactly one completion
            let request = tokio::spawn(async move { recognizer.recognize(normalized).await });
            let result = request.await.unwrap_or_else(|e| {
                tracing::error!(%run, error = %e, "recognition task failed");
                Err(Error::NetworkError(format!("recognition task failed: {e}")))
            });
            if session.is_cancelled() {
                tracing::debug!(%run, "session closed, dropping completion");
                return;
            }
            if token.is_cancelled() {
                tracing::debug!(%run, "run superseded before completion");
            }
            // Receiver is gone once the coordinator is dropped
            let _ = tx.send(Completion { run, result });
        });
        self.pending += 1;

        tracing::info!(
            %run,
            recognizer = self.recognizer.name(),
            width = status.width,
            height = status.height,
            "recognition requested"
        );

        Ok(status)
    }

    /// Wait for the next completion and apply it
    ///
    /// Returns `None` when no request is pending. Cancel-safe. A request task
    /// that panics is reported as a `NetworkError` failure.
    pub async fn next_outcome(&mut self) -> Option<RunOutcome> {
        if self.pending == 0 {
            return None;
        }

        let completion = self.completions_rx.recv().await?;
        self.pending -= 1;
        Some(self.apply(completion))
    }

    fn apply(&mut self, completion: Completion) -> RunOutcome {
        let Completion { run, result } = completion;

        let is_active = self
            .active
            .as_ref()
            .is_some_and(|a| a.run == run && !a.token.is_cancelled());
        if !is_active {
            tracing::debug!(%run, "discarding stale completion");
            return RunOutcome::Superseded { run };
        }
        // Terminal: nothing else for this run is applied
        self.active = None;

        match result {
            Ok(text) => {
                self.narration.set_text(text.clone());
                let autoplay = !text.is_empty();
                if autoplay {
                    if let Err(e) = self.narration.play() {
                        tracing::warn!(%run, error = %e, "autoplay failed");
                    }
                } else {
                    tracing::info!(%run, "no text found");
                }
                tracing::info!(%run, chars = text.chars().count(), "recognition complete");
                RunOutcome::Recognized {
                    run,
                    text,
                    autoplay,
                }
            }
            Err(error) => {
                tracing::warn!(%run, kind = %error.kind(), error = %error, "recognition failed");
                RunOutcome::Failed { run, error }
            }
        }
    }

    /// Tear down the session: stop narration and discard late completions
    pub fn shutdown(mut self) {
        tracing::debug!(pending = self.pending, "pipeline shutting down");
        self.narration.stop();
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_display_and_order() {
        assert_eq!(RunId(3).to_string(), "run-3");
        assert!(RunId(1) < RunId(2));
        assert_eq!(RunId(7).get(), 7);
    }

    #[test]
    fn test_outcome_run_accessor() {
        let outcome = RunOutcome::Superseded { run: RunId(4) };
        assert_eq!(outcome.run(), RunId(4));

        let outcome = RunOutcome::Failed {
            run: RunId(5),
            error: Error::NetworkError("refused".to_string()),
        };
        assert_eq!(outcome.run(), RunId(5));
    }
}
