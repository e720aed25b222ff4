//! Spoken recitation of the prayer.
//!
//! Components:
//! - `machine`: pure IDLE ⇄ SPEAKING transition table
//! - `engine`: the `SpeechEngine` boundary, prosody and completion signals
//! - `espeak`: espeak-ng child-process engine with kill-to-stop

pub mod engine;
pub mod espeak;
pub mod machine;

use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use engine::{EngineSignal, Prosody, SpeechEngine};
use machine::{Effect, RecitationEvent, RecitationMachine, RecitationStatus};

/// Shown to the user when a recitation fails.
pub const RECITATION_FAILED_MESSAGE: &str = "Failed to recite the prayer. Please try again.";

#[derive(Debug, Error)]
pub enum RecitationError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

/// Drives one playback session at a time through [`RecitationMachine`].
///
/// The state flips before the engine is called, so a second `start()` issued
/// while the first is still in flight always takes the toggle-to-stop branch.
pub struct RecitationController {
    machine: RecitationMachine,
    engine: Arc<dyn SpeechEngine>,
    text: String,
    prosody: Prosody,
}

impl RecitationController {
    pub fn new(engine: Arc<dyn SpeechEngine>, text: impl Into<String>, prosody: Prosody) -> Self {
        Self {
            machine: RecitationMachine::new(),
            engine,
            text: text.into(),
            prosody,
        }
    }

    pub fn current_state(&self) -> RecitationStatus {
        self.machine.status()
    }

    /// Start reciting, or stop if already speaking.
    pub async fn start(&mut self) -> Result<RecitationStatus, RecitationError> {
        self.dispatch(RecitationEvent::Start).await?;
        Ok(self.current_state())
    }

    pub async fn stop(&mut self) -> RecitationStatus {
        // Stop never reports a failure.
        let _ = self.dispatch(RecitationEvent::Stop).await;
        self.current_state()
    }

    /// Reconcile with a completion signal from the engine.
    pub async fn handle_signal(&mut self, signal: EngineSignal) -> Result<RecitationStatus, RecitationError> {
        debug!("Engine signal for session {}: {signal:?}", signal.session());
        self.dispatch(signal.into()).await?;
        Ok(self.current_state())
    }

    async fn dispatch(&mut self, event: RecitationEvent) -> Result<(), RecitationError> {
        let mut pending: VecDeque<RecitationEvent> = VecDeque::from([event]);
        let mut failure = None;

        while let Some(event) = pending.pop_front() {
            let before = self.machine.status();
            let effects = self.machine.apply(event);
            let after = self.machine.state().status();
            if before != after {
                info!("State: {before} → {after}");
            }

            for effect in effects {
                match effect {
                    Effect::Speak(session) => {
                        if let Err(e) = self.engine.speak(session, &self.text, &self.prosody).await {
                            warn!("Speech engine rejected recitation: {e}");
                            pending.push_back(RecitationEvent::EngineError(session, e.to_string()));
                        }
                    }
                    Effect::StopEngine => {
                        if let Err(e) = self.engine.stop().await {
                            warn!("Failed to stop speech engine: {e}");
                        }
                    }
                    Effect::ReportFailure(message) => failure = Some(message),
                }
            }
        }

        match failure {
            Some(message) => Err(RecitationError::Synthesis(message)),
            None => Ok(()),
        }
    }
}
