//! espeak-ng speech engine.
//!
//! Each recitation is one `espeak-ng` child process speaking straight to the
//! default audio device. Stopping kills the child. Completion is reported on
//! the signal channel once the child exits.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::engine::{EngineSignal, Prosody, SessionId, SignalSender, SpeechEngine, SpeechError};

const BASE_PITCH: f32 = 50.0;
const BASE_WPM: f32 = 175.0;

struct ActivePlayback {
    session: SessionId,
    cancel: oneshot::Sender<()>,
}

pub struct EspeakEngine {
    program: PathBuf,
    signals: SignalSender,
    active: Arc<AsyncMutex<Option<ActivePlayback>>>,
}

impl EspeakEngine {
    pub fn new(program: impl Into<PathBuf>, signals: SignalSender) -> Self {
        Self {
            program: program.into(),
            signals,
            active: Arc::new(AsyncMutex::new(None)),
        }
    }
}

/// Map normalized prosody (1.0 = normal) onto espeak-ng flags.
pub fn espeak_args(prosody: &Prosody) -> Vec<String> {
    let voice = prosody
        .voice
        .clone()
        .unwrap_or_else(|| prosody.language.clone());
    let pitch = (BASE_PITCH * prosody.pitch).round().clamp(0.0, 99.0) as i32;
    let wpm = (BASE_WPM * prosody.rate).round().clamp(80.0, 450.0) as i32;

    vec![
        "-v".into(),
        voice,
        "-p".into(),
        pitch.to_string(),
        "-s".into(),
        wpm.to_string(),
    ]
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    async fn speak(&self, session: SessionId, text: &str, prosody: &Prosody) -> Result<(), SpeechError> {
        let mut command = Command::new(&self.program);
        command
            .args(espeak_args(prosody))
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        debug!(command = ?command, "Running espeak-ng");

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpeechError::EngineUnavailable(format!("{} not found", self.program.display()))
            } else {
                SpeechError::Spawn(e)
            }
        })?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let previous = self.active.lock().await.replace(ActivePlayback {
            session,
            cancel: cancel_tx,
        });
        if let Some(previous) = previous {
            let _ = previous.cancel.send(());
        }

        info!("Reciting (session {session}, {} chars)", text.len());

        let signals = self.signals.clone();
        let active = self.active.clone();
        tokio::spawn(async move {
            // A dropped sender counts as a cancel too.
            let exited = tokio::select! {
                status = child.wait() => Some(status),
                _ = cancel_rx => None,
            };

            let signal = match exited {
                Some(Ok(status)) if status.success() => EngineSignal::Done(session),
                Some(Ok(status)) => EngineSignal::Error(
                    session,
                    SpeechError::Failed(format!("espeak-ng exited with {status}")).to_string(),
                ),
                Some(Err(e)) => EngineSignal::Error(session, e.to_string()),
                None => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill espeak-ng: {e}");
                    }
                    EngineSignal::Stopped(session)
                }
            };

            {
                let mut guard = active.lock().await;
                if guard.as_ref().is_some_and(|p| p.session == session) {
                    *guard = None;
                }
            }

            debug!("Session {session} finished: {signal:?}");
            let _ = signals.send(signal);
        });

        Ok(())
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        if let Some(playback) = self.active.lock().await.take() {
            debug!("Stopping session {}", playback.session);
            let _ = playback.cancel.send(());
        }
        Ok(())
    }
}
