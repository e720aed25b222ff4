//! Boundary to the speech engine.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::SpeechConfig;

/// Identifies one `Speaking` session. Engine signals carry it so a late signal
/// from an earlier session never ends a newer one.
pub type SessionId = u64;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("failed to start speech engine: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prosody {
    pub language: String,
    /// 1.0 is the engine's normal pitch.
    pub pitch: f32,
    /// 1.0 is the engine's normal speaking rate.
    pub rate: f32,
    pub voice: Option<String>,
}

impl Default for Prosody {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for Prosody {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            language: config.language.clone(),
            pitch: config.pitch,
            rate: config.rate,
            voice: config.voice.clone(),
        }
    }
}

/// Asynchronous completion reported by the engine: done, stopped, or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSignal {
    Done(SessionId),
    Stopped(SessionId),
    Error(SessionId, String),
}

impl EngineSignal {
    pub fn session(&self) -> SessionId {
        match self {
            Self::Done(s) | Self::Stopped(s) | Self::Error(s, _) => *s,
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<EngineSignal>;

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Begin speaking `text`. Returns once playback has started; completion
    /// arrives later as an [`EngineSignal`] tagged with `session`.
    async fn speak(&self, session: SessionId, text: &str, prosody: &Prosody) -> Result<(), SpeechError>;

    /// Stop any active playback. A no-op when nothing is playing.
    async fn stop(&self) -> Result<(), SpeechError>;
}
