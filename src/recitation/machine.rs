//! Recitation state machine: IDLE ⇄ SPEAKING.
//!
//! Pure transition table. Side effects are returned as [`Effect`]s and carried
//! out by the controller.

use serde::Serialize;

use super::engine::{EngineSignal, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecitationStatus {
    Idle,
    Speaking,
}

impl std::fmt::Display for RecitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Speaking => write!(f, "SPEAKING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecitationState {
    Idle,
    Speaking { session: SessionId },
}

impl RecitationState {
    pub fn status(&self) -> RecitationStatus {
        match self {
            Self::Idle => RecitationStatus::Idle,
            Self::Speaking { .. } => RecitationStatus::Speaking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecitationEvent {
    Start,
    Stop,
    EngineDone(SessionId),
    EngineStopped(SessionId),
    EngineError(SessionId, String),
}

impl From<EngineSignal> for RecitationEvent {
    fn from(signal: EngineSignal) -> Self {
        match signal {
            EngineSignal::Done(s) => Self::EngineDone(s),
            EngineSignal::Stopped(s) => Self::EngineStopped(s),
            EngineSignal::Error(s, message) => Self::EngineError(s, message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Speak(SessionId),
    StopEngine,
    ReportFailure(String),
}

#[derive(Debug)]
pub struct RecitationMachine {
    state: RecitationState,
    last_session: SessionId,
}

impl Default for RecitationMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecitationMachine {
    pub fn new() -> Self {
        Self {
            state: RecitationState::Idle,
            last_session: 0,
        }
    }

    pub fn state(&self) -> RecitationState {
        self.state
    }

    pub fn status(&self) -> RecitationStatus {
        self.state.status()
    }

    /// Apply one event. Every path out of SPEAKING lands in IDLE; signals for
    /// any session other than the current one are ignored.
    pub fn apply(&mut self, event: RecitationEvent) -> Vec<Effect> {
        use RecitationEvent as E;
        use RecitationState as S;

        match (self.state, event) {
            (S::Idle, E::Start) => {
                self.last_session += 1;
                self.state = S::Speaking { session: self.last_session };
                vec![Effect::Speak(self.last_session)]
            }
            // A second start while speaking is a toggle.
            (S::Speaking { .. }, E::Start | E::Stop) => {
                self.state = S::Idle;
                vec![Effect::StopEngine]
            }
            (S::Speaking { session }, E::EngineDone(s) | E::EngineStopped(s)) if s == session => {
                self.state = S::Idle;
                Vec::new()
            }
            (S::Speaking { session }, E::EngineError(s, message)) if s == session => {
                self.state = S::Idle;
                vec![Effect::ReportFailure(message)]
            }
            _ => Vec::new(),
        }
    }
}
