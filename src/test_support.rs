//! In-memory fakes for unit testing.
//!
//! These implement `NotificationHost` and `SpeechEngine` so the scheduler,
//! controller and service can be tested without D-Bus or audio.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::notifier::Alert;
use crate::recitation::engine::{Prosody, SessionId, SpeechEngine, SpeechError};
use crate::reminder::host::{
    ChannelConfig, HostError, NotificationHost, PermissionState, ScheduledTrigger,
};

/// Fake host keyed by identifier, so re-scheduling replaces like a real host.
pub struct FakeNotificationHost {
    triggers: Mutex<BTreeMap<String, ScheduledTrigger>>,
    rejected: Mutex<HashSet<String>>,
    permission: Mutex<PermissionState>,
    available: bool,
    cancel_all_calls: AtomicUsize,
    channels: Mutex<Vec<ChannelConfig>>,
}

impl FakeNotificationHost {
    pub fn new() -> Self {
        Self {
            triggers: Mutex::new(BTreeMap::new()),
            rejected: Mutex::new(HashSet::new()),
            permission: Mutex::new(PermissionState::Granted),
            available: true,
            cancel_all_calls: AtomicUsize::new(0),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Simulates a platform without a notification service.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            permission: Mutex::new(PermissionState::Denied),
            ..Self::new()
        }
    }

    pub fn with_permission(permission: PermissionState) -> Self {
        Self {
            permission: Mutex::new(permission),
            ..Self::new()
        }
    }

    /// Make `schedule_recurring` fail for one identifier.
    pub fn reject(&self, identifier: &str) {
        self.rejected.lock().unwrap().insert(identifier.to_string());
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.cancel_all_calls.load(Ordering::SeqCst)
    }

    pub fn channels(&self) -> Vec<ChannelConfig> {
        self.channels.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), HostError> {
        if self.available {
            Ok(())
        } else {
            Err(HostError::Unavailable("no notification service".into()))
        }
    }
}

impl Default for FakeNotificationHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationHost for FakeNotificationHost {
    async fn permission_status(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    async fn create_channel(&self, channel: &ChannelConfig) -> Result<(), HostError> {
        self.check_available()?;
        self.channels.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn schedule_recurring(&self, request: ScheduledTrigger) -> Result<(), HostError> {
        self.check_available()?;
        request.trigger.validate()?;
        if self.rejected.lock().unwrap().contains(&request.identifier) {
            return Err(HostError::Rejected {
                identifier: request.identifier,
                reason: "rejected by test".into(),
            });
        }
        self.triggers
            .lock()
            .unwrap()
            .insert(request.identifier.clone(), request);
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), HostError> {
        self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.triggers.lock().unwrap().clear();
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledTrigger>, HostError> {
        self.check_available()?;
        Ok(self.triggers.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    Speak(SessionId, String),
    Stop,
}

/// Records calls; completion signals are fed to the controller by the test.
pub struct FakeSpeechEngine {
    calls: Mutex<Vec<SpeechCall>>,
    last_prosody: Mutex<Option<Prosody>>,
    fail_speak: bool,
}

impl FakeSpeechEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            last_prosody: Mutex::new(None),
            fail_speak: false,
        }
    }

    /// Every `speak` is rejected as if the engine binary were missing.
    pub fn failing() -> Self {
        Self {
            fail_speak: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<SpeechCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn speak_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SpeechCall::Speak(..)))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SpeechCall::Stop))
            .count()
    }

    pub fn last_prosody(&self) -> Option<Prosody> {
        self.last_prosody.lock().unwrap().clone()
    }
}

impl Default for FakeSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for FakeSpeechEngine {
    async fn speak(&self, session: SessionId, text: &str, prosody: &Prosody) -> Result<(), SpeechError> {
        self.calls
            .lock()
            .unwrap()
            .push(SpeechCall::Speak(session, text.to_string()));
        *self.last_prosody.lock().unwrap() = Some(prosody.clone());
        if self.fail_speak {
            return Err(SpeechError::EngineUnavailable("fake engine offline".into()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        self.calls.lock().unwrap().push(SpeechCall::Stop);
        Ok(())
    }
}

/// Collects alerts instead of showing them.
pub struct RecordingAlerts {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        Self {
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn bodies(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl Default for RecordingAlerts {
    fn default() -> Self {
        Self::new()
    }
}

impl Alert for RecordingAlerts {
    fn alert(&self, summary: &str, body: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((summary.to_string(), body.to_string()));
    }
}
