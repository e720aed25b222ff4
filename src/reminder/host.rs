//! Boundary to the host notification subsystem.
//!
//! The scheduler only ever talks to a [`NotificationHost`]. The desktop
//! implementation lives in [`super::desktop`]; tests use an in-memory fake.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

/// Action identifier reported when the notification body itself is clicked.
pub const DEFAULT_ACTION_IDENTIFIER: &str = "default";
/// Dedicated affirmative action shown on every reminder.
pub const YES_ACTION: &str = "YES_ACTION";
/// Negative action; the user declined this reminder.
pub const DISMISS_ACTION: &str = "dismiss";

pub const REMINDER_CATEGORY: &str = "ANGELUS_REMINDER";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification service unavailable: {0}")]
    Unavailable(String),

    #[error("host rejected trigger {identifier}: {reason}")]
    Rejected { identifier: String, reason: String },

    #[error("invalid trigger time {hour}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Unknown,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelConfig {
    pub name: String,
    pub vibration_pattern: Vec<u32>,
    pub light_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub sound: bool,
    pub category: String,
    /// Slot identifier echoed back in the payload.
    pub prayer_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyTrigger {
    pub hour: u32,
    pub minute: u32,
    pub repeats: bool,
}

impl DailyTrigger {
    pub fn validate(&self) -> Result<(), HostError> {
        if self.hour > 23 || self.minute > 59 {
            return Err(HostError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
            });
        }
        Ok(())
    }
}

/// A recurring trigger as handed to, and reported back by, the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledTrigger {
    pub identifier: String,
    pub content: NotificationContent,
    pub trigger: DailyTrigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResponse {
    pub identifier: String,
    pub action_identifier: String,
}

impl NotificationResponse {
    /// True for the default tap and for the explicit "Yes" action.
    pub fn wants_recitation(&self) -> bool {
        self.action_identifier == DEFAULT_ACTION_IDENTIFIER
            || self.action_identifier == YES_ACTION
    }
}

/// Events the host pushes to the coordination loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    ReceivedWhileForegrounded { identifier: String },
    UserResponded(NotificationResponse),
}

#[async_trait]
pub trait NotificationHost: Send + Sync {
    /// Current authorization without prompting.
    async fn permission_status(&self) -> PermissionState;

    async fn request_permission(&self) -> PermissionState;

    /// Platform-conditional; hosts without channels accept and ignore it.
    async fn create_channel(&self, channel: &ChannelConfig) -> Result<(), HostError>;

    /// Arms a recurring trigger. An existing trigger with the same identifier
    /// is replaced, never duplicated.
    async fn schedule_recurring(&self, request: ScheduledTrigger) -> Result<(), HostError>;

    /// Removes every trigger the host knows about.
    async fn cancel_all(&self) -> Result<(), HostError>;

    async fn list_scheduled(&self) -> Result<Vec<ScheduledTrigger>, HostError>;
}
