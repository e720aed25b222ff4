//! Reminder scheduling: four fixed daily Angelus reminders.
//!
//! Components:
//! - `host`: the `NotificationHost` boundary and its record types
//! - `desktop`: notify-rust backed host with in-process daily timers
//! - `clock`: next-occurrence arithmetic for daily triggers
//!
//! Installation is clear-then-recreate. Hosts also replace by identifier, so
//! a slot can never be armed twice.

pub mod clock;
pub mod desktop;
pub mod host;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use host::{DailyTrigger, NotificationContent, NotificationHost, ScheduledTrigger, REMINDER_CATEGORY};

pub const REMINDER_TITLE: &str = "Time for The Angelus";

/// One fixed time of day at which a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSlot {
    pub identifier: &'static str,
    pub hour: u32,
    pub minute: u32,
    pub label: &'static str,
}

pub const SLOTS: [ReminderSlot; 4] = [
    ReminderSlot { identifier: "six-am", hour: 6, minute: 0, label: "6:00 AM" },
    ReminderSlot { identifier: "noon", hour: 12, minute: 0, label: "12:00 PM" },
    ReminderSlot { identifier: "six-pm", hour: 18, minute: 0, label: "6:00 PM" },
    ReminderSlot { identifier: "midnight", hour: 0, minute: 0, label: "12:00 AM" },
];

impl ReminderSlot {
    pub fn title(&self) -> &'static str {
        REMINDER_TITLE
    }

    pub fn body(&self) -> String {
        format!("It's {}. Would you like to recite The Angelus prayer?", self.label)
    }

    pub fn to_trigger(&self) -> ScheduledTrigger {
        ScheduledTrigger {
            identifier: self.identifier.to_string(),
            content: NotificationContent {
                title: self.title().to_string(),
                body: self.body(),
                sound: true,
                category: REMINDER_CATEGORY.to_string(),
                prayer_time: self.identifier.to_string(),
            },
            trigger: DailyTrigger {
                hour: self.hour,
                minute: self.minute,
                repeats: true,
            },
            next_fire: None,
        }
    }
}

/// Outcome of one `install()` pass. Diagnostics only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub scheduled: Vec<String>,
    pub failed: Vec<FailedSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSlot {
    pub identifier: String,
    pub reason: String,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.scheduled.len() == SLOTS.len()
    }
}

/// Keeps exactly one recurring trigger per [`ReminderSlot`] armed with the host.
///
/// Callers serialize `install()`; the service only runs it from its event loop.
pub struct ReminderScheduler {
    host: Arc<dyn NotificationHost>,
}

impl ReminderScheduler {
    pub fn new(host: Arc<dyn NotificationHost>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<dyn NotificationHost> {
        &self.host
    }

    /// Clear everything, then arm all four slots. A failing slot is logged and
    /// skipped; the others are still scheduled.
    pub async fn install(&self) -> InstallReport {
        self.clear_all().await;

        let mut report = InstallReport::default();
        for slot in &SLOTS {
            match self.host.schedule_recurring(slot.to_trigger()).await {
                Ok(()) => {
                    info!(
                        "Scheduled reminder {} at {}:{:02}",
                        slot.identifier, slot.hour, slot.minute
                    );
                    report.scheduled.push(slot.identifier.to_string());
                }
                Err(e) => {
                    error!("Failed to schedule reminder {}: {e}", slot.identifier);
                    report.failed.push(FailedSlot {
                        identifier: slot.identifier.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.is_complete() {
            info!("All reminders scheduled");
        } else {
            warn!(
                "Scheduled {}/{} reminders",
                report.scheduled.len(),
                SLOTS.len()
            );
        }
        report
    }

    /// Cancel every trigger the host holds, ours or not.
    pub async fn clear_all(&self) {
        match self.host.cancel_all().await {
            Ok(()) => debug!("All reminders cancelled"),
            Err(e) => error!("Failed to cancel reminders: {e}"),
        }
    }

    /// Whatever the host currently reports. Empty on host error.
    pub async fn list_scheduled(&self) -> Vec<ScheduledTrigger> {
        match self.host.list_scheduled().await {
            Ok(triggers) => triggers,
            Err(e) => {
                error!("Failed to list scheduled reminders: {e}");
                Vec::new()
            }
        }
    }
}
