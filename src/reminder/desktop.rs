//! Desktop notification host via notify-rust (D-Bus).
//!
//! Each armed trigger is a tokio task that waits for the next local
//! `hour:minute` and then shows a notification with Recite / Yes / No actions.
//! The chosen action is pushed back to the service as a `NotificationEvent`.
//!
//! At most one popup per trigger stays open: it is closed when the same slot
//! fires again, and when its trigger is replaced or cancelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Local;
use notify_rust::{Hint, Notification, Timeout};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock;
use super::host::{
    ChannelConfig, HostError, NotificationEvent, NotificationHost, NotificationResponse,
    PermissionState, ScheduledTrigger, DEFAULT_ACTION_IDENTIFIER, DISMISS_ACTION, YES_ACTION,
};
use crate::config::{NotificationConfig, Urgency};

/// Action reported by the notification server when the popup is closed
/// without choosing anything.
const CLOSED_ACTION: &str = "__closed";

/// Presentation settings shared by every reminder popup.
#[derive(Debug, Clone)]
struct Delivery {
    app_name: String,
    icon: String,
    timeout_ms: u32,
    urgency: Urgency,
}

impl From<&NotificationConfig> for Delivery {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            icon: config.icon.clone(),
            timeout_ms: config.timeout_ms,
            urgency: config.urgency,
        }
    }
}

/// Popup bookkeeping for one armed trigger.
struct Popups {
    live: AtomicBool,
    open: Mutex<Option<u32>>,
}

impl Popups {
    fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            open: Mutex::new(None),
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Record a shown popup. False if the trigger was retired meanwhile.
    fn track(&self, id: u32) -> bool {
        let mut open = lock(&self.open);
        if !self.is_live() {
            return false;
        }
        *open = Some(id);
        true
    }

    fn untrack(&self, id: u32) {
        let mut open = lock(&self.open);
        if *open == Some(id) {
            *open = None;
        }
    }

    fn take_open(&self) -> Option<u32> {
        lock(&self.open).take()
    }

    /// Stop answering for this trigger. Returns the popup still on screen.
    fn retire(&self) -> Option<u32> {
        let mut open = lock(&self.open);
        self.live.store(false, Ordering::SeqCst);
        open.take()
    }

    /// Event to emit for an action chosen on one of this trigger's popups.
    fn response(&self, identifier: &str, action: &str) -> Option<NotificationEvent> {
        if action == CLOSED_ACTION || !self.is_live() {
            return None;
        }
        Some(NotificationEvent::UserResponded(NotificationResponse {
            identifier: identifier.to_string(),
            action_identifier: action.to_string(),
        }))
    }
}

fn lock(open: &Mutex<Option<u32>>) -> std::sync::MutexGuard<'_, Option<u32>> {
    open.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct ArmedTrigger {
    record: ScheduledTrigger,
    task: JoinHandle<()>,
    popups: Arc<Popups>,
}

impl ArmedTrigger {
    fn disarm(self) {
        self.task.abort();
        if let Some(id) = self.popups.retire() {
            tokio::task::spawn_blocking(move || close_popup(id));
        }
    }
}

pub struct DesktopNotificationHost {
    config: NotificationConfig,
    events: mpsc::UnboundedSender<NotificationEvent>,
    armed: AsyncMutex<HashMap<String, ArmedTrigger>>,
}

impl DesktopNotificationHost {
    pub fn new(config: NotificationConfig, events: mpsc::UnboundedSender<NotificationEvent>) -> Self {
        Self {
            config,
            events,
            armed: AsyncMutex::new(HashMap::new()),
        }
    }
}

impl Drop for DesktopNotificationHost {
    fn drop(&mut self) {
        for (_, armed) in self.armed.get_mut().drain() {
            armed.task.abort();
            armed.popups.retire();
        }
    }
}

#[async_trait]
impl NotificationHost for DesktopNotificationHost {
    async fn permission_status(&self) -> PermissionState {
        if !self.config.enabled {
            return PermissionState::Denied;
        }

        // The desktop has no permission prompt: a reachable notification
        // server is as good as a grant.
        match tokio::task::spawn_blocking(notify_rust::get_server_information).await {
            Ok(Ok(server)) => {
                debug!("Notification server: {} {}", server.name, server.version);
                PermissionState::Granted
            }
            Ok(Err(e)) => {
                warn!("Notification server unavailable: {e}");
                PermissionState::Denied
            }
            Err(e) => {
                warn!("Notification server probe failed: {e}");
                PermissionState::Unknown
            }
        }
    }

    async fn request_permission(&self) -> PermissionState {
        self.permission_status().await
    }

    async fn create_channel(&self, channel: &ChannelConfig) -> Result<(), HostError> {
        if !self.config.enabled {
            return Err(HostError::Unavailable("notifications disabled in config".into()));
        }
        // Desktop servers have no channels.
        debug!("Notification channel '{}' accepted", channel.name);
        Ok(())
    }

    async fn schedule_recurring(&self, request: ScheduledTrigger) -> Result<(), HostError> {
        if !self.config.enabled {
            return Err(HostError::PermissionDenied);
        }
        request.trigger.validate()?;
        if !request.trigger.repeats {
            return Err(HostError::Rejected {
                identifier: request.identifier,
                reason: "only daily repeating triggers are supported".into(),
            });
        }

        let mut record = request;
        record.next_fire = None;
        let identifier = record.identifier.clone();

        let popups = Arc::new(Popups::new());
        let task = tokio::spawn(run_trigger(
            record.clone(),
            Delivery::from(&self.config),
            self.events.clone(),
            popups.clone(),
        ));

        let previous = self.armed.lock().await.insert(
            identifier.clone(),
            ArmedTrigger {
                record,
                task,
                popups,
            },
        );
        if let Some(previous) = previous {
            previous.disarm();
            debug!("Replaced trigger {identifier}");
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), HostError> {
        let mut armed = self.armed.lock().await;
        let count = armed.len();
        for (_, trigger) in armed.drain() {
            trigger.disarm();
        }
        debug!("Cancelled {count} trigger(s)");
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<ScheduledTrigger>, HostError> {
        let now = Local::now();
        let armed = self.armed.lock().await;
        let mut triggers: Vec<ScheduledTrigger> = armed
            .values()
            .map(|armed| {
                let mut record = armed.record.clone();
                record.next_fire =
                    clock::next_occurrence(&now, record.trigger.hour, record.trigger.minute);
                record
            })
            .collect();
        triggers.sort_by_key(|t| t.next_fire);
        Ok(triggers)
    }
}

/// Fire `record` every day at its local time until aborted.
async fn run_trigger(
    record: ScheduledTrigger,
    delivery: Delivery,
    events: mpsc::UnboundedSender<NotificationEvent>,
    popups: Arc<Popups>,
) {
    let (hour, minute) = (record.trigger.hour, record.trigger.minute);
    let Some(mut target) = clock::next_occurrence(&Local::now(), hour, minute) else {
        warn!("Trigger {} has no next occurrence", record.identifier);
        return;
    };
    debug!("Trigger {} armed for {target}", record.identifier);

    loop {
        let now = Local::now();
        if now >= target {
            deliver(&record, &delivery, &events, &popups);
            match clock::next_occurrence(&now, hour, minute) {
                Some(next) => target = next,
                None => return,
            }
            debug!("Trigger {} re-armed for {target}", record.identifier);
            continue;
        }
        tokio::time::sleep(clock::wait_step(&now, &target)).await;
    }
}

fn deliver(
    record: &ScheduledTrigger,
    delivery: &Delivery,
    events: &mpsc::UnboundedSender<NotificationEvent>,
    popups: &Arc<Popups>,
) {
    info!("Reminder {} due", record.identifier);
    let _ = events.send(NotificationEvent::ReceivedWhileForegrounded {
        identifier: record.identifier.clone(),
    });

    let record = record.clone();
    let delivery = delivery.clone();
    let events = events.clone();
    let popups = popups.clone();
    // show() and wait_for_action() block on D-Bus.
    tokio::task::spawn_blocking(move || {
        // Yesterday's unanswered popup gives way to today's.
        if let Some(id) = popups.take_open() {
            close_popup(id);
        }
        show_reminder(&record, &delivery, &events, &popups);
    });
}

fn show_reminder(
    record: &ScheduledTrigger,
    delivery: &Delivery,
    events: &mpsc::UnboundedSender<NotificationEvent>,
    popups: &Popups,
) {
    let mut notification = Notification::new();
    notification
        .appname(&delivery.app_name)
        .summary(&record.content.title)
        .body(&record.content.body)
        .icon(&delivery.icon)
        .hint(Hint::Category(record.content.category.clone()))
        .urgency(match delivery.urgency {
            Urgency::Low => notify_rust::Urgency::Low,
            Urgency::Normal => notify_rust::Urgency::Normal,
            Urgency::Critical => notify_rust::Urgency::Critical,
        })
        .timeout(match delivery.timeout_ms {
            0 => Timeout::Never,
            ms => Timeout::Milliseconds(ms),
        })
        .action(DEFAULT_ACTION_IDENTIFIER, "Recite")
        .action(YES_ACTION, "Yes")
        .action(DISMISS_ACTION, "No, thanks");
    if record.content.sound {
        notification.sound_name("message-new-instant");
    }

    let handle = match notification.show() {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Failed to show reminder {}: {e}", record.identifier);
            return;
        }
    };

    let id = handle.id();
    if !popups.track(id) {
        handle.close();
        return;
    }

    handle.wait_for_action(|action| match popups.response(&record.identifier, action) {
        Some(event) => {
            let _ = events.send(event);
        }
        None => debug!("Reminder {} closed without a response", record.identifier),
    });
    popups.untrack(id);
}

/// Close a popup shown earlier by id. notify-rust only closes through a
/// handle, so take over the id with an empty popup and close that; the
/// original waiter sees the close and returns.
fn close_popup(id: u32) {
    match Notification::new().id(id).summary("").show() {
        Ok(handle) => handle.close(),
        Err(e) => warn!("Failed to close popup {id}: {e}"),
    }
}
