//! One-off desktop alerts via notify-rust (D-Bus).
//!
//! Used for the few user-visible failures: a recitation error and the
//! notification-permission advisory. Reminders themselves go through
//! `reminder::desktop`.

use notify_rust::Notification;
use tracing::{debug, warn};

use crate::config::NotificationConfig;

/// Where user-visible alerts go.
pub trait Alert: Send + Sync {
    fn alert(&self, summary: &str, body: &str);
}

pub struct Notifier {
    enabled: bool,
    app_name: String,
    icon: String,
}

impl Notifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            enabled: config.enabled,
            app_name: config.app_name.clone(),
            icon: config.icon.clone(),
        }
    }

}

impl Alert for Notifier {
    fn alert(&self, summary: &str, body: &str) {
        if !self.enabled {
            debug!("Alert suppressed: {summary}: {body}");
            return;
        }

        debug!("Alert: {summary}");

        if let Err(e) = Notification::new()
            .appname(&self.app_name)
            .summary(summary)
            .body(body)
            .icon(&self.icon)
            .timeout(5000)
            .show()
        {
            warn!("Failed to show alert: {e}");
        }
    }
}
