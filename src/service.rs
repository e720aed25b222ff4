//! Service orchestration: one event loop that owns the scheduler and the
//! recitation controller.
//!
//! Inputs: host notification events, engine completion signals, control
//! commands from the API, and Ctrl-C. Handled strictly one at a time.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::notifier::Alert;
use crate::recitation::engine::EngineSignal;
use crate::recitation::machine::RecitationStatus;
use crate::recitation::{RecitationController, RecitationError, RECITATION_FAILED_MESSAGE};
use crate::reminder::host::{ChannelConfig, NotificationEvent, PermissionState, ScheduledTrigger};
use crate::reminder::{InstallReport, ReminderScheduler};

pub const PERMISSION_ADVISORY: &str = "Please enable notifications to receive prayer reminders.";

/// Requests from the control API. Each carries its reply channel.
#[derive(Debug)]
pub enum Command {
    Recite(oneshot::Sender<RecitationStatus>),
    Stop(oneshot::Sender<RecitationStatus>),
    Status(oneshot::Sender<StatusSnapshot>),
    ListReminders(oneshot::Sender<Vec<ScheduledTrigger>>),
    InstallReminders(oneshot::Sender<InstallReport>),
    ClearReminders(oneshot::Sender<()>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state: RecitationStatus,
    pub permission: PermissionState,
    pub reminders: usize,
}

/// Receiving ends wired into [`ReminderService::run`].
pub struct ServiceInputs {
    pub notifications: mpsc::UnboundedReceiver<NotificationEvent>,
    pub signals: mpsc::UnboundedReceiver<EngineSignal>,
    pub commands: mpsc::Receiver<Command>,
}

pub struct ReminderService {
    scheduler: ReminderScheduler,
    controller: RecitationController,
    alerts: Arc<dyn Alert>,
    channel: ChannelConfig,
    permission: PermissionState,
}

impl ReminderService {
    pub fn new(
        scheduler: ReminderScheduler,
        controller: RecitationController,
        alerts: Arc<dyn Alert>,
        channel: ChannelConfig,
    ) -> Self {
        Self {
            scheduler,
            controller,
            alerts,
            channel,
            permission: PermissionState::Unknown,
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn recitation_state(&self) -> RecitationStatus {
        self.controller.current_state()
    }

    /// Launch sequence: permission check, then (re)install every reminder.
    /// Never fails; problems are logged.
    pub async fn startup(&mut self) {
        self.ensure_permission().await;
        self.scheduler.install().await;
    }

    pub async fn run(mut self, inputs: ServiceInputs) {
        let ServiceInputs {
            mut notifications,
            mut signals,
            mut commands,
        } = inputs;

        info!(
            "Service ready, state {}, notifications {:?}",
            self.recitation_state(),
            self.permission()
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(event) = notifications.recv() => self.on_notification(event).await,
                Some(signal) = signals.recv() => self.on_engine_signal(signal).await,
                Some(command) = commands.recv() => self.on_command(command).await,
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
            }
        }

        self.controller.stop().await;
    }

    async fn ensure_permission(&mut self) {
        let host = self.scheduler.host().clone();

        if let Err(e) = host.create_channel(&self.channel).await {
            warn!("Failed to create notification channel: {e}");
        }

        let mut permission = host.permission_status().await;
        if !permission.is_granted() {
            permission = host.request_permission().await;
        }
        self.permission = permission;

        if permission.is_granted() {
            info!("Notifications enabled");
        } else {
            warn!("Notifications disabled ({permission:?}): {PERMISSION_ADVISORY}");
            self.alerts.alert("Permission required", PERMISSION_ADVISORY);
        }
    }

    pub(crate) async fn on_notification(&mut self, event: NotificationEvent) {
        match event {
            NotificationEvent::ReceivedWhileForegrounded { identifier } => {
                info!("Reminder {identifier} delivered");
            }
            NotificationEvent::UserResponded(response) => {
                if response.wants_recitation() {
                    info!(
                        "Reminder {} answered with {}, reciting",
                        response.identifier, response.action_identifier
                    );
                    self.recite().await;
                } else {
                    debug!(
                        "Reminder {} declined ({})",
                        response.identifier, response.action_identifier
                    );
                }
            }
        }
    }

    pub(crate) async fn on_engine_signal(&mut self, signal: EngineSignal) {
        if let Err(e) = self.controller.handle_signal(signal).await {
            self.report_failure(e);
        }
    }

    pub(crate) async fn on_command(&mut self, command: Command) {
        match command {
            Command::Recite(reply) => {
                let state = self.recite().await;
                let _ = reply.send(state);
            }
            Command::Stop(reply) => {
                let state = self.controller.stop().await;
                let _ = reply.send(state);
            }
            Command::Status(reply) => {
                let snapshot = StatusSnapshot {
                    state: self.controller.current_state(),
                    permission: self.permission,
                    reminders: self.scheduler.list_scheduled().await.len(),
                };
                let _ = reply.send(snapshot);
            }
            Command::ListReminders(reply) => {
                let _ = reply.send(self.scheduler.list_scheduled().await);
            }
            Command::InstallReminders(reply) => {
                let _ = reply.send(self.scheduler.install().await);
            }
            Command::ClearReminders(reply) => {
                self.scheduler.clear_all().await;
                let _ = reply.send(());
            }
        }
    }

    async fn recite(&mut self) -> RecitationStatus {
        if let Err(e) = self.controller.start().await {
            self.report_failure(e);
        }
        self.controller.current_state()
    }

    fn report_failure(&self, e: RecitationError) {
        error!("Recitation failed: {e}");
        self.alerts.alert("Error", RECITATION_FAILED_MESSAGE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::recitation::engine::Prosody;
    use crate::reminder::host::{
        NotificationHost, NotificationResponse, DEFAULT_ACTION_IDENTIFIER, DISMISS_ACTION, YES_ACTION,
    };
    use crate::test_support::{FakeNotificationHost, FakeSpeechEngine, RecordingAlerts};

    fn channel() -> ChannelConfig {
        ChannelConfig {
            name: "default".into(),
            vibration_pattern: vec![0, 250, 250, 250],
            light_color: "#FF231F7C".into(),
        }
    }

    fn service(host: &Arc<FakeNotificationHost>, engine: &Arc<FakeSpeechEngine>) -> ReminderService {
        service_with_alerts(host, engine, &Arc::new(RecordingAlerts::new()))
    }

    fn service_with_alerts(
        host: &Arc<FakeNotificationHost>,
        engine: &Arc<FakeSpeechEngine>,
        alerts: &Arc<RecordingAlerts>,
    ) -> ReminderService {
        ReminderService::new(
            ReminderScheduler::new(host.clone()),
            RecitationController::new(engine.clone(), "Amen", Prosody::default()),
            alerts.clone(),
            channel(),
        )
    }

    fn responded(action: &str) -> NotificationEvent {
        NotificationEvent::UserResponded(NotificationResponse {
            identifier: "six-pm".into(),
            action_identifier: action.into(),
        })
    }

    #[tokio::test]
    async fn startup_checks_permission_and_installs() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        service.startup().await;

        assert_eq!(service.permission(), PermissionState::Granted);
        assert_eq!(host.channels(), vec![channel()]);
        assert_eq!(host.list_scheduled().await.unwrap().len(), 4);
        assert_eq!(service.recitation_state(), RecitationStatus::Idle);
    }

    #[tokio::test]
    async fn denied_permission_still_installs_and_recites() {
        let host = Arc::new(FakeNotificationHost::with_permission(PermissionState::Denied));
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        service.startup().await;
        assert_eq!(service.permission(), PermissionState::Denied);
        assert_eq!(host.list_scheduled().await.unwrap().len(), 4);

        service.on_notification(responded(YES_ACTION)).await;
        assert_eq!(service.recitation_state(), RecitationStatus::Speaking);
    }

    #[tokio::test]
    async fn unavailable_host_does_not_block_startup() {
        let host = Arc::new(FakeNotificationHost::unavailable());
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        service.startup().await;
        assert_eq!(service.permission(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn default_tap_starts_recitation_once() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        service.on_notification(responded(DEFAULT_ACTION_IDENTIFIER)).await;

        assert_eq!(engine.speak_count(), 1);
        assert_eq!(engine.stop_count(), 0);
        assert_eq!(service.recitation_state(), RecitationStatus::Speaking);
    }

    #[tokio::test]
    async fn dismiss_and_delivery_do_not_recite() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        service
            .on_notification(NotificationEvent::ReceivedWhileForegrounded {
                identifier: "noon".into(),
            })
            .await;
        service.on_notification(responded(DISMISS_ACTION)).await;

        assert!(engine.calls().is_empty());
        assert_eq!(service.recitation_state(), RecitationStatus::Idle);
    }

    #[tokio::test]
    async fn engine_error_returns_service_to_idle() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        service.on_notification(responded(YES_ACTION)).await;
        service
            .on_engine_signal(EngineSignal::Error(1, "no audio device".into()))
            .await;

        assert_eq!(service.recitation_state(), RecitationStatus::Idle);
    }

    #[tokio::test]
    async fn engine_error_alerts_the_user_once() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let mut service = service_with_alerts(&host, &engine, &alerts);

        service.on_notification(responded(YES_ACTION)).await;
        service
            .on_engine_signal(EngineSignal::Error(1, "no audio device".into()))
            .await;

        assert_eq!(alerts.bodies(), vec![RECITATION_FAILED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn stale_error_after_stop_is_silent() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let mut service = service_with_alerts(&host, &engine, &alerts);

        service.on_notification(responded(YES_ACTION)).await;
        let (tx, _rx) = oneshot::channel();
        service.on_command(Command::Stop(tx)).await;
        service
            .on_engine_signal(EngineSignal::Error(1, "killed".into()))
            .await;

        assert!(alerts.bodies().is_empty());
        assert_eq!(service.recitation_state(), RecitationStatus::Idle);
    }

    #[tokio::test]
    async fn rejected_speak_alerts_the_user() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::failing());
        let alerts = Arc::new(RecordingAlerts::new());
        let mut service = service_with_alerts(&host, &engine, &alerts);

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::Recite(tx)).await;

        assert_eq!(rx.await.unwrap(), RecitationStatus::Idle);
        assert_eq!(alerts.bodies(), vec![RECITATION_FAILED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn denied_permission_shows_advisory() {
        let host = Arc::new(FakeNotificationHost::with_permission(PermissionState::Denied));
        let engine = Arc::new(FakeSpeechEngine::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let mut service = service_with_alerts(&host, &engine, &alerts);

        service.startup().await;
        assert_eq!(alerts.bodies(), vec![PERMISSION_ADVISORY.to_string()]);
    }

    #[tokio::test]
    async fn granted_permission_shows_nothing() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let alerts = Arc::new(RecordingAlerts::new());
        let mut service = service_with_alerts(&host, &engine, &alerts);

        service.startup().await;
        assert!(alerts.bodies().is_empty());
    }

    #[tokio::test]
    async fn commands_reply_with_state() {
        let host = Arc::new(FakeNotificationHost::new());
        let engine = Arc::new(FakeSpeechEngine::new());
        let mut service = service(&host, &engine);

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::Recite(tx)).await;
        assert_eq!(rx.await.unwrap(), RecitationStatus::Speaking);

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::Stop(tx)).await;
        assert_eq!(rx.await.unwrap(), RecitationStatus::Idle);

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::InstallReminders(tx)).await;
        assert!(rx.await.unwrap().is_complete());

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::Status(tx)).await;
        let snapshot = rx.await.unwrap();
        assert_eq!(snapshot.reminders, 4);
        assert_eq!(snapshot.state, RecitationStatus::Idle);

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::ClearReminders(tx)).await;
        rx.await.unwrap();

        let (tx, rx) = oneshot::channel();
        service.on_command(Command::ListReminders(tx)).await;
        assert!(rx.await.unwrap().is_empty());
    }
}
