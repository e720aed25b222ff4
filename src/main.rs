//! angelus-reminder: daily Angelus reminders and spoken recitation.

mod api;
mod config;
mod notifier;
mod prayer;
mod recitation;
mod reminder;
mod service;
#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use recitation::engine::{Prosody, SpeechEngine};
use recitation::espeak::EspeakEngine;
use recitation::machine::RecitationStatus;
use recitation::RecitationController;
use reminder::desktop::DesktopNotificationHost;
use reminder::host::ChannelConfig;
use reminder::{ReminderScheduler, SLOTS};

#[derive(Parser, Debug)]
#[command(name = "angelus-reminder", about = "Daily Angelus prayer reminders")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Run the reminder service (default)
    Run,
    /// Recite the prayer once in the foreground, Ctrl-C to stop
    Recite,
    /// Print the reminder times and the prayer
    Times,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,notify_rust=info,zbus=info,hyper=info")
    } else {
        EnvFilter::new("info,notify_rust=warn,zbus=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::load(args.config.as_deref());

    match args.mode.unwrap_or(Mode::Run) {
        Mode::Run => run_service(config).await,
        Mode::Recite => recite_once(&config).await,
        Mode::Times => {
            print_times();
            Ok(())
        }
    }
}

async fn run_service(config: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("angelus-reminder starting");

    let (notification_tx, notifications) = mpsc::unbounded_channel();
    let (signal_tx, signals) = mpsc::unbounded_channel();
    let (command_tx, commands) = mpsc::channel(16);

    let host = Arc::new(DesktopNotificationHost::new(
        config.notifications.clone(),
        notification_tx,
    ));
    let engine: Arc<dyn SpeechEngine> = Arc::new(EspeakEngine::new(&config.speech.engine, signal_tx));
    info!(
        "Speech engine: {} (language: {}, pitch: {}, rate: {})",
        config.speech.engine, config.speech.language, config.speech.pitch, config.speech.rate
    );

    let controller = RecitationController::new(
        engine,
        prayer::THE_ANGELUS,
        Prosody::from(&config.speech),
    );
    let channel = ChannelConfig {
        name: config.notifications.channel_name.clone(),
        vibration_pattern: vec![0, 250, 250, 250],
        light_color: "#FF231F7C".into(),
    };

    let mut service = service::ReminderService::new(
        ReminderScheduler::new(host),
        controller,
        Arc::new(notifier::Notifier::new(&config.notifications)),
        channel,
    );
    service.startup().await;

    if config.api.enabled {
        api::start_api(api::ApiState { commands: command_tx }, config.api.port).await;
    } else {
        // Nothing else sends commands; the loop's command branch goes quiet.
        drop(command_tx);
    }

    service
        .run(service::ServiceInputs {
            notifications,
            signals,
            commands,
        })
        .await;

    Ok(())
}

async fn recite_once(config: &config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let (signal_tx, mut signals) = mpsc::unbounded_channel();
    let engine = Arc::new(EspeakEngine::new(&config.speech.engine, signal_tx));
    let mut controller = RecitationController::new(
        engine,
        prayer::THE_ANGELUS,
        Prosody::from(&config.speech),
    );

    controller.start().await?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    while controller.current_state() == RecitationStatus::Speaking {
        tokio::select! {
            Some(signal) = signals.recv() => {
                controller.handle_signal(signal).await?;
            }
            _ = &mut interrupt => {
                controller.stop().await;
            }
        }
    }

    Ok(())
}

fn print_times() {
    println!("You will receive reminders at:");
    for slot in &SLOTS {
        println!("  • {} ({})", slot.label, slot.identifier);
    }
    println!();
    println!("{}", prayer::TITLE);
    println!();
    println!("{}", prayer::THE_ANGELUS);
}
