//! angelus-ctl: command-line client for the angelus-reminder control API.
//!
//! Sends one HTTP request to the running service and prints the JSON reply.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::{Client, Method};
use serde_json::Value;

const DEFAULT_PORT: u16 = 8768;

#[derive(Parser, Debug)]
#[command(name = "angelus-ctl", about = "Control a running angelus-reminder service")]
struct Args {
    /// Control API port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Show recitation state, permission and reminder count
    Status,
    /// Recite the prayer now (stops it if already reciting)
    Recite,
    /// Stop reciting
    Stop,
    /// List scheduled reminders
    Reminders,
    /// Re-install the four daily reminders
    Install,
    /// Cancel all scheduled reminders
    Clear,
}

impl Action {
    fn request(self) -> (Method, &'static str) {
        match self {
            Self::Status => (Method::GET, "/status"),
            Self::Recite => (Method::POST, "/recite"),
            Self::Stop => (Method::POST, "/stop"),
            Self::Reminders => (Method::GET, "/reminders"),
            Self::Install => (Method::POST, "/reminders"),
            Self::Clear => (Method::DELETE, "/reminders"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let (method, path) = args.command.request();
    let url = format!("http://127.0.0.1:{}{path}", args.port);

    let client = match Client::builder().timeout(Duration::from_secs(5)).build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("angelus-ctl: {e}");
            return ExitCode::FAILURE;
        }
    };

    let response = match client.request(method, &url).send().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("angelus-ctl: service not reachable at {url}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let status = response.status();
    let body: Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("angelus-ctl: invalid response ({status}): {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&body) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{body}"),
    }

    if status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
