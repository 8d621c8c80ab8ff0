//! SC-Listen: print Sealed-Chat realtime events.
//!
//! Connects with a session token, subscribes to the requested
//! (channel, action) pairs and writes every dispatched payload to stdout as
//! one JSON object per line. Connection lifecycle goes to stderr.
//!
//! ## Usage
//!
//! ```bash
//! sc-listen --token "$TOKEN" -s message:created -s message:updated
//! ```
//!
//! Exits 0 on Ctrl-C and 1 once the connection gives up reconnecting.

mod args;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sc_01_realtime::{LifecycleEvent, RealtimeClient};
use sc_telemetry::{init_telemetry, TelemetryConfig, TracingObserver};
use serde_json::{json, Value};
use shared_bus::handler_fn;
use shared_types::SessionCredentials;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use args::Args;

enum Outcome {
    Interrupted,
    GaveUp,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env().for_service("sc-listen");
    telemetry.json_logs |= args.json_logs;
    init_telemetry(&telemetry)?;

    let client = RealtimeClient::websocket(
        args.realtime_config()?,
        Arc::new(SessionCredentials::with_token(args.token.clone())),
        Arc::new(TracingObserver::new()),
    );

    let (lines_tx, mut lines) = mpsc::unbounded_channel::<Value>();
    for target in &args.subscriptions {
        let tx = lines_tx.clone();
        let (channel, action) = (target.channel.clone(), target.action.clone());
        client.subscribe(
            target.channel.clone(),
            target.action.clone(),
            handler_fn(move |payload| {
                tx.send(json!({ "channel": channel, "action": action, "data": payload }))?;
                Ok(())
            }),
        );
    }

    let mut lifecycle = client.lifecycle();
    client.connect()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Outcome::Interrupted,
            Some(line) = lines.recv() => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{line}")?;
                stdout.flush()?;
            }
            event = lifecycle.recv() => match event {
                Ok(event) => {
                    eprintln!("{}", describe(&event));
                    if matches!(event, LifecycleEvent::TerminalFailure { .. }) {
                        break Outcome::GaveUp;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Lifecycle events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break Outcome::GaveUp,
            },
        }
    };

    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "Disconnect failed");
    }
    client.shutdown().await;

    Ok(match outcome {
        Outcome::Interrupted => ExitCode::SUCCESS,
        Outcome::GaveUp => ExitCode::FAILURE,
    })
}

fn describe(event: &LifecycleEvent) -> String {
    match event {
        LifecycleEvent::Connecting { attempt: 0 } => "connecting".to_string(),
        LifecycleEvent::Connecting { attempt } => format!("connecting (attempt {attempt})"),
        LifecycleEvent::Connected => "connected".to_string(),
        LifecycleEvent::ReconnectScheduled { attempt, delay } => {
            format!("connection lost, retry {attempt} in {} ms", delay.as_millis())
        }
        LifecycleEvent::Disconnected => "disconnected".to_string(),
        LifecycleEvent::TerminalFailure { attempts, reason } => {
            format!("giving up after {attempts} attempts: {reason}")
        }
    }
}
