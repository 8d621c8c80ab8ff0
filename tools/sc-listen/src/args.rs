//! Command-line arguments.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use sc_01_realtime::RealtimeConfig;

/// Print realtime channel events as JSON lines
#[derive(Parser, Debug)]
#[command(name = "sc-listen")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// WebSocket endpoint URL
    #[arg(long, env = "SC_WS_URL", default_value = "ws://localhost:3000/cable")]
    pub url: String,

    /// Session token sent in every subscribe frame
    #[arg(long, env = "SC_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Subscription as `channel:action`; repeatable
    #[arg(short, long = "subscribe", value_name = "CHANNEL:ACTION", required = true)]
    pub subscriptions: Vec<Target>,

    /// Reconnects attempted before giving up
    #[arg(long, default_value_t = 5)]
    pub max_reconnect_attempts: u32,

    /// Backoff base in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub base_delay_ms: u64,

    /// Emit logs as JSON on stderr
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    pub fn realtime_config(&self) -> Result<RealtimeConfig> {
        Ok(RealtimeConfig::builder()
            .url(&self.url)
            .max_reconnect_attempts(self.max_reconnect_attempts)
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .build()?)
    }
}

/// One `channel:action` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub channel: String,
    pub action: String,
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((channel, action)) = s.split_once(':') else {
            bail!("expected CHANNEL:ACTION, got `{s}`");
        };
        let (channel, action) = (channel.trim(), action.trim());
        if channel.is_empty() || action.is_empty() {
            bail!("channel and action must be non-empty in `{s}`");
        }
        Ok(Self {
            channel: channel.to_string(),
            action: action.to_string(),
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        let target: Target = "message:created".parse().unwrap();
        assert_eq!(target.channel, "message");
        assert_eq!(target.action, "created");
        assert_eq!(target.to_string(), "message:created");

        assert!("message".parse::<Target>().is_err());
        assert!(":created".parse::<Target>().is_err());
        assert!("message:".parse::<Target>().is_err());
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "sc-listen",
            "--url",
            "wss://chat.example.com/cable",
            "--token",
            "t",
            "-s",
            "message:created",
            "--subscribe",
            "message:updated",
            "--max-reconnect-attempts",
            "2",
        ])
        .unwrap();
        assert_eq!(args.subscriptions.len(), 2);

        let config = args.realtime_config().unwrap();
        assert_eq!(config.url, "wss://chat.example.com/cable");
        assert_eq!(config.max_reconnect_attempts, 2);
    }

    #[test]
    fn test_subscription_required() {
        assert!(Args::try_parse_from(["sc-listen", "--token", "t"]).is_err());
    }
}
