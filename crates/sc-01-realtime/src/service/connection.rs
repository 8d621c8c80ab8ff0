//! # Connection Manager
//!
//! A cloneable [`ConnectionManager`] handle plus the [`ConnectionDriver`]
//! task that exclusively owns the physical connection.
//!
//! ```text
//!   ConnectionManager ──Command──▶ ConnectionDriver ──▶ Transport
//!        ▲   ▲                       │  │  │
//!  watch │   │ broadcast             │  │  └─ reconnect sleep
//!  state │   │ LifecycleEvent        │  └──── FrameStream ─▶ ConnectionListener
//!        └───┴───────────────────────┘
//! ```
//!
//! Every state transition happens on the driver task. Commands, inbound
//! frames and backoff timers are multiplexed with `tokio::select!`, so a
//! `disconnect()` cancels a pending reconnect or an in-flight open.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;

use shared_types::{CredentialProvider, Observer};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Sleep};
use tracing::{debug, error, info, warn};

use crate::config::RealtimeConfig;
use crate::domain::{
    CloseOutcome, ConnectionLifecycle, ConnectionState, LifecycleEvent, ReconnectPolicy,
};
use crate::error::{ConnectionError, TransportError};
use crate::ports::{ConnectionListener, Transport, TransportSession};

enum Command {
    Connect,
    Send(String),
    Disconnect { ack: oneshot::Sender<()> },
    Shutdown,
}

/// Handle to the connection driver.
#[derive(Clone)]
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
    credentials: Arc<dyn CredentialProvider>,
}

impl ConnectionManager {
    /// Create a handle and its driver. The driver does nothing until run.
    pub fn new(
        config: RealtimeConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        observer: Arc<dyn Observer>,
    ) -> (Self, ConnectionDriver) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (lifecycle_tx, _) = broadcast::channel(config.lifecycle_capacity.max(1));
        let policy = ReconnectPolicy::new(config.max_reconnect_attempts, config.base_delay());

        let handle = Self {
            commands: command_tx,
            state: state_rx,
            lifecycle: lifecycle_tx.clone(),
            credentials: Arc::clone(&credentials),
        };
        let driver = ConnectionDriver {
            config,
            transport,
            credentials,
            observer,
            commands: command_rx,
            state_tx,
            lifecycle_tx,
            lifecycle: ConnectionLifecycle::new(policy),
        };
        (handle, driver)
    }

    /// Start connecting.
    ///
    /// A no-op while connecting or connected. Fails immediately, without
    /// touching the transport, when no session token is available.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        if self.credentials.token().is_none() {
            warn!("Connect refused: no session token");
            return Err(ConnectionError::MissingCredential);
        }
        self.command(Command::Connect)
    }

    /// Close the connection, cancel any pending reconnect and forget all
    /// subscriptions. Resolves once the driver has done so.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        let (ack, done) = oneshot::channel();
        self.command(Command::Disconnect { ack })?;
        done.await.map_err(|_| ConnectionError::DriverStopped)
    }

    /// Queue a raw outbound frame. Dropped by the driver unless connected.
    pub fn send(&self, frame: String) -> Result<(), ConnectionError> {
        self.command(Command::Send(frame))
    }

    /// Stop the driver task after tearing the connection down.
    pub fn shutdown(&self) -> Result<(), ConnectionError> {
        self.command(Command::Shutdown)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch of the connection state.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Subscribe to lifecycle events emitted from now on.
    pub fn lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }

    fn command(&self, command: Command) -> Result<(), ConnectionError> {
        self.commands
            .send(command)
            .map_err(|_| ConnectionError::DriverStopped)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

enum OpenOutcome {
    Opened(TransportSession),
    Failed(String),
    Cancelled(oneshot::Sender<()>),
    Shutdown,
}

/// Task owning the physical connection.
pub struct ConnectionDriver {
    config: RealtimeConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    observer: Arc<dyn Observer>,
    commands: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    lifecycle_tx: broadcast::Sender<LifecycleEvent>,
    lifecycle: ConnectionLifecycle,
}

impl ConnectionDriver {
    /// Run on a new tokio task.
    pub fn spawn(self, listener: Arc<dyn ConnectionListener>) -> JoinHandle<()> {
        tokio::spawn(self.run(listener))
    }

    /// Drive the connection until a shutdown command arrives or the command
    /// channel closes.
    pub async fn run(mut self, listener: Arc<dyn ConnectionListener>) {
        let mut link: Option<TransportSession> = None;
        let mut retry: Option<Pin<Box<Sleep>>> = None;

        loop {
            if self.lifecycle.state() == ConnectionState::Connecting {
                match self.open().await {
                    OpenOutcome::Opened(session) => {
                        link = Some(session);
                        self.lifecycle.opened();
                        self.publish_state();
                        info!(url = %self.config.url, "Realtime connection established");
                        self.emit(LifecycleEvent::Connected);
                        listener.on_connected();
                    }
                    OpenOutcome::Failed(reason) => {
                        warn!(url = %self.config.url, reason = %reason, "Connection attempt failed");
                        retry = self.handle_close(listener.as_ref(), &reason);
                    }
                    OpenOutcome::Cancelled(ack) => {
                        self.teardown(listener.as_ref());
                        let _ = ack.send(());
                    }
                    OpenOutcome::Shutdown => {
                        self.teardown(listener.as_ref());
                        break;
                    }
                }
                continue;
            }

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => {
                        if self.lifecycle.request_connect() {
                            retry = None;
                            self.announce_connecting();
                        } else {
                            debug!(state = %self.lifecycle.state(), "Connect ignored");
                        }
                    }
                    Some(Command::Send(frame)) => match link.as_mut() {
                        Some(session) => {
                            if let Err(e) = session.sink.send(frame).await {
                                self.report_transport_error(&e);
                            }
                        }
                        None => debug!("Dropping outbound frame: not connected"),
                    },
                    Some(Command::Disconnect { ack }) => {
                        retry = None;
                        if let Some(mut session) = link.take() {
                            session.sink.close().await;
                        }
                        self.teardown(listener.as_ref());
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown) | None => {
                        if let Some(mut session) = link.take() {
                            session.sink.close().await;
                        }
                        self.teardown(listener.as_ref());
                        break;
                    }
                },
                frame = next_frame(&mut link), if link.is_some() => match frame {
                    Some(Ok(text)) => listener.on_frame(&text),
                    Some(Err(e)) => self.report_transport_error(&e),
                    None => {
                        link = None;
                        retry = self.handle_close(listener.as_ref(), "connection closed");
                    }
                },
                () = expire(&mut retry), if retry.is_some() => {
                    retry = None;
                    self.resume(listener.as_ref());
                }
            }
        }

        debug!("Connection driver stopped");
    }

    /// Open the transport, bounded by the connect timeout and cancellable
    /// by `disconnect()`.
    async fn open(&mut self) -> OpenOutcome {
        let transport = Arc::clone(&self.transport);
        let url = self.config.url.clone();
        let limit = self.config.connect_timeout();

        let opening = timeout(limit, transport.open(&url));
        tokio::pin!(opening);

        loop {
            tokio::select! {
                result = &mut opening => {
                    return match result {
                        Ok(Ok(session)) => OpenOutcome::Opened(session),
                        Ok(Err(e)) => OpenOutcome::Failed(e.to_string()),
                        Err(_) => OpenOutcome::Failed(format!(
                            "connect timed out after {}ms",
                            limit.as_millis()
                        )),
                    };
                }
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect { ack }) => return OpenOutcome::Cancelled(ack),
                    Some(Command::Shutdown) | None => return OpenOutcome::Shutdown,
                    Some(Command::Connect) => debug!("Connect ignored: already connecting"),
                    Some(Command::Send(_)) => debug!("Dropping outbound frame: still connecting"),
                },
            }
        }
    }

    fn handle_close(&mut self, listener: &dyn ConnectionListener, reason: &str) -> Option<Pin<Box<Sleep>>> {
        match self.lifecycle.closed() {
            CloseOutcome::Retry { attempt, delay } => {
                self.publish_state();
                warn!(
                    attempt,
                    max_attempts = self.config.max_reconnect_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    reason,
                    "Reconnect scheduled"
                );
                self.emit(LifecycleEvent::ReconnectScheduled { attempt, delay });
                Some(Box::pin(sleep(delay)))
            }
            CloseOutcome::Terminal { attempts } => {
                self.publish_state();
                self.fail(listener, attempts, reason);
                None
            }
            CloseOutcome::Ignored => None,
        }
    }

    /// Backoff elapsed: reconnect if a token is still available.
    fn resume(&mut self, listener: &dyn ConnectionListener) {
        if self.credentials.token().is_none() {
            let attempts = self.lifecycle.abandon();
            self.publish_state();
            self.fail(listener, attempts, &ConnectionError::MissingCredential.to_string());
            return;
        }
        if self.lifecycle.retry_due() {
            self.announce_connecting();
        }
    }

    fn fail(&self, listener: &dyn ConnectionListener, attempts: u32, reason: &str) {
        error!(attempts, reason, "Realtime connection failed permanently");
        self.observer.terminal_failure(attempts, reason);
        self.emit(LifecycleEvent::TerminalFailure {
            attempts,
            reason: reason.to_string(),
        });
        listener.on_terminal_failure(attempts, reason);
    }

    fn teardown(&mut self, listener: &dyn ConnectionListener) {
        self.lifecycle.teardown();
        self.publish_state();
        info!("Realtime connection closed by client");
        self.emit(LifecycleEvent::Disconnected);
        listener.on_teardown();
    }

    fn announce_connecting(&self) {
        self.publish_state();
        let attempt = self.lifecycle.attempt();
        debug!(attempt, url = %self.config.url, "Connecting");
        self.emit(LifecycleEvent::Connecting { attempt });
    }

    fn report_transport_error(&self, error: &TransportError) {
        warn!(error = %error, "Transport error");
        self.observer.transport_error(&error.to_string());
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.lifecycle.state());
    }

    fn emit(&self, event: LifecycleEvent) {
        // No receivers is fine.
        let _ = self.lifecycle_tx.send(event);
    }
}

async fn next_frame(link: &mut Option<TransportSession>) -> Option<Result<String, TransportError>> {
    match link {
        Some(session) => session.stream.next_frame().await,
        None => pending().await,
    }
}

async fn expire(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(delay) => delay.as_mut().await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryServer, InMemoryTransport};
    use parking_lot::Mutex;
    use shared_types::testing::{Observed, RecordingObserver};
    use shared_types::SessionCredentials;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingListener {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingListener {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl ConnectionListener for RecordingListener {
        fn on_connected(&self) {
            self.calls.lock().push("connected".into());
        }
        fn on_frame(&self, frame: &str) {
            self.calls.lock().push(format!("frame:{frame}"));
        }
        fn on_teardown(&self) {
            self.calls.lock().push("teardown".into());
        }
        fn on_terminal_failure(&self, attempts: u32, _reason: &str) {
            self.calls.lock().push(format!("terminal:{attempts}"));
        }
    }

    struct Harness {
        manager: ConnectionManager,
        server: InMemoryServer,
        listener: Arc<RecordingListener>,
        observer: Arc<RecordingObserver>,
        credentials: Arc<SessionCredentials>,
        driver: JoinHandle<()>,
    }

    fn harness() -> Harness {
        harness_with(RealtimeConfig::default())
    }

    fn harness_with(config: RealtimeConfig) -> Harness {
        let (transport, server) = InMemoryTransport::pair();
        let credentials = Arc::new(SessionCredentials::with_token("tok"));
        let observer = Arc::new(RecordingObserver::new());
        let listener = Arc::new(RecordingListener::default());
        let (manager, driver) = ConnectionManager::new(
            config,
            Arc::new(transport),
            credentials.clone(),
            observer.clone(),
        );
        let driver = driver.spawn(listener.clone());
        Harness {
            manager,
            server,
            listener,
            observer,
            credentials,
            driver,
        }
    }

    async fn wait_for(manager: &ConnectionManager, state: ConnectionState) {
        let mut changes = manager.state_changes();
        changes
            .wait_for(|s| *s == state)
            .await
            .expect("driver alive");
    }

    async fn until(cond: impl Fn() -> bool) {
        for _ in 0..1000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_connect_without_token_fails_fast() {
        let h = harness();
        h.credentials.clear();

        assert_eq!(h.manager.connect(), Err(ConnectionError::MissingCredential));
        tokio::task::yield_now().await;
        assert_eq!(h.server.open_attempts(), 0);
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_then_frames_reach_listener() {
        let mut h = harness();
        h.manager.connect().unwrap();
        let conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;

        conn.push("one");
        conn.push("two");
        until(|| h.listener.calls().len() == 3).await;
        h.manager.disconnect().await.unwrap();

        assert_eq!(
            h.listener.calls(),
            vec!["connected", "frame:one", "frame:two", "teardown"]
        );
    }

    #[tokio::test]
    async fn test_connect_is_noop_when_connected() {
        let mut h = harness();
        h.manager.connect().unwrap();
        let _conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;

        h.manager.connect().unwrap();
        h.manager.disconnect().await.unwrap();
        assert_eq!(h.server.open_attempts(), 1);
    }

    #[tokio::test]
    async fn test_send_reaches_server_only_when_connected() {
        let mut h = harness();
        h.manager.send("early".into()).unwrap();
        h.manager.connect().unwrap();
        let mut conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;

        h.manager.send("late".into()).unwrap();
        assert_eq!(conn.recv().await.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_non_fatal_transport_error_keeps_connection() {
        let mut h = harness();
        h.manager.connect().unwrap();
        let conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;

        conn.fail("checksum mismatch");
        conn.push("after");
        until(|| h.listener.calls().contains(&"frame:after".to_string())).await;

        assert_eq!(
            h.observer.events(),
            vec![Observed::TransportError("Receive failed: checksum mismatch".into())]
        );
        assert!(h.manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_then_terminal_failure() {
        let h = harness();
        h.server.refuse_all(true);
        let mut events = h.manager.lifecycle();
        let started = Instant::now();

        h.manager.connect().unwrap();

        let mut scheduled = Vec::new();
        let mut connecting_at = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                LifecycleEvent::Connecting { attempt } => {
                    connecting_at.push((attempt, started.elapsed()));
                }
                LifecycleEvent::ReconnectScheduled { attempt, delay } => {
                    scheduled.push((attempt, delay.as_millis()));
                }
                LifecycleEvent::TerminalFailure { attempts, .. } => {
                    assert_eq!(attempts, 5);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(
            scheduled,
            vec![(1, 2000), (2, 4000), (3, 8000), (4, 16000), (5, 32000)]
        );
        let offsets: Vec<u64> = connecting_at
            .iter()
            .map(|(_, at)| at.as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 2, 6, 14, 30, 62]);
        assert_eq!(h.server.open_attempts(), 6);
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
        assert_eq!(h.observer.terminal_failures(), 1);
        assert_eq!(h.listener.calls(), vec!["terminal:5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_drop_resets_attempts() {
        let mut h = harness();
        h.manager.connect().unwrap();
        let conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;

        let mut events = h.manager.lifecycle();
        conn.close();
        assert_eq!(
            events.recv().await.unwrap(),
            LifecycleEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_secs(2)
            }
        );

        let _conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;
        assert_eq!(h.listener.calls(), vec!["connected", "connected"]);
        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Connecting { attempt: 1 });
        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_reconnect() {
        let h = harness();
        h.server.refuse_all(true);
        let mut events = h.manager.lifecycle();
        h.manager.connect().unwrap();

        loop {
            if let LifecycleEvent::ReconnectScheduled { .. } = events.recv().await.unwrap() {
                break;
            }
        }
        h.manager.disconnect().await.unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.server.open_attempts(), 1);
        assert_eq!(h.listener.calls(), vec!["teardown"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_hanging_open() {
        let h = harness();
        h.server.hang_opens(true);
        h.manager.connect().unwrap();
        wait_for(&h.manager, ConnectionState::Connecting).await;

        h.manager.disconnect().await.unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Disconnected);
        assert_eq!(h.listener.calls(), vec!["teardown"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_timeout_counts_as_close() {
        let config = RealtimeConfig::builder()
            .connect_timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        let h = harness_with(config);
        h.server.hang_opens(true);
        let mut events = h.manager.lifecycle();
        h.manager.connect().unwrap();

        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Connecting { attempt: 0 });
        assert_eq!(
            events.recv().await.unwrap(),
            LifecycleEvent::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_secs(2)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_at_reconnect_is_terminal() {
        let mut h = harness();
        h.manager.connect().unwrap();
        let conn = h.server.accept().await.unwrap();
        wait_for(&h.manager, ConnectionState::Connected).await;

        h.credentials.clear();
        let mut events = h.manager.lifecycle();
        conn.close();

        let mut last = None;
        while let Ok(event) = events.recv().await {
            let done = matches!(event, LifecycleEvent::TerminalFailure { .. });
            last = Some(event);
            if done {
                break;
            }
        }
        assert_eq!(
            last,
            Some(LifecycleEvent::TerminalFailure {
                attempts: 1,
                reason: ConnectionError::MissingCredential.to_string(),
            })
        );
        assert_eq!(h.server.open_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_connect_after_terminal_gets_full_budget() {
        let config = RealtimeConfig::builder().max_reconnect_attempts(1).build().unwrap();
        let mut h = harness_with(config);
        h.server.refuse_all(true);
        let mut events = h.manager.lifecycle();
        h.manager.connect().unwrap();
        loop {
            if let LifecycleEvent::TerminalFailure { .. } = events.recv().await.unwrap() {
                break;
            }
        }

        h.server.refuse_all(false);
        h.manager.connect().unwrap();
        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Connecting { attempt: 0 });
        let _conn = h.server.accept().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Connected);
    }

    #[tokio::test]
    async fn test_shutdown_stops_driver() {
        let h = harness();
        h.manager.shutdown().unwrap();
        h.driver.await.unwrap();
        assert_eq!(h.manager.connect(), Err(ConnectionError::DriverStopped));
    }
}
