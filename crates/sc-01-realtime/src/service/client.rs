//! Ready-wired connection manager, router and driver task.

use std::sync::Arc;

use shared_bus::{EventHandler, SubscriptionId};
use shared_types::{CredentialProvider, Observer};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::adapters::WebSocketTransport;
use crate::config::RealtimeConfig;
use crate::domain::{ConnectionState, LifecycleEvent};
use crate::error::ConnectionError;
use crate::ports::Transport;
use crate::service::connection::ConnectionManager;
use crate::service::router::MessageRouter;

/// The realtime channel as the application sees it.
///
/// Must be created inside a tokio runtime; the driver task is spawned
/// immediately. Dropping the client stops the driver even when other
/// holders of [`router`](Self::router) remain.
pub struct RealtimeClient {
    connection: ConnectionManager,
    router: Arc<MessageRouter>,
    driver: Option<JoinHandle<()>>,
}

impl RealtimeClient {
    /// Wire everything over the given transport.
    pub fn spawn(
        config: RealtimeConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let (connection, driver) =
            ConnectionManager::new(config, transport, Arc::clone(&credentials), Arc::clone(&observer));
        let router = Arc::new(MessageRouter::new(connection.clone(), credentials, observer));
        let driver = driver.spawn(router.clone());

        Self {
            connection,
            router,
            driver: Some(driver),
        }
    }

    /// Wire everything over a real WebSocket.
    pub fn websocket(
        config: RealtimeConfig,
        credentials: Arc<dyn CredentialProvider>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self::spawn(config, Arc::new(WebSocketTransport::new()), credentials, observer)
    }

    pub fn connect(&self) -> Result<(), ConnectionError> {
        self.connection.connect()
    }

    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.connection.disconnect().await
    }

    pub fn subscribe(
        &self,
        channel: impl Into<String>,
        action: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        self.router.subscribe(channel, action, handler)
    }

    pub fn unsubscribe(&self, channel: &str, action: &str, id: Option<SubscriptionId>) -> usize {
        self.router.unsubscribe(channel, action, id)
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.connection.state_changes()
    }

    pub fn lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.connection.lifecycle()
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Tear down and wait for the driver task to exit.
    pub async fn shutdown(mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        if self.connection.shutdown().is_ok() {
            if let Err(e) = driver.await {
                debug!(error = %e, "Driver task ended abnormally");
            }
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        // The router keeps a command sender alive, so the driver cannot
        // notice on its own that the client is gone.
        if self.driver.take().is_some() && self.connection.shutdown().is_err() {
            debug!("Driver already stopped");
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("state", &self.state())
            .field("channels", &self.router.channels())
            .finish()
    }
}
