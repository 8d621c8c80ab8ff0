//! # Reconnect Flows
//!
//! The full realtime client (driver task, router, registry) against the
//! in-memory server:
//!
//! 1. subscriptions made before connecting are replayed on every connect,
//!    one subscribe per distinct channel, with the token current at the time;
//! 2. pings, notices and garbage never reach handlers or break the stream;
//! 3. a failing handler does not stop the others;
//! 4. retries exhaust into a terminal failure that the observer sees, and a
//!    manual connect afterwards starts over;
//! 5. disconnect empties the registry.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sc_01_realtime::{Command, ConnectionState, LifecycleEvent};
    use sc_telemetry::{TracingObserver, FRAMES_DROPPED};
    use serde_json::json;
    use shared_bus::handler_fn;

    use crate::integration::fixtures::{
        control_frames, credentials, event, realtime, realtime_with, recorder, until, TOKEN,
    };

    // =========================================================================
    // REPLAY
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_replay_on_every_connect() {
        let mut rt = realtime(credentials());
        let (created, mut created_rx) = recorder();
        let (typing, _typing_rx) = recorder();
        rt.client.subscribe("message", "created", created);
        rt.client.subscribe("message", "updated", handler_fn(|_| Ok(())));
        rt.client.subscribe("room", "typing", typing);

        rt.client.connect().unwrap();
        let mut conn = rt.server.accept().await.unwrap();
        assert_eq!(
            control_frames(&mut conn, 2).await,
            vec![
                (Command::Subscribe, "message".to_string(), TOKEN.to_string()),
                (Command::Subscribe, "room".to_string(), TOKEN.to_string()),
            ]
        );

        // The server drops us; the token rotates before the retry.
        rt.credentials.set_token("rotated");
        conn.close();

        let mut conn = rt.server.accept().await.unwrap();
        let replayed = control_frames(&mut conn, 2).await;
        assert_eq!(
            replayed,
            vec![
                (Command::Subscribe, "message".to_string(), "rotated".to_string()),
                (Command::Subscribe, "room".to_string(), "rotated".to_string()),
            ]
        );

        // Anything queued after the replay comes out behind it, so the next
        // frame proves nothing else was replayed.
        until(|| rt.client.state() == ConnectionState::Connected).await;
        rt.client.subscribe("presence", "online", handler_fn(|_| Ok(())));
        let next = control_frames(&mut conn, 1).await;
        assert_eq!(next[0].1, "presence");
        assert!(conn.drain().is_empty());

        conn.push_json(&event("message", "created", json!({ "id": 1 })));
        assert_eq!(created_rx.recv().await.unwrap(), json!({ "id": 1 }));
        assert_eq!(rt.server.open_attempts(), 2);

        rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_live_subscribe_and_last_unsubscribe() {
        let mut rt = realtime(credentials());
        rt.client.connect().unwrap();
        let mut conn = rt.server.accept().await.unwrap();
        until(|| rt.client.state() == ConnectionState::Connected).await;

        let a = rt.client.subscribe("room", "typing", handler_fn(|_| Ok(())));
        let b = rt.client.subscribe("room", "joined", handler_fn(|_| Ok(())));
        let frames = control_frames(&mut conn, 2).await;
        assert!(frames.iter().all(|(c, ch, _)| *c == Command::Subscribe && ch == "room"));

        // Another action still uses the channel: no unsubscribe yet.
        assert_eq!(rt.client.unsubscribe("room", "typing", Some(a)), 1);
        assert_eq!(rt.client.unsubscribe("room", "joined", Some(b)), 1);
        assert_eq!(
            control_frames(&mut conn, 1).await,
            vec![(Command::Unsubscribe, "room".to_string(), TOKEN.to_string())]
        );

        rt.client.shutdown().await;
    }

    // =========================================================================
    // INBOUND ROBUSTNESS
    // =========================================================================

    #[tokio::test]
    async fn test_noise_is_dropped_without_desync() {
        let mut rt = realtime(credentials());
        let (handler, mut rx) = recorder();
        rt.client.subscribe("message", "created", handler);
        rt.client.connect().unwrap();
        let conn = rt.server.accept().await.unwrap();

        conn.push(r#"{"type":"ping","message":1700000000}"#);
        conn.push(r#"{"type":"welcome"}"#);
        conn.push("<html>502</html>");
        conn.push(r#"{"channel":"message"}"#);
        conn.push_json(&event("message", "created", json!("after the noise")));

        assert_eq!(rx.recv().await.unwrap(), json!("after the noise"));
        assert_eq!(rt.observer.dropped_frames(), 2);
        assert!(rx.try_recv().is_err());
        assert!(rt.client.connection().is_connected());

        rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_failing_handlers_are_isolated() {
        let mut rt = realtime(credentials());
        rt.client.subscribe("message", "created", handler_fn(|_| Err("rejected".into())));
        rt.client.subscribe(
            "message",
            "created",
            handler_fn(|_| panic!("handler bug")),
        );
        let (handler, mut rx) = recorder();
        rt.client.subscribe("message", "created", handler);

        rt.client.connect().unwrap();
        let conn = rt.server.accept().await.unwrap();
        conn.push_json(&event("message", "created", json!(1)));
        conn.push_json(&event("message", "created", json!(2)));

        assert_eq!(rx.recv().await.unwrap(), json!(1));
        assert_eq!(rx.recv().await.unwrap(), json!(2));
        assert_eq!(rt.observer.handler_failures(), 4);

        rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_tracing_observer_counts_dropped_frames() {
        let before = FRAMES_DROPPED
            .with_label_values(&["Frame is not valid JSON"])
            .get();
        let (client, mut server) = realtime_with(credentials(), Arc::new(TracingObserver::new()));
        let (handler, mut rx) = recorder();
        client.subscribe("message", "created", handler);
        client.connect().unwrap();
        let conn = server.accept().await.unwrap();

        conn.push("not json");
        conn.push_json(&event("message", "created", json!("ok")));
        rx.recv().await.unwrap();

        let after = FRAMES_DROPPED
            .with_label_values(&["Frame is not valid JSON"])
            .get();
        assert!(after - before >= 1.0);
        client.shutdown().await;
    }

    // =========================================================================
    // FAILURE AND TEARDOWN
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_then_manual_reconnect() {
        let mut rt = realtime(credentials());
        rt.client.subscribe("message", "created", handler_fn(|_| Ok(())));
        rt.server.refuse_all(true);
        let mut lifecycle = rt.client.lifecycle();

        rt.client.connect().unwrap();
        let attempts = loop {
            if let LifecycleEvent::TerminalFailure { attempts, .. } = lifecycle.recv().await.unwrap() {
                break attempts;
            }
        };
        assert_eq!(attempts, 5);
        assert_eq!(rt.server.open_attempts(), 6);
        assert_eq!(rt.observer.terminal_failures(), 1);
        assert_eq!(rt.client.state(), ConnectionState::Disconnected);
        // Registrations survive a terminal failure.
        assert_eq!(rt.client.router().subscription_count(), 1);

        rt.server.refuse_all(false);
        rt.client.connect().unwrap();
        assert_eq!(
            lifecycle.recv().await.unwrap(),
            LifecycleEvent::Connecting { attempt: 0 }
        );
        let mut conn = rt.server.accept().await.unwrap();
        assert_eq!(control_frames(&mut conn, 1).await[0].1, "message");

        rt.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_registry_and_stops_retrying() {
        let mut rt = realtime(credentials());
        rt.client.subscribe("message", "created", handler_fn(|_| Ok(())));
        rt.client.connect().unwrap();
        let mut conn = rt.server.accept().await.unwrap();
        control_frames(&mut conn, 1).await;

        rt.client.disconnect().await.unwrap();
        assert_eq!(rt.client.state(), ConnectionState::Disconnected);
        assert!(rt.client.router().channels().is_empty());
        assert!(conn.recv().await.is_none());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(rt.server.open_attempts(), 1);

        rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_without_token_is_refused_synchronously() {
        let rt = realtime(credentials());
        rt.credentials.clear();
        assert!(rt.client.connect().is_err());
        assert_eq!(rt.server.open_attempts(), 0);
        rt.client.shutdown().await;
    }
}
