//! # Encrypted Delivery
//!
//! Alice sends through [`SecureMessenger`]; the "server" (in-memory store
//! plus in-memory realtime endpoint) relays the stored record to Bob's
//! realtime client, whose attached inbox decrypts it.
//!
//! The server side only ever handles envelope JSON.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sc_01_realtime::adapters::ServerConnection;
    use sc_01_realtime::{Command, ConnectionState};
    use sc_02_secure_messaging::{
        DecryptFailure, DecryptionStatus, InMemoryMessageStore, InboxEvent, Message,
        MessageUpdate, SecureMessenger, StaticKeyDirectory,
    };
    use serde_json::json;
    use shared_crypto::{CryptoError, EncryptedEnvelope};
    use shared_types::SessionCredentials;

    use crate::integration::fixtures::{
        control_frames, credentials, event, realtime, until, Realtime,
    };

    const ALICE: u64 = 1;
    const BOB: u64 = 2;

    struct World {
        store: InMemoryMessageStore,
        alice: SecureMessenger,
        bob: Arc<SecureMessenger>,
        bob_rt: Realtime,
    }

    fn world() -> World {
        let store = InMemoryMessageStore::new();
        let alice_creds = credentials();
        let bob_creds = credentials();
        let directory = Arc::new(
            StaticKeyDirectory::new()
                .with(ALICE, public_key(&alice_creds))
                .with(BOB, public_key(&bob_creds)),
        );

        let alice = SecureMessenger::new(
            ALICE,
            Arc::new(store.session(ALICE)),
            directory.clone(),
            alice_creds,
        );
        let bob = Arc::new(SecureMessenger::new(
            BOB,
            Arc::new(store.session(BOB)),
            directory,
            bob_creds.clone(),
        ));

        World {
            store,
            alice,
            bob,
            bob_rt: realtime(bob_creds),
        }
    }

    fn public_key(credentials: &SessionCredentials) -> [u8; 32] {
        use shared_types::CredentialProvider;
        *credentials.key_pair().unwrap().public_key()
    }

    /// What the server broadcasts after storing a message.
    fn relay(conn: &ServerConnection, record: &Message) {
        conn.push_json(&event(
            "message",
            "created",
            json!({ "data": { "id": record.id.to_string(), "type": "message", "attributes": record } }),
        ));
    }

    async fn connected(w: &mut World) -> ServerConnection {
        w.bob_rt.client.connect().unwrap();
        let mut conn = w.bob_rt.server.accept().await.unwrap();
        let frames = control_frames(&mut conn, 1).await;
        assert_eq!(frames[0].1, "message");
        conn
    }

    #[tokio::test]
    async fn test_message_reaches_recipient_decrypted() {
        let mut w = world();
        let mut inbox = w.bob.attach(w.bob_rt.client.router());
        let conn = connected(&mut w).await;

        let sent = w.alice.send(BOB, "the eagle has landed").await.unwrap();
        let stored = w.store.get(sent.id).unwrap();
        assert!(!stored.encrypted_content.as_deref().unwrap().contains("eagle"));
        relay(&conn, &stored);

        match inbox.recv().await.unwrap() {
            InboxEvent::Received(message) => {
                assert_eq!(message.id, sent.id);
                assert_eq!(message.decryption, DecryptionStatus::Decrypted);
                assert_eq!(message.decrypted_content.as_deref(), Some("the eagle has landed"));
                assert_eq!(message.content_hash, sent.content_hash);
            }
            other => panic!("unexpected event {other:?}"),
        }

        w.bob_rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_updates_follow_in_arrival_order() {
        let mut w = world();
        let mut inbox = w.bob.attach(w.bob_rt.client.router());
        let conn = connected(&mut w).await;

        let sent = w.alice.send(BOB, "read me").await.unwrap();
        relay(&conn, &w.store.get(sent.id).unwrap());
        let receipt = w.bob.mark_as_read(sent.id).await.unwrap();
        conn.push_json(&event("message", "updated", serde_json::to_value(&receipt).unwrap()));
        conn.push_json(&event(
            "message",
            "updated",
            serde_json::to_value(MessageUpdate::revoked(sent.id)).unwrap(),
        ));

        let mut local = match inbox.recv().await.unwrap() {
            InboxEvent::Received(message) => message,
            other => panic!("unexpected event {other:?}"),
        };
        for _ in 0..2 {
            match inbox.recv().await.unwrap() {
                InboxEvent::Updated(update) => local.apply(&update),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(local.is_read);
        assert!(local.is_revoked());
        assert_eq!(local.decrypted_content.as_deref(), Some("read me"));

        w.bob_rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_tampered_relay_never_yields_plaintext() {
        let mut w = world();
        let mut inbox = w.bob.attach(w.bob_rt.client.router());
        let conn = connected(&mut w).await;

        let sent = w.alice.send(BOB, "wire 100 to account 42").await.unwrap();
        let mut record = w.store.get(sent.id).unwrap();
        let mut envelope =
            EncryptedEnvelope::from_json(record.encrypted_content.as_deref().unwrap()).unwrap();
        envelope.nonce[0] ^= 0x80;
        record.encrypted_content = Some(envelope.to_json());
        relay(&conn, &record);

        match inbox.recv().await.unwrap() {
            InboxEvent::Received(message) => {
                assert_eq!(
                    message.decryption,
                    DecryptionStatus::Failed(DecryptFailure::Crypto(
                        CryptoError::AuthenticationFailed
                    ))
                );
                assert!(message.decrypted_content.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }

        w.bob_rt.client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbox_survives_reconnect() {
        let mut w = world();
        let mut inbox = w.bob.attach(w.bob_rt.client.router());
        let conn = connected(&mut w).await;
        conn.close();

        let mut conn = w.bob_rt.server.accept().await.unwrap();
        assert_eq!(control_frames(&mut conn, 1).await[0].1, "message");

        let sent = w.alice.send(BOB, "still here").await.unwrap();
        relay(&conn, &w.store.get(sent.id).unwrap());
        match inbox.recv().await.unwrap() {
            InboxEvent::Received(message) => {
                assert_eq!(message.decrypted_content.as_deref(), Some("still here"));
            }
            other => panic!("unexpected event {other:?}"),
        }

        w.bob_rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_closes_the_inbox() {
        let mut w = world();
        let mut inbox = w.bob.attach(w.bob_rt.client.router());
        let _conn = connected(&mut w).await;

        w.bob_rt.client.disconnect().await.unwrap();
        assert!(inbox.recv().await.is_none());

        w.bob_rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropped_inbox_unsubscribes_on_the_wire() {
        let mut w = world();
        let inbox = w.bob.attach(w.bob_rt.client.router());
        let mut conn = connected(&mut w).await;
        until(|| w.bob_rt.client.state() == ConnectionState::Connected).await;

        drop(inbox);
        let frames = control_frames(&mut conn, 1).await;
        assert_eq!(frames[0].0, Command::Unsubscribe);
        assert_eq!(frames[0].1, "message");

        assert_eq!(w.bob_rt.client.router().subscription_count(), 0);

        w.bob_rt.client.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_history_matches_live_delivery() {
        let w = world();
        w.alice.send(BOB, "first").await.unwrap();
        w.bob.send(ALICE, "second").await.unwrap();

        let bob_view = w.bob.fetch().await.unwrap();
        let alice_view = w.alice.fetch().await.unwrap();
        let texts = |messages: &[Message]| -> Vec<String> {
            messages
                .iter()
                .filter_map(|m| m.decrypted_content.clone())
                .collect()
        };
        assert_eq!(texts(&bob_view), vec!["first", "second"]);
        assert_eq!(texts(&alice_view), texts(&bob_view));

        w.bob_rt.client.shutdown().await;
    }
}
