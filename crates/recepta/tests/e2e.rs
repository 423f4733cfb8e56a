// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the assembled serve pipeline.
//!
//! Each test runs `serve::run` against a temp-dir SQLite database, a mock
//! transport, and a canned reply generator, then drives traffic through the
//! mock session. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use recepta_config::model::ReceptaConfig;
use recepta_core::traits::TransportEvent;
use recepta_core::types::{ConnectionState, InboundBody, InboundEvent, OutboundPayload, PeerId};
use recepta_test_utils::{CapturingStatusSink, MockReplier, MockTransport};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn test_config(dir: &tempfile::TempDir) -> ReceptaConfig {
    let mut config = ReceptaConfig::default();
    config.storage.database_path = dir
        .path()
        .join("recepta.db")
        .to_string_lossy()
        .into_owned();
    config.keystore.path = dir
        .path()
        .join("creds.json")
        .to_string_lossy()
        .into_owned();
    config.transport.reconnect_delay_ms = 10;
    config.delivery.retry_interval_ms = 10;
    config
}

#[tokio::test]
async fn serve_answers_an_inbound_message() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(MockTransport::new());
    let replier = Arc::new(MockReplier::new("Thanks for reaching out!"));
    let sink = Arc::new(CapturingStatusSink::new());
    let cancel = CancellationToken::new();

    let serve = tokio::spawn(recepta::serve::run(
        test_config(&dir),
        transport.clone(),
        replier,
        sink.clone(),
        cancel.clone(),
    ));

    // Wait for the session to come up.
    let mut session = None;
    for _ in 0..500 {
        if let Some(s) = transport.last_session().await {
            session = Some(s);
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let session = session.expect("transport session never opened");

    session
        .emit(TransportEvent::Message(InboundEvent {
            peer: PeerId::from("peer:51999888777"),
            body: InboundBody::Text { body: "hola".into() },
            received_at: chrono::Utc::now(),
        }))
        .await;

    // The reply must come back out through the same session.
    for _ in 0..500 {
        if !session.sent_messages().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let sent = session.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, PeerId::from("peer:51999888777"));
    assert_eq!(
        sent[0].1,
        OutboundPayload::Text {
            body: "Thanks for reaching out!".into()
        }
    );

    cancel.cancel();
    serve.await.unwrap().unwrap();
}

#[tokio::test]
async fn serve_persists_conversations_across_restarts() {
    let dir = tempdir().unwrap();

    // First run: one inbound message.
    {
        let transport = Arc::new(MockTransport::new());
        let replier = Arc::new(MockReplier::new("First run reply"));
        let sink = Arc::new(CapturingStatusSink::new());
        let cancel = CancellationToken::new();
        let serve = tokio::spawn(recepta::serve::run(
            test_config(&dir),
            transport.clone(),
            replier,
            sink,
            cancel.clone(),
        ));

        let mut session = None;
        for _ in 0..500 {
            if let Some(s) = transport.last_session().await {
                session = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let session = session.expect("transport session never opened");
        session
            .emit(TransportEvent::Message(InboundEvent {
                peer: PeerId::from("peer:123"),
                body: InboundBody::Text { body: "hola".into() },
                received_at: chrono::Utc::now(),
            }))
            .await;
        for _ in 0..500 {
            if !session.sent_messages().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        cancel.cancel();
        serve.await.unwrap().unwrap();
    }

    // The same database, inspected directly: the peer and bot messages are
    // durable and the conversation is unique per peer.
    let config = test_config(&dir);
    let store = recepta_storage::SqliteStore::open(&config.storage).await.unwrap();
    use recepta_core::traits::ConversationStore;
    use recepta_core::types::ConversationDefaults;

    let conversation = store
        .upsert_conversation(
            "peer:123",
            ConversationDefaults::for_peer(&PeerId::from("peer:123")),
        )
        .await
        .unwrap();
    assert_eq!(conversation.display_name, "Guest");
    assert_eq!(conversation.phone_number, "123");
    assert_eq!(conversation.last_message.as_deref(), Some("First run reply"));

    let messages = store
        .messages_for_conversation(&conversation.id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    store.close().await.unwrap();
}

#[tokio::test]
async fn serve_publishes_status_transitions() {
    let dir = tempdir().unwrap();
    let transport = Arc::new(MockTransport::new());
    let replier = Arc::new(MockReplier::new("reply"));
    let sink = Arc::new(CapturingStatusSink::new());
    let cancel = CancellationToken::new();

    let serve = tokio::spawn(recepta::serve::run(
        test_config(&dir),
        transport,
        replier,
        sink.clone(),
        cancel.clone(),
    ));

    for _ in 0..500 {
        if sink.last_state().await == Some(ConnectionState::Connected) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let states = sink.states().await;
    assert_eq!(
        states,
        vec![ConnectionState::Connecting, ConnectionState::Connected]
    );

    cancel.cancel();
    serve.await.unwrap().unwrap();

    // Shutdown publishes the final disconnected snapshot.
    assert_eq!(sink.last_state().await, Some(ConnectionState::Disconnected));
}
