// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message ingestion.
//!
//! For every inbound event with extractable text: resolve the peer's
//! conversation (creating it with Guest defaults on first contact), persist
//! the peer's message, generate a reply, persist the reply, and hand the
//! reply to the outbound queue. Events without text (bare media, reactions,
//! protocol noise) are ignored.
//!
//! A reply generator failure drops the reply for that one event; the peer's
//! message is already persisted and the loop keeps running.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use recepta_core::traits::{ConversationStore, ReplyGenerator};
use recepta_core::types::{
    ConversationDefaults, InboundEvent, NewMessage, OutboundPayload, Sender,
};
use recepta_core::ReceptaError;

use crate::queue::OutboundQueue;

/// Consumes inbound transport events and produces persisted replies.
pub struct InboundIngester {
    store: Arc<dyn ConversationStore>,
    replier: Arc<dyn ReplyGenerator>,
    queue: Arc<OutboundQueue>,
}

impl InboundIngester {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        replier: Arc<dyn ReplyGenerator>,
        queue: Arc<OutboundQueue>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            replier,
            queue,
        })
    }

    /// Spawns the ingestion loop over the connection manager's inbound
    /// channel. The loop ends when the channel closes or the token fires.
    pub fn spawn(
        self: &Arc<Self>,
        mut inbound: mpsc::Receiver<InboundEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => return,
                    event = inbound.recv() => match event {
                        Some(event) => event,
                        None => return,
                    },
                };
                if let Err(e) = this.process(event).await {
                    // Storage faults on one event must not kill ingestion.
                    error!(error = %e, "failed to ingest inbound event");
                }
            }
        })
    }

    /// Handles a single inbound event end to end.
    pub async fn process(&self, event: InboundEvent) -> Result<(), ReceptaError> {
        let Some(text) = event.body.text() else {
            debug!(peer = %event.peer, "ignoring inbound event without text");
            return Ok(());
        };
        let text = text.to_string();

        let conversation = self
            .store
            .upsert_conversation(&event.peer.0, ConversationDefaults::for_peer(&event.peer))
            .await?;

        self.store
            .insert_message(&NewMessage {
                conversation_id: conversation.id.clone(),
                sender: Sender::Peer,
                content: text.clone(),
                created_at: event.received_at,
            })
            .await?;
        self.store
            .touch_conversation(&conversation.id, &text, event.received_at)
            .await?;

        let reply = match self.replier.generate(&conversation, &text).await {
            Ok(reply) => reply,
            Err(e) => {
                // The peer message is already durable; only the reply is lost.
                warn!(
                    peer = %event.peer,
                    conversation_id = %conversation.id,
                    error = %e,
                    "reply generation failed, dropping reply"
                );
                return Ok(());
            }
        };

        let now = chrono::Utc::now();
        self.store
            .insert_message(&NewMessage {
                conversation_id: conversation.id.clone(),
                sender: Sender::Bot,
                content: reply.clone(),
                created_at: now,
            })
            .await?;
        self.store
            .touch_conversation(&conversation.id, &reply, now)
            .await?;

        let message_id = self
            .queue
            .enqueue(event.peer.clone(), OutboundPayload::Text { body: reply })
            .await;
        debug!(
            peer = %event.peer,
            conversation_id = %conversation.id,
            message_id = %message_id,
            "reply enqueued"
        );
        Ok(())
    }
}
