// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reply generator with a canned response and failure injection.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use recepta_core::traits::ReplyGenerator;
use recepta_core::types::Conversation;
use recepta_core::ReceptaError;

/// Returns a fixed reply and records every prompt it was asked about.
pub struct MockReplier {
    reply: String,
    fail: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockReplier {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent `generate` calls fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// The incoming texts passed to `generate`, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ReplyGenerator for MockReplier {
    async fn generate(
        &self,
        _conversation: &Conversation,
        incoming: &str,
    ) -> Result<String, ReceptaError> {
        self.calls.lock().await.push(incoming.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReceptaError::Replier {
                message: "mock generator failure".to_string(),
                source: None,
            });
        }
        Ok(self.reply.clone())
    }
}
