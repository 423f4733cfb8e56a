// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply generation seam.

use async_trait::async_trait;

use crate::error::ReceptaError;
use crate::types::Conversation;

/// Produces a reply to an inbound message.
///
/// Treated as a black box by the ingestion pipeline: only the text-in,
/// text-out contract matters. Failures are caught by the caller and turned
/// into a dropped reply, never a crash.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        conversation: &Conversation,
        incoming: &str,
    ) -> Result<String, ReceptaError>;
}
